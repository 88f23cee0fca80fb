use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use crate::llm::PROGRESS_ITEMS_MARKER;
use crate::models::ActionItem;

#[derive(Debug, Deserialize)]
struct ProposedItem {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    category: Option<String>,
}

pub fn extract_action_items(text: &str) -> Vec<ActionItem> {
    extract_action_items_at(text, Utc::now())
}

/// Parses the JSON array that follows the progress marker. Never fails:
/// a missing marker or malformed JSON yields an empty list.
pub fn extract_action_items_at(text: &str, now: DateTime<Utc>) -> Vec<ActionItem> {
    let Some(marker_at) = text.find(PROGRESS_ITEMS_MARKER) else {
        return Vec::new();
    };
    let trailer = &text[marker_at + PROGRESS_ITEMS_MARKER.len()..];

    let (Some(start), Some(end)) = (trailer.find('['), trailer.rfind(']')) else {
        warn!("progress marker present without a JSON array");
        return Vec::new();
    };
    if end < start {
        warn!("progress marker present without a JSON array");
        return Vec::new();
    }

    let proposed = match serde_json::from_str::<Vec<ProposedItem>>(&trailer[start..=end]) {
        Ok(items) => items,
        Err(err) => {
            warn!("failed to parse progress items: {err}");
            return Vec::new();
        }
    };

    let stamp = now.timestamp_millis();
    proposed
        .into_iter()
        .enumerate()
        .map(|(index, item)| ActionItem {
            id: format!("{stamp}-{index}"),
            title: item.title,
            description: item.description,
            completed: false,
            category: item.category.filter(|category| !category.trim().is_empty()),
        })
        .collect()
}

/// Splits a reply into the prose shown to the user and its action items.
pub fn split_reply(text: &str, now: DateTime<Utc>) -> (String, Vec<ActionItem>) {
    match text.find(PROGRESS_ITEMS_MARKER) {
        Some(marker_at) => (
            text[..marker_at].trim_end().to_string(),
            extract_action_items_at(text, now),
        ),
        None => (text.to_string(), Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{extract_action_items, extract_action_items_at, split_reply};

    #[test]
    fn extracts_single_item_with_synthesized_id() {
        let items = extract_action_items(
            r#"Here is a plan. PROGRESS_ITEMS:[{"title":"A","description":"B","category":"C"}]"#,
        );

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "A");
        assert_eq!(items[0].description, "B");
        assert_eq!(items[0].category.as_deref(), Some("C"));
        assert!(!items[0].completed);
        assert!(!items[0].id.is_empty());
    }

    #[test]
    fn ids_are_unique_per_item() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let items = extract_action_items_at(
            "PROGRESS_ITEMS:\n[{\"title\":\"One\",\"description\":\"\"},{\"title\":\"Two\",\"description\":\"\"}]",
            now,
        );

        let stamp = now.timestamp_millis();
        assert_eq!(items[0].id, format!("{stamp}-0"));
        assert_eq!(items[1].id, format!("{stamp}-1"));
        assert_eq!(items[1].category, None);
    }

    #[test]
    fn missing_marker_yields_no_items() {
        assert!(extract_action_items("Just prose with [brackets] in it").is_empty());
    }

    #[test]
    fn malformed_json_yields_no_items() {
        assert!(extract_action_items("Reply PROGRESS_ITEMS:[not valid json]").is_empty());
        assert!(extract_action_items("Reply PROGRESS_ITEMS: ] dangling [").is_empty());
        assert!(extract_action_items("Reply PROGRESS_ITEMS:").is_empty());
    }

    #[test]
    fn split_reply_strips_the_trailer() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let (message, items) = split_reply(
            "Start with a plan.\n\nPROGRESS_ITEMS:[{\"title\":\"Draft plan\",\"description\":\"Outline sections\",\"category\":\"Planning\"}]",
            now,
        );

        assert_eq!(message, "Start with a plan.");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Draft plan");
    }

    #[test]
    fn split_reply_keeps_text_without_marker() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let (message, items) = split_reply("No next steps here.", now);
        assert_eq!(message, "No next steps here.");
        assert!(items.is_empty());
    }
}
