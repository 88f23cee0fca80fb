use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

pub const DEFAULT_BUSINESS_TYPE: &str = "business";
pub const DEFAULT_CITY: &str = "Louisiana";

/// What a visitor wants to build and where, read from a free-text sentence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusinessIntent {
    pub business_type: String,
    pub city: String,
}

#[derive(Debug, Clone, Copy)]
pub struct QuickStartGoal {
    pub id: &'static str,
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const QUICK_START_GOALS: &[QuickStartGoal] = &[
    QuickStartGoal {
        id: "start",
        label: "Start a Business",
        prompt: "I want to start a business in Louisiana",
    },
    QuickStartGoal {
        id: "grow",
        label: "Grow Revenue",
        prompt: "I want to grow my business revenue",
    },
    QuickStartGoal {
        id: "funding",
        label: "Get Funding",
        prompt: "I need help securing funding for my business",
    },
    QuickStartGoal {
        id: "compliance",
        label: "Navigate Compliance",
        prompt: "I need help with Louisiana business compliance",
    },
    QuickStartGoal {
        id: "marketing",
        label: "Improve Marketing",
        prompt: "I want to improve my marketing strategy",
    },
    QuickStartGoal {
        id: "operations",
        label: "Optimize Operations",
        prompt: "I want to optimize my business operations",
    },
];

pub fn quick_start_goal(id: &str) -> Option<&'static QuickStartGoal> {
    QUICK_START_GOALS.iter().find(|goal| goal.id == id)
}

// Most specific first: "start a X in Y", then "a X in Y", then "X in Y".
static INTENT_PATTERNS: LazyLock<Result<Vec<Regex>, String>> = LazyLock::new(|| {
    [
        r"(?i)\b(?:start|open|launch|create)\s+(?:a|an)\s+(.+?)\s+in\s+([^.!?]+)",
        r"(?i)\b(?:a|an)\s+(.+?)\s+in\s+([^.!?]+)",
        r"(?i)^\s*(.+?)\s+in\s+([^.!?]+)",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).map_err(|err| err.to_string()))
    .collect()
});

pub fn parse_business_intent(text: &str) -> BusinessIntent {
    match INTENT_PATTERNS.as_ref() {
        Ok(patterns) => {
            for pattern in patterns {
                if let Some(captures) = pattern.captures(text) {
                    let business_type = captures.get(1).map_or("", |m| m.as_str().trim());
                    let city = captures.get(2).map_or("", |m| m.as_str().trim());
                    if !business_type.is_empty() && !city.is_empty() {
                        return BusinessIntent {
                            business_type: business_type.to_string(),
                            city: city.to_string(),
                        };
                    }
                }
            }
        }
        Err(err) => warn!("intent patterns failed to compile: {err}"),
    }

    if let Some(intent) = split_on_in(text) {
        return intent;
    }

    let trimmed = text.trim();
    BusinessIntent {
        business_type: if trimmed.is_empty() {
            DEFAULT_BUSINESS_TYPE.to_string()
        } else {
            trimmed.to_string()
        },
        city: DEFAULT_CITY.to_string(),
    }
}

fn split_on_in(text: &str) -> Option<BusinessIntent> {
    let words = text.split_whitespace().collect::<Vec<_>>();
    if words.len() < 3 {
        return None;
    }

    let index = words.iter().position(|word| word.eq_ignore_ascii_case("in"))?;
    if index == 0 || index + 1 >= words.len() {
        return None;
    }

    Some(BusinessIntent {
        business_type: words[..index].join(" "),
        city: words[index + 1..].join(" "),
    })
}
