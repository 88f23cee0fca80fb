use chrono::Utc;
use shared::dispatch::{DispatchError, Dispatcher};
use shared::intake::{
    DEFAULT_BUSINESS_TYPE, DEFAULT_CITY, QUICK_START_GOALS, parse_business_intent,
    quick_start_goal,
};
use shared::models::{AssessmentAnswers, BusinessStage};
use shared::session::{ChatSession, SessionStore, SessionStoreError};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::cli::parse_yes_no;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerUpdate {
    Stage(BusinessStage),
    Industry(String),
    Challenge(String),
    HasPlan(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Chat(String),
    Items,
    Done(usize),
    Goals,
    Goal(&'static str),
    Answer(AnswerUpdate),
    Reset,
    Quit,
    Empty,
    Invalid(String),
}

pub fn parse_command(line: &str) -> Command {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }
    if !trimmed.starts_with('/') {
        return Command::Chat(trimmed.to_string());
    }

    let (name, argument) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (trimmed, ""),
    };

    match (name, argument) {
        ("/items", "") => Command::Items,
        ("/goals", "") => Command::Goals,
        ("/reset", "") => Command::Reset,
        ("/quit" | "/exit", "") => Command::Quit,
        ("/done", number) if !number.is_empty() => match number.parse::<usize>() {
            Ok(number) if number > 0 => Command::Done(number),
            _ => Command::Invalid(format!("/done expects an item number, got {number}")),
        },
        ("/goal", id) if !id.is_empty() => match quick_start_goal(id) {
            Some(goal) => Command::Goal(goal.id),
            None => Command::Invalid(format!("unknown goal: {id} (type /goals to list them)")),
        },
        ("/stage", value) if !value.is_empty() => match BusinessStage::parse(value) {
            Some(stage) => Command::Answer(AnswerUpdate::Stage(stage)),
            None => Command::Invalid(format!(
                "unknown stage: {value} (expected idea, startup, established, growth or transition)"
            )),
        },
        ("/industry", value) if !value.is_empty() => {
            Command::Answer(AnswerUpdate::Industry(value.to_string()))
        }
        ("/challenge", value) if !value.is_empty() => {
            Command::Answer(AnswerUpdate::Challenge(value.to_string()))
        }
        ("/plan", value) if !value.is_empty() => match parse_yes_no(value) {
            Some(has_plan) => Command::Answer(AnswerUpdate::HasPlan(has_plan)),
            None => Command::Invalid(format!("/plan expects yes or no, got {value}")),
        },
        _ => Command::Invalid(format!("unknown command: {trimmed}")),
    }
}

#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Print(String),
    Quit,
}

/// One running chat session. Every mutation is persisted before the
/// result is shown.
pub struct Advisor<S: SessionStore> {
    dispatcher: Dispatcher,
    store: S,
    session: ChatSession,
}

impl<S: SessionStore> Advisor<S> {
    pub fn new(dispatcher: Dispatcher, store: S, session: ChatSession) -> Self {
        Self {
            dispatcher,
            store,
            session,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<Step, AdvisorError> {
        match parse_command(line) {
            Command::Empty => Ok(Step::Print(String::new())),
            Command::Invalid(message) => Ok(Step::Print(message)),
            Command::Quit => Ok(Step::Quit),
            Command::Items => Ok(Step::Print(render_items(&self.session))),
            Command::Done(number) => self.toggle(number),
            Command::Goals => Ok(Step::Print(render_goals())),
            Command::Goal(id) => match quick_start_goal(id) {
                Some(goal) => self.chat(goal.prompt).await,
                None => Ok(Step::Print(format!("unknown goal: {id}"))),
            },
            Command::Answer(update) => {
                apply_answer(&mut self.session.answers, update);
                self.session.updated_at = Utc::now();
                self.store.save(&self.session)?;
                Ok(Step::Print(render_answers(&self.session.answers)))
            }
            Command::Reset => {
                self.session.reset(Utc::now());
                self.store.save(&self.session)?;
                info!("session reset");
                Ok(Step::Print(last_message(&self.session)))
            }
            Command::Chat(text) => self.chat(&text).await,
        }
    }

    async fn chat(&mut self, text: &str) -> Result<Step, AdvisorError> {
        self.seed_industry(text);

        let history = self.session.history();
        let result = self
            .dispatcher
            .send_message(text, &history, &self.session.answers)
            .await?;
        let new_items = result.progress_items.len();

        self.session.push_user(text, Utc::now());
        self.session.push_assistant(result, Utc::now());
        self.store.save(&self.session)?;

        let mut output = last_message(&self.session);
        if new_items > 0 {
            output.push_str(&format!(
                "\n\n({new_items} action item(s) suggested; type /items to review)"
            ));
        }
        Ok(Step::Print(output))
    }

    fn toggle(&mut self, number: usize) -> Result<Step, AdvisorError> {
        let Some(id) = self
            .session
            .action_items
            .get(number - 1)
            .map(|item| item.id.clone())
        else {
            return Ok(Step::Print(format!("no action item #{number}")));
        };

        self.session.toggle_item(&id, Utc::now());
        self.store.save(&self.session)?;
        Ok(Step::Print(render_items(&self.session)))
    }

    // A first message such as "start a bakery in Lafayette" fills in a
    // missing industry so the system prompt is tailored from turn one.
    fn seed_industry(&mut self, text: &str) {
        let is_first_turn = self.session.messages.len() <= 1;
        if !is_first_turn || self.session.answers.industry.is_some() {
            return;
        }

        let intent = parse_business_intent(text);
        if intent.city == DEFAULT_CITY || intent.business_type == DEFAULT_BUSINESS_TYPE {
            return;
        }

        debug!(industry = %intent.business_type, city = %intent.city, "seeding industry from first message");
        self.session.answers.industry = Some(intent.business_type);
    }
}

/// Loads the saved session or starts a new one, applying `updates` to its
/// answers. A resumed session that changed is saved straight away.
pub fn open_session<S: SessionStore>(
    store: &S,
    updates: Vec<AnswerUpdate>,
) -> Result<ChatSession, SessionStoreError> {
    let saved = match store.load() {
        Ok(saved) => saved,
        Err(err) => {
            warn!("ignoring unreadable session: {err}");
            None
        }
    };

    match saved {
        Some(mut session) => {
            info!("resumed saved session");
            if !updates.is_empty() {
                for update in updates {
                    apply_answer(&mut session.answers, update);
                }
                session.updated_at = Utc::now();
                store.save(&session)?;
            }
            Ok(session)
        }
        None => {
            let mut answers = AssessmentAnswers::default();
            for update in updates {
                apply_answer(&mut answers, update);
            }
            Ok(ChatSession::start(answers, Utc::now()))
        }
    }
}

pub fn apply_answer(answers: &mut AssessmentAnswers, update: AnswerUpdate) {
    match update {
        AnswerUpdate::Stage(stage) => answers.stage = Some(stage),
        AnswerUpdate::Industry(industry) => answers.industry = Some(industry),
        AnswerUpdate::Challenge(challenge) => answers.main_challenge = Some(challenge),
        AnswerUpdate::HasPlan(has_plan) => answers.has_business_plan = Some(has_plan),
    }
}

pub fn render_answers(answers: &AssessmentAnswers) -> String {
    let has_plan = match answers.has_business_plan {
        Some(true) => "yes",
        Some(false) => "no",
        None => "not specified",
    };
    format!(
        "Profile: stage {}, industry {}, challenge {}, business plan {has_plan}",
        answers.stage.map_or("not specified", BusinessStage::as_str),
        answers.industry.as_deref().unwrap_or("not specified"),
        answers.main_challenge.as_deref().unwrap_or("not specified"),
    )
}

pub fn render_goals() -> String {
    let mut lines = vec!["Quick-start goals (type /goal <id>):".to_string()];
    for goal in QUICK_START_GOALS {
        lines.push(format!("  {:<11} {}", goal.id, goal.label));
    }
    lines.join("\n")
}

pub fn render_items(session: &ChatSession) -> String {
    if session.action_items.is_empty() {
        return "No action items yet.".to_string();
    }

    let mut lines = vec![format!(
        "Action items ({} of {} done):",
        session.completed_count(),
        session.action_items.len()
    )];
    for (index, item) in session.action_items.iter().enumerate() {
        let mark = if item.completed { "x" } else { " " };
        let category = item
            .category
            .as_deref()
            .map(|category| format!(" [{category}]"))
            .unwrap_or_default();
        lines.push(format!("  {}. [{mark}] {}{category}", index + 1, item.title));
        if !item.description.is_empty() {
            lines.push(format!("       {}", item.description));
        }
    }
    lines.join("\n")
}

pub fn last_message(session: &ChatSession) -> String {
    session
        .messages
        .last()
        .map(|message| message.content.clone())
        .unwrap_or_default()
}
