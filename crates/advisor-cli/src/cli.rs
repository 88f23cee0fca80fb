use std::path::PathBuf;

use shared::models::BusinessStage;
use thiserror::Error;

use crate::repl::AnswerUpdate;

pub const DEFAULT_SESSION_PATH: &str = ".advisor-session.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub relay_url: Option<String>,
    pub offline: bool,
    pub session_path: PathBuf,
    pub stage: Option<BusinessStage>,
    pub industry: Option<String>,
    pub challenge: Option<String>,
    pub has_plan: Option<bool>,
    pub reset: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("invalid --stage value: {0} (expected idea, startup, established, growth or transition)")]
    InvalidStage(String),
    #[error("invalid --has-plan value: {0} (expected yes or no)")]
    InvalidHasPlan(String),
    #[error("--relay-url cannot be combined with --offline")]
    RelayUrlWithOffline,
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self {
            relay_url: None,
            offline: false,
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
            stage: None,
            industry: None,
            challenge: None,
            has_plan: None,
            reset: false,
        };

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--offline" => options.offline = true,
                "--reset" => options.reset = true,
                "--relay-url" => options.relay_url = Some(required_value(&mut iter, &arg)?),
                "--session" => options.session_path = PathBuf::from(required_value(&mut iter, &arg)?),
                "--stage" => {
                    let value = required_value(&mut iter, &arg)?;
                    options.stage = Some(
                        BusinessStage::parse(&value).ok_or(CliError::InvalidStage(value))?,
                    );
                }
                "--industry" => options.industry = Some(required_value(&mut iter, &arg)?),
                "--challenge" => options.challenge = Some(required_value(&mut iter, &arg)?),
                "--has-plan" => {
                    let value = required_value(&mut iter, &arg)?;
                    options.has_plan =
                        Some(parse_yes_no(&value).ok_or(CliError::InvalidHasPlan(value))?);
                }
                unknown => return Err(CliError::UnknownArgument(unknown.to_string())),
            }
        }

        if options.offline && options.relay_url.is_some() {
            return Err(CliError::RelayUrlWithOffline);
        }

        Ok(options)
    }

    /// True when any assessment flag was given on the command line.
    pub fn has_assessment_overrides(&self) -> bool {
        !self.answer_updates().is_empty()
    }

    pub fn answer_updates(&self) -> Vec<AnswerUpdate> {
        let mut updates = Vec::new();
        if let Some(stage) = self.stage {
            updates.push(AnswerUpdate::Stage(stage));
        }
        if let Some(industry) = &self.industry {
            updates.push(AnswerUpdate::Industry(industry.clone()));
        }
        if let Some(challenge) = &self.challenge {
            updates.push(AnswerUpdate::Challenge(challenge.clone()));
        }
        if let Some(has_plan) = self.has_plan {
            updates.push(AnswerUpdate::HasPlan(has_plan));
        }
        updates
    }
}

pub fn parse_yes_no(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" => Some(true),
        "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

fn required_value<I>(iter: &mut I, flag: &str) -> Result<String, CliError>
where
    I: Iterator<Item = String>,
{
    iter.next()
        .filter(|value| !value.starts_with("--"))
        .ok_or_else(|| CliError::MissingValue(flag.to_string()))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use shared::models::BusinessStage;

    use super::{CliError, CliOptions, DEFAULT_SESSION_PATH, parse_yes_no};

    fn parse(args: &[&str]) -> Result<CliOptions, CliError> {
        CliOptions::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn defaults_without_arguments() {
        let options = parse(&[]).expect("empty args should parse");
        assert_eq!(options.relay_url, None);
        assert!(!options.offline);
        assert!(!options.reset);
        assert_eq!(options.session_path, PathBuf::from(DEFAULT_SESSION_PATH));
        assert!(!options.has_assessment_overrides());
    }

    #[test]
    fn parses_every_flag() {
        let options = parse(&[
            "--relay-url",
            "http://127.0.0.1:4000",
            "--session",
            "/tmp/s.json",
            "--stage",
            "Growth",
            "--industry",
            "Catering",
            "--challenge",
            "Hiring",
            "--has-plan",
            "No",
            "--reset",
        ])
        .expect("flags should parse");

        assert_eq!(options.relay_url.as_deref(), Some("http://127.0.0.1:4000"));
        assert_eq!(options.session_path, PathBuf::from("/tmp/s.json"));
        assert_eq!(options.stage, Some(BusinessStage::Growth));
        assert_eq!(options.industry.as_deref(), Some("Catering"));
        assert_eq!(options.challenge.as_deref(), Some("Hiring"));
        assert_eq!(options.has_plan, Some(false));
        assert!(options.reset);
        assert!(options.has_assessment_overrides());
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(parse(&["--stage", "unicorn"]), Err(CliError::InvalidStage(_))));
        assert!(matches!(parse(&["--industry"]), Err(CliError::MissingValue(_))));
        assert!(matches!(
            parse(&["--industry", "--offline"]),
            Err(CliError::MissingValue(_))
        ));
        assert!(matches!(parse(&["--verbose"]), Err(CliError::UnknownArgument(_))));
        assert!(matches!(
            parse(&["--offline", "--relay-url", "http://x"]),
            Err(CliError::RelayUrlWithOffline)
        ));
        assert!(matches!(parse(&["-h"]), Err(CliError::HelpRequested)));
        assert!(matches!(
            parse(&["--has-plan", "sometimes"]),
            Err(CliError::InvalidHasPlan(_))
        ));
    }

    #[test]
    fn has_plan_alone_counts_as_an_override() {
        let options = parse(&["--has-plan", "yes"]).expect("flag should parse");
        assert_eq!(options.has_plan, Some(true));
        assert!(options.has_assessment_overrides());
        assert_eq!(parse_yes_no(" Y "), Some(true));
        assert_eq!(parse_yes_no("false"), Some(false));
        assert_eq!(parse_yes_no(""), None);
    }
}
