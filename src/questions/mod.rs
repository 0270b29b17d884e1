// Question bank
//
// Static reference data: 30 assessment categories, each with an ordered
// list of questions authored in YAML. Loaded once at startup, read-only
// afterwards.

mod loader;

pub use loader::QuestionBank;

use std::fmt;
use thiserror::Error;

/// Difficulty tag on a question. Absence in the source YAML is the
/// default state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Difficulty {
    #[default]
    Default,
    Hard,
}

impl Difficulty {
    /// Parse a difficulty tag. Matching is case-insensitive; the tag
    /// domain is closed, anything unrecognized is rejected.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn is_hard(&self) -> bool {
        matches!(self, Difficulty::Hard)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Default => write!(f, "default"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

/// A single assessment question within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub text: String,
    pub difficulty: Difficulty,
}

/// An ordered list of questions under one group identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupQuestions {
    pub id: String,
    pub questions: Vec<Question>,
}

/// Errors surfaced by the question-bank loader. Parsing never skips a
/// bad entry silently; a dropped question would corrupt the fixed
/// 30-group structure the rest of the pipeline relies on.
#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read question bank file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse question bank YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("duplicate group `{0}`")]
    DuplicateGroup(String),

    #[error("group `{group}`, entry {index}: question text is empty")]
    EmptyText { group: String, index: usize },

    #[error("group `{group}`, entry {index}: {reason}")]
    MalformedEntry {
        group: String,
        index: usize,
        reason: String,
    },
}
