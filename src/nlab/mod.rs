mod parser;
mod query;

pub use parser::{QuestionTableParser, RevealedAnswerParser};
pub use query::{AnswerQuery, ANSWER_ENDPOINT};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Difficulty tag written on every record. The answer endpoint is queried with
/// the same grade (`kyu=2`).
pub const LEVEL: u8 = 2;

/// One quiz item, serialized with the keys the question database has always used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(rename = "Context")]
    pub context: String,
    #[serde(rename = "Options")]
    pub options: Vec<String>,
    #[serde(rename = "Ans")]
    pub answer: String,
    #[serde(rename = "Explain")]
    pub explanation: String,
    pub level: u8,
}

impl QuestionRecord {
    pub fn new(context: String, options: Vec<String>) -> Self {
        Self {
            context,
            options,
            answer: String::new(),
            explanation: String::new(),
            level: LEVEL,
        }
    }

    /// A record carrying only a revealed answer, as stored in the answer dump.
    pub fn answer_only(answer: String) -> Self {
        Self {
            context: String::new(),
            options: vec![],
            answer,
            explanation: String::new(),
            level: LEVEL,
        }
    }
}

impl fmt::Display for QuestionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Context   : {}", self.context)?;
        writeln!(f, "Options   : ")?;
        for (i, o) in self.options.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, o)?;
        }
        if self.answer.is_empty() {
            writeln!(f, "Answer    : None")?;
        } else {
            writeln!(f, "Answer    : {}", self.answer)?;
        }
        writeln!(f, "Level     : {}", self.level)
    }
}
