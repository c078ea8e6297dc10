//! Question and answer records
//!
//! Wire format follows what the AI service returns: a `type` tag of
//! `mc`, `tf`, `input` or `matching` with kind-specific fields alongside.

use crate::error::FinlitError;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizOption {
    pub text: String,
    /// Mindset / correctness tag attached by the generator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mindset: Option<String>,
}

impl QuizOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mindset: None,
        }
    }

    pub fn tagged(text: impl Into<String>, mindset: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            mindset: Some(mindset.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MatchingPair {
    pub left: String,
    pub right: String,
}

impl MatchingPair {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: left.into(),
            right: right.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum QuestionKind {
    #[serde(rename = "mc")]
    MultipleChoice {
        #[serde(default)]
        options: Vec<QuizOption>,
    },
    #[serde(rename = "tf")]
    TrueFalse {
        #[serde(default)]
        options: Vec<QuizOption>,
    },
    #[serde(rename = "input")]
    FreeText {
        #[serde(
            rename = "correctAnswerLabel",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        reference: Option<String>,
    },
    #[serde(rename = "matching")]
    Matching {
        #[serde(default)]
        pairs: Vec<MatchingPair>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(default)]
    pub feedback: String,
    #[serde(flatten)]
    pub kind: QuestionKind,
}

impl Question {
    pub fn multiple_choice(prompt: impl Into<String>, options: Vec<QuizOption>) -> Self {
        Self {
            prompt: prompt.into(),
            feedback: String::new(),
            kind: QuestionKind::MultipleChoice { options },
        }
    }

    pub fn true_false(prompt: impl Into<String>, options: Vec<QuizOption>) -> Self {
        Self {
            prompt: prompt.into(),
            feedback: String::new(),
            kind: QuestionKind::TrueFalse { options },
        }
    }

    pub fn free_text(prompt: impl Into<String>, reference: Option<String>) -> Self {
        Self {
            prompt: prompt.into(),
            feedback: String::new(),
            kind: QuestionKind::FreeText { reference },
        }
    }

    pub fn matching(prompt: impl Into<String>, pairs: Vec<MatchingPair>) -> Self {
        Self {
            prompt: prompt.into(),
            feedback: String::new(),
            kind: QuestionKind::Matching { pairs },
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = feedback.into();
        self
    }

    /// Wire tag of this question's kind
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            QuestionKind::MultipleChoice { .. } => "mc",
            QuestionKind::TrueFalse { .. } => "tf",
            QuestionKind::FreeText { .. } => "input",
            QuestionKind::Matching { .. } => "matching",
        }
    }

    /// Options for MC/TF questions
    pub fn options(&self) -> Option<&[QuizOption]> {
        match &self.kind {
            QuestionKind::MultipleChoice { options } | QuestionKind::TrueFalse { options } => {
                Some(options)
            }
            _ => None,
        }
    }

    /// Pairs for matching questions
    pub fn pairs(&self) -> Option<&[MatchingPair]> {
        match &self.kind {
            QuestionKind::Matching { pairs } => Some(pairs),
            _ => None,
        }
    }

    /// Reject records that would misbehave mid-session
    pub fn validate(&self, index: usize) -> Result<()> {
        let invalid = |reason: &str| FinlitError::Validation {
            index,
            reason: reason.to_string(),
        };

        if self.prompt.trim().is_empty() {
            return Err(invalid("prompt is empty"));
        }

        match &self.kind {
            QuestionKind::MultipleChoice { options } => {
                if options.len() < 2 {
                    return Err(invalid("multiple-choice needs at least two options"));
                }
                if options.iter().any(|o| o.text.trim().is_empty()) {
                    return Err(invalid("option text is empty"));
                }
            }
            QuestionKind::TrueFalse { options } => {
                if options.len() != 2 {
                    return Err(invalid("true/false needs exactly two options"));
                }
                if options.iter().any(|o| o.text.trim().is_empty()) {
                    return Err(invalid("option text is empty"));
                }
            }
            QuestionKind::FreeText { .. } => {}
            QuestionKind::Matching { pairs } => {
                if pairs.is_empty() {
                    return Err(invalid("matching needs at least one pair"));
                }
                if pairs
                    .iter()
                    .any(|p| p.left.trim().is_empty() || p.right.trim().is_empty())
                {
                    return Err(invalid("matching pair has an empty side"));
                }
                let mut lefts = HashSet::new();
                let mut rights = HashSet::new();
                for pair in pairs {
                    if !lefts.insert(pair.left.as_str()) {
                        return Err(invalid(&format!("duplicate left item '{}'", pair.left)));
                    }
                    if !rights.insert(pair.right.as_str()) {
                        return Err(invalid(&format!("duplicate right item '{}'", pair.right)));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Payload of an answer; shape depends on the question kind
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum AnswerContent {
    /// Index into the original (unshuffled) option list
    Option(usize),
    Text(String),
    Pairs(Vec<MatchingPair>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_index: usize,
    pub answer_content: AnswerContent,
}
