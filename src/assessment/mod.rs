//! Risk / mindset assessment
//!
//! Fixed-option questionnaire: question order and each question's options
//! are shuffled once, answers are `{question, answer}` text pairs handed
//! whole to the AI for profiling. Users may type their own answer for a
//! limited number of questions.

pub mod flow;

pub use flow::{ProfileRequest, RiskFlow, RiskPhase, RiskSnapshot};

use crate::error::FinlitError;
use crate::models::{RiskQuestion, UserRiskAnswer};
use crate::quiz::shuffle::{presentation_order, shuffled};
use crate::quiz::{AutoAdvance, Navigation};
use crate::Result;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

/// Typed answers allowed per assessment
pub const MAX_CUSTOM_ANSWERS: usize = 3;

const CHOICE_ADVANCE_DELAY: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, PartialEq, Eq)]
enum RiskChoice {
    Option(usize),
    Custom(String),
}

#[derive(Debug, Clone)]
struct ShuffledRiskQuestion {
    question: RiskQuestion,
    order: Vec<usize>,
}

/// Outcome of answering the current question
#[derive(Debug, Clone, PartialEq)]
pub enum RiskStep {
    Next(AutoAdvance),
    /// Last question answered; the full answer list is ready
    Completed(Vec<UserRiskAnswer>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskQuestionView {
    pub index: usize,
    pub total: usize,
    pub question: String,
    pub options: Vec<String>,
    pub selected: Option<String>,
    pub custom_answers_left: usize,
}

#[derive(Debug, Clone)]
pub struct RiskAssessment {
    questions: Vec<ShuffledRiskQuestion>,
    current: usize,
    answers: BTreeMap<usize, RiskChoice>,
    complete: bool,
}

/// Parse a user-entered age; must be a positive whole number
pub fn validate_age(input: &str) -> Result<u32> {
    match input.trim().parse::<u32>() {
        Ok(age) if age > 0 => Ok(age),
        _ => Err(FinlitError::InvalidInput(
            "Please enter a valid age.".to_string(),
        )),
    }
}

impl RiskAssessment {
    pub fn start(questions: Vec<RiskQuestion>) -> Result<Self> {
        Self::start_with_rng(questions, &mut rand::thread_rng())
    }

    pub fn start_with_rng<R: Rng + ?Sized>(
        questions: Vec<RiskQuestion>,
        rng: &mut R,
    ) -> Result<Self> {
        if questions.is_empty() {
            return Err(FinlitError::EmptyQuiz);
        }

        for (index, q) in questions.iter().enumerate() {
            let reason = if q.question.trim().is_empty() {
                Some("prompt is empty")
            } else if q.options.len() < 2 {
                Some("needs at least two options")
            } else if q.options.iter().any(|o| o.trim().is_empty()) {
                Some("option text is empty")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(FinlitError::Validation {
                    index,
                    reason: reason.to_string(),
                });
            }
        }

        let questions = shuffled(&questions, rng)
            .into_iter()
            .map(|question| {
                let order = presentation_order(question.options.len(), rng);
                ShuffledRiskQuestion { question, order }
            })
            .collect::<Vec<_>>();

        info!(questions = questions.len(), "Risk assessment started");

        Ok(Self {
            questions,
            current: 0,
            answers: BTreeMap::new(),
            complete: false,
        })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn custom_answers_used(&self) -> usize {
        self.answers
            .values()
            .filter(|c| matches!(c, RiskChoice::Custom(_)))
            .count()
    }

    /// Options of the current question in display order
    pub fn current_options(&self) -> Vec<&str> {
        let q = &self.questions[self.current];
        q.order
            .iter()
            .map(|&i| q.question.options[i].as_str())
            .collect()
    }

    fn answer_text(&self, index: usize) -> Option<&str> {
        let q = &self.questions[index];
        match self.answers.get(&index)? {
            RiskChoice::Option(i) => Some(q.question.options[*i].as_str()),
            RiskChoice::Custom(text) => Some(text.as_str()),
        }
    }

    pub fn current_view(&self) -> RiskQuestionView {
        let q = &self.questions[self.current];
        RiskQuestionView {
            index: self.current,
            total: self.len(),
            question: q.question.question.clone(),
            options: self.current_options().into_iter().map(String::from).collect(),
            selected: self.answer_text(self.current).map(String::from),
            custom_answers_left: MAX_CUSTOM_ANSWERS.saturating_sub(self.custom_answers_used()),
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.complete {
            Err(FinlitError::SessionComplete)
        } else {
            Ok(())
        }
    }

    /// Choose by position in the displayed (shuffled) option list
    pub fn choose(&mut self, displayed_index: usize) -> Result<RiskStep> {
        self.ensure_active()?;
        let q = &self.questions[self.current];
        let original = *q
            .order
            .get(displayed_index)
            .ok_or(FinlitError::AnswerMismatch {
                index: self.current,
                reason: format!("option {} out of range", displayed_index),
            })?;
        self.record(RiskChoice::Option(original))
    }

    /// Answer the current question with free text
    pub fn choose_custom(&mut self, text: &str) -> Result<RiskStep> {
        self.ensure_active()?;
        let text = text.trim();
        if text.is_empty() {
            return Err(FinlitError::InvalidAnswer("custom answer is empty".to_string()));
        }

        let replacing_custom = matches!(self.answers.get(&self.current), Some(RiskChoice::Custom(_)));
        if !replacing_custom && self.custom_answers_used() >= MAX_CUSTOM_ANSWERS {
            return Err(FinlitError::CustomAnswerLimit(MAX_CUSTOM_ANSWERS));
        }

        self.record(RiskChoice::Custom(text.to_string()))
    }

    fn record(&mut self, choice: RiskChoice) -> Result<RiskStep> {
        self.answers.insert(self.current, choice);

        if self.current + 1 < self.len() {
            self.current += 1;
            Ok(RiskStep::Next(AutoAdvance {
                delay: CHOICE_ADVANCE_DELAY,
            }))
        } else {
            self.finish().map(RiskStep::Completed)
        }
    }

    pub fn retreat(&mut self) -> Result<Navigation> {
        self.ensure_active()?;
        if self.current == 0 {
            return Ok(Navigation::Stayed(0));
        }
        self.current -= 1;
        Ok(Navigation::Moved(self.current))
    }

    /// Answers in presentation order; every question must be answered
    pub fn finish(&mut self) -> Result<Vec<UserRiskAnswer>> {
        self.ensure_active()?;

        let missing: Vec<usize> = (0..self.len())
            .filter(|i| !self.answers.contains_key(i))
            .collect();
        if !missing.is_empty() {
            return Err(FinlitError::IncompleteAnswers { missing });
        }

        self.complete = true;
        info!(answers = self.len(), "Risk assessment complete");
        Ok(self.answers())
    }

    /// Recorded `{question, answer}` pairs in presentation order
    pub fn answers(&self) -> Vec<UserRiskAnswer> {
        (0..self.len())
            .filter_map(|i| {
                self.answer_text(i).map(|answer| UserRiskAnswer {
                    question: self.questions[i].question.question.clone(),
                    answer: answer.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn questions(n: usize) -> Vec<RiskQuestion> {
        (0..n)
            .map(|i| RiskQuestion {
                question: format!("Scenario {}: the market drops 20%", i),
                options: vec![
                    "Sell everything".to_string(),
                    "Hold".to_string(),
                    "Buy more".to_string(),
                ],
            })
            .collect()
    }

    #[test]
    fn test_validate_age() {
        assert_eq!(validate_age(" 34 ").unwrap(), 34);
        assert!(validate_age("0").is_err());
        assert!(validate_age("-4").is_err());
        assert!(validate_age("abc").is_err());
    }

    #[test]
    fn test_rejects_malformed() {
        assert!(matches!(RiskAssessment::start(vec![]), Err(FinlitError::EmptyQuiz)));
        let bad = vec![RiskQuestion {
            question: "Q".into(),
            options: vec!["only".into()],
        }];
        assert!(matches!(
            RiskAssessment::start(bad),
            Err(FinlitError::Validation { index: 0, .. })
        ));
    }

    #[test]
    fn test_choice_maps_through_shuffle() {
        let mut assessment =
            RiskAssessment::start_with_rng(questions(2), &mut StdRng::seed_from_u64(4)).unwrap();
        let displayed = assessment.current_options()[1].to_string();
        let prompt = assessment.current_view().question;

        assert!(matches!(assessment.choose(1).unwrap(), RiskStep::Next(_)));
        let RiskStep::Completed(answers) = assessment.choose(0).unwrap() else {
            panic!("expected completion");
        };

        assert!(assessment.is_complete());
        assert_eq!(answers[0].question, prompt);
        assert_eq!(answers[0].answer, displayed);
    }

    #[test]
    fn test_custom_answer_limit() {
        let mut assessment =
            RiskAssessment::start_with_rng(questions(5), &mut StdRng::seed_from_u64(8)).unwrap();
        for _ in 0..3 {
            assessment.choose_custom("Depends on my emergency fund").unwrap();
        }
        assert_eq!(assessment.current_view().custom_answers_left, 0);
        assert!(matches!(
            assessment.choose_custom("One more"),
            Err(FinlitError::CustomAnswerLimit(3))
        ));

        // Replacing an existing custom answer does not spend a slot
        assessment.retreat().unwrap();
        assert!(assessment.choose_custom("Changed my mind").is_ok());
        assert!(matches!(
            assessment.choose_custom("   "),
            Err(FinlitError::InvalidAnswer(_))
        ));
    }

    #[test]
    fn test_reanswer_overwrites() {
        let mut assessment =
            RiskAssessment::start_with_rng(questions(3), &mut StdRng::seed_from_u64(2)).unwrap();
        assessment.choose(0).unwrap();
        assessment.retreat().unwrap();
        assessment.choose(2).unwrap();
        assert_eq!(assessment.current_index(), 1);
        assessment.choose(0).unwrap();
        let RiskStep::Completed(answers) = assessment.choose(0).unwrap() else {
            panic!("expected completion");
        };
        assert_eq!(answers.len(), 3);
    }

    #[test]
    fn test_retreat_bounded() {
        let mut assessment = RiskAssessment::start(questions(2)).unwrap();
        assert_eq!(assessment.retreat().unwrap(), Navigation::Stayed(0));
        assert!(matches!(
            assessment.finish(),
            Err(FinlitError::IncompleteAnswers { .. })
        ));
    }

    #[test]
    fn test_flow_types_available_from_module_root() {
        use crate::models::{Language, UserContext};

        let mut flow = RiskFlow::new(Language::En, UserContext::default());
        let snapshot: RiskSnapshot = flow.snapshot();
        assert_eq!(snapshot.phase, "awaiting_age");

        flow.submit_age("40").unwrap();
        assert!(matches!(flow.phase(), RiskPhase::Generating { age: 40 }));
    }
}
