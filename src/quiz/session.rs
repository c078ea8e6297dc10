//! Quiz session state machine
//!
//! `Active(index) -> Active(index + 1) -> ... -> Complete`. One value holds
//! the shuffled presentation, the position, the answers and the matching
//! boards; every event goes through a single method on it.

use super::matching::{MatchingBoard, PickOutcome, Side};
use super::question::{Answer, AnswerContent, Question, QuestionKind};
use super::shuffle::{presentation_order, shuffled};
use crate::error::FinlitError;
use crate::Result;
use rand::Rng;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Pause before moving on after an option is picked
pub const OPTION_ADVANCE_DELAY: Duration = Duration::from_millis(300);
/// Pause after the last matching pair so the finished board is visible
pub const MATCHING_ADVANCE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub(crate) enum Presentation {
    /// Original option indices in display order
    Options(Vec<usize>),
    FreeText,
    Matching(MatchingBoard),
}

#[derive(Debug, Clone)]
pub(crate) struct ProcessedQuestion {
    pub(crate) question: Question,
    pub(crate) presentation: Presentation,
}

/// Caller should move to the next question after `delay`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoAdvance {
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Moved(usize),
    /// At a boundary; position unchanged
    Stayed(usize),
    Completed(Vec<Answer>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchProgress {
    pub outcome: PickOutcome,
    pub auto_advance: Option<AutoAdvance>,
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    id: Uuid,
    pub(crate) questions: Vec<ProcessedQuestion>,
    current: usize,
    answers: BTreeMap<usize, AnswerContent>,
    complete: bool,
}

impl QuizSession {
    /// Start a session with thread-local randomness
    pub fn start(questions: Vec<Question>) -> Result<Self> {
        Self::start_with_rng(questions, &mut rand::thread_rng())
    }

    pub fn start_with_rng<R: Rng + ?Sized>(questions: Vec<Question>, rng: &mut R) -> Result<Self> {
        if questions.is_empty() {
            return Err(FinlitError::EmptyQuiz);
        }

        for (index, question) in questions.iter().enumerate() {
            question.validate(index)?;
        }

        let processed = questions
            .into_iter()
            .map(|question| {
                let presentation = match &question.kind {
                    QuestionKind::MultipleChoice { options } | QuestionKind::TrueFalse { options } => {
                        Presentation::Options(presentation_order(options.len(), rng))
                    }
                    QuestionKind::FreeText { .. } => Presentation::FreeText,
                    QuestionKind::Matching { pairs } => {
                        let lefts: Vec<String> = pairs.iter().map(|p| p.left.clone()).collect();
                        let rights: Vec<String> = pairs.iter().map(|p| p.right.clone()).collect();
                        Presentation::Matching(MatchingBoard::new(
                            shuffled(&lefts, rng),
                            shuffled(&rights, rng),
                        ))
                    }
                };
                ProcessedQuestion {
                    question,
                    presentation,
                }
            })
            .collect::<Vec<_>>();

        let session = Self {
            id: Uuid::new_v4(),
            questions: processed,
            current: 0,
            answers: BTreeMap::new(),
            complete: false,
        };

        info!(session_id = %session.id, questions = session.len(), "Quiz session started");

        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
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

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index).map(|p| &p.question)
    }

    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().map(|p| &p.question)
    }

    pub fn answer_for(&self, index: usize) -> Option<&AnswerContent> {
        self.answers.get(&index)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Display order of a MC/TF question, as original option indices
    pub fn option_order(&self, index: usize) -> Option<&[usize]> {
        match &self.questions.get(index)?.presentation {
            Presentation::Options(order) => Some(order),
            _ => None,
        }
    }

    pub fn board(&self, index: usize) -> Option<&MatchingBoard> {
        match &self.questions.get(index)?.presentation {
            Presentation::Matching(board) => Some(board),
            _ => None,
        }
    }

    pub fn missing_answers(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|i| !self.answers.contains_key(i))
            .collect()
    }

    pub fn can_finish(&self) -> bool {
        self.answers.len() == self.len()
    }

    fn ensure_active(&self) -> Result<()> {
        if self.complete {
            Err(FinlitError::SessionComplete)
        } else {
            Ok(())
        }
    }

    /// Record or overwrite the answer for `index`
    pub fn answer(&mut self, index: usize, content: AnswerContent) -> Result<()> {
        self.ensure_active()?;

        let len = self.len();
        let processed = self
            .questions
            .get_mut(index)
            .ok_or(FinlitError::IndexOutOfRange { index, len })?;

        let mismatch = |reason: String| FinlitError::AnswerMismatch { index, reason };

        let content = match (&processed.question.kind, content) {
            (
                QuestionKind::MultipleChoice { options } | QuestionKind::TrueFalse { options },
                AnswerContent::Option(choice),
            ) => {
                if choice >= options.len() {
                    return Err(mismatch(format!(
                        "option {} out of range ({} options)",
                        choice,
                        options.len()
                    )));
                }
                AnswerContent::Option(choice)
            }
            (QuestionKind::FreeText { .. }, AnswerContent::Text(text)) => {
                if text.trim().is_empty() {
                    return Err(FinlitError::InvalidAnswer(
                        "free-text answer is empty".to_string(),
                    ));
                }
                AnswerContent::Text(text)
            }
            (QuestionKind::Matching { .. }, AnswerContent::Pairs(pairs)) => {
                let Presentation::Matching(board) = &mut processed.presentation else {
                    return Err(mismatch("matching board missing".to_string()));
                };
                if !board.is_complete_pairing(&pairs) {
                    return Err(FinlitError::InvalidAnswer(
                        "matching answer must pair every item exactly once".to_string(),
                    ));
                }
                board.restore(pairs.clone());
                AnswerContent::Pairs(pairs)
            }
            (_, other) => {
                return Err(mismatch(format!(
                    "{:?} is not valid for a '{}' question",
                    other,
                    processed.question.kind_name()
                )))
            }
        };

        debug!(session_id = %self.id, index, "Answer recorded");
        self.answers.insert(index, content);
        Ok(())
    }

    /// Pick an option on the current MC/TF question by its original index
    pub fn select_option(&mut self, original_index: usize) -> Result<AutoAdvance> {
        self.answer(self.current, AnswerContent::Option(original_index))?;
        Ok(AutoAdvance {
            delay: OPTION_ADVANCE_DELAY,
        })
    }

    /// Submit free text for the current question
    pub fn submit_text(&mut self, text: &str) -> Result<AutoAdvance> {
        self.answer(self.current, AnswerContent::Text(text.to_string()))?;
        Ok(AutoAdvance {
            delay: Duration::ZERO,
        })
    }

    /// Pick an item on the current matching question's board
    pub fn pick_match(&mut self, side: Side, item: &str) -> Result<MatchProgress> {
        self.ensure_active()?;

        let index = self.current;
        let processed = &mut self.questions[index];
        let Presentation::Matching(board) = &mut processed.presentation else {
            return Err(FinlitError::AnswerMismatch {
                index,
                reason: format!(
                    "pairing is not valid for a '{}' question",
                    processed.question.kind_name()
                ),
            });
        };

        let outcome = board.pick(side, item);
        let auto_advance = match &outcome {
            PickOutcome::Completed(pairs) => {
                self.answers.insert(index, AnswerContent::Pairs(pairs.clone()));
                debug!(session_id = %self.id, index, "Matching answer finalized");
                Some(AutoAdvance {
                    delay: MATCHING_ADVANCE_DELAY,
                })
            }
            _ => None,
        };

        Ok(MatchProgress {
            outcome,
            auto_advance,
        })
    }

    fn leave_current(&mut self) {
        if let Presentation::Matching(board) = &mut self.questions[self.current].presentation {
            board.clear_selection();
        }
    }

    /// Move forward; on the last question this completes the session
    pub fn advance(&mut self) -> Result<Navigation> {
        self.ensure_active()?;

        if self.current + 1 >= self.len() {
            return self.finish().map(Navigation::Completed);
        }

        self.leave_current();
        self.current += 1;
        Ok(Navigation::Moved(self.current))
    }

    pub fn retreat(&mut self) -> Result<Navigation> {
        self.ensure_active()?;

        if self.current == 0 {
            return Ok(Navigation::Stayed(0));
        }

        self.leave_current();
        self.current -= 1;
        Ok(Navigation::Moved(self.current))
    }

    /// Ordered answer list; requires an answer for every question
    pub fn finish(&mut self) -> Result<Vec<Answer>> {
        self.ensure_active()?;

        let missing = self.missing_answers();
        if !missing.is_empty() {
            return Err(FinlitError::IncompleteAnswers { missing });
        }

        self.complete = true;
        info!(session_id = %self.id, answers = self.answers.len(), "Quiz session complete");

        Ok(self.answers())
    }

    /// Recorded answers in index order
    pub fn answers(&self) -> Vec<Answer> {
        self.answers
            .iter()
            .map(|(index, content)| Answer {
                question_index: *index,
                answer_content: content.clone(),
            })
            .collect()
    }
}
