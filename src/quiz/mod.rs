//! Quiz engine
//!
//! Drives a user through an ordered list of heterogeneous questions
//! (multiple-choice, true/false, free-text, matching), collecting exactly
//! one answer per question. Scoring is done by the AI service afterwards.

pub mod matching;
pub mod question;
pub mod session;
pub mod shuffle;
pub mod view;

pub use matching::{MatchingBoard, PickOutcome, Selection, Side};
pub use question::{Answer, AnswerContent, MatchingPair, Question, QuestionKind, QuizOption};
pub use session::{AutoAdvance, MatchProgress, Navigation, QuizSession};
pub use view::{OptionView, QuestionBody, QuestionView};
