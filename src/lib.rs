//! Financial Literacy Engine
//!
//! Backend for a bilingual (English / Egyptian Arabic) financial-literacy
//! site:
//! - Quiz sessions over AI-generated mixed-format questions
//! - A risk-tolerance assessment with custom answers
//! - Budgeting, investment and cash-flow tools
//! - Grounded news with a TTL cache
//! - A mentor chat and a free-form agent that routes requests to features
//!
//! FLOW:
//! REQUEST → GENERATE → ANSWER → ANALYSE → RESULTS

pub mod activity;
pub mod agent;
pub mod api;
pub mod assessment;
pub mod budget;
pub mod cache;
pub mod chat;
pub mod completion;
pub mod config;
pub mod content;
pub mod error;
pub mod flow;
pub mod gemini;
pub mod models;
pub mod quiz;
pub mod sessions;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use quiz::{Answer, AnswerContent, Question, QuizSession};
