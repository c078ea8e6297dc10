//! Quiz lifecycle and stale-response discard
//!
//! Every AI request issued on behalf of a flow carries a `RequestTicket`.
//! A response is applied only if its ticket is still the flow's current
//! one; restarting a flow or issuing a newer request makes older tickets
//! stale, and their responses are dropped on arrival.

use crate::error::FinlitError;
use crate::models::{Language, QuizAnalysis, QuizKind, UserContext};
use crate::quiz::{Answer, Question, QuestionView, QuizSession};
use crate::Result;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shown to users for any failure of the external AI service
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RequestTicket {
    pub flow_id: Uuid,
    pub request_id: Uuid,
}

/// Tracks the single outstanding request of a flow
#[derive(Debug, Clone)]
pub struct RequestGate {
    flow_id: Uuid,
    current: Option<Uuid>,
}

impl RequestGate {
    pub fn new(flow_id: Uuid) -> Self {
        Self {
            flow_id,
            current: None,
        }
    }

    /// Issue a ticket, superseding any outstanding one
    pub fn issue(&mut self) -> RequestTicket {
        let request_id = Uuid::new_v4();
        self.current = Some(request_id);
        RequestTicket {
            flow_id: self.flow_id,
            request_id,
        }
    }

    /// Consume `ticket` if it is the outstanding one
    pub fn accept(&mut self, ticket: RequestTicket) -> bool {
        if ticket.flow_id == self.flow_id && self.current == Some(ticket.request_id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.current = None;
    }

    pub fn is_pending(&self) -> bool {
        self.current.is_some()
    }
}

/// Whether a response was applied or dropped as stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Applied,
    Stale,
}

#[derive(Debug, Clone)]
pub enum QuizPhase {
    Generating,
    Active(QuizSession),
    Analyzing { answers: Vec<Answer> },
    Finished(QuizAnalysis),
    Failed(String),
}

impl QuizPhase {
    pub fn name(&self) -> &'static str {
        match self {
            QuizPhase::Generating => "generating",
            QuizPhase::Active(_) => "active",
            QuizPhase::Analyzing { .. } => "analyzing",
            QuizPhase::Finished(_) => "finished",
            QuizPhase::Failed(_) => "failed",
        }
    }
}

/// Everything needed to send a finished quiz off for scoring
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub ticket: RequestTicket,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizSnapshot {
    pub flow_id: Uuid,
    pub kind: QuizKind,
    pub phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<QuizAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct QuizFlow {
    id: Uuid,
    kind: QuizKind,
    language: Language,
    context: UserContext,
    phase: QuizPhase,
    gate: RequestGate,
    questions: Vec<Question>,
}

impl QuizFlow {
    /// New flow in the generating phase with its first ticket
    pub fn begin(kind: QuizKind, language: Language, context: UserContext) -> (Self, RequestTicket) {
        let id = Uuid::new_v4();
        let mut gate = RequestGate::new(id);
        let ticket = gate.issue();

        info!(flow_id = %id, %kind, %language, "Quiz flow started");

        let flow = Self {
            id,
            kind,
            language,
            context,
            phase: QuizPhase::Generating,
            gate,
            questions: Vec::new(),
        };
        (flow, ticket)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> QuizKind {
        self.kind
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn context(&self) -> &UserContext {
        &self.context
    }

    pub fn phase(&self) -> &QuizPhase {
        &self.phase
    }

    /// Discard progress and regenerate; in-flight responses become stale
    pub fn restart(&mut self) -> RequestTicket {
        info!(flow_id = %self.id, "Quiz flow restarted");
        self.phase = QuizPhase::Generating;
        self.questions.clear();
        self.gate.issue()
    }

    fn admit(&mut self, ticket: RequestTicket, what: &str) -> bool {
        if self.gate.accept(ticket) {
            true
        } else {
            debug!(flow_id = %self.id, request_id = %ticket.request_id, "Discarding stale {}", what);
            false
        }
    }

    pub fn receive_questions(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<Question>>,
    ) -> Result<Delivery> {
        if !self.admit(ticket, "questions") {
            return Ok(Delivery::Stale);
        }

        let questions = match result {
            Ok(questions) => questions,
            Err(e) => {
                warn!(flow_id = %self.id, error = %e, "Quiz generation failed");
                self.phase = QuizPhase::Failed(GENERIC_ERROR_MESSAGE.to_string());
                return Err(e);
            }
        };

        match QuizSession::start(questions.clone()) {
            Ok(session) => {
                self.questions = questions;
                self.phase = QuizPhase::Active(session);
                Ok(Delivery::Applied)
            }
            Err(e) => {
                warn!(flow_id = %self.id, error = %e, "Generated quiz rejected");
                self.phase = QuizPhase::Failed(GENERIC_ERROR_MESSAGE.to_string());
                Err(e)
            }
        }
    }

    pub fn session(&self) -> Result<&QuizSession> {
        match &self.phase {
            QuizPhase::Active(session) => Ok(session),
            other => Err(FinlitError::InvalidPhase(format!(
                "quiz is {}, not active",
                other.name()
            ))),
        }
    }

    pub fn session_mut(&mut self) -> Result<&mut QuizSession> {
        match &mut self.phase {
            QuizPhase::Active(session) => Ok(session),
            other => Err(FinlitError::InvalidPhase(format!(
                "quiz is {}, not active",
                other.name()
            ))),
        }
    }

    /// Move a completed session to analysis with the session's own answers
    pub fn begin_analysis(&mut self) -> Result<AnalysisRequest> {
        let session = self.session()?;
        if !session.is_complete() {
            return Err(FinlitError::IncompleteAnswers {
                missing: session.missing_answers(),
            });
        }
        let answers = session.answers();

        let ticket = self.gate.issue();
        self.phase = QuizPhase::Analyzing {
            answers: answers.clone(),
        };

        Ok(AnalysisRequest {
            ticket,
            questions: self.questions.clone(),
            answers,
            language: self.language,
        })
    }

    pub fn receive_analysis(
        &mut self,
        ticket: RequestTicket,
        result: Result<QuizAnalysis>,
    ) -> Result<Delivery> {
        if !self.admit(ticket, "analysis") {
            return Ok(Delivery::Stale);
        }

        match result {
            Ok(analysis) => {
                info!(flow_id = %self.id, score = analysis.score_percentage, "Quiz analysed");
                self.phase = QuizPhase::Finished(analysis);
                Ok(Delivery::Applied)
            }
            Err(e) => {
                warn!(flow_id = %self.id, error = %e, "Quiz analysis failed");
                self.phase = QuizPhase::Failed(GENERIC_ERROR_MESSAGE.to_string());
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> QuizSnapshot {
        QuizSnapshot {
            flow_id: self.id,
            kind: self.kind,
            phase: self.phase.name(),
            question: match &self.phase {
                QuizPhase::Active(session) if !session.is_complete() => Some(session.current_view()),
                _ => None,
            },
            analysis: match &self.phase {
                QuizPhase::Finished(analysis) => Some(analysis.clone()),
                _ => None,
            },
            error: match &self.phase {
                QuizPhase::Failed(message) => Some(message.clone()),
                _ => None,
            },
        }
    }
}
