//! Risk assessment lifecycle: age gate, generation, answering, profiling

use super::{validate_age, RiskAssessment, RiskQuestionView};
use crate::error::FinlitError;
use crate::flow::{Delivery, RequestGate, RequestTicket, GENERIC_ERROR_MESSAGE};
use crate::models::{Language, RiskProfile, RiskQuestion, UserContext, UserRiskAnswer};
use crate::Result;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub enum RiskPhase {
    AwaitingAge { error: Option<String> },
    Generating { age: u32 },
    Answering { age: u32, assessment: RiskAssessment },
    Analyzing { age: u32 },
    Results(RiskProfile),
    Failed(String),
}

impl RiskPhase {
    pub fn name(&self) -> &'static str {
        match self {
            RiskPhase::AwaitingAge { .. } => "awaiting_age",
            RiskPhase::Generating { .. } => "generating",
            RiskPhase::Answering { .. } => "answering",
            RiskPhase::Analyzing { .. } => "analyzing",
            RiskPhase::Results(_) => "results",
            RiskPhase::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProfileRequest {
    pub ticket: RequestTicket,
    pub answers: Vec<UserRiskAnswer>,
    pub age: u32,
    pub language: Language,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskSnapshot {
    pub flow_id: Uuid,
    pub phase: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<RiskQuestionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<RiskProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RiskFlow {
    id: Uuid,
    language: Language,
    context: UserContext,
    phase: RiskPhase,
    gate: RequestGate,
}

impl RiskFlow {
    pub fn new(language: Language, context: UserContext) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            language,
            context,
            phase: RiskPhase::AwaitingAge { error: None },
            gate: RequestGate::new(id),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn context(&self) -> &UserContext {
        &self.context
    }

    pub fn phase(&self) -> &RiskPhase {
        &self.phase
    }

    /// Validate the age and request questions
    pub fn submit_age(&mut self, input: &str) -> Result<RequestTicket> {
        match validate_age(input) {
            Ok(age) => {
                info!(flow_id = %self.id, age, "Risk assessment requested");
                self.phase = RiskPhase::Generating { age };
                Ok(self.gate.issue())
            }
            Err(e) => {
                self.phase = RiskPhase::AwaitingAge {
                    error: Some(e.to_string()),
                };
                Err(e)
            }
        }
    }

    fn admit(&mut self, ticket: RequestTicket) -> bool {
        let accepted = self.gate.accept(ticket);
        if !accepted {
            debug!(flow_id = %self.id, request_id = %ticket.request_id, "Discarding stale risk response");
        }
        accepted
    }

    /// Generation failures return the user to the age step
    pub fn receive_questions(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<RiskQuestion>>,
    ) -> Result<Delivery> {
        if !self.admit(ticket) {
            return Ok(Delivery::Stale);
        }

        let RiskPhase::Generating { age } = self.phase else {
            return Err(FinlitError::InvalidPhase(format!(
                "risk flow is {}, not generating",
                self.phase.name()
            )));
        };

        match result.and_then(RiskAssessment::start) {
            Ok(assessment) => {
                self.phase = RiskPhase::Answering { age, assessment };
                Ok(Delivery::Applied)
            }
            Err(e) => {
                warn!(flow_id = %self.id, error = %e, "Risk question generation failed");
                self.phase = RiskPhase::AwaitingAge {
                    error: Some(GENERIC_ERROR_MESSAGE.to_string()),
                };
                Err(e)
            }
        }
    }

    pub fn assessment_mut(&mut self) -> Result<&mut RiskAssessment> {
        match &mut self.phase {
            RiskPhase::Answering { assessment, .. } => Ok(assessment),
            other => Err(FinlitError::InvalidPhase(format!(
                "risk flow is {}, not answering",
                other.name()
            ))),
        }
    }

    /// Hand completed answers off for profiling
    pub fn begin_analysis(&mut self) -> Result<ProfileRequest> {
        let (age, answers) = match &self.phase {
            RiskPhase::Answering { age, assessment } if assessment.is_complete() => {
                (*age, assessment.answers())
            }
            RiskPhase::Answering { .. } => {
                return Err(FinlitError::InvalidPhase(
                    "risk assessment is not complete".to_string(),
                ))
            }
            other => {
                return Err(FinlitError::InvalidPhase(format!(
                    "risk flow is {}, not answering",
                    other.name()
                )))
            }
        };

        self.phase = RiskPhase::Analyzing { age };
        Ok(ProfileRequest {
            ticket: self.gate.issue(),
            answers,
            age,
            language: self.language,
        })
    }

    pub fn receive_profile(
        &mut self,
        ticket: RequestTicket,
        result: Result<RiskProfile>,
    ) -> Result<Delivery> {
        if !self.admit(ticket) {
            return Ok(Delivery::Stale);
        }

        match result {
            Ok(profile) => {
                info!(flow_id = %self.id, profile = %profile.profile, "Risk profile ready");
                self.phase = RiskPhase::Results(profile);
                Ok(Delivery::Applied)
            }
            Err(e) => {
                warn!(flow_id = %self.id, error = %e, "Risk profiling failed");
                self.phase = RiskPhase::Failed(GENERIC_ERROR_MESSAGE.to_string());
                Err(e)
            }
        }
    }

    /// Back to the age step; outstanding responses become stale
    pub fn reset(&mut self) {
        self.gate.cancel();
        self.phase = RiskPhase::AwaitingAge { error: None };
    }

    pub fn snapshot(&self) -> RiskSnapshot {
        RiskSnapshot {
            flow_id: self.id,
            phase: self.phase.name(),
            question: match &self.phase {
                RiskPhase::Answering { assessment, .. } if !assessment.is_complete() => {
                    Some(assessment.current_view())
                }
                _ => None,
            },
            profile: match &self.phase {
                RiskPhase::Results(profile) => Some(profile.clone()),
                _ => None,
            },
            error: match &self.phase {
                RiskPhase::AwaitingAge { error } => error.clone(),
                RiskPhase::Failed(message) => Some(message.clone()),
                _ => None,
            },
        }
    }
}
