//! Mentor chat sessions
//!
//! A session keeps an ordered message list that opens with a localized
//! greeting. The greeting is display-only and never sent to the model.

use crate::completion::{ChatTurn, CompletionService, ModelTier, TurnRole};
use crate::error::FinlitError;
use crate::models::{Language, UserContext};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

pub fn greeting(language: Language) -> &'static str {
    match language {
        Language::En => "Hi! I'm your financial independence mentor. What would you like to work on today?",
        Language::Ar => "أهلاً! أنا مرشدك للاستقلال المالي. عايز نشتغل على إيه النهارده؟",
    }
}

pub fn system_instruction(language: Language, context: &UserContext) -> String {
    let reply_language = match language {
        Language::En => "English",
        Language::Ar => "Egyptian Arabic",
    };
    format!(
        "You are a financial independence mentor. Your primary goal is to empower the user to \
         become self-reliant and break free from the traditional employee mindset. Never give \
         direct financial advice. Instead, provide frameworks, ask empowering questions, and \
         explain concepts that lead them to their own conclusions. Emphasize that a job is a \
         temporary tool for capital, not a long-term career. Your tone is firm and motivating, \
         that of a seasoned mentor who has achieved financial freedom. The user is currently: {}. \
         Your responses must be in {}. Be concise and empowering.",
        context.activity, reply_language
    )
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    id: Uuid,
    language: Language,
    context: UserContext,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(language: Language, context: UserContext) -> Self {
        Self::with_id(Uuid::new_v4(), language, context)
    }

    pub fn with_id(id: Uuid, language: Language, context: UserContext) -> Self {
        Self {
            id,
            language,
            context,
            messages: vec![ChatMessage::new(ChatRole::Model, greeting(language))],
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn system_instruction(&self) -> String {
        system_instruction(self.language, &self.context)
    }

    /// A new language or activity starts the conversation over
    pub fn reconfigure(&mut self, language: Language, context: UserContext) -> bool {
        if self.language == language && self.context == context {
            return false;
        }
        info!(chat_id = %self.id, %language, "Chat context changed, resetting history");
        self.language = language;
        self.context = context;
        self.messages = vec![ChatMessage::new(ChatRole::Model, greeting(language))];
        true
    }

    /// Append the user's message and return the turns to send
    pub fn prepare(&mut self, text: &str) -> Result<Vec<ChatTurn>> {
        if text.trim().is_empty() {
            return Err(FinlitError::InvalidInput("Message cannot be empty".to_string()));
        }
        self.messages.push(ChatMessage::new(ChatRole::User, text));

        Ok(self
            .messages
            .iter()
            .skip(1)
            .map(|m| ChatTurn {
                role: match m.role {
                    ChatRole::User => TurnRole::User,
                    ChatRole::Model => TurnRole::Model,
                },
                text: m.text.clone(),
            })
            .collect())
    }

    pub fn receive(&mut self, reply: String) -> &ChatMessage {
        self.messages.push(ChatMessage::new(ChatRole::Model, reply));
        &self.messages[self.messages.len() - 1]
    }

    pub async fn send(&mut self, service: &dyn CompletionService, text: &str) -> Result<&ChatMessage> {
        let turns = self.prepare(text)?;
        let system = self.system_instruction();

        match service.chat(ModelTier::Lite, &system, &turns).await {
            Ok(reply) => Ok(self.receive(reply)),
            Err(e) => {
                warn!(chat_id = %self.id, error = %e, "Chat reply failed");
                Err(e)
            }
        }
    }
}
