//! Completion service trait and implementations
//!
//! All generated content (questions, scoring, profiles, articles, news,
//! chat replies) comes through this seam. The Gemini implementation talks
//! to the network; `ScriptedCompletion` replays canned responses.

use crate::error::FinlitError;
use crate::models::NewsData;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::Mutex;

pub mod gemini;
pub use gemini::GeminiCompletion;

/// Which configured model handles a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Reasoning,
    Lite,
}

/// Prompt plus the response schema the service must follow
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub tier: ModelTier,
    pub prompt: String,
    pub schema: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub text: String,
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Structured JSON matching `request.schema`
    async fn complete_json(&self, request: CompletionRequest) -> Result<serde_json::Value>;

    /// Free text grounded in web search, with its sources
    async fn search_grounded(&self, tier: ModelTier, prompt: String) -> Result<NewsData>;

    /// Next model turn for a conversation
    async fn chat(&self, tier: ModelTier, system: &str, turns: &[ChatTurn]) -> Result<String>;
}

/// Parse a JSON payload, tolerating a surrounding markdown fence
pub fn parse_json_payload(raw: &str) -> Result<serde_json::Value> {
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    serde_json::from_str(cleaned).map_err(|e| {
        FinlitError::InvalidResponse(format!("Failed to parse AI JSON response: {} | raw={}", e, raw))
    })
}

/// Replays queued responses in order; records every request it receives
#[derive(Default)]
pub struct ScriptedCompletion {
    json: Mutex<VecDeque<std::result::Result<serde_json::Value, String>>>,
    news: Mutex<VecDeque<NewsData>>,
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_json(&self, value: serde_json::Value) {
        self.json.lock().await.push_back(Ok(value));
    }

    pub async fn push_failure(&self, message: impl Into<String>) {
        self.json.lock().await.push_back(Err(message.into()));
    }

    pub async fn push_news(&self, news: NewsData) {
        self.news.lock().await.push_back(news);
    }

    pub async fn push_reply(&self, reply: impl Into<String>) {
        self.replies.lock().await.push_back(reply.into());
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete_json(&self, request: CompletionRequest) -> Result<serde_json::Value> {
        self.requests.lock().await.push(request);
        match self.json.lock().await.pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(FinlitError::LlmError(message)),
            None => Err(FinlitError::LlmError("no scripted response queued".to_string())),
        }
    }

    async fn search_grounded(&self, _tier: ModelTier, _prompt: String) -> Result<NewsData> {
        self.news
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| FinlitError::LlmError("no scripted news queued".to_string()))
    }

    async fn chat(&self, _tier: ModelTier, _system: &str, _turns: &[ChatTurn]) -> Result<String> {
        self.replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| FinlitError::LlmError("no scripted reply queued".to_string()))
    }
}
