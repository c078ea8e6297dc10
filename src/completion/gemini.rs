//! Gemini-backed completion service

use super::{parse_json_payload, ChatTurn, CompletionRequest, CompletionService, ModelTier, TurnRole};
use crate::config::GeminiConfig;
use crate::gemini::GeminiClient;
use crate::models::NewsData;
use crate::Result;
use async_trait::async_trait;
use tracing::debug;

pub struct GeminiCompletion {
    client: GeminiClient,
    config: GeminiConfig,
}

impl GeminiCompletion {
    pub fn new(config: GeminiConfig) -> Result<Self> {
        Ok(Self {
            client: GeminiClient::new(&config)?,
            config,
        })
    }

    fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.config.fast_model,
            ModelTier::Reasoning => &self.config.reasoning_model,
            ModelTier::Lite => &self.config.lite_model,
        }
    }
}

#[async_trait]
impl CompletionService for GeminiCompletion {
    async fn complete_json(&self, request: CompletionRequest) -> Result<serde_json::Value> {
        let model = self.model(request.tier);
        debug!(model, prompt_len = request.prompt.len(), "Structured completion");

        let raw = self
            .client
            .generate_json(model, &request.prompt, request.schema)
            .await?;

        parse_json_payload(&raw)
    }

    async fn search_grounded(&self, tier: ModelTier, prompt: String) -> Result<NewsData> {
        self.client.generate_grounded(self.model(tier), &prompt).await
    }

    async fn chat(&self, tier: ModelTier, system: &str, turns: &[ChatTurn]) -> Result<String> {
        let turns: Vec<(bool, String)> = turns
            .iter()
            .map(|t| (t.role == TurnRole::User, t.text.clone()))
            .collect();
        self.client.chat(self.model(tier), system, &turns).await
    }
}
