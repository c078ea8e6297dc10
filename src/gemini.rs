//! Gemini API client
//!
//! Thin wrapper over the `generateContent` REST endpoint covering the three
//! call shapes the app needs: schema-constrained JSON, search-grounded text,
//! and multi-turn chat. Uses a long-lived reqwest::Client for connection pooling.

use crate::config::GeminiConfig;
use crate::error::FinlitError;
use crate::models::{GroundingChunk, NewsData, WebSource};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> crate::Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// JSON output constrained by `schema`; returns the raw response text
    pub async fn generate_json(
        &self,
        model: &str,
        prompt: &str,
        schema: serde_json::Value,
    ) -> crate::Result<String> {
        let request = GeminiRequest {
            contents: vec![Content::user(prompt)],
            generation_config: Some(GenerationConfig {
                temperature: None,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(schema),
            }),
            system_instruction: None,
            tools: Vec::new(),
        };

        let response = self.send(model, &request).await?;
        response_text(&response)
    }

    /// Free text answered with Google Search grounding
    pub async fn generate_grounded(&self, model: &str, prompt: &str) -> crate::Result<NewsData> {
        let request = GeminiRequest {
            contents: vec![Content::user(prompt)],
            generation_config: None,
            system_instruction: None,
            tools: vec![Tool::google_search()],
        };

        let response = self.send(model, &request).await?;
        Ok(NewsData {
            text: response_text(&response)?,
            sources: grounding_sources(&response),
        })
    }

    /// Multi-turn chat; `turns` are `(is_user, text)` in order
    pub async fn chat(
        &self,
        model: &str,
        system_instruction: &str,
        turns: &[(bool, String)],
    ) -> crate::Result<String> {
        let request = GeminiRequest {
            contents: turns
                .iter()
                .map(|(is_user, text)| Content {
                    role: Some(if *is_user { "user" } else { "model" }.to_string()),
                    parts: vec![Part { text: text.clone() }],
                })
                .collect(),
            generation_config: None,
            system_instruction: Some(Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction.to_string(),
                }],
            }),
            tools: Vec::new(),
        };

        let response = self.send(model, &request).await?;
        response_text(&response)
    }

    async fn send(&self, model: &str, request: &GeminiRequest) -> crate::Result<GeminiResponse> {
        if self.api_key.is_empty() {
            return Err(FinlitError::ConfigError(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}/{}:generateContent", self.base_url, model);

        info!(model, "Calling Gemini API");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                FinlitError::LlmError(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(FinlitError::LlmError(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        response.json::<GeminiResponse>().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            FinlitError::LlmError(format!("Gemini parse error: {}", e))
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

impl Tool {
    fn google_search() -> Self {
        Self {
            google_search: GoogleSearch {},
        }
    }
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<WireGroundingChunk>,
}

#[derive(Debug, Deserialize)]
struct WireGroundingChunk {
    web: Option<WebSource>,
}

/// Concatenated text of the first candidate
fn response_text(response: &GeminiResponse) -> crate::Result<String> {
    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| FinlitError::LlmError("No response from Gemini API".to_string()))?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(FinlitError::LlmError(format!(
            "Empty response from Gemini (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }

    Ok(text)
}

fn grounding_sources(response: &GeminiResponse) -> Vec<GroundingChunk> {
    response
        .candidates
        .first()
        .and_then(|c| c.grounding_metadata.as_ref())
        .map(|m| {
            m.grounding_chunks
                .iter()
                .filter_map(|chunk| chunk.web.clone().map(|web| GroundingChunk { web }))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content::user("Generate 20 questions")],
            generation_config: Some(GenerationConfig {
                temperature: None,
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(serde_json::json!({ "type": "ARRAY" })),
            }),
            system_instruction: None,
            tools: Vec::new(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(json["generationConfig"]["responseSchema"]["type"], "ARRAY");
        assert!(json.get("tools").is_none());
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_grounded_request_has_search_tool() {
        let request = GeminiRequest {
            contents: vec![Content::user("News for Stocks in en")],
            generation_config: None,
            system_instruction: None,
            tools: vec![Tool::google_search()],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""tools":[{"googleSearch":{}}]"#));
    }

    #[test]
    fn test_response_with_grounding() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Markets rose. " }, { "text": "Gold fell." }] },
                "finishReason": "STOP",
                "groundingMetadata": {
                    "groundingChunks": [
                        { "web": { "uri": "https://example.com/a", "title": "A" } },
                        { "retrievedContext": {} }
                    ]
                }
            }]
        }))
        .unwrap();

        assert_eq!(response_text(&response).unwrap(), "Markets rose. Gold fell.");
        let sources = grounding_sources(&response);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].web.title, "A");
    }

    #[test]
    fn test_empty_candidates_is_error() {
        let response: GeminiResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(response_text(&response).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let config = GeminiConfig {
            api_key: String::new(),
            ..GeminiConfig::default()
        };
        let client = GeminiClient::new(&config).unwrap();
        let err = client.generate_grounded("gemini-2.5-flash", "news").await.unwrap_err();
        assert!(err.to_string().to_lowercase().contains("api_key"));
    }
}
