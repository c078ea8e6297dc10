//! Agent: free-form request → interpretation → route → dispatch
//!
//! Interpretation is done by the AI; routing is a pure function over the
//! interpretation so it can be tested without the network.

use crate::cache::NewsCache;
use crate::content::ContentService;
use crate::error::FinlitError;
use crate::models::{
    AgentCommand, AgentInterpretation, Book, GeneratedContent, Language, NewsData, ToolType,
    UserContext,
};
use crate::Result;
use serde::Serialize;
use tracing::{debug, info};

pub const ASSISTANT_NAME: &str = "Manus AI";
pub const DEFAULT_NEWS_CATEGORY: &str = "All";

/// Where an interpreted request goes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AgentRoute {
    LaunchTool { tool: ToolType },
    Content { topic: String },
    News { category: String },
    Books,
    Ideas,
    Reply { message: String },
}

fn non_blank(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub fn route(interpretation: &AgentInterpretation) -> AgentRoute {
    let reply = || AgentRoute::Reply {
        message: interpretation.response_to_user.clone(),
    };

    match interpretation.command {
        AgentCommand::ShowComponent => {
            let quiz_type = interpretation
                .component_props
                .as_ref()
                .and_then(|p| p.quiz_type);
            let tool = match (interpretation.component_name.as_deref(), quiz_type) {
                (Some("QuizSection"), Some(kind)) => ToolType::from(kind),
                (Some("RiskAnalysisSection"), _) => ToolType::Risk,
                _ => ToolType::Tools,
            };
            AgentRoute::LaunchTool { tool }
        }
        AgentCommand::GenerateContent => match non_blank(interpretation.content_topic.as_ref()) {
            Some(topic) => AgentRoute::Content { topic },
            None => reply(),
        },
        AgentCommand::FetchNews => AgentRoute::News {
            category: non_blank(interpretation.news_category.as_ref())
                .unwrap_or_else(|| DEFAULT_NEWS_CATEGORY.to_string()),
        },
        AgentCommand::RecommendBooks => AgentRoute::Books,
        AgentCommand::SuggestIdeas => AgentRoute::Ideas,
        AgentCommand::ShowHelp | AgentCommand::Unknown => reply(),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "component", content = "data", rename_all = "snake_case")]
pub enum AgentOutcome {
    LaunchTool(ToolType),
    Content(GeneratedContent),
    News(NewsData),
    Books(Vec<Book>),
    Ideas(Vec<String>),
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentResponse {
    pub outcome: AgentOutcome,
    pub response_to_user: String,
    /// New user activity, when the request changes it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
}

#[derive(Clone)]
pub struct Agent {
    content: ContentService,
    news: NewsCache,
}

impl Agent {
    pub fn new(content: ContentService, news: NewsCache) -> Self {
        Self { content, news }
    }

    pub async fn handle(
        &self,
        query: &str,
        language: Language,
        context: &UserContext,
    ) -> Result<AgentResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(FinlitError::InvalidInput("Please enter a request.".to_string()));
        }

        let interpretation = self.content.interpret_agent(query, context, language).await?;
        let route = route(&interpretation);

        info!(command = ?interpretation.command, ?route, "Agent request routed");

        let (outcome, activity) = self.dispatch(route, language, context).await?;

        Ok(AgentResponse {
            outcome,
            response_to_user: interpretation.response_to_user,
            activity,
        })
    }

    async fn dispatch(
        &self,
        route: AgentRoute,
        language: Language,
        context: &UserContext,
    ) -> Result<(AgentOutcome, Option<String>)> {
        let result = match route {
            AgentRoute::LaunchTool { tool } => (AgentOutcome::LaunchTool(tool), None),
            AgentRoute::Content { topic } => {
                let content = self.content.content_for_topic(&topic, language, context).await?;
                (
                    AgentOutcome::Content(content),
                    Some(format!("Learning about {}.", topic)),
                )
            }
            AgentRoute::News { category } => {
                let news = self.content.news_cached(&self.news, language, &category).await?;
                (
                    AgentOutcome::News(news),
                    Some(format!("Viewing news for {}.", category)),
                )
            }
            AgentRoute::Books => {
                let books = self.content.book_recommendations(language, context).await?;
                (
                    AgentOutcome::Books(books),
                    Some("Browsing book recommendations.".to_string()),
                )
            }
            AgentRoute::Ideas => {
                let ideas = self.content.feature_ideas(language, context).await?;
                (
                    AgentOutcome::Ideas(ideas),
                    Some("Brainstorming new website features.".to_string()),
                )
            }
            AgentRoute::Reply { message } => {
                debug!("Agent replying directly");
                (
                    AgentOutcome::Content(GeneratedContent {
                        title: ASSISTANT_NAME.to_string(),
                        explanation: message,
                        example: None,
                        key_points: Vec::new(),
                    }),
                    Some("Chatting with Manus.".to_string()),
                )
            }
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ScriptedCompletion;
    use crate::models::{ComponentProps, QuizKind};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn interpretation(command: AgentCommand) -> AgentInterpretation {
        AgentInterpretation {
            command,
            response_to_user: "Here you go".to_string(),
            ..AgentInterpretation::default()
        }
    }

    #[test]
    fn test_show_component_routing() {
        let mut quiz = interpretation(AgentCommand::ShowComponent);
        quiz.component_name = Some("QuizSection".into());
        quiz.component_props = Some(ComponentProps {
            quiz_type: Some(QuizKind::Budgeting),
        });
        assert_eq!(route(&quiz), AgentRoute::LaunchTool { tool: ToolType::Budgeting });

        // quiz section without a quiz type falls back to the tools page
        quiz.component_props = None;
        assert_eq!(route(&quiz), AgentRoute::LaunchTool { tool: ToolType::Tools });

        let mut risk = interpretation(AgentCommand::ShowComponent);
        risk.component_name = Some("RiskAnalysisSection".into());
        assert_eq!(route(&risk), AgentRoute::LaunchTool { tool: ToolType::Risk });
    }

    #[test]
    fn test_news_category_defaults_to_all() {
        let mut news = interpretation(AgentCommand::FetchNews);
        assert_eq!(route(&news), AgentRoute::News { category: "All".into() });
        news.news_category = Some("Crypto".into());
        assert_eq!(route(&news), AgentRoute::News { category: "Crypto".into() });
    }

    #[test]
    fn test_help_and_unknown_reply() {
        for command in [AgentCommand::ShowHelp, AgentCommand::Unknown] {
            assert_eq!(
                route(&interpretation(command)),
                AgentRoute::Reply { message: "Here you go".into() }
            );
        }
        // content without a topic has nothing to generate
        assert!(matches!(
            route(&interpretation(AgentCommand::GenerateContent)),
            AgentRoute::Reply { .. }
        ));
    }

    #[tokio::test]
    async fn test_handle_generates_content() {
        let scripted = Arc::new(ScriptedCompletion::new());
        scripted
            .push_json(json!({
                "command": "generate_content",
                "content_topic": "Compound Interest",
                "response_to_user": "Let me explain compound interest."
            }))
            .await;
        scripted
            .push_json(json!({
                "title": "Compound Interest",
                "explanation": "Interest on interest.",
                "keyPoints": ["Start early"]
            }))
            .await;

        let agent = Agent::new(
            ContentService::new(scripted.clone()),
            NewsCache::new(Duration::from_secs(900)),
        );
        let response = agent
            .handle("explain compound interest", Language::En, &UserContext::default())
            .await
            .unwrap();

        match response.outcome {
            AgentOutcome::Content(content) => assert_eq!(content.key_points, vec!["Start early"]),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(response.activity.as_deref(), Some("Learning about Compound Interest."));
        assert_eq!(scripted.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_reply_titled_with_assistant() {
        let scripted = Arc::new(ScriptedCompletion::new());
        scripted
            .push_json(json!({ "command": "unknown", "response_to_user": "I can help with money topics." }))
            .await;
        let agent = Agent::new(
            ContentService::new(scripted),
            NewsCache::new(Duration::from_secs(900)),
        );

        let response = agent
            .handle("what's the weather", Language::En, &UserContext::default())
            .await
            .unwrap();
        let AgentOutcome::Content(content) = response.outcome else {
            panic!("expected direct reply");
        };
        assert_eq!(content.title, ASSISTANT_NAME);
        assert_eq!(content.explanation, "I can help with money topics.");
        assert!(agent.handle("  ", Language::En, &UserContext::default()).await.is_err());
    }
}
