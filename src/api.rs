//! REST API server for the financial-literacy engine
//!
//! Exposes quizzes, the risk assessment, the budgeting tools, news, reading
//! content, the mentor chat and the agent over HTTP for the web front end.
//! Flow state lives in memory; locks are released before every AI call.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::activity::{ActivityLog, ActivityRecord};
use crate::agent::{Agent, AgentResponse};
use crate::assessment::{RiskFlow, RiskPhase, RiskSnapshot, RiskStep};
use crate::budget::{self, target_allocation, Allocation, BudgetRequest, CashFlowInput, Situation};
use crate::cache::NewsCache;
use crate::chat::{ChatMessage, ChatSession};
use crate::completion::{CompletionService, ModelTier};
use crate::config::DEFAULT_SESSION_TTL;
use crate::content::ContentService;
use crate::error::FinlitError;
use crate::flow::{QuizFlow, QuizPhase, QuizSnapshot, RequestTicket, GENERIC_ERROR_MESSAGE};
use crate::models::{InvestmentDetails, Language, QuizKind, UserContext};
use crate::quiz::{AutoAdvance, Navigation, PickOutcome, QuizSession, Side};
use crate::sessions::SessionStore;
use crate::Result;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct StartQuizRequest {
    pub kind: QuizKind,
    #[serde(default)]
    pub language: Language,
    pub activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OptionRequest {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct MatchRequest {
    pub side: Side,
    pub item: String,
}

/// Age as typed by the user; numbers are accepted too
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AgeInput {
    Number(serde_json::Number),
    Text(String),
}

impl AgeInput {
    fn as_text(&self) -> String {
        match self {
            AgeInput::Number(n) => n.to_string(),
            AgeInput::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StartRiskRequest {
    pub age: AgeInput,
    #[serde(default)]
    pub language: Language,
    pub activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AgeRequest {
    pub age: AgeInput,
}

#[derive(Debug, Deserialize)]
pub struct BudgetToolRequest {
    #[serde(flatten)]
    pub budget: BudgetRequest,
    #[serde(default)]
    pub language: Language,
    pub activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AllocationRequest {
    pub income: f64,
    #[serde(default)]
    pub situation: Situation,
}

#[derive(Debug, Deserialize)]
pub struct InvestmentToolRequest {
    #[serde(flatten)]
    pub details: InvestmentDetails,
    #[serde(default)]
    pub language: Language,
    pub activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CashFlowToolRequest {
    #[serde(flatten)]
    pub input: CashFlowInput,
    #[serde(default)]
    pub language: Language,
    pub activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewsQuery {
    #[serde(default)]
    pub language: Language,
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LanguageQuery {
    #[serde(default)]
    pub language: Language,
    pub activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ContentRequest {
    pub topic: String,
    #[serde(default)]
    pub language: Language,
    pub activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub chat_id: Option<String>,
    #[serde(default)]
    pub language: Language,
    pub activity: Option<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentRequest {
    pub query: String,
    #[serde(default)]
    pub language: Language,
    pub activity: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub limit: Option<usize>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuizEventResponse {
    #[serde(flatten)]
    pub snapshot: QuizSnapshot,
    /// Presentation pause the client should show before the next question
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_advance_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pick: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct RiskEventResponse {
    #[serde(flatten)]
    pub snapshot: RiskSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_advance_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub chat_id: Uuid,
    pub reply: ChatMessage,
    pub messages: Vec<ChatMessage>,
}

type ApiReply = (StatusCode, Json<ApiResponse>);

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub content: ContentService,
    pub agent: Agent,
    pub news: NewsCache,
    pub activity: ActivityLog,
    quizzes: SessionStore<QuizFlow>,
    risks: SessionStore<RiskFlow>,
    chats: SessionStore<ChatSession>,
}

impl ApiState {
    pub fn new(completion: Arc<dyn CompletionService>, news_ttl: Duration) -> Self {
        let content = ContentService::new(completion);
        let news = NewsCache::new(news_ttl);
        Self {
            agent: Agent::new(content.clone(), news.clone()),
            content,
            news,
            activity: ActivityLog::new(),
            quizzes: SessionStore::new(DEFAULT_SESSION_TTL),
            risks: SessionStore::new(DEFAULT_SESSION_TTL),
            chats: SessionStore::new(DEFAULT_SESSION_TTL),
        }
    }

    /// Idle time after which quiz, risk and chat sessions are dropped
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.quizzes = SessionStore::new(ttl);
        self.risks = SessionStore::new(ttl);
        self.chats = SessionStore::new(ttl);
        self
    }

    async fn with_quiz<T>(&self, id: Uuid, f: impl FnOnce(&mut QuizFlow) -> Result<T>) -> Result<T> {
        self.quizzes.with(id, f).await
    }

    async fn with_risk<T>(&self, id: Uuid, f: impl FnOnce(&mut RiskFlow) -> Result<T>) -> Result<T> {
        self.risks.with(id, f).await
    }
}

/// =============================
/// Helpers
/// =============================

fn status_for(e: &FinlitError) -> StatusCode {
    match e {
        FinlitError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        FinlitError::IncompleteAnswers { .. }
        | FinlitError::SessionComplete
        | FinlitError::CustomAnswerLimit(_)
        | FinlitError::InvalidPhase(_) => StatusCode::CONFLICT,
        e if e.is_external() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn reply_ok<T: Serialize>(data: T) -> ApiReply {
    (StatusCode::OK, Json(ApiResponse::success(data)))
}

fn reply_err(e: FinlitError) -> ApiReply {
    let status = status_for(&e);
    if e.is_external() {
        error!(error = %e, "AI service request failed");
        (status, Json(ApiResponse::error(GENERIC_ERROR_MESSAGE.to_string())))
    } else {
        warn!(error = %e, %status, "Request rejected");
        (status, Json(ApiResponse::error(e.to_string())))
    }
}

fn reply<T: Serialize>(result: Result<T>) -> ApiReply {
    match result {
        Ok(data) => reply_ok(data),
        Err(e) => reply_err(e),
    }
}

/// Engine rejections of generated content are the AI's fault, not the user's
fn as_upstream(e: FinlitError) -> FinlitError {
    if e.is_external() {
        e
    } else {
        FinlitError::InvalidResponse(e.to_string())
    }
}

fn user_context(activity: Option<String>) -> UserContext {
    activity
        .filter(|a| !a.trim().is_empty())
        .map(UserContext::new)
        .unwrap_or_default()
}

fn delay_ms(hint: AutoAdvance) -> u64 {
    u64::try_from(hint.delay.as_millis()).unwrap_or(u64::MAX)
}

/// Apply an auto-advance hint; the last question stays put for an explicit finish
fn follow_auto_advance(session: &mut QuizSession, hint: Option<AutoAdvance>) -> Result<Option<u64>> {
    let Some(hint) = hint else {
        return Ok(None);
    };
    if session.current_index() + 1 < session.len() {
        session.advance()?;
    }
    Ok(Some(delay_ms(hint)))
}

fn pick_label(outcome: &PickOutcome) -> &'static str {
    match outcome {
        PickOutcome::Ignored => "ignored",
        PickOutcome::Selected => "selected",
        PickOutcome::Deselected => "deselected",
        PickOutcome::Resolved(_) => "resolved",
        PickOutcome::Completed(_) => "completed",
    }
}

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

fn parse_or_stable_uuid(value: Option<&str>) -> Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => Uuid::new_v4(),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Quiz Endpoints
/// =============================

async fn generate_quiz(state: &ApiState, id: Uuid, ticket: RequestTicket) -> Result<QuizSnapshot> {
    let (kind, language, context) = state
        .with_quiz(id, |flow| Ok((flow.kind(), flow.language(), flow.context().clone())))
        .await?;

    let result = state.content.quiz_questions(kind, language, &context).await;

    state
        .with_quiz(id, |flow| {
            flow.receive_questions(ticket, result).map_err(as_upstream)?;
            Ok(flow.snapshot())
        })
        .await
}

/// Scores a completed session; a finished flow is discarded once its result is returned
async fn score_quiz(state: &ApiState, id: Uuid) -> Result<QuizEventResponse> {
    let request = state.with_quiz(id, |flow| flow.begin_analysis()).await?;

    let result = state
        .content
        .analyze_quiz(&request.questions, &request.answers, request.language)
        .await;

    let (snapshot, finished) = state
        .with_quiz(id, |flow| {
            flow.receive_analysis(request.ticket, result)?;
            Ok((flow.snapshot(), matches!(flow.phase(), QuizPhase::Finished(_))))
        })
        .await?;

    if finished {
        state.quizzes.remove(id).await;
        state
            .activity
            .record(
                "Quiz Finished",
                json!({ "flow_id": id, "answers": request.answers.len() }),
            )
            .await;
    }

    Ok(QuizEventResponse {
        snapshot,
        auto_advance_ms: None,
        pick: None,
    })
}

async fn start_quiz(State(state): State<ApiState>, Json(req): Json<StartQuizRequest>) -> ApiReply {
    let context = user_context(req.activity);
    let (flow, ticket) = QuizFlow::begin(req.kind, req.language, context);
    let id = flow.id();

    state.quizzes.insert(id, flow).await;
    state
        .activity
        .record("Quiz Started", json!({ "flow_id": id, "kind": req.kind, "language": req.language }))
        .await;

    reply(generate_quiz(&state, id, ticket).await)
}

async fn restart_quiz(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    match state.with_quiz(id, |flow| Ok(flow.restart())).await {
        Ok(ticket) => reply(generate_quiz(&state, id, ticket).await),
        Err(e) => reply_err(e),
    }
}

async fn get_quiz(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    reply(state.with_quiz(id, |flow| Ok(flow.snapshot())).await)
}

async fn quiz_option(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OptionRequest>,
) -> ApiReply {
    reply(
        state
            .with_quiz(id, |flow| {
                let session = flow.session_mut()?;
                let hint = session.select_option(req.index)?;
                let auto_advance_ms = follow_auto_advance(session, Some(hint))?;
                Ok(QuizEventResponse {
                    snapshot: flow.snapshot(),
                    auto_advance_ms,
                    pick: None,
                })
            })
            .await,
    )
}

async fn quiz_text(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TextRequest>,
) -> ApiReply {
    reply(
        state
            .with_quiz(id, |flow| {
                let session = flow.session_mut()?;
                let hint = session.submit_text(&req.text)?;
                let auto_advance_ms = follow_auto_advance(session, Some(hint))?;
                Ok(QuizEventResponse {
                    snapshot: flow.snapshot(),
                    auto_advance_ms,
                    pick: None,
                })
            })
            .await,
    )
}

async fn quiz_match(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MatchRequest>,
) -> ApiReply {
    reply(
        state
            .with_quiz(id, |flow| {
                let session = flow.session_mut()?;
                let progress = session.pick_match(req.side, &req.item)?;
                let auto_advance_ms = follow_auto_advance(session, progress.auto_advance)?;
                Ok(QuizEventResponse {
                    snapshot: flow.snapshot(),
                    auto_advance_ms,
                    pick: Some(pick_label(&progress.outcome)),
                })
            })
            .await,
    )
}

async fn quiz_advance(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    match state.with_quiz(id, |flow| flow.session_mut()?.advance()).await {
        Ok(Navigation::Completed(_)) => reply(score_quiz(&state, id).await),
        Ok(_) => get_quiz(State(state), Path(id)).await,
        Err(e) => reply_err(e),
    }
}

async fn quiz_retreat(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    reply(
        state
            .with_quiz(id, |flow| {
                flow.session_mut()?.retreat()?;
                Ok(flow.snapshot())
            })
            .await,
    )
}

async fn quiz_finish(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    match state.with_quiz(id, |flow| flow.session_mut()?.finish()).await {
        Ok(_) => reply(score_quiz(&state, id).await),
        Err(e) => reply_err(e),
    }
}

/// =============================
/// Risk Assessment Endpoints
/// =============================

async fn generate_risk(state: &ApiState, id: Uuid, ticket: RequestTicket) -> Result<RiskSnapshot> {
    let (language, context) = state
        .with_risk(id, |flow| Ok((flow.language(), flow.context().clone())))
        .await?;

    let result = state.content.risk_questions(language, &context).await;

    state
        .with_risk(id, |flow| {
            flow.receive_questions(ticket, result).map_err(as_upstream)?;
            Ok(flow.snapshot())
        })
        .await
}

/// Profiles a completed assessment; the flow is discarded once its result is returned
async fn profile_risk(state: &ApiState, id: Uuid) -> Result<RiskEventResponse> {
    let (request, context) = state
        .with_risk(id, |flow| Ok((flow.begin_analysis()?, flow.context().clone())))
        .await?;

    let result = state
        .content
        .analyze_risk(&request.answers, request.age, request.language, &context)
        .await;

    let (snapshot, done) = state
        .with_risk(id, |flow| {
            flow.receive_profile(request.ticket, result)?;
            Ok((flow.snapshot(), matches!(flow.phase(), RiskPhase::Results(_))))
        })
        .await?;

    if done {
        state.risks.remove(id).await;
    }

    Ok(RiskEventResponse {
        snapshot,
        auto_advance_ms: None,
    })
}

async fn risk_step(state: &ApiState, id: Uuid, step: Result<RiskStep>) -> Result<RiskEventResponse> {
    match step? {
        RiskStep::Next(hint) => Ok(RiskEventResponse {
            snapshot: state.with_risk(id, |flow| Ok(flow.snapshot())).await?,
            auto_advance_ms: Some(delay_ms(hint)),
        }),
        RiskStep::Completed(_) => profile_risk(state, id).await,
    }
}

async fn start_risk(State(state): State<ApiState>, Json(req): Json<StartRiskRequest>) -> ApiReply {
    let mut flow = RiskFlow::new(req.language, user_context(req.activity));
    let ticket = match flow.submit_age(&req.age.as_text()) {
        Ok(ticket) => ticket,
        Err(e) => return reply_err(e),
    };
    let id = flow.id();

    state.risks.insert(id, flow).await;
    state
        .activity
        .record("Risk Assessment Started", json!({ "flow_id": id, "language": req.language }))
        .await;

    reply(generate_risk(&state, id, ticket).await)
}

async fn risk_age(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<AgeRequest>,
) -> ApiReply {
    match state.with_risk(id, |flow| flow.submit_age(&req.age.as_text())).await {
        Ok(ticket) => reply(generate_risk(&state, id, ticket).await),
        Err(e) => reply_err(e),
    }
}

async fn get_risk(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    reply(state.with_risk(id, |flow| Ok(flow.snapshot())).await)
}

async fn risk_choose(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<OptionRequest>,
) -> ApiReply {
    let step = state
        .with_risk(id, |flow| flow.assessment_mut()?.choose(req.index))
        .await;
    reply(risk_step(&state, id, step).await)
}

async fn risk_custom(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TextRequest>,
) -> ApiReply {
    let step = state
        .with_risk(id, |flow| flow.assessment_mut()?.choose_custom(&req.text))
        .await;
    reply(risk_step(&state, id, step).await)
}

async fn risk_retreat(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiReply {
    reply(
        state
            .with_risk(id, |flow| {
                flow.assessment_mut()?.retreat()?;
                Ok(flow.snapshot())
            })
            .await,
    )
}

/// =============================
/// Tool Endpoints
/// =============================

async fn budget_tool(State(state): State<ApiState>, Json(req): Json<BudgetToolRequest>) -> ApiReply {
    let budget = match req.budget.sanitized() {
        Ok(budget) => budget,
        Err(e) => return reply_err(e),
    };

    state
        .activity
        .record(
            "Budget Analysis Requested",
            json!({ "income": budget.income, "numExpenses": budget.expenses.len(), "currency": budget.currency }),
        )
        .await;

    let context = user_context(req.activity);
    reply(state.content.budget_suggestions(&budget, req.language, &context).await)
}

async fn allocation_tool(Json(req): Json<AllocationRequest>) -> ApiReply {
    if !(req.income.is_finite() && req.income > 0.0) {
        return reply_err(FinlitError::InvalidInput(
            "Please enter your monthly income.".to_string(),
        ));
    }
    let allocation: Allocation = target_allocation(req.income, req.situation);
    reply_ok(allocation)
}

async fn investment_tool(
    State(state): State<ApiState>,
    Json(req): Json<InvestmentToolRequest>,
) -> ApiReply {
    if let Err(e) = budget::validate_investment(&req.details) {
        return reply_err(e);
    }

    state
        .activity
        .record("Investment Plan Requested", json!({ "goal": req.details.goal, "risk": req.details.risk }))
        .await;

    let context = user_context(req.activity);
    reply(state.content.investment_plan(&req.details, req.language, &context).await)
}

async fn cashflow_tool(
    State(state): State<ApiState>,
    Json(req): Json<CashFlowToolRequest>,
) -> ApiReply {
    let input = req.input.sanitized();

    state
        .activity
        .record("Cash Flow Statement Requested", json!({ "items": input.item_count() }))
        .await;

    let context = user_context(req.activity);
    reply(state.content.cash_flow_statement(&input, req.language, &context).await)
}

/// =============================
/// News & Reading Endpoints
/// =============================

async fn news(State(state): State<ApiState>, Query(query): Query<NewsQuery>) -> ApiReply {
    let category = query
        .category
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| crate::agent::DEFAULT_NEWS_CATEGORY.to_string());

    reply(
        state
            .content
            .news_cached(&state.news, query.language, &category)
            .await,
    )
}

async fn topic_content(State(state): State<ApiState>, Json(req): Json<ContentRequest>) -> ApiReply {
    let context = user_context(req.activity);
    reply(
        state
            .content
            .content_for_topic(&req.topic, req.language, &context)
            .await,
    )
}

async fn books(State(state): State<ApiState>, Query(query): Query<LanguageQuery>) -> ApiReply {
    let context = user_context(query.activity);
    reply(state.content.book_recommendations(query.language, &context).await)
}

async fn ideas(State(state): State<ApiState>, Query(query): Query<LanguageQuery>) -> ApiReply {
    let context = user_context(query.activity);
    reply(state.content.feature_ideas(query.language, &context).await)
}

/// =============================
/// Chat & Agent Endpoints
/// =============================

async fn chat_turn(state: &ApiState, req: ChatRequest) -> Result<ChatReply> {
    let chat_id = parse_or_stable_uuid(req.chat_id.as_deref());
    let context = user_context(req.activity);

    let language = req.language;
    let (system, turns) = state
        .chats
        .with_or_insert(
            chat_id,
            || ChatSession::with_id(chat_id, language, context.clone()),
            |session| {
                session.reconfigure(language, context.clone());
                let turns = session.prepare(&req.message)?;
                Ok((session.system_instruction(), turns))
            },
        )
        .await?;

    info!(%chat_id, turns = turns.len(), "Chat message received");

    let reply = state
        .content
        .completion()
        .chat(ModelTier::Lite, &system, &turns)
        .await?;

    state
        .chats
        .with(chat_id, |session| {
            let message = session.receive(reply).clone();
            Ok(ChatReply {
                chat_id,
                reply: message,
                messages: session.messages().to_vec(),
            })
        })
        .await
}

async fn chat_handler(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> ApiReply {
    reply(chat_turn(&state, req).await)
}

async fn agent_handler(State(state): State<ApiState>, Json(req): Json<AgentRequest>) -> ApiReply {
    state
        .activity
        .record("Agent Query", json!({ "query": req.query }))
        .await;

    let context = user_context(req.activity);
    let result: Result<AgentResponse> = state.agent.handle(&req.query, req.language, &context).await;
    reply(result)
}

async fn activity(State(state): State<ApiState>, Query(query): Query<ActivityQuery>) -> ApiReply {
    let records: Vec<ActivityRecord> = state.activity.recent(query.limit.unwrap_or(50)).await;
    reply_ok(records)
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/quiz", post(start_quiz))
        .route("/api/quiz/:id", get(get_quiz))
        .route("/api/quiz/:id/option", post(quiz_option))
        .route("/api/quiz/:id/text", post(quiz_text))
        .route("/api/quiz/:id/match", post(quiz_match))
        .route("/api/quiz/:id/advance", post(quiz_advance))
        .route("/api/quiz/:id/retreat", post(quiz_retreat))
        .route("/api/quiz/:id/finish", post(quiz_finish))
        .route("/api/quiz/:id/restart", post(restart_quiz))
        .route("/api/risk", post(start_risk))
        .route("/api/risk/:id", get(get_risk))
        .route("/api/risk/:id/age", post(risk_age))
        .route("/api/risk/:id/choose", post(risk_choose))
        .route("/api/risk/:id/custom", post(risk_custom))
        .route("/api/risk/:id/retreat", post(risk_retreat))
        .route("/api/tools/budget", post(budget_tool))
        .route("/api/tools/allocation", post(allocation_tool))
        .route("/api/tools/investment", post(investment_tool))
        .route("/api/tools/cashflow", post(cashflow_tool))
        .route("/api/news", get(news))
        .route("/api/content", post(topic_content))
        .route("/api/books", get(books))
        .route("/api/ideas", get(ideas))
        .route("/api/chat", post(chat_handler))
        .route("/api/agent", post(agent_handler))
        .route("/api/activity", get(activity))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: ApiState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::ScriptedCompletion;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> (Arc<ScriptedCompletion>, Router) {
        let (scripted, _, router) = app_with_state(DEFAULT_SESSION_TTL);
        (scripted, router)
    }

    fn app_with_state(session_ttl: Duration) -> (Arc<ScriptedCompletion>, ApiState, Router) {
        let scripted = Arc::new(ScriptedCompletion::new());
        let state = ApiState::new(scripted.clone(), Duration::from_secs(900))
            .with_session_ttl(session_ttl);
        (scripted, state.clone(), create_router(state))
    }

    fn analysis_json() -> Value {
        json!({
            "scorePercentage": 50,
            "overallFeedback": "Good start.",
            "growthOpportunities": []
        })
    }

    async fn start_quiz_id(app: &Router, scripted: &ScriptedCompletion, questions: Value) -> String {
        scripted.push_json(questions).await;
        let (status, body) = call(app, "POST", "/api/quiz", Some(json!({ "kind": "mindset" }))).await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["flow_id"].as_str().unwrap().to_string()
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn two_question_quiz() -> Value {
        json!([
            {
                "type": "mc",
                "question": "Where should savings go first?",
                "options": [{ "text": "Emergency fund" }, { "text": "New phone" }],
                "feedback": ""
            },
            {
                "type": "input",
                "question": "What does ETF stand for?",
                "correctAnswerLabel": "Exchange-Traded Fund",
                "feedback": ""
            }
        ])
    }

    #[test]
    fn test_health() {
        let (_, app) = app();
        let (status, body) = tokio_test::block_on(call(&app, "GET", "/health", None));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[test]
    fn test_stable_uuid_is_deterministic() {
        let a = parse_or_stable_uuid(Some("chat-abc"));
        assert_eq!(a, parse_or_stable_uuid(Some("chat-abc")));
        assert_eq!(a.get_version_num(), 4);
        let id = Uuid::new_v4();
        assert_eq!(parse_or_stable_uuid(Some(&id.to_string())), id);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&FinlitError::SessionNotFound(Uuid::nil())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&FinlitError::LlmError("down".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&FinlitError::IncompleteAnswers { missing: vec![1] }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&FinlitError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert!(matches!(
            as_upstream(FinlitError::EmptyQuiz),
            FinlitError::InvalidResponse(_)
        ));
    }

    #[tokio::test]
    async fn test_quiz_scenario_end_to_end() {
        let (scripted, app) = app();
        scripted.push_json(two_question_quiz()).await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/quiz",
            Some(json!({ "kind": "mindset", "language": "en" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["phase"], "active");
        assert_eq!(body["data"]["question"]["total"], 2);
        let id = body["data"]["flow_id"].as_str().unwrap().to_string();

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/quiz/{}/option", id),
            Some(json!({ "index": 1 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["auto_advance_ms"], 300);
        assert_eq!(body["data"]["question"]["index"], 1);

        let (status, body) = call(&app, "POST", &format!("/api/quiz/{}/finish", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);

        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/quiz/{}/text", id),
            Some(json!({ "text": "exchange traded fund" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["auto_advance_ms"], 0);
        // last question: no implicit advance
        assert_eq!(body["data"]["question"]["index"], 1);
        assert_eq!(body["data"]["question"]["can_finish"], true);

        scripted
            .push_json(json!({
                "scorePercentage": 50,
                "overallFeedback": "Good start.",
                "growthOpportunities": []
            }))
            .await;
        let (status, body) = call(&app, "POST", &format!("/api/quiz/{}/finish", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["phase"], "finished");
        assert_eq!(body["data"]["analysis"]["overallFeedback"], "Good start.");

        let requests = scripted.requests().await;
        assert_eq!(requests.len(), 2);
        assert!(requests[1].prompt.contains("New phone"));
        assert!(requests[1].prompt.contains("exchange traded fund"));
    }

    #[tokio::test]
    async fn test_generation_failure_is_generic_502() {
        let (scripted, app) = app();
        scripted.push_failure("quota exceeded").await;

        let (status, body) = call(&app, "POST", "/api/quiz", Some(json!({ "kind": "budgeting" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], GENERIC_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_invalid_generated_quiz_is_502() {
        let (scripted, app) = app();
        scripted
            .push_json(json!([{ "type": "tf", "question": "Cash is king", "options": [{ "text": "True" }] }]))
            .await;

        let (status, _) = call(&app, "POST", "/api/quiz", Some(json!({ "kind": "mindset" }))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_unknown_quiz_is_404() {
        let (_, app) = app();
        let (status, body) = call(&app, "GET", &format!("/api/quiz/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_allocation_tool() {
        let (_, app) = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/tools/allocation",
            Some(json!({ "income": 10000, "situation": "debt" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["savings"], 4000.0);
        assert_eq!(body["data"]["split"]["wants"], 10);

        let (status, _) = call(&app, "POST", "/api/tools/allocation", Some(json!({ "income": 0 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_budget_without_valid_items_is_400() {
        let (scripted, app) = app();
        let (status, _) = call(
            &app,
            "POST",
            "/api/tools/budget",
            Some(json!({ "income": 5000, "expenses": [{ "category": "", "amount": 10, "type": "fixed" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(scripted.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_risk_age_is_400() {
        let (scripted, app) = app();
        let (status, body) = call(&app, "POST", "/api/risk", Some(json!({ "age": "abc" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid input: Please enter a valid age.");
        assert!(scripted.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_risk_start_with_numeric_age() {
        let (scripted, app) = app();
        scripted
            .push_json(json!([
                { "question": "Markets drop 20%. You?", "options": ["Sell", "Hold", "Buy more"] }
            ]))
            .await;

        let (status, body) = call(&app, "POST", "/api/risk", Some(json!({ "age": 34 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["phase"], "answering");
    }

    #[tokio::test]
    async fn test_chat_keeps_history_under_chat_id() {
        let (scripted, app) = app();
        scripted.push_reply("What would freedom look like for you?").await;
        scripted.push_reply("Then start with one asset.").await;

        let (status, body) = call(
            &app,
            "POST",
            "/api/chat",
            Some(json!({ "chat_id": "session-1", "message": "I want out of my job" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"]["messages"][1]["role"], "user");

        let (_, body) = call(
            &app,
            "POST",
            "/api/chat",
            Some(json!({ "chat_id": "session-1", "message": "Owning something" })),
        )
        .await;
        let messages = body["data"]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[4]["text"], "Then start with one asset.");
        assert_eq!(body["data"]["chat_id"], json!(stable_uuid_from_string("session-1")));
    }

    #[tokio::test]
    async fn test_activity_lists_recorded_actions() {
        let (scripted, app) = app();
        scripted.push_json(two_question_quiz()).await;
        call(&app, "POST", "/api/quiz", Some(json!({ "kind": "mindset" }))).await;

        let (status, body) = call(&app, "GET", "/api/activity?limit=5", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["action"], "Quiz Started");
    }

    #[tokio::test]
    async fn test_finished_quizzes_are_discarded() {
        let (scripted, state, app) = app_with_state(DEFAULT_SESSION_TTL);

        let mut ids = Vec::new();
        for _ in 0..5 {
            let id = start_quiz_id(&app, &scripted, two_question_quiz()).await;
            call(&app, "POST", &format!("/api/quiz/{}/option", id), Some(json!({ "index": 0 }))).await;
            call(&app, "POST", &format!("/api/quiz/{}/text", id), Some(json!({ "text": "fund" }))).await;
            scripted.push_json(analysis_json()).await;
            let (status, body) = call(&app, "POST", &format!("/api/quiz/{}/finish", id), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["data"]["phase"], "finished");
            ids.push(id);
        }

        assert!(state.quizzes.is_empty().await);
        let (status, _) = call(&app, "GET", &format!("/api/quiz/{}", ids[0]), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_failed_analysis_keeps_flow_for_restart() {
        let (scripted, state, app) = app_with_state(DEFAULT_SESSION_TTL);
        let id = start_quiz_id(&app, &scripted, two_question_quiz()).await;
        call(&app, "POST", &format!("/api/quiz/{}/option", id), Some(json!({ "index": 0 }))).await;
        call(&app, "POST", &format!("/api/quiz/{}/text", id), Some(json!({ "text": "fund" }))).await;

        scripted.push_failure("timeout").await;
        let (status, _) = call(&app, "POST", &format!("/api/quiz/{}/finish", id), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(state.quizzes.len().await, 1);

        let (_, body) = call(&app, "GET", &format!("/api/quiz/{}", id), None).await;
        assert_eq!(body["data"]["phase"], "failed");
    }

    #[tokio::test]
    async fn test_idle_sessions_expire() {
        let (scripted, state, app) = app_with_state(Duration::from_millis(200));
        let id = start_quiz_id(&app, &scripted, two_question_quiz()).await;
        scripted.push_reply("Tell me more.").await;
        call(&app, "POST", "/api/chat", Some(json!({ "chat_id": "idle", "message": "hi" }))).await;
        assert_eq!(state.chats.len().await, 1);

        tokio::time::sleep(Duration::from_millis(400)).await;

        let (status, _) = call(&app, "GET", &format!("/api/quiz/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(state.quizzes.is_empty().await);

        // the next chat turn sweeps the idle conversation and starts over
        scripted.push_reply("Welcome back.").await;
        let (_, body) = call(&app, "POST", "/api/chat", Some(json!({ "chat_id": "idle", "message": "hello" }))).await;
        assert_eq!(body["data"]["messages"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_completed_risk_flow_is_discarded() {
        let (scripted, state, app) = app_with_state(DEFAULT_SESSION_TTL);
        scripted
            .push_json(json!([{ "question": "Markets drop 20%. You?", "options": ["Sell", "Hold"] }]))
            .await;
        let (_, body) = call(&app, "POST", "/api/risk", Some(json!({ "age": "29" }))).await;
        let id = body["data"]["flow_id"].as_str().unwrap().to_string();

        scripted
            .push_json(json!({
                "profile": "Balanced",
                "description": "Comfortable with some swings.",
                "allocation": { "highRisk": 50, "lowRisk": 50 },
                "assetComfort": { "stocks": 60, "bonds": 50, "realEstate": 40, "commodities": 20 },
                "explanation": "You held during a drop.",
                "overallRiskPercentage": 55,
                "lossAversionPercentage": 45,
                "lossAversionExplanation": "Moderate.",
                "investmentHorizon": "long-term",
                "investmentHorizonDescription": "Ten years or more.",
                "definitions": { "shortTerm": "< 3y", "mediumTerm": "3-7y", "longTerm": "> 7y" }
            }))
            .await;
        let (status, body) = call(
            &app,
            "POST",
            &format!("/api/risk/{}/custom", id),
            Some(json!({ "text": "Wait and read the news" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["phase"], "results");
        assert_eq!(body["data"]["profile"]["profile"], "Balanced");
        assert!(state.risks.is_empty().await);
    }

    #[tokio::test]
    async fn test_matching_question_through_router() {
        let (scripted, app) = app();
        let id = start_quiz_id(
            &app,
            &scripted,
            json!([
                {
                    "type": "matching",
                    "question": "Match each asset to what it is",
                    "pairs": [
                        { "left": "Stock", "right": "Ownership" },
                        { "left": "Bond", "right": "Loan" }
                    ],
                    "feedback": ""
                },
                { "type": "input", "question": "Define inflation", "feedback": "" }
            ]),
        )
        .await;
        let pick = |side: &str, item: &str| json!({ "side": side, "item": item });
        let uri = format!("/api/quiz/{}/match", id);

        let (_, body) = call(&app, "POST", &uri, Some(pick("left", "Stock"))).await;
        assert_eq!(body["data"]["pick"], "selected");
        assert!(body["data"].get("auto_advance_ms").is_none());

        let (_, body) = call(&app, "POST", &uri, Some(pick("right", "Ownership"))).await;
        assert_eq!(body["data"]["pick"], "resolved");
        assert_eq!(body["data"]["question"]["index"], 0);

        // resolved items are ignored
        let (_, body) = call(&app, "POST", &uri, Some(pick("left", "Stock"))).await;
        assert_eq!(body["data"]["pick"], "ignored");

        call(&app, "POST", &uri, Some(pick("right", "Loan"))).await;
        let (status, body) = call(&app, "POST", &uri, Some(pick("left", "Bond"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["pick"], "completed");
        assert_eq!(body["data"]["auto_advance_ms"], 1000);
        assert_eq!(body["data"]["question"]["index"], 1);
        assert_eq!(body["data"]["question"]["answered_count"], 1);

        // picking on a non-matching question is a 400
        let (status, _) = call(&app, "POST", &uri, Some(pick("left", "Bond"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // revisiting shows the finished pairing
        let (_, body) = call(&app, "POST", &format!("/api/quiz/{}/retreat", id), None).await;
        assert_eq!(body["data"]["question"]["index"], 0);
        assert_eq!(body["data"]["question"]["answered"], true);
    }

    #[tokio::test]
    async fn test_advance_and_retreat_then_score_on_last() {
        let (scripted, app) = app();
        let id = start_quiz_id(&app, &scripted, two_question_quiz()).await;

        let (_, body) = call(&app, "POST", &format!("/api/quiz/{}/retreat", id), None).await;
        assert_eq!(body["data"]["question"]["index"], 0);

        let (_, body) = call(&app, "POST", &format!("/api/quiz/{}/advance", id), None).await;
        assert_eq!(body["data"]["question"]["index"], 1);

        // last question unanswered: advancing cannot complete
        let (status, _) = call(&app, "POST", &format!("/api/quiz/{}/advance", id), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        call(&app, "POST", &format!("/api/quiz/{}/text", id), Some(json!({ "text": "fund" }))).await;
        call(&app, "POST", &format!("/api/quiz/{}/retreat", id), None).await;
        call(&app, "POST", &format!("/api/quiz/{}/option", id), Some(json!({ "index": 0 }))).await;

        scripted.push_json(analysis_json()).await;
        let (status, body) = call(&app, "POST", &format!("/api/quiz/{}/advance", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["phase"], "finished");
        assert_eq!(body["data"]["analysis"]["scorePercentage"], 50.0);
    }

    #[tokio::test]
    async fn test_restart_regenerates_and_clears_progress() {
        let (scripted, app) = app();
        let id = start_quiz_id(&app, &scripted, two_question_quiz()).await;
        call(&app, "POST", &format!("/api/quiz/{}/option", id), Some(json!({ "index": 1 }))).await;

        scripted
            .push_json(json!([
                { "type": "input", "question": "What is an index fund?", "feedback": "" }
            ]))
            .await;
        let (status, body) = call(&app, "POST", &format!("/api/quiz/{}/restart", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["flow_id"], id.as_str());
        assert_eq!(body["data"]["phase"], "active");
        assert_eq!(body["data"]["question"]["total"], 1);
        assert_eq!(body["data"]["question"]["answered_count"], 0);

        // a failed regeneration leaves the flow restartable
        scripted.push_failure("overloaded").await;
        let (status, _) = call(&app, "POST", &format!("/api/quiz/{}/restart", id), None).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        let (_, body) = call(&app, "GET", &format!("/api/quiz/{}", id), None).await;
        assert_eq!(body["data"]["phase"], "failed");
    }

    #[tokio::test]
    async fn test_response_after_restart_is_dropped() {
        let (scripted, state, _) = app_with_state(DEFAULT_SESSION_TTL);
        let (flow, old_ticket) = QuizFlow::begin(QuizKind::Mindset, Language::En, UserContext::default());
        let id = flow.id();
        state.quizzes.insert(id, flow).await;

        let new_ticket = state.with_quiz(id, |flow| Ok(flow.restart())).await.unwrap();
        scripted.push_json(two_question_quiz()).await;
        generate_quiz(&state, id, new_ticket).await.unwrap();

        // the first request's questions arrive late
        let late: Vec<crate::quiz::Question> = serde_json::from_value(json!([
            { "type": "input", "question": "Stale question", "feedback": "" }
        ]))
        .unwrap();
        let snapshot = state
            .with_quiz(id, |flow| {
                flow.receive_questions(old_ticket, Ok(late))?;
                Ok(flow.snapshot())
            })
            .await
            .unwrap();
        assert_eq!(snapshot.question.unwrap().total, 2);
    }
}
