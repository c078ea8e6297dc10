//! Typed wrappers over the completion service
//!
//! Each call builds a prompt plus response schema, picks a model tier, and
//! decodes the JSON reply into the matching model type.

use crate::budget::{BudgetRequest, CashFlowInput};
use crate::cache::NewsCache;
use crate::completion::{CompletionRequest, CompletionService, ModelTier};
use crate::error::FinlitError;
use crate::models::{
    AgentInterpretation, Book, BudgetAnalysis, CashFlowStatement, GeneratedContent,
    InvestmentDetails, InvestmentPlan, Language, NewsData, QuizAnalysis, QuizKind, RiskProfile,
    RiskQuestion, UserContext, UserRiskAnswer,
};
use crate::quiz::{Answer, AnswerContent, Question, QuestionKind};
use crate::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub mod schemas;

pub const QUIZ_LENGTH: usize = 20;
pub const RISK_QUESTION_COUNT: usize = 15;
pub const BOOK_COUNT: usize = 5;
pub const IDEA_COUNT: usize = 3;

/// Focus topics rotated into the investment quiz prompt
pub const INVESTMENT_TOPICS: [&str; 10] = [
    "Stocks",
    "Bonds",
    "Mutual Funds",
    "ETFs",
    "Real Estate",
    "Compound Interest",
    "Inflation",
    "Risk Management",
    "Diversification",
    "Market Caps",
];

const FALLBACK_REFERENCE: &str = "See options mindset";

fn language_name(language: Language) -> &'static str {
    match language {
        Language::En => "English",
        Language::Ar => "Arabic",
    }
}

fn random_topic() -> &'static str {
    use rand::seq::SliceRandom;
    INVESTMENT_TOPICS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(INVESTMENT_TOPICS[0])
}

/// One answer rendered for the scoring prompt
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedAnswer {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user_answer: String,
    pub correct_ref: String,
}

/// Render answers as text: option text for mc/tf, the typed text for input,
/// and the resolved pairs as JSON for matching
pub fn process_answers(questions: &[Question], answers: &[Answer]) -> Vec<ProcessedAnswer> {
    answers
        .iter()
        .filter_map(|answer| {
            let question = questions.get(answer.question_index)?;

            let user_answer = match (&answer.answer_content, question.options()) {
                (AnswerContent::Option(i), Some(options)) => options
                    .get(*i)
                    .map(|o| o.text.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                (AnswerContent::Text(text), _) => text.clone(),
                (AnswerContent::Pairs(pairs), _) => serde_json::to_string(pairs).unwrap_or_default(),
                (AnswerContent::Option(_), None) => "Unknown".to_string(),
            };

            let correct_ref = match &question.kind {
                QuestionKind::FreeText {
                    reference: Some(label),
                } if !label.trim().is_empty() => label.clone(),
                QuestionKind::Matching { pairs } => serde_json::to_string(pairs).unwrap_or_default(),
                _ => FALLBACK_REFERENCE.to_string(),
            };

            Some(ProcessedAnswer {
                question: question.prompt.clone(),
                kind: question.kind_name(),
                user_answer,
                correct_ref,
            })
        })
        .collect()
}

pub fn investment_quiz_prompt(language: Language, topic: &str, seed: i64) -> String {
    format!(
        "Generate exactly {total} mixed-format quiz questions to test foundational investment \
         knowledge in {lang}.\n\
         Focus heavily on: {topic} and general principles. Random Seed: {seed}.\n\n\
         The {total} questions MUST be split exactly as follows:\n\
         1. 5 Multiple Choice Questions ('mc'): standard 4 options.\n\
         2. 5 True/False Questions ('tf'): exactly two options, \"True\" and \"False\" (translated).\n\
         3. 5 Short Answer Questions ('input'): the user types the answer. Provide a \
         'correctAnswerLabel' for grading reference.\n\
         4. 5 Matching Questions ('matching'): provide 4 pairs of terms and definitions in the \
         'pairs' array. Every left and every right value must be unique.\n\n\
         Every question needs a short 'feedback' explanation.\n\
         The output must be a valid JSON array of objects matching the specified schema.",
        total = QUIZ_LENGTH,
        lang = language_name(language),
        topic = topic,
        seed = seed,
    )
}

fn standard_quiz_prompt(kind: QuizKind, language: Language) -> String {
    let focus: &'static str = match kind {
        QuizKind::Budgeting => "a practical budgeting and saving habits quiz",
        _ => "a financial mindset quiz. The questions must focus strictly on the core \
              philosophical and psychological differences between a 'rich mindset' and a \
              'poor mindset'",
    };
    format!(
        "Generate exactly {} multiple-choice quiz questions for {} in {}.\n\
         Each question must have 4 options, each tagged with the mindset it reflects.\n\
         The output must be a valid JSON array.",
        QUIZ_LENGTH,
        focus,
        language_name(language)
    )
}

fn context_line(context: &UserContext) -> String {
    format!("The user is currently: {}.", context.activity)
}

#[derive(Clone)]
pub struct ContentService {
    completion: Arc<dyn CompletionService>,
}

impl ContentService {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self { completion }
    }

    pub fn completion(&self) -> &Arc<dyn CompletionService> {
        &self.completion
    }

    async fn request<T: DeserializeOwned>(
        &self,
        what: &'static str,
        tier: ModelTier,
        prompt: String,
        schema: serde_json::Value,
    ) -> Result<T> {
        debug!(what, ?tier, "Requesting generated content");

        let value = self
            .completion
            .complete_json(CompletionRequest {
                tier,
                prompt,
                schema,
            })
            .await
            .map_err(|e| {
                warn!(what, error = %e, "Completion failed");
                e
            })?;

        serde_json::from_value(value).map_err(|e| {
            warn!(what, error = %e, "Response did not match schema");
            FinlitError::InvalidResponse(format!("{} response: {}", what, e))
        })
    }

    // ===== Quizzes =====

    pub async fn quiz_questions(
        &self,
        kind: QuizKind,
        language: Language,
        context: &UserContext,
    ) -> Result<Vec<Question>> {
        info!(%kind, %language, "Generating quiz questions");

        let (tier, prompt, schema) = match kind {
            QuizKind::Investment => {
                let prompt = investment_quiz_prompt(
                    language,
                    random_topic(),
                    chrono::Utc::now().timestamp_millis(),
                );
                (ModelTier::Reasoning, prompt, schemas::mixed_quiz())
            }
            _ => (
                ModelTier::Fast,
                standard_quiz_prompt(kind, language),
                schemas::standard_quiz(),
            ),
        };

        let prompt = format!("{}\n{}", prompt, context_line(context));
        self.request("quiz", tier, prompt, schema).await
    }

    pub async fn analyze_quiz(
        &self,
        questions: &[Question],
        answers: &[Answer],
        language: Language,
    ) -> Result<QuizAnalysis> {
        let processed = process_answers(questions, answers);
        let lang = language_name(language);
        let prompt = format!(
            "You are an expert financial coach. Analyze the user's answers for a financial quiz in {lang}.\n\n\
             For 'mc' and 'tf' types: infer correctness from sound financial wisdom.\n\
             For 'input' types: compare the user's text to the 'correctRef'. Be lenient with spelling.\n\
             For 'matching' types: check whether the user paired the items correctly.\n\n\
             Quiz Data & User Answers: {data}\n\n\
             Provide a detailed analysis as a single valid JSON object.\n\
             1. 'scorePercentage': 0-100 based on correctness.\n\
             2. 'overallFeedback': a summary paragraph in {lang}.\n\
             3. 'growthOpportunities': for incorrect answers, the question, what they answered, \
             what was correct, and an explanation.",
            lang = lang,
            data = serde_json::to_string(&processed)?,
        );

        info!(answers = processed.len(), "Scoring quiz");
        self.request("quiz analysis", ModelTier::Reasoning, prompt, schemas::quiz_analysis())
            .await
    }

    // ===== Risk =====

    pub async fn risk_questions(
        &self,
        language: Language,
        context: &UserContext,
    ) -> Result<Vec<RiskQuestion>> {
        let prompt = format!(
            "Generate {} scenario-based multiple-choice questions in {} to assess a user's \
             financial risk profile. Each question needs at least 3 options.\n{}\n\
             The output must be a valid JSON array of objects.",
            RISK_QUESTION_COUNT,
            language_name(language),
            context_line(context)
        );
        self.request("risk questions", ModelTier::Fast, prompt, schemas::risk_questions())
            .await
    }

    pub async fn analyze_risk(
        &self,
        answers: &[UserRiskAnswer],
        age: u32,
        language: Language,
        context: &UserContext,
    ) -> Result<RiskProfile> {
        let prompt = format!(
            "Analyze the investment risk profile for a user aged {}. Language: {}.\n\
             Answers: {}\n{}\n\
             Percentages are 0-100. Output JSON strictly following the schema.",
            age,
            language_name(language),
            serde_json::to_string(answers)?,
            context_line(context)
        );
        self.request("risk profile", ModelTier::Fast, prompt, schemas::risk_profile())
            .await
    }

    // ===== Tools =====

    /// `request` should already be sanitized
    pub async fn budget_suggestions(
        &self,
        request: &BudgetRequest,
        language: Language,
        context: &UserContext,
    ) -> Result<BudgetAnalysis> {
        let prompt = format!(
            "Analyze this monthly budget. Income: {} {}. Expenses: {}. Language: {}.\n{}\n\
             Output JSON.",
            request.income,
            request.currency,
            serde_json::to_string(&request.expenses)?,
            language_name(language),
            context_line(context)
        );
        self.request("budget", ModelTier::Fast, prompt, schemas::budget_analysis())
            .await
    }

    pub async fn investment_plan(
        &self,
        details: &InvestmentDetails,
        language: Language,
        context: &UserContext,
    ) -> Result<InvestmentPlan> {
        let prompt = format!(
            "Create an investment plan. Details: {}. Language: {}.\n{}\n\
             Asset allocation values are percentages summing to 100.",
            serde_json::to_string(details)?,
            language_name(language),
            context_line(context)
        );
        self.request("investment plan", ModelTier::Fast, prompt, schemas::investment_plan())
            .await
    }

    pub async fn cash_flow_statement(
        &self,
        input: &CashFlowInput,
        language: Language,
        context: &UserContext,
    ) -> Result<CashFlowStatement> {
        let prompt = format!(
            "Generate a personal cash flow statement. Data: {}. Language: {}.\n{}",
            serde_json::to_string(input)?,
            language_name(language),
            context_line(context)
        );
        self.request("cash flow", ModelTier::Fast, prompt, schemas::cash_flow_statement())
            .await
    }

    // ===== Agent & reading =====

    pub async fn interpret_agent(
        &self,
        query: &str,
        context: &UserContext,
        language: Language,
    ) -> Result<AgentInterpretation> {
        let prompt = format!(
            "You route requests for a financial literacy website.\n\
             User request: {query}\n{context}\nLanguage: {lang}\n\n\
             Pick one command:\n\
             - generate_content: explain a topic (set content_topic)\n\
             - fetch_news: financial news (set news_category, e.g. Stocks, Crypto, Economy, All)\n\
             - recommend_books\n\
             - suggest_ideas\n\
             - show_component: open a tool. component_name is QuizSection (with \
             component_props.quizType one of mindset, budgeting, investment), \
             RiskAnalysisSection, or FinancialToolsSection\n\
             - show_help: explain what you can do\n\
             - unknown\n\
             Always write response_to_user in {lang}.",
            query = query,
            context = context_line(context),
            lang = language_name(language),
        );
        self.request(
            "agent interpretation",
            ModelTier::Reasoning,
            prompt,
            schemas::agent_interpretation(),
        )
        .await
    }

    pub async fn content_for_topic(
        &self,
        topic: &str,
        language: Language,
        context: &UserContext,
    ) -> Result<GeneratedContent> {
        if topic.trim().is_empty() {
            return Err(FinlitError::InvalidInput("Please enter a topic.".to_string()));
        }
        let prompt = format!(
            "Explain the financial concept '{}' in {} for a beginner. Include a short title, \
             a clear explanation, one practical example and 3-5 key points.\n{}",
            topic.trim(),
            language_name(language),
            context_line(context)
        );
        self.request("topic content", ModelTier::Fast, prompt, schemas::topic_content())
            .await
    }

    pub async fn book_recommendations(
        &self,
        language: Language,
        context: &UserContext,
    ) -> Result<Vec<Book>> {
        let prompt = format!(
            "Recommend {} personal finance books in {}.\n{}",
            BOOK_COUNT,
            language_name(language),
            context_line(context)
        );
        self.request("books", ModelTier::Fast, prompt, schemas::books())
            .await
    }

    pub async fn feature_ideas(&self, language: Language, context: &UserContext) -> Result<Vec<String>> {
        let prompt = format!(
            "Suggest {} new feature ideas for a financial literacy website in {}.\n{}",
            IDEA_COUNT,
            language_name(language),
            context_line(context)
        );
        self.request("ideas", ModelTier::Reasoning, prompt, schemas::ideas())
            .await
    }

    // ===== News =====

    pub async fn news(&self, language: Language, category: &str) -> Result<NewsData> {
        let prompt = format!(
            "Summarize the latest financial news for the category '{}' in {}.",
            category,
            language_name(language)
        );
        info!(%language, category, "Fetching grounded news");
        self.completion.search_grounded(ModelTier::Fast, prompt).await
    }

    /// News through the cache; only successful responses are stored
    pub async fn news_cached(
        &self,
        cache: &NewsCache,
        language: Language,
        category: &str,
    ) -> Result<NewsData> {
        if let Some(hit) = cache.get(language, category).await {
            debug!(%language, category, "News cache hit");
            return Ok(hit);
        }

        let news = self.news(language, category).await?;
        cache.insert(language, category, news.clone()).await;
        Ok(news)
    }
}
