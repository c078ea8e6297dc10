//! Core data models for content exchanged with the AI service

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ar,
}

impl Language {
    /// Short code used in cache keys and prompts
    pub fn code(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Ar => "ar",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuizKind {
    Mindset,
    Budgeting,
    Investment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    Mindset,
    Risk,
    Budgeting,
    Investment,
    Tools,
    Reading,
    Rules,
}

impl From<QuizKind> for ToolType {
    fn from(kind: QuizKind) -> Self {
        match kind {
            QuizKind::Mindset => ToolType::Mindset,
            QuizKind::Budgeting => ToolType::Budgeting,
            QuizKind::Investment => ToolType::Investment,
        }
    }
}

//
// ================= User Context =================
//

/// What the user is currently doing, fed into prompts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserContext {
    pub activity: String,
}

impl UserContext {
    pub fn new(activity: impl Into<String>) -> Self {
        Self {
            activity: activity.into(),
        }
    }
}

impl Default for UserContext {
    fn default() -> Self {
        Self::new("Browsing the home page")
    }
}

//
// ================= Quiz Analysis =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnalysis {
    pub score_percentage: f64,
    pub overall_feedback: String,
    #[serde(default)]
    pub growth_opportunities: Vec<GrowthOpportunity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GrowthOpportunity {
    pub question: String,
    pub your_answer: String,
    pub rich_mindset_answer: String,
    pub explanation: String,
}

//
// ================= Risk Profile =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskQuestion {
    pub question: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRiskAnswer {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum InvestmentHorizon {
    ShortTerm,
    MediumTerm,
    LongTerm,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskProfile {
    pub profile: String,
    pub description: String,
    pub allocation: RiskAllocation,
    pub asset_comfort: AssetComfort,
    pub explanation: String,
    pub overall_risk_percentage: f64,
    pub loss_aversion_percentage: f64,
    pub loss_aversion_explanation: String,
    pub investment_horizon: InvestmentHorizon,
    pub investment_horizon_description: String,
    pub definitions: HorizonDefinitions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskAllocation {
    pub high_risk: f64,
    pub low_risk: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetComfort {
    pub stocks: f64,
    pub bonds: f64,
    pub real_estate: f64,
    pub commodities: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HorizonDefinitions {
    pub short_term: String,
    pub medium_term: String,
    pub long_term: String,
}

//
// ================= Budget =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    #[default]
    Variable,
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetItem {
    #[serde(default)]
    pub id: String,
    pub category: String,
    pub amount: f64,
    #[serde(rename = "type", default)]
    pub expense_type: ExpenseType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct BudgetAnalysis {
    pub summary: String,
    pub key_metrics: KeyMetrics,
    pub expense_breakdown: ExpenseBreakdownGroups,
    pub positive_points: Vec<String>,
    pub areas_for_improvement: Vec<ImprovementArea>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyMetrics {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net_savings: f64,
    pub savings_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenseBreakdownGroups {
    pub fixed: Vec<ExpenseBreakdown>,
    pub variable: Vec<ExpenseBreakdown>,
    pub total_fixed: f64,
    pub total_variable: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ExpenseBreakdown {
    pub category: String,
    pub amount: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ImprovementArea {
    pub area: String,
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential_savings: Option<String>,
}

//
// ================= Investment Plan =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvestmentDetails {
    pub goal: String,
    pub target: f64,
    /// Years
    pub timeline: f64,
    pub initial: f64,
    pub monthly: f64,
    pub risk: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct InvestmentPlan {
    pub plan_name: String,
    pub summary: String,
    pub asset_allocation: BTreeMap<String, f64>,
    pub strategies: Vec<String>,
    pub disclaimer: String,
}

//
// ================= Cash Flow =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CashFlowItem {
    pub item: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CashFlowActivity {
    pub inflows: Vec<CashFlowItem>,
    pub outflows: Vec<CashFlowItem>,
    pub net_cash_flow: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CashFlowSummary {
    pub net_increase_in_cash: f64,
    pub beginning_cash_balance: f64,
    pub ending_cash_balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CashFlowStatement {
    pub operating_activities: CashFlowActivity,
    pub investing_activities: CashFlowActivity,
    pub financing_activities: CashFlowActivity,
    pub summary: CashFlowSummary,
    pub analysis: String,
}

//
// ================= Educational Content =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratedContent {
    pub title: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Book {
    pub title: String,
    pub author: String,
    pub summary: String,
    pub cover_image: String,
    pub url: String,
}

//
// ================= Agent =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentCommand {
    GenerateContent,
    FetchNews,
    RecommendBooks,
    SuggestIdeas,
    ShowComponent,
    ShowHelp,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ComponentProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiz_type: Option<QuizKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AgentInterpretation {
    pub command: AgentCommand,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub news_category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_props: Option<ComponentProps>,
    pub response_to_user: String,
}

//
// ================= News =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebSource {
    pub uri: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroundingChunk {
    pub web: WebSource,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewsData {
    pub text: String,
    pub sources: Vec<GroundingChunk>,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl fmt::Display for QuizKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuizKind::Mindset => "mindset",
            QuizKind::Budgeting => "budgeting",
            QuizKind::Investment => "investment",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_profile_deserialization() {
        let json = serde_json::json!({
            "profile": "Balanced",
            "description": "Comfortable with moderate swings",
            "allocation": { "highRisk": 40, "lowRisk": 60 },
            "assetComfort": { "stocks": 60, "bonds": 70, "realEstate": 50, "commodities": 20 },
            "explanation": "...",
            "overallRiskPercentage": 45,
            "lossAversionPercentage": 55,
            "lossAversionExplanation": "...",
            "investmentHorizon": "long-term",
            "investmentHorizonDescription": "...",
            "definitions": { "shortTerm": "< 3y", "mediumTerm": "3-7y", "longTerm": "> 7y" }
        });

        let profile: RiskProfile = serde_json::from_value(json).unwrap();
        assert_eq!(profile.investment_horizon, InvestmentHorizon::LongTerm);
        assert_eq!(profile.allocation.high_risk, 40.0);
    }

    #[test]
    fn test_agent_interpretation_defaults() {
        let parsed: AgentInterpretation = serde_json::from_value(serde_json::json!({
            "command": "show_component",
            "component_name": "QuizSection",
            "component_props": { "quizType": "investment" },
            "response_to_user": "Launching"
        }))
        .unwrap();

        assert_eq!(parsed.command, AgentCommand::ShowComponent);
        assert_eq!(
            parsed.component_props.and_then(|p| p.quiz_type),
            Some(QuizKind::Investment)
        );
        assert!(parsed.content_topic.is_none());
    }

    #[test]
    fn test_partial_budget_analysis_tolerated() {
        let parsed: BudgetAnalysis = serde_json::from_value(serde_json::json!({
            "summary": "ok",
            "keyMetrics": { "totalIncome": 1000 }
        }))
        .unwrap();
        assert_eq!(parsed.key_metrics.total_income, 1000.0);
        assert!(parsed.positive_points.is_empty());
    }
}
