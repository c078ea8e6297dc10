//! Local budgeting calculators and tool-input sanitation
//!
//! Everything here runs without the AI service: the needs/wants/savings
//! split is a fixed table, and inputs are cleaned before they are sent off
//! for analysis.

use crate::error::FinlitError;
use crate::models::{BudgetItem, CashFlowItem, InvestmentDetails};
use crate::Result;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "EGP";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Situation {
    /// Prosperity
    #[default]
    Normal,
    Foundation,
    Debt,
    Aggressive,
    Acceleration,
    Crisis,
    Shortage,
}

/// Needs / wants / savings percentages
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Split {
    pub needs: u8,
    pub wants: u8,
    pub savings: u8,
}

impl Situation {
    pub const ALL: [Situation; 7] = [
        Situation::Normal,
        Situation::Foundation,
        Situation::Debt,
        Situation::Aggressive,
        Situation::Acceleration,
        Situation::Crisis,
        Situation::Shortage,
    ];

    pub fn split(&self) -> Split {
        let (needs, wants, savings) = match self {
            Situation::Normal => (50, 30, 20),
            Situation::Foundation => (50, 20, 30),
            Situation::Debt => (50, 10, 40),
            Situation::Aggressive => (45, 10, 45),
            Situation::Acceleration => (40, 20, 40),
            Situation::Crisis => (60, 15, 25),
            Situation::Shortage => (70, 5, 25),
        };
        Split {
            needs,
            wants,
            savings,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Allocation {
    pub situation: Situation,
    pub split: Split,
    pub needs: f64,
    pub wants: f64,
    pub savings: f64,
}

pub fn target_allocation(income: f64, situation: Situation) -> Allocation {
    let split = situation.split();
    let share = |pct: u8| income * f64::from(pct) / 100.0;
    Allocation {
        situation,
        split,
        needs: share(split.needs),
        wants: share(split.wants),
        savings: share(split.savings),
    }
}

/// Keep items with a category and a positive amount
pub fn sanitize_budget(income: f64, items: Vec<BudgetItem>) -> Result<Vec<BudgetItem>> {
    if !(income.is_finite() && income > 0.0) {
        return Err(FinlitError::InvalidInput(
            "Please enter your monthly income.".to_string(),
        ));
    }

    let kept: Vec<BudgetItem> = items
        .into_iter()
        .filter(|item| !item.category.trim().is_empty() && item.amount > 0.0)
        .collect();

    if kept.is_empty() {
        return Err(FinlitError::InvalidInput(
            "Please add at least one expense with a category and amount.".to_string(),
        ));
    }

    Ok(kept)
}

/// Investment planner inputs: a named goal, a positive target and timeline
pub fn validate_investment(details: &InvestmentDetails) -> Result<()> {
    if details.goal.trim().is_empty() {
        return Err(FinlitError::InvalidInput("Please describe your goal.".to_string()));
    }
    if !(details.target > 0.0 && details.timeline > 0.0) {
        return Err(FinlitError::InvalidInput(
            "Target amount and timeline must be positive.".to_string(),
        ));
    }
    if details.initial < 0.0 || details.monthly < 0.0 {
        return Err(FinlitError::InvalidInput(
            "Contributions cannot be negative.".to_string(),
        ));
    }
    Ok(())
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BudgetRequest {
    pub income: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub expenses: Vec<BudgetItem>,
}

impl BudgetRequest {
    pub fn sanitized(self) -> Result<Self> {
        let expenses = sanitize_budget(self.income, self.expenses)?;
        Ok(Self { expenses, ..self })
    }
}

/// Cash-flow tool input, one inflow/outflow list per activity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CashFlowInput {
    pub beginning_balance: f64,
    pub op_inflows: Vec<CashFlowItem>,
    pub op_outflows: Vec<CashFlowItem>,
    pub inv_inflows: Vec<CashFlowItem>,
    pub inv_outflows: Vec<CashFlowItem>,
    pub fin_inflows: Vec<CashFlowItem>,
    pub fin_outflows: Vec<CashFlowItem>,
}

fn drop_empty(items: Vec<CashFlowItem>) -> Vec<CashFlowItem> {
    items
        .into_iter()
        .filter(|i| !i.item.trim().is_empty() && i.amount > 0.0)
        .collect()
}

impl CashFlowInput {
    pub fn sanitized(self) -> Self {
        Self {
            beginning_balance: self.beginning_balance,
            op_inflows: drop_empty(self.op_inflows),
            op_outflows: drop_empty(self.op_outflows),
            inv_inflows: drop_empty(self.inv_inflows),
            inv_outflows: drop_empty(self.inv_outflows),
            fin_inflows: drop_empty(self.fin_inflows),
            fin_outflows: drop_empty(self.fin_outflows),
        }
    }

    pub fn item_count(&self) -> usize {
        [
            &self.op_inflows,
            &self.op_outflows,
            &self.inv_inflows,
            &self.inv_outflows,
            &self.fin_inflows,
            &self.fin_outflows,
        ]
        .iter()
        .map(|list| list.len())
        .sum()
    }
}
