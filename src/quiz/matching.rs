//! Matching-question board
//!
//! Two-slot selection machine: `Idle` or one side holding a pending item.
//! Picking the opposite side resolves a pair; the answer is complete once
//! every defined pair has been resolved.

use super::question::MatchingPair;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    Idle,
    OneSideSelected { side: Side, item: String },
}

/// Result of a single pick event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// Item already resolved or not on that side
    Ignored,
    Selected,
    Deselected,
    Resolved(MatchingPair),
    /// Last pair resolved; carries the full resolved list
    Completed(Vec<MatchingPair>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingBoard {
    left: Vec<String>,
    right: Vec<String>,
    resolved: Vec<MatchingPair>,
    selection: Selection,
}

impl MatchingBoard {
    /// `left` and `right` are the presentation columns (already shuffled)
    pub fn new(left: Vec<String>, right: Vec<String>) -> Self {
        Self {
            left,
            right,
            resolved: Vec::new(),
            selection: Selection::Idle,
        }
    }

    pub fn total_pairs(&self) -> usize {
        self.left.len()
    }

    pub fn resolved(&self) -> &[MatchingPair] {
        &self.resolved
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_complete(&self) -> bool {
        self.resolved.len() == self.total_pairs()
    }

    fn is_resolved(&self, side: Side, item: &str) -> bool {
        self.resolved.iter().any(|p| match side {
            Side::Left => p.left == item,
            Side::Right => p.right == item,
        })
    }

    fn column(&self, side: Side) -> &[String] {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Items on `side` not yet part of a resolved pair, in presentation order
    pub fn available(&self, side: Side) -> Vec<&str> {
        self.column(side)
            .iter()
            .filter(|item| !self.is_resolved(side, item))
            .map(String::as_str)
            .collect()
    }

    pub fn pick(&mut self, side: Side, item: &str) -> PickOutcome {
        if !self.column(side).iter().any(|i| i == item) || self.is_resolved(side, item) {
            return PickOutcome::Ignored;
        }

        match std::mem::take(&mut self.selection) {
            Selection::Idle => {
                self.selection = Selection::OneSideSelected {
                    side,
                    item: item.to_string(),
                };
                PickOutcome::Selected
            }
            Selection::OneSideSelected {
                side: pending_side,
                item: pending,
            } if pending_side == side => {
                if pending == item {
                    PickOutcome::Deselected
                } else {
                    self.selection = Selection::OneSideSelected {
                        side,
                        item: item.to_string(),
                    };
                    PickOutcome::Selected
                }
            }
            Selection::OneSideSelected { item: pending, .. } => {
                let pair = match side {
                    Side::Left => MatchingPair::new(item, pending),
                    Side::Right => MatchingPair::new(pending, item),
                };
                self.resolved.push(pair.clone());

                if self.is_complete() {
                    PickOutcome::Completed(self.resolved.clone())
                } else {
                    PickOutcome::Resolved(pair)
                }
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection = Selection::Idle;
    }

    /// Replace the resolved pairs, e.g. when an answer was recorded directly
    pub fn restore(&mut self, pairs: Vec<MatchingPair>) {
        self.resolved = pairs;
        self.selection = Selection::Idle;
    }

    /// True when `pairs` uses every left and right item exactly once
    pub fn is_complete_pairing(&self, pairs: &[MatchingPair]) -> bool {
        if pairs.len() != self.total_pairs() {
            return false;
        }
        let mut lefts: Vec<&str> = pairs.iter().map(|p| p.left.as_str()).collect();
        let mut rights: Vec<&str> = pairs.iter().map(|p| p.right.as_str()).collect();
        let mut expected_left: Vec<&str> = self.left.iter().map(String::as_str).collect();
        let mut expected_right: Vec<&str> = self.right.iter().map(String::as_str).collect();
        lefts.sort_unstable();
        rights.sort_unstable();
        expected_left.sort_unstable();
        expected_right.sort_unstable();
        lefts == expected_left && rights == expected_right
    }
}
