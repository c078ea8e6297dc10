//! Serializable snapshot of the current question for front ends

use super::matching::{Selection, Side};
use super::question::{AnswerContent, MatchingPair};
use super::session::{Presentation, QuizSession};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OptionView {
    pub original_index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionBody {
    Choice {
        kind: &'static str,
        options: Vec<OptionView>,
        selected: Option<usize>,
    },
    FreeText {
        draft: Option<String>,
    },
    Matching {
        available_left: Vec<String>,
        available_right: Vec<String>,
        resolved: Vec<MatchingPair>,
        selection: Selection,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuestionView {
    pub index: usize,
    pub total: usize,
    pub prompt: String,
    pub answered: bool,
    pub answered_count: usize,
    pub can_finish: bool,
    pub body: QuestionBody,
}

impl QuizSession {
    /// Snapshot of the question at the current position
    pub fn current_view(&self) -> QuestionView {
        let index = self.current_index();
        let processed = &self.questions[index];
        let answer = self.answer_for(index);

        let body = match &processed.presentation {
            Presentation::Options(order) => {
                let options = processed.question.options().unwrap_or_default();
                QuestionBody::Choice {
                    kind: processed.question.kind_name(),
                    options: order
                        .iter()
                        .filter_map(|&i| {
                            options.get(i).map(|o| OptionView {
                                original_index: i,
                                text: o.text.clone(),
                            })
                        })
                        .collect(),
                    selected: match answer {
                        Some(AnswerContent::Option(i)) => Some(*i),
                        _ => None,
                    },
                }
            }
            Presentation::FreeText => QuestionBody::FreeText {
                draft: match answer {
                    Some(AnswerContent::Text(t)) => Some(t.clone()),
                    _ => None,
                },
            },
            Presentation::Matching(board) => QuestionBody::Matching {
                available_left: board.available(Side::Left).into_iter().map(String::from).collect(),
                available_right: board.available(Side::Right).into_iter().map(String::from).collect(),
                resolved: board.resolved().to_vec(),
                selection: board.selection().clone(),
            },
        };

        QuestionView {
            index,
            total: self.len(),
            prompt: processed.question.prompt.clone(),
            answered: answer.is_some(),
            answered_count: self.answered_count(),
            can_finish: self.can_finish(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quiz::question::{Question, QuizOption};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_choice_view_follows_shuffle() {
        let mut session = QuizSession::start_with_rng(
            vec![Question::multiple_choice(
                "Best first step?",
                vec![
                    QuizOption::new("Budget"),
                    QuizOption::new("Borrow"),
                    QuizOption::new("Gamble"),
                ],
            )],
            &mut StdRng::seed_from_u64(21),
        )
        .unwrap();

        let view = session.current_view();
        let QuestionBody::Choice { options, selected, .. } = &view.body else {
            panic!("expected choice body");
        };
        let order: Vec<usize> = options.iter().map(|o| o.original_index).collect();
        assert_eq!(order, session.option_order(0).unwrap());
        assert!(selected.is_none());

        session.select_option(2).unwrap();
        let QuestionBody::Choice { selected, .. } = session.current_view().body else {
            panic!("expected choice body");
        };
        assert_eq!(selected, Some(2));
    }

    #[test]
    fn test_matching_view_serializes() {
        let session = QuizSession::start(vec![Question::matching(
            "Match",
            vec![MatchingPair::new("ETF", "Basket")],
        )])
        .unwrap();
        let json = serde_json::to_value(session.current_view()).unwrap();
        assert_eq!(json["body"]["type"], "matching");
        assert_eq!(json["body"]["available_left"][0], "ETF");
        assert_eq!(json["body"]["selection"]["state"], "idle");
    }
}
