//! Response schemas in the Gemini `responseSchema` dialect

use serde_json::{json, Value};

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn number() -> Value {
    json!({ "type": "NUMBER" })
}

fn array_of(items: Value) -> Value {
    json!({ "type": "ARRAY", "items": items })
}

fn cash_flow_activity() -> Value {
    let item = json!({
        "type": "OBJECT",
        "properties": { "item": string(), "amount": number() }
    });
    json!({
        "type": "OBJECT",
        "properties": {
            "inflows": array_of(item.clone()),
            "outflows": array_of(item),
            "netCashFlow": number()
        }
    })
}

/// Mindset and budgeting quizzes: multiple-choice only, every option tagged
pub fn standard_quiz() -> Value {
    array_of(json!({
        "type": "OBJECT",
        "properties": {
            "type": { "type": "STRING", "enum": ["mc"] },
            "question": string(),
            "options": array_of(json!({
                "type": "OBJECT",
                "properties": { "text": string(), "mindset": string() },
                "required": ["text", "mindset"]
            })),
            "feedback": string()
        },
        "required": ["type", "question", "options", "feedback"]
    }))
}

pub fn mixed_quiz() -> Value {
    array_of(json!({
        "type": "OBJECT",
        "properties": {
            "type": { "type": "STRING", "enum": ["mc", "tf", "input", "matching"] },
            "question": string(),
            "options": array_of(json!({
                "type": "OBJECT",
                "properties": { "text": string(), "mindset": string() },
                "required": ["text"]
            })),
            "pairs": array_of(json!({
                "type": "OBJECT",
                "properties": { "left": string(), "right": string() },
                "required": ["left", "right"]
            })),
            "correctAnswerLabel": string(),
            "feedback": string()
        },
        "required": ["type", "question", "feedback"]
    }))
}

pub fn quiz_analysis() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "scorePercentage": number(),
            "overallFeedback": string(),
            "growthOpportunities": array_of(json!({
                "type": "OBJECT",
                "properties": {
                    "question": string(),
                    "yourAnswer": string(),
                    "richMindsetAnswer": string(),
                    "explanation": string()
                },
                "required": ["question", "yourAnswer", "richMindsetAnswer", "explanation"]
            }))
        },
        "required": ["scorePercentage", "overallFeedback", "growthOpportunities"]
    })
}

pub fn risk_questions() -> Value {
    array_of(json!({
        "type": "OBJECT",
        "properties": {
            "question": string(),
            "options": array_of(string())
        },
        "required": ["question", "options"]
    }))
}

pub fn risk_profile() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "profile": string(),
            "description": string(),
            "allocation": {
                "type": "OBJECT",
                "properties": { "highRisk": number(), "lowRisk": number() },
                "required": ["highRisk", "lowRisk"]
            },
            "assetComfort": {
                "type": "OBJECT",
                "properties": {
                    "stocks": number(),
                    "bonds": number(),
                    "realEstate": number(),
                    "commodities": number()
                },
                "required": ["stocks", "bonds", "realEstate", "commodities"]
            },
            "explanation": string(),
            "overallRiskPercentage": number(),
            "lossAversionPercentage": number(),
            "lossAversionExplanation": string(),
            "investmentHorizon": {
                "type": "STRING",
                "enum": ["short-term", "medium-term", "long-term"]
            },
            "investmentHorizonDescription": string(),
            "definitions": {
                "type": "OBJECT",
                "properties": {
                    "shortTerm": string(),
                    "mediumTerm": string(),
                    "longTerm": string()
                },
                "required": ["shortTerm", "mediumTerm", "longTerm"]
            }
        },
        "required": [
            "profile", "description", "allocation", "assetComfort", "explanation",
            "overallRiskPercentage", "lossAversionPercentage", "lossAversionExplanation",
            "investmentHorizon", "investmentHorizonDescription", "definitions"
        ]
    })
}

pub fn budget_analysis() -> Value {
    let breakdown = array_of(json!({
        "type": "OBJECT",
        "properties": { "category": string(), "amount": number(), "percentage": number() }
    }));
    json!({
        "type": "OBJECT",
        "properties": {
            "summary": string(),
            "keyMetrics": {
                "type": "OBJECT",
                "properties": {
                    "totalIncome": number(),
                    "totalExpenses": number(),
                    "netSavings": number(),
                    "savingsRate": number()
                },
                "required": ["totalIncome"]
            },
            "expenseBreakdown": {
                "type": "OBJECT",
                "properties": {
                    "fixed": breakdown.clone(),
                    "variable": breakdown,
                    "totalFixed": number(),
                    "totalVariable": number()
                },
                "required": ["fixed"]
            },
            "positivePoints": array_of(string()),
            "areasForImprovement": array_of(json!({
                "type": "OBJECT",
                "properties": {
                    "area": string(),
                    "suggestion": string(),
                    "potentialSavings": string()
                }
            }))
        }
    })
}

pub fn investment_plan() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "planName": string(),
            "summary": string(),
            "assetAllocation": { "type": "OBJECT", "additionalProperties": number() },
            "strategies": array_of(string()),
            "disclaimer": string()
        }
    })
}

pub fn cash_flow_statement() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "operatingActivities": cash_flow_activity(),
            "investingActivities": cash_flow_activity(),
            "financingActivities": cash_flow_activity(),
            "summary": {
                "type": "OBJECT",
                "properties": {
                    "netIncreaseInCash": number(),
                    "beginningCashBalance": number(),
                    "endingCashBalance": number()
                }
            },
            "analysis": string()
        }
    })
}

pub fn agent_interpretation() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "command": {
                "type": "STRING",
                "enum": [
                    "generate_content", "fetch_news", "recommend_books", "suggest_ideas",
                    "show_component", "show_help", "unknown"
                ]
            },
            "content_topic": string(),
            "news_category": string(),
            "component_name": string(),
            "component_props": {
                "type": "OBJECT",
                "properties": { "quizType": string() }
            },
            "response_to_user": string()
        }
    })
}

pub fn topic_content() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": string(),
            "explanation": string(),
            "example": string(),
            "keyPoints": array_of(string())
        }
    })
}

pub fn books() -> Value {
    array_of(json!({
        "type": "OBJECT",
        "properties": {
            "title": string(),
            "author": string(),
            "summary": string(),
            "coverImage": string(),
            "url": string()
        }
    }))
}

pub fn ideas() -> Value {
    array_of(string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_quiz_allows_every_kind() {
        let schema = mixed_quiz();
        let kinds = &schema["items"]["properties"]["type"]["enum"];
        assert_eq!(kinds.as_array().map(|k| k.len()), Some(4));
        assert_eq!(standard_quiz()["items"]["properties"]["type"]["enum"][0], "mc");
    }

    #[test]
    fn test_cash_flow_activities_share_shape() {
        let schema = cash_flow_statement();
        assert_eq!(
            schema["properties"]["operatingActivities"],
            schema["properties"]["financingActivities"]
        );
    }
}
