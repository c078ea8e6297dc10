use finlit_engine::{
    budget::{target_allocation, Situation},
    completion::ScriptedCompletion,
    content::ContentService,
    flow::QuizFlow,
    quiz::{Navigation, QuestionBody},
    Language, QuizKind, UserContext,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Financial literacy engine demo starting");

    // Scripted AI responses so the demo runs offline
    let scripted = Arc::new(ScriptedCompletion::new());
    scripted
        .push_json(json!([
            {
                "type": "mc",
                "question": "You get a raise. What comes first?",
                "options": [
                    { "text": "Invest the difference", "mindset": "rich" },
                    { "text": "Upgrade your car", "mindset": "poor" }
                ],
                "feedback": "Raises are capital, not lifestyle."
            },
            {
                "type": "tf",
                "question": "A house you live in is always an asset.",
                "options": [{ "text": "True" }, { "text": "False" }],
                "feedback": "Assets put money in your pocket."
            },
            {
                "type": "input",
                "question": "What does ETF stand for?",
                "correctAnswerLabel": "Exchange-Traded Fund",
                "feedback": ""
            }
        ]))
        .await;
    scripted
        .push_json(json!({
            "scorePercentage": 100,
            "overallFeedback": "You think like an owner.",
            "growthOpportunities": []
        }))
        .await;

    let content = ContentService::new(scripted.clone());
    let context = UserContext::new("Taking the mindset quiz");

    let (mut flow, ticket) = QuizFlow::begin(QuizKind::Mindset, Language::En, context.clone());
    let questions = content
        .quiz_questions(flow.kind(), flow.language(), &context)
        .await;
    flow.receive_questions(ticket, questions)?;

    // Answer each question with its first displayed option or a typed answer
    loop {
        let session = flow.session_mut()?;
        let view = session.current_view();
        println!("Q{}/{}: {}", view.index + 1, view.total, view.prompt);

        match view.body {
            QuestionBody::Choice { options, .. } => {
                let pick = options.first().map(|o| o.original_index).unwrap_or(0);
                session.select_option(pick)?;
            }
            QuestionBody::FreeText { .. } => {
                session.submit_text("exchange traded fund")?;
            }
            QuestionBody::Matching { .. } => {
                return Err("demo quiz has no matching questions".into());
            }
        }

        if let Navigation::Completed(answers) = session.advance()? {
            info!(answers = answers.len(), "All questions answered");
            break;
        }
    }

    let request = flow.begin_analysis()?;
    let analysis = content
        .analyze_quiz(&request.questions, &request.answers, request.language)
        .await;
    flow.receive_analysis(request.ticket, analysis)?;

    let snapshot = flow.snapshot();
    println!("\n=== QUIZ RESULT ===");
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    let allocation = target_allocation(12_000.0, Situation::Foundation);
    println!("\n=== BUDGET SPLIT (Foundation) ===");
    println!(
        "Needs: {:.0}  Wants: {:.0}  Savings: {:.0}",
        allocation.needs, allocation.wants, allocation.savings
    );

    info!(requests = scripted.requests().await.len(), "Demo complete");
    Ok(())
}
