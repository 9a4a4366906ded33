//! Interactive tutoring session on the terminal

use super::helpers::{load_config, load_knowledge, open_sessions, parse_ids, prompt, GlobalArgs};
use geotutor_core::{
    error::{ErrorKind, Result, TutorError},
    AnswerId, FeedbackCode, KnowledgeStore, Question, SessionEnd, SessionId, SessionStore,
    SharedKnowledge, TheoremId, TriangleId, Tutor, TutorService,
};
use std::sync::Arc;
use tracing::debug;

/// How the question loop ended
enum Stop {
    Finished,
    EndOfInput,
}

pub async fn handle(args: &GlobalArgs, top: usize) -> Result<()> {
    let config = load_config(args)?;
    let (_source, snapshot) = load_knowledge(&config).await?;
    if snapshot.active_questions().is_empty() {
        return Err(TutorError::NotFound(
            "no active questions; run `geotutor import` first".to_string(),
        ));
    }

    let tutor = Tutor::from_config(SharedKnowledge::new(snapshot), &config);
    let store: Arc<dyn SessionStore> = Arc::new(open_sessions(&config).await?);
    let service = TutorService::new(tutor, store);

    let id = service.start_session().await;
    debug!("Interactive session {}", id);
    let mut question = Some(service.first_question(id).await?);

    loop {
        if let Stop::EndOfInput = ask_questions(&service, id, question.take(), top).await? {
            service.abandon(id).await?;
            println!("\nSession abandoned.");
            return Ok(());
        }

        match finish(&service, id).await? {
            Some(SessionEnd::Resume) => {
                question = Some(service.next_question(id).await?);
            }
            Some(SessionEnd::Closed(log)) => {
                println!("Session saved ({} answers).", log.len());
                return Ok(());
            }
            Some(SessionEnd::Abandoned) | None => {
                println!("Session discarded.");
                return Ok(());
            }
        }
    }
}

async fn ask_questions(
    service: &TutorService,
    id: SessionId,
    mut question: Option<Question>,
    top: usize,
) -> Result<Stop> {
    let knowledge = service.tutor().knowledge().snapshot();

    while let Some(current) = question.take() {
        println!("\nQuestion {}: {}", current.id, current.text);
        for option in knowledge.answer_options() {
            println!("  [{}] {}", option.id, option.label);
        }

        let Some(input) = prompt("Answer (q to finish): ")? else {
            return Ok(Stop::EndOfInput);
        };
        if input.eq_ignore_ascii_case("q") {
            return Ok(Stop::Finished);
        }
        let Ok(answer) = input.parse::<u32>() else {
            println!("Please enter an answer number.");
            question = Some(current);
            continue;
        };

        match service.submit_answer(id, current.id, AnswerId(answer)).await {
            Ok(outcome) => {
                println!("\nTriangle weights:");
                for category in knowledge.triangle_categories() {
                    let weight = outcome.weights.get(&category.id).copied().unwrap_or(0.0);
                    println!("  {:<12} {:.3}", category.label, weight);
                }
                if !outcome.ranked.is_empty() {
                    println!("Relevant theorems:");
                    for theorem in outcome.ranked.iter().take(top) {
                        println!(
                            "  {:>3}  {:.3}  {}",
                            theorem.theorem_id, theorem.combined_score, theorem.text
                        );
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::InvalidInput || matches!(e, TutorError::NotFound(_)) => {
                println!("{}", e);
                question = Some(current);
                continue;
            }
            Err(e) => return Err(e),
        }

        match service.next_question(id).await {
            Ok(next) => question = Some(next),
            Err(e) if e.is_exhausted() => {
                println!("\nNo more questions.");
            }
            Err(e) => return Err(e),
        }
    }

    Ok(Stop::Finished)
}

/// Ask for feedback and end the session. `None` means input ran out.
async fn finish(service: &TutorService, id: SessionId) -> Result<Option<SessionEnd>> {
    let knowledge = service.tutor().knowledge().snapshot();

    loop {
        println!("\nHow did it go?");
        for code in FeedbackCode::ALL {
            println!("  [{}] {}", code.code(), code.label());
        }
        let Some(input) = prompt("Feedback: ")? else {
            service.abandon(id).await?;
            return Ok(None);
        };
        let Ok(feedback) = input.parse::<u8>() else {
            println!("Please enter a feedback code.");
            continue;
        };

        let mut triangle_types: Vec<TriangleId> = Vec::new();
        let mut helpful: Vec<TheoremId> = Vec::new();
        let mut persist = true;

        if FeedbackCode::try_from(feedback).is_ok_and(|code| code.is_terminal()) {
            let labels: Vec<String> = knowledge
                .triangle_categories()
                .iter()
                .map(|c| format!("{}={}", c.id, c.label))
                .collect();
            let input = prompt(&format!("Triangle types ({}): ", labels.join(", ")))?
                .unwrap_or_default();
            triangle_types = match parse_ids(&input) {
                Ok(ids) => ids,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };

            let input = prompt("Helpful theorem ids: ")?.unwrap_or_default();
            helpful = match parse_ids(&input) {
                Ok(ids) => ids,
                Err(e) => {
                    println!("{}", e);
                    continue;
                }
            };

            let input = prompt("Save this session? [Y/n]: ")?.unwrap_or_default();
            persist = !input.eq_ignore_ascii_case("n");
        }

        match service
            .end_session(id, feedback, triangle_types, helpful, persist)
            .await
        {
            Ok(end) => return Ok(Some(end)),
            Err(e) if e.kind() == ErrorKind::InvalidInput => println!("{}", e),
            Err(e) => return Err(e),
        }
    }
}
