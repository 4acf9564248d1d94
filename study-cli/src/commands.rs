//! Subcommand handlers.

use anyhow::{bail, Context, Result};
use shared::exam::ExamType;
use shared::models::SummaryVariant;
use shared::{
    BaseQuizSource, Deck, ExamAction, ExamConfig, ExamPhase, FlashcardAction, SessionAction,
    StudyApp, Tab, UltraGeneration, UltraKind,
};

use crate::cli::{Command, CreditsCommand, ExamCommand, HistoryCommand};
use crate::render;

pub async fn run(app: &mut StudyApp, command: Command) -> Result<()> {
    match command {
        Command::Process(args) => {
            app.upload_document(&args.file, args.target_language)
                .await
                .with_context(|| format!("processing {}", args.file.display()))?;
            print_status(app);
        }
        Command::Status => print_status(app),
        Command::Summary { variant } => {
            let variant = SummaryVariant::from(variant);
            app.dispatch(SessionAction::TabSelected(match variant {
                SummaryVariant::Ultra => Tab::UltraSummary,
                _ => Tab::Summary,
            }));
            let results = require_results(app)?;
            match variant.text(results) {
                Some(text) => println!("{}", text),
                None if variant == SummaryVariant::Ultra => {
                    println!("No ultra summary yet. Run `study ultra summary` to generate one.")
                }
                None => println!("This summary is empty."),
            }
        }
        Command::Map { ultra } => {
            app.dispatch(SessionAction::TabSelected(if ultra { Tab::UltraMap } else { Tab::ConceptMap }));
            let results = require_results(app)?;
            match (ultra, &results.mappa_ultra) {
                (false, _) => render::print_map(&results.mappa_concettuale),
                (true, Some(nodes)) => render::print_map(nodes),
                (true, None) => println!("No ultra map yet. Run `study ultra maps` to generate one."),
            }
        }
        Command::Flashcards { ultra } => browse_flashcards(app, ultra)?,
        Command::Exam(exam) => run_exam_command(app, exam).await?,
        Command::Plan { days } => {
            require_results(app)?;
            app.dispatch(SessionAction::TabSelected(Tab::StudyGuide));
            app.dispatch(SessionAction::DaysInputChanged(days));
            let plan = app.generate_study_plan().await?;
            println!("{}", plan);
        }
        Command::Questions { price } => {
            if app.user().is_none() {
                bail!("Sign in (STUDY_AUTH_TOKEN) to generate probable questions");
            }
            let cost = app.refresh_question_cost(false).await?;
            if price {
                println!("Probable questions: {}", render::question_price(cost));
                return Ok(());
            }
            require_results(app)?;
            app.dispatch(SessionAction::TabSelected(Tab::StudyGuide));
            let questions = app.generate_probable_questions().await?;
            for (i, question) in questions.iter().enumerate() {
                println!("{}. {}", i + 1, question);
            }
            println!();
            println!("Next time: {}", render::question_price(app.question_cost()));
        }
        Command::Tts { variant, out } => {
            let audio = app.synthesize_audio(variant.into()).await?;
            tokio::fs::write(&out, &audio.mp3)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            if audio.truncated {
                println!("The summary was too long and has been truncated.");
            }
            println!("Wrote {} ({} bytes)", out.display(), audio.mp3.len());
        }
        Command::Ultra { kind, yes } => run_ultra(app, kind.into(), yes).await?,
        Command::History(HistoryCommand::List) => {
            let entries = app.history().await?;
            render::print_history(&entries);
        }
        Command::History(HistoryCommand::Load { session_id }) => {
            app.load_history_entry(&session_id).await?;
            print_status(app);
        }
        Command::Download { variant, out } => {
            let bytes = app.download_summary(variant.into()).await?;
            tokio::fs::write(&out, &bytes)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {} ({} bytes)", out.display(), bytes.len());
        }
        Command::Claim { token } => {
            let balance = app.claim_magic_link(&token).await?;
            println!("Link redeemed. Credits: {}", balance);
        }
        Command::Credits(CreditsCommand::Add { amount, reason }) => {
            let balance = app.add_credits(amount, reason.as_deref()).await?;
            println!("Credits: {}", balance);
        }
    }
    Ok(())
}

fn require_results(app: &StudyApp) -> Result<&shared::StudyResults> {
    app.state()
        .results()
        .context("No active session. Run `study process <FILE>` first.")
}

fn print_status(app: &StudyApp) {
    let state = app.state();
    match &state.session {
        Some(session) => {
            println!("Document:   {}", session.file_name);
            println!("Session:    {}", session.session_id);
            println!("Flashcards: {}", session.results.flashcard.len());
            println!("Quiz:       {} questions", session.results.quiz.len());
            for kind in [UltraKind::Summary, UltraKind::Flashcards, UltraKind::Maps] {
                let status = if session.results.has_ultra(kind) { "ready" } else { "not generated" };
                println!("{:<11} {}", format!("{}:", kind.label()), status);
            }
        }
        None => println!("No active session."),
    }

    match app.credits().current() {
        Some(credits) => println!("Credits:    {}", credits),
        None => println!("Credits:    unknown"),
    }
    if let Some(progress) = &state.ultra_progress {
        render::print_progress(progress);
    }
    if let Some(error) = &state.ultra_error {
        println!("Last ultra generation failed: {}", error);
    }
}

fn browse_flashcards(app: &mut StudyApp, ultra: bool) -> Result<()> {
    let results = require_results(app)?;
    if ultra && results.flashcard_ultra.is_none() {
        println!("No ultra flashcards yet. Run `study ultra flashcards` to generate them.");
        return Ok(());
    }

    let deck = if ultra { Deck::Ultra } else { Deck::Standard };
    app.dispatch(SessionAction::TabSelected(Tab::Flashcards));
    if app.state().flashcards.deck != deck {
        app.dispatch(SessionAction::Flashcards(FlashcardAction::SelectDeck(deck)));
    }

    loop {
        let state = app.state();
        let cards = state.flashcards();
        if cards.is_empty() {
            println!("This deck is empty.");
            return Ok(());
        }

        let face = if state.flashcards.show_back { "back" } else { "front" };
        println!();
        println!("[{}] ({})", state.flashcards.position_label(cards.len()), face);
        println!("{}", state.flashcards.visible(cards).unwrap_or_default());

        let Some(input) = render::prompt("[f]lip [n]ext [p]revious [q]uit >")? else {
            return Ok(());
        };
        let action = match input.as_str() {
            "f" | "" => FlashcardAction::Flip,
            "n" => FlashcardAction::Next,
            "p" => FlashcardAction::Previous,
            "q" => return Ok(()),
            _ => continue,
        };
        app.dispatch(SessionAction::Flashcards(action));
    }
}

async fn run_exam_command(app: &mut StudyApp, command: ExamCommand) -> Result<()> {
    require_results(app)?;
    app.dispatch(SessionAction::TabSelected(Tab::Exam));

    match command {
        ExamCommand::Base => {
            app.dispatch(SessionAction::TabSelected(Tab::Quiz));
            if app.start_base_quiz().await? == BaseQuizSource::Fallback {
                println!("Using the built-in practice quiz.");
            }
        }
        ExamCommand::Custom {
            questions,
            difficulty,
            exam_type,
        } => {
            let config = ExamConfig {
                num_questions: questions,
                difficulty: difficulty.into(),
                exam_type: exam_type.into(),
            };
            let count = app.generate_custom_exam(config).await?;
            println!("Exam ready: {} questions.", count);
            if config.exam_type != ExamType::MultipleChoice {
                println!("Open answers are not scored automatically.");
            }
        }
        ExamCommand::Resume => {}
        ExamCommand::Restart => app.dispatch(SessionAction::Exam(ExamAction::Restart)),
        ExamCommand::Reset => {
            app.dispatch(SessionAction::Exam(ExamAction::Reset));
            println!("Exam discarded.");
            return Ok(());
        }
    }

    take_exam(app)
}

fn take_exam(app: &mut StudyApp) -> Result<()> {
    loop {
        let exam = &app.state().exam;
        match exam.phase() {
            ExamPhase::Configuration => {
                println!("No exam in progress. Run `study exam base` or `study exam custom`.");
                return Ok(());
            }
            ExamPhase::Completed { score, total } => {
                println!();
                println!("Score: {} / {}", score, total);
                println!("Run `study exam restart` to try again or `study exam reset` for a new one.");
                return Ok(());
            }
            ExamPhase::InProgress { .. } => {}
        }

        let Some(question) = exam.current().cloned() else {
            return Ok(());
        };
        render::print_question(exam, &question);

        let label = if exam.show_explanation {
            "[n]ext [p]revious [f]inish [q]uit >"
        } else if question.is_multiple_choice() {
            "answer number, [p]revious [f]inish [q]uit >"
        } else {
            "your answer, or :p :f :q >"
        };
        let Some(input) = render::prompt(label)? else {
            return Ok(());
        };

        let actions = if exam.show_explanation || question.is_multiple_choice() {
            match input.as_str() {
                "n" | "" if exam.show_explanation => vec![ExamAction::Next],
                "p" => vec![ExamAction::Previous],
                "f" => vec![ExamAction::Finish],
                "q" => return Ok(()),
                choice => match choice.parse::<usize>() {
                    Ok(n) if n >= 1 && n <= question.options.len() => {
                        vec![ExamAction::SelectOption(n - 1)]
                    }
                    _ => continue,
                },
            }
        } else {
            match input.as_str() {
                ":p" => vec![ExamAction::Previous],
                ":f" => vec![ExamAction::Finish],
                ":q" => return Ok(()),
                "" => continue,
                text => vec![
                    ExamAction::EditOpenAnswer(text.to_string()),
                    ExamAction::SubmitOpenAnswer,
                ],
            }
        };

        for action in actions {
            app.dispatch(SessionAction::Exam(action));
        }
    }
}

async fn run_ultra(app: &mut StudyApp, kind: UltraKind, yes: bool) -> Result<()> {
    require_results(app)?;
    app.dispatch(SessionAction::TabSelected(match kind {
        UltraKind::Summary => Tab::UltraSummary,
        UltraKind::Flashcards => Tab::Flashcards,
        UltraKind::Maps => Tab::UltraMap,
    }));

    let outcome = app
        .generate_ultra(
            kind,
            |quote| {
                if yes {
                    return true;
                }
                let balance = quote
                    .balance
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                render::confirm(&format!(
                    "Generating the {} needs at least {} credits (you have {}). Continue?",
                    quote.kind.label(),
                    quote.cost,
                    balance
                ))
            },
            |progress| render::print_progress(&progress),
        )
        .await?;

    match outcome {
        UltraGeneration::AlreadyAvailable => println!("The {} is already available.", kind.label()),
        UltraGeneration::Declined => println!("Nothing was generated."),
        UltraGeneration::Completed { .. } => {
            println!("The {} is ready.", kind.label());
            if let Some(credits) = app.credits().current() {
                println!("Credits: {}", credits);
            }
        }
    }
    Ok(())
}
