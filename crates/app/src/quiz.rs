use std::error::Error;
use std::io::{BufRead, Write};
use std::sync::Arc;

use log::info;
use rand::Rng;

use quiz_core::model::{Achievement, SelectionPolicy, VerificationPolicy};
use services::session::{InputResult, QuestionView, VerificationOutcome};
use services::{BankFilter, Persistence, QuizLoopService, QuizSession, SessionError};
use storage::csv_bank::{self, QuestionBank};
use storage::repository::StorageError;
use storage::{CsvBankWriter, JsonProgressRepository};

use crate::config::AppConfig;
use crate::prompt::{Prompt, is_exit};

type AppResult<T> = Result<T, Box<dyn Error>>;

pub fn load_bank(config: &AppConfig) -> Result<QuestionBank, StorageError> {
    let bank = csv_bank::load_dir(&config.banks_dir)?;
    let report = bank.report();
    info!(
        "loaded {} questions from {} files ({} files and {} rows skipped)",
        bank.len(),
        report.files,
        report.skipped_files,
        report.skipped_rows
    );
    Ok(bank)
}

fn loop_service(config: &AppConfig) -> QuizLoopService {
    QuizLoopService::new(
        config.clock,
        Arc::new(CsvBankWriter::new()),
        Arc::new(JsonProgressRepository::new(&config.progress_file)),
    )
    .with_mastery(config.mastery)
    .with_verification(config.verification)
    .with_policy(config.policy)
    .with_size(config.size)
}

/// `quiz` subcommand: sessions with the configured filter and policy.
pub fn run<R: BufRead, W: Write, G: Rng + ?Sized>(
    config: &AppConfig,
    prompt: &mut Prompt<R, W>,
    rng: &mut G,
) -> AppResult<()> {
    let mut bank = load_bank(config)?;
    if bank.is_empty() {
        prompt.say(format!("No questions found in {}.", config.banks_dir.display()))?;
        return Ok(());
    }
    run_sessions(config, &mut bank, prompt, rng)
}

/// Menu-driven quiz: pick a section and a mode, then run sessions until the user leaves.
pub fn run_menu<R: BufRead, W: Write, G: Rng + ?Sized>(
    config: &AppConfig,
    prompt: &mut Prompt<R, W>,
    rng: &mut G,
) -> AppResult<()> {
    let mut bank = load_bank(config)?;
    if bank.is_empty() {
        prompt.say(format!("No questions found in {}.", config.banks_dir.display()))?;
        return Ok(());
    }

    loop {
        let sections: Vec<String> = bank.sections().into_iter().map(str::to_owned).collect();
        prompt.say("\n=== Sections ===")?;
        prompt.say("  a) All sections")?;
        for (n, section) in sections.iter().enumerate() {
            prompt.say(format!("  {}) {section}", n + 1))?;
        }
        prompt.say("  r) Reload banks")?;
        prompt.say("  0) Back")?;
        let Some(choice) = prompt.choose("Choose a section: ")? else {
            return Ok(());
        };
        if choice.eq_ignore_ascii_case("r") {
            bank = load_bank(config)?;
            prompt.say(format!(
                "Reloaded {} questions from {}.",
                bank.len(),
                config.banks_dir.display()
            ))?;
            continue;
        }
        let filter = if choice.eq_ignore_ascii_case("a") {
            BankFilter::all()
        } else {
            match choice.parse::<usize>().ok().and_then(|n| sections.get(n.wrapping_sub(1))) {
                Some(section) => BankFilter::sections([section.as_str()]),
                None => {
                    prompt.say("Invalid section.")?;
                    continue;
                }
            }
        };

        prompt.say("\n=== Mode ===")?;
        prompt.say("  1) Normal")?;
        prompt.say("  2) Reinforce mastered questions")?;
        prompt.say("  3) Reinforce unmastered questions")?;
        prompt.say("  4) With verification")?;
        prompt.say("  0) Back")?;
        let Some(mode) = prompt.choose("Choose a mode: ")? else {
            continue;
        };
        let (policy, verify) = match mode.as_str() {
            "1" => (SelectionPolicy::All, false),
            "2" => (SelectionPolicy::MasteredOnly, false),
            "3" => (SelectionPolicy::UnmasteredOnly, false),
            "4" => (SelectionPolicy::All, true),
            _ => {
                prompt.say("Invalid mode.")?;
                continue;
            }
        };
        let verify = verify
            || config.verification.is_enabled()
            || prompt.confirm("Ask verification questions to confirm understanding?")?;

        let mut chosen = config.clone();
        chosen.filter = filter;
        chosen.policy = policy;
        chosen.verification = if verify {
            VerificationPolicy::full()
        } else {
            VerificationPolicy::disabled()
        };
        run_sessions(&chosen, &mut bank, prompt, rng)?;
    }
}

fn run_sessions<R: BufRead, W: Write, G: Rng + ?Sized>(
    config: &AppConfig,
    bank: &mut QuestionBank,
    prompt: &mut Prompt<R, W>,
    rng: &mut G,
) -> AppResult<()> {
    let service = loop_service(config);
    loop {
        let started = match service.start_session(bank, config.filter.clone(), rng) {
            Ok(started) => started,
            Err(SessionError::Empty) => {
                prompt.say("No questions match this selection.")?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        prompt.say(format!("\n=== Session ({} questions) ===", started.session.progress().total))?;
        if started.fallback {
            prompt.say(format!(
                "No questions match the {} filter; selecting from all questions.",
                config.policy
            ))?;
        }
        announce(prompt, &started.unlocked)?;

        let mut session = started.session;
        if !run_session(&service, &mut session, bank, prompt, rng)? {
            return Ok(());
        }
        if !prompt.confirm("\nContinue with more questions in this mode?")? {
            return Ok(());
        }
    }
}

/// Returns `false` when the respondent quits before the end.
fn run_session<R: BufRead, W: Write, G: Rng + ?Sized>(
    service: &QuizLoopService,
    session: &mut QuizSession,
    bank: &mut QuestionBank,
    prompt: &mut Prompt<R, W>,
    rng: &mut G,
) -> AppResult<bool> {
    loop {
        show_question(prompt, &session.present(bank, rng)?)?;

        let (feedback, unlocked) = loop {
            let Some(raw) = prompt.ask("Answer (option numbers, N for a note, q to quit): ")? else {
                return Ok(false);
            };
            if is_exit(&raw) {
                return Ok(false);
            }
            match service.handle_input(session, bank, &raw) {
                Ok(InputResult::NoteRequested) => {
                    take_note(service, session, bank, prompt)?;
                    show_question(prompt, &session.present(bank, rng)?)?;
                }
                Ok(InputResult::Answered { feedback, unlocked }) => break (feedback, unlocked),
                Err(SessionError::Answer(e)) => prompt.say(format!("Invalid answer: {e}"))?,
                Err(e) => return Err(e.into()),
            }
        };

        if feedback.was_correct {
            prompt.say("✔ Correct\n")?;
        } else {
            prompt.say("✘ Incorrect")?;
            let answer: Vec<String> = feedback
                .correct_options
                .iter()
                .map(|(n, text)| format!("{n}) {text}"))
                .collect();
            prompt.say(format!("Correct answer: {}\n", answer.join(", ")))?;
        }
        if let Persistence::Skipped(reason) = &feedback.outcome.persistence {
            prompt.say(format!("(metrics kept for this run only: {reason})"))?;
        }
        announce(prompt, &unlocked)?;

        if feedback.was_correct {
            verify(service, session, bank, prompt, rng)?;
        } else if prompt.confirm("Add a note?")? {
            take_note(service, session, bank, prompt)?;
        }

        if let Some(done) = service.advance(session)?.completed {
            prompt.say(format!(
                "\nSession score: {:.2}/100 ({} of {} correct)",
                done.summary.score(),
                done.summary.correct(),
                done.summary.asked()
            ))?;
            announce(prompt, &done.unlocked)?;
            return Ok(true);
        }
    }
}

fn show_question<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    view: &QuestionView<'_>,
) -> AppResult<()> {
    let record = view.record;
    prompt.say(format!(
        "\n[{} #{}] Question {}/{}",
        record.section(),
        record.id(),
        view.position,
        view.total
    ))?;
    prompt.say(format!("{}\n", record.prompt()))?;
    for (n, text) in &view.options {
        prompt.say(format!("  {n}) {text}"))?;
    }
    prompt.say(if record.is_multi() {
        "\n(Select every correct option, separated by commas)"
    } else {
        "\n(Select a single option)"
    })?;
    Ok(())
}

fn take_note<R: BufRead, W: Write>(
    service: &QuizLoopService,
    session: &mut QuizSession,
    bank: &mut QuestionBank,
    prompt: &mut Prompt<R, W>,
) -> AppResult<()> {
    let Some(note) = prompt.ask("Write your note: ")? else {
        return Ok(());
    };
    match service.add_note(session, bank, &note)? {
        Some(Persistence::Saved) => prompt.say("Note saved.")?,
        Some(Persistence::Skipped(reason)) => {
            prompt.say(format!("Note kept for this run only: {reason}"))?;
        }
        None => prompt.say("Empty note ignored.")?,
    }
    Ok(())
}

fn verify<R: BufRead, W: Write, G: Rng + ?Sized>(
    service: &QuizLoopService,
    session: &mut QuizSession,
    bank: &QuestionBank,
    prompt: &mut Prompt<R, W>,
    rng: &mut G,
) -> AppResult<()> {
    let Some(check) = service.begin_verification(session, bank, rng)? else {
        return Ok(());
    };
    prompt.say(format!("\nVerification question: {}\n", check.prompt))?;
    for (n, text) in &check.options {
        prompt.say(format!("  {n}) {text}"))?;
    }
    prompt.say("\n(Select a single option)")?;
    let raw = prompt.ask("Your answer: ")?.unwrap_or_default();

    match session.answer_verification(bank, &raw)? {
        VerificationOutcome::Passed => prompt.say("✔ Excellent! Your understanding is solid.\n")?,
        VerificationOutcome::Failed { explanation } => {
            prompt.say("✘ Incorrect answer.")?;
            if let Some(explanation) = explanation {
                prompt.say(format!("Explanation: {explanation}"))?;
            }
        }
        VerificationOutcome::Invalid => prompt.say("Invalid option.\n")?,
    }
    Ok(())
}

pub fn announce<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    unlocked: &[Achievement],
) -> AppResult<()> {
    for achievement in unlocked {
        prompt.say(format!(
            "Achievement unlocked: {} - {}",
            achievement.title, achievement.description
        ))?;
    }
    Ok(())
}
