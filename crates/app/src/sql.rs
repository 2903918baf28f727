use std::error::Error;
use std::io::{BufRead, Write};
use std::sync::Arc;

use rand::Rng;
use rand::seq::SliceRandom;

use quiz_core::model::SqlCommand;
use services::sql_trainer::{FragmentOutcome, SubmitFeedback};
use services::{FragmentDrill, ProgressService, SqlTrainer, TrainerError, TrainerMode};
use storage::JsonProgressRepository;
use storage::xml_commands::load_commands;

use crate::config::AppConfig;
use crate::prompt::{Prompt, is_exit};
use crate::quiz::announce;

type AppResult<T> = Result<T, Box<dyn Error>>;

/// How the `sql` subcommand runs its exercises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SqlOptions {
    pub mode: TrainerMode,
    /// Type each command fragment by fragment instead of in one go.
    pub fragments: bool,
    pub shuffle: bool,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            mode: TrainerMode::Guided,
            fragments: false,
            shuffle: false,
        }
    }
}

enum Step {
    Next,
    Quit,
}

pub fn run<R: BufRead, W: Write, G: Rng + ?Sized>(
    config: &AppConfig,
    options: SqlOptions,
    prompt: &mut Prompt<R, W>,
    rng: &mut G,
) -> AppResult<()> {
    let mut commands = load_commands(&config.commands_dir);
    if options.shuffle {
        commands.shuffle(rng);
    }
    let progress = ProgressService::new(
        config.clock,
        Arc::new(JsonProgressRepository::new(&config.progress_file)),
    );
    let mut trainer = match SqlTrainer::new(config.clock, progress.clone(), commands, options.mode) {
        Ok(trainer) => trainer,
        Err(TrainerError::NoCommands) => {
            prompt.say(format!(
                "No SQL commands found in {}.",
                config.commands_dir.display()
            ))?;
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let started_at = config.clock.now();
    announce(prompt, &progress.start_session())?;
    prompt.say(format!(
        "=== SQL trainer: {} commands, {} mode ===",
        trainer.len(),
        trainer.mode()
    ))?;
    prompt.say("Commands: :hint  :solution  :mode  :skip  q")?;

    while let Some(command) = trainer.current().cloned() {
        show_command(prompt, &command, trainer.position() + 1, trainer.len())?;
        let step = if options.fragments {
            drill_command(&mut trainer, prompt)?
        } else {
            free_text_command(&mut trainer, &command, prompt)?
        };
        if matches!(step, Step::Quit) {
            break;
        }
        trainer.next_command();
    }
    trainer.finish();

    let minutes = config.clock.seconds_since(started_at) / 60.0;
    announce(prompt, &progress.add_study_time(minutes))?;
    let snapshot = progress.snapshot();
    prompt.say(format!(
        "\nSession finished. Commands completed overall: {} (accuracy {:.1}%)",
        snapshot.sql.completed,
        snapshot.sql_accuracy()
    ))?;
    Ok(())
}

fn show_command<R: BufRead, W: Write>(
    prompt: &mut Prompt<R, W>,
    command: &SqlCommand,
    position: usize,
    total: usize,
) -> AppResult<()> {
    prompt.say(format!(
        "\n[{position}/{total}] {} ({})",
        command.title(),
        command.category()
    ))?;
    if !command.description().is_empty() {
        prompt.say(command.description())?;
    }
    Ok(())
}

fn free_text_command<R: BufRead, W: Write>(
    trainer: &mut SqlTrainer,
    command: &SqlCommand,
    prompt: &mut Prompt<R, W>,
) -> AppResult<Step> {
    loop {
        let Some(answer) = prompt.ask("SQL> ")? else {
            return Ok(Step::Quit);
        };
        match answer.as_str() {
            a if is_exit(a) => return Ok(Step::Quit),
            "" => continue,
            ":skip" => return Ok(Step::Next),
            ":solution" => {
                prompt.say(format!("Solution: {}", command.full()))?;
                continue;
            }
            ":hint" => {
                for (n, part) in command.parts().iter().enumerate() {
                    prompt.say(format!("  {}. {}", n + 1, part.desc))?;
                }
                continue;
            }
            ":mode" => {
                trainer.set_mode(trainer.mode().toggled());
                prompt.say(format!("Mode: {}", trainer.mode()))?;
                continue;
            }
            _ => {}
        }

        match trainer.submit(&answer)? {
            SubmitFeedback::Solved {
                attempts,
                elapsed_seconds,
                unlocked,
            } => {
                prompt.say(format!(
                    "✔ CORRECT! Completed in {} with {attempts} attempt(s)",
                    format_elapsed(elapsed_seconds)
                ))?;
                announce(prompt, &unlocked)?;
                return Ok(Step::Next);
            }
            SubmitFeedback::Miss { attempt } => {
                prompt.say(format!("✘ Attempt {attempt}: incorrect command. Check the syntax."))?;
            }
            SubmitFeedback::Hint {
                attempt,
                outcome,
                words,
            } => {
                prompt.say(format!("✘ Attempt {attempt}: {outcome}"))?;
                prompt.say(format!("  {words}"))?;
            }
        }
    }
}

fn drill_command<R: BufRead, W: Write>(
    trainer: &mut SqlTrainer,
    prompt: &mut Prompt<R, W>,
) -> AppResult<Step> {
    let mut drill = match trainer.fragment_drill() {
        Ok(drill) => drill,
        Err(TrainerError::NoFragments(id)) => {
            prompt.say(format!("Command {id} has no fragments; skipping."))?;
            return Ok(Step::Next);
        }
        Err(e) => return Err(e.into()),
    };

    while let Some(part) = drill.current().cloned() {
        prompt.say(format!(
            "Parts: [{}] {}/{}  Hint: {}",
            typed_so_far(&drill),
            drill.position(),
            drill.len(),
            part.desc
        ))?;
        let Some(input) = prompt.ask("> ")? else {
            return Ok(Step::Quit);
        };
        if is_exit(&input) {
            return Ok(Step::Quit);
        }
        if input == ":skip" {
            return Ok(Step::Next);
        }
        match drill.type_fragment(&input)? {
            FragmentOutcome::Accepted => prompt.say("Correct. Next part.")?,
            FragmentOutcome::Completed => {
                prompt.say("Command completed.")?;
            }
            FragmentOutcome::Rejected { errors } => prompt.say(format!(
                "Incorrect. Try again. Errors: {errors}/{}",
                services::sql_trainer::MAX_FRAGMENT_ERRORS
            ))?,
            FragmentOutcome::Reset => prompt.say("Too many errors. The command starts over.")?,
        }
    }

    let unlocked = trainer.complete_drill(&drill)?;
    announce(prompt, &unlocked)?;
    Ok(Step::Next)
}

fn typed_so_far(drill: &FragmentDrill) -> String {
    drill
        .completed()
        .iter()
        .map(|p| p.text.trim())
        .collect::<Vec<_>>()
        .join(" ")
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn format_elapsed(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let (minutes, seconds) = (total / 60, total % 60);
    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}
