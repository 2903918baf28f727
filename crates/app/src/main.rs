use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use env_logger::Env;

use quiz_core::MasteryPreset;
use quiz_core::model::{SelectionPolicy, SessionSize};
use services::TrainerMode;

mod config;
mod prompt;
mod quiz;
mod report;
mod sql;

use config::AppConfig;
use prompt::Prompt;
use sql::SqlOptions;

/// Study toolkit for the DP-700 exam: quizzes, SQL drills and progress.
#[derive(Parser, Debug)]
#[command(name = "dp700-prep", version, about)]
struct Cli {
    /// Directory holding the CSV question banks.
    #[arg(long, global = true, env = "PREP_BANK_DIR", default_value = "banks")]
    banks: PathBuf,

    /// Directory tree holding the XML command files.
    #[arg(long, global = true, env = "PREP_COMMANDS_DIR", default_value = "commands")]
    commands: PathBuf,

    /// Progress file; created on first save.
    #[arg(long, global = true, env = "PREP_PROGRESS_FILE", default_value = "progress.json")]
    progress: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run quiz sessions over the question banks.
    Quiz(QuizArgs),
    /// Practise SQL commands.
    Sql(SqlArgs),
    /// Show per-module study metrics.
    Report {
        #[arg(long, default_value = "console")]
        mastery: MasteryPreset,
    },
    /// Show saved progress and achievements.
    Progress,
}

#[derive(Args, Debug)]
struct QuizArgs {
    /// Restrict to these sections (repeatable).
    #[arg(long = "section")]
    sections: Vec<String>,

    /// all, mastered or unmastered.
    #[arg(long, default_value = "all")]
    policy: SelectionPolicy,

    #[arg(long, default_value_t = SessionSize::DEFAULT_MIN)]
    min: usize,

    #[arg(long, default_value_t = SessionSize::DEFAULT_MAX)]
    max: usize,

    /// Follow correct answers with verification questions.
    #[arg(long)]
    verify: bool,

    /// Mastery thresholds: console or platform.
    #[arg(long, default_value = "console")]
    mastery: MasteryPreset,
}

#[derive(Args, Debug)]
struct SqlArgs {
    /// Show hints after a wrong answer (default).
    #[arg(long, conflicts_with = "free")]
    guided: bool,

    /// Only report the attempt number after a wrong answer.
    #[arg(long)]
    free: bool,

    /// Type each command fragment by fragment.
    #[arg(long)]
    fragments: bool,

    #[arg(long)]
    shuffle: bool,
}

impl SqlArgs {
    fn options(&self) -> SqlOptions {
        SqlOptions {
            mode: if self.free {
                TrainerMode::Free
            } else {
                TrainerMode::Guided
            },
            fragments: self.fragments,
            shuffle: self.shuffle,
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = AppConfig::new(cli.banks, cli.commands, cli.progress);

    let stdin = io::stdin();
    let mut prompt = Prompt::new(stdin.lock(), io::stdout().lock());
    let mut rng = rand::rng();

    match cli.command {
        Some(Command::Quiz(args)) => {
            let config = config
                .with_mastery(args.mastery)
                .with_session(args.policy, args.min, args.max, args.verify)?
                .with_sections(&args.sections);
            quiz::run(&config, &mut prompt, &mut rng)
        }
        Some(Command::Sql(args)) => sql::run(&config, args.options(), &mut prompt, &mut rng),
        Some(Command::Report { mastery }) => report::report(&config.with_mastery(mastery), &mut prompt),
        Some(Command::Progress) => report::progress(&config, &mut prompt),
        None => main_menu(&config, &mut prompt, &mut rng),
    }
}

fn main_menu<R: io::BufRead, W: io::Write>(
    config: &AppConfig,
    prompt: &mut Prompt<R, W>,
    rng: &mut rand::rngs::ThreadRng,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        prompt.say("\n=== DP-700 prep ===")?;
        prompt.say("1. Quiz")?;
        prompt.say("2. SQL trainer")?;
        prompt.say("3. Study metrics")?;
        prompt.say("4. Progress")?;
        prompt.say("0. Exit")?;
        let Some(choice) = prompt.choose("Choose an option: ")? else {
            return Ok(());
        };
        match choice.as_str() {
            "1" => quiz::run_menu(config, prompt, rng)?,
            "2" => sql::run(config, SqlOptions::default(), prompt, rng)?,
            "3" => report::report(config, prompt)?,
            "4" => report::progress(config, prompt)?,
            other => prompt.say(format!("Unknown option {other:?}."))?,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();
    if let Err(err) = run() {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
