use std::error::Error;
use std::io::{BufRead, Write};
use std::sync::Arc;

use services::{ModuleReport, ProgressService, module_reports};
use storage::JsonProgressRepository;

use crate::config::AppConfig;
use crate::prompt::Prompt;
use crate::quiz::load_bank;

type AppResult<T> = Result<T, Box<dyn Error>>;

/// Per-file study metrics for every loaded bank.
pub fn report<R: BufRead, W: Write>(config: &AppConfig, prompt: &mut Prompt<R, W>) -> AppResult<()> {
    let bank = load_bank(config)?;
    let reports = module_reports(&bank, &config.mastery);
    if reports.is_empty() {
        prompt.say(format!("No questions found in {}.", config.banks_dir.display()))?;
        return Ok(());
    }

    prompt.say("=== Study metrics ===")?;
    for module in &reports {
        show_module(prompt, module)?;
    }
    Ok(())
}

fn show_module<R: BufRead, W: Write>(prompt: &mut Prompt<R, W>, module: &ModuleReport) -> AppResult<()> {
    prompt.say(format!("\nModule: {}", module.module))?;
    prompt.say(format!("  Total questions: {}", module.total_questions))?;
    prompt.say(format!("  Questions studied: {}", module.studied))?;
    prompt.say(format!("  Study progress: {:.2}%", module.study_progress()))?;
    prompt.say(format!("  Total attempts: {}", module.attempts))?;
    prompt.say(format!("  Correct answers: {}", module.correct))?;
    prompt.say(format!("  Overall performance: {:.2}%", module.performance()))?;
    let m = &module.mastery;
    prompt.say(format!(
        "  Mastery: {} new, {} learning, {} mastered",
        m.new, m.learning, m.mastered
    ))?;
    Ok(())
}

/// Summary of the saved progress file.
pub fn progress<R: BufRead, W: Write>(config: &AppConfig, prompt: &mut Prompt<R, W>) -> AppResult<()> {
    let service = ProgressService::new(
        config.clock,
        Arc::new(JsonProgressRepository::new(&config.progress_file)),
    );
    let p = service.snapshot();

    prompt.say("=== Progress ===")?;
    prompt.say(format!(
        "Sessions: {} started, {} completed, {:.1} minutes studied",
        p.sessions_started, p.sessions_completed, p.study_minutes
    ))?;
    prompt.say(format!(
        "Quiz: {}/{} correct ({:.1}%), streak {} (best {})",
        p.quiz.correct,
        p.quiz.answered,
        p.quiz_accuracy(),
        p.quiz.current_streak,
        p.quiz.best_streak
    ))?;
    prompt.say(format!(
        "SQL: {} commands completed, {} attempts, {:.1}% accuracy, streak {} (best {})",
        p.sql.completed,
        p.sql.attempts,
        p.sql_accuracy(),
        p.sql.current_streak,
        p.sql.best_streak
    ))?;
    if let Some(fastest) = p.sql.fastest_seconds {
        prompt.say(format!("Fastest command: {fastest:.1}s"))?;
    }
    match p.study_days.last_study_date {
        Some(last) => prompt.say(format!(
            "Study days: streak {} (best {}), last {last}",
            p.study_days.current_streak, p.study_days.best_streak
        ))?,
        None => prompt.say("Study days: none yet")?,
    }

    if p.achievements.is_empty() {
        prompt.say("Achievements: none yet")?;
    } else {
        prompt.say(format!("Achievements ({}):", p.achievements.len()))?;
        for a in &p.achievements {
            prompt.say(format!(
                "  {} - {} ({})",
                a.title,
                a.description,
                a.unlocked_at.format("%Y-%m-%d")
            ))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;

    use super::*;
    use quiz_core::time::fixed_clock;

    fn config(dir: &std::path::Path) -> AppConfig {
        AppConfig::new(dir.join("banks"), dir.join("commands"), dir.join("progress.json"))
            .with_clock(fixed_clock())
    }

    fn output(prompt: Prompt<Cursor<&str>, Vec<u8>>) -> String {
        String::from_utf8(prompt.into_output()).unwrap()
    }

    #[test]
    fn report_lists_each_module() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        fs::create_dir_all(&config.banks_dir).unwrap();
        fs::write(
            config.banks_dir.join("dp700_spark.csv"),
            "section,id,question,options,correct,multi,notas,metrics\n\
             Spark,1,Lazy?,yes;no,1,false,,9;1\n\
             Spark,2,Action?,count;map,1,false,,1;4\n",
        )
        .unwrap();

        let mut prompt = Prompt::new(Cursor::new(""), Vec::new());
        report(&config, &mut prompt).unwrap();
        let out = output(prompt);
        assert!(out.contains("Module: dp700_spark"));
        assert!(out.contains("Questions studied: 1"));
        assert!(out.contains("Study progress: 50.00%"));
        assert!(out.contains("Overall performance: 66.67%"));
    }

    #[test]
    fn progress_without_a_file_shows_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut prompt = Prompt::new(Cursor::new(""), Vec::new());
        progress(&config(dir.path()), &mut prompt).unwrap();
        let out = output(prompt);
        assert!(out.contains("Sessions: 0 started, 0 completed"));
        assert!(out.contains("Achievements: none yet"));
        assert!(!dir.path().join("progress.json").exists());
    }
}
