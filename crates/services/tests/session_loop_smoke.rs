use std::fs;
use std::path::Path;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use quiz_core::model::{Metrics, QuestionId, QuestionKey, SessionSize};
use quiz_core::time::fixed_now;
use services::session::{InputResult, QuestionView};
use services::{BankFilter, Clock, QuizLoopService, SessionError};
use storage::csv_bank::{self, QuestionBank};
use storage::repository::ProgressRepository;
use storage::{CsvBankWriter, JsonProgressRepository};

const BANK: &str = "section,id,question,options,correct,multi,notas,metrics\n\
SQL,1,Which clause filters groups?,WHERE;HAVING;ORDER BY,2,false,,0;0\n\
SQL,2,Pick all DDL statements,CREATE;SELECT;DROP,1;3,true,,1;1\n\
KQL,1,Operator for filtering rows,where;project;extend,1,false,,0;0\n";

fn setup(dir: &Path) -> (QuestionBank, JsonProgressRepository, QuizLoopService) {
    fs::write(dir.join("dp700_mixed.csv"), BANK).unwrap();
    let bank = csv_bank::load_dir(dir).unwrap();
    let progress = JsonProgressRepository::new(dir.join("progress.json"));
    let service = QuizLoopService::new(
        Clock::fixed(fixed_now()),
        Arc::new(CsvBankWriter::new()),
        Arc::new(progress.clone()),
    )
    .with_size(SessionSize::new(1, 10).unwrap());
    (bank, progress, service)
}

/// Displayed numbers of the correct options, joined the way a respondent types them.
fn correct_input(view: &QuestionView<'_>) -> String {
    let record = view.record;
    let correct: Vec<&str> = record
        .correct()
        .iter()
        .map(|&i| record.options()[i].as_str())
        .collect();
    view.options
        .iter()
        .filter(|(_, text)| correct.contains(text))
        .map(|(n, _)| n.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[test]
fn full_session_writes_metrics_and_progress() {
    let dir = tempfile::tempdir().unwrap();
    let (mut bank, progress, service) = setup(dir.path());
    let mut rng = StdRng::seed_from_u64(17);

    let started = service
        .start_session(&bank, BankFilter::all(), &mut rng)
        .unwrap();
    assert!(!started.fallback);
    let mut session = started.session;

    let completed = loop {
        let input = correct_input(&session.present(&bank, &mut rng).unwrap());
        let result = service.handle_input(&mut session, &mut bank, &input).unwrap();
        assert!(matches!(result, InputResult::Answered { ref feedback, .. } if feedback.was_correct));
        if let Some(completed) = service.advance(&mut session).unwrap().completed {
            break completed;
        }
    };
    assert_eq!(completed.summary.asked(), 3);
    assert_eq!(completed.summary.score(), 100.0);

    let reloaded = csv_bank::load_dir(dir.path()).unwrap();
    let ddl = QuestionKey::new(dir.path().join("dp700_mixed.csv"), "SQL", QuestionId::new(2));
    assert_eq!(reloaded.find(&ddl).unwrap().metrics(), Metrics::new(2, 1));
    assert!(
        reloaded
            .records()
            .iter()
            .all(|r| r.metrics().correct() >= 1)
    );

    let saved = progress.load().unwrap();
    assert_eq!(saved.sessions_started, 1);
    assert_eq!(saved.sessions_completed, 1);
    assert_eq!((saved.quiz.answered, saved.quiz.correct), (3, 3));
    assert!(saved.has_achievement("first_answer"));
}

#[test]
fn note_detour_consumes_no_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let (mut bank, _progress, service) = setup(dir.path());
    let mut rng = StdRng::seed_from_u64(3);

    let mut session = service
        .start_session(&bank, BankFilter::sections(["KQL"]), &mut rng)
        .unwrap()
        .session;
    session.present(&bank, &mut rng).unwrap();

    let result = service.handle_input(&mut session, &mut bank, "N").unwrap();
    assert_eq!(result, InputResult::NoteRequested);
    service
        .add_note(&mut session, &mut bank, "where filters, project selects")
        .unwrap();

    assert!(matches!(
        service.handle_input(&mut session, &mut bank, "abc"),
        Err(SessionError::Answer(_))
    ));
    assert_eq!(session.progress().answered, 0);

    let raw = fs::read_to_string(dir.path().join("dp700_mixed.csv")).unwrap();
    assert!(raw.contains("KQL,1,Operator for filtering rows,where;project;extend,1,false,\"where filters, project selects\",0;0"));
}

#[test]
fn unknown_section_yields_no_session() {
    let dir = tempfile::tempdir().unwrap();
    let (bank, _progress, service) = setup(dir.path());
    let mut rng = StdRng::seed_from_u64(0);

    let err = service
        .start_session(&bank, BankFilter::sections(["Spark"]), &mut rng)
        .unwrap_err();
    assert!(matches!(err, SessionError::Empty));
}
