use std::fs;

use quiz_core::model::{CommandCategory, UserProgress};
use storage::repository::{ProgressRepository, StorageError};
use storage::xml_commands::load_commands;
use storage::JsonProgressRepository;

#[test]
fn commands_are_found_recursively_and_bad_files_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let kql = dir.path().join("KQL");
    let nested = dir.path().join("misc").join("deep");
    fs::create_dir_all(&kql).unwrap();
    fs::create_dir_all(&nested).unwrap();

    fs::write(
        kql.join("b_take.xml"),
        "<command><title>Take</title><full>StormEvents | take 10</full></command>",
    )
    .unwrap();
    fs::write(
        nested.join("a_insert.xml"),
        "<command><parts><part><text>INSERT INTO t</text></part><part><text>VALUES (1)</text></part></parts></command>",
    )
    .unwrap();
    fs::write(dir.path().join("broken.xml"), "<command><full>").unwrap();
    fs::write(dir.path().join("readme.md"), "# not a command").unwrap();

    let commands = load_commands(dir.path());
    let ids: Vec<_> = commands.iter().map(|c| c.id()).collect();
    assert_eq!(ids, vec!["b_take", "a_insert"]);

    assert_eq!(commands[0].category(), CommandCategory::Kql);
    assert_eq!(commands[1].category(), CommandCategory::Dml);
    assert_eq!(commands[1].full(), "INSERT INTO t VALUES (1)");
}

#[test]
fn missing_command_directory_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_commands(&dir.path().join("nowhere")).is_empty());
}

#[test]
fn progress_round_trips_as_pretty_json() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonProgressRepository::new(dir.path().join("state").join("progress.json"));

    assert!(matches!(repo.load(), Err(StorageError::NotFound { .. })));

    let mut progress = UserProgress::default();
    progress.sessions_started = 1;
    progress.quiz.answered = 3;
    progress.sql.completed_ids.insert("top_sales".into());
    repo.save(&progress).unwrap();

    let raw = fs::read_to_string(repo.path()).unwrap();
    assert!(raw.contains("\n  \"sessions_started\": 1"));
    assert_eq!(repo.load().unwrap(), progress);
}

#[test]
fn corrupt_progress_is_a_serialization_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.json");
    fs::write(&path, "{ not json").unwrap();

    let repo = JsonProgressRepository::new(&path);
    assert!(matches!(repo.load(), Err(StorageError::Serialization(_))));
}

#[test]
fn progress_save_replaces_the_file_whole() {
    let dir = tempfile::tempdir().unwrap();
    let repo = JsonProgressRepository::new(dir.path().join("progress.json"));

    let mut progress = UserProgress::default();
    for n in 0..20 {
        progress.sql.completed_ids.insert(format!("command_{n}"));
    }
    repo.save(&progress).unwrap();
    repo.save(&UserProgress::default()).unwrap();

    assert_eq!(repo.load().unwrap(), UserProgress::default());
    let entries: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("progress.json")]);
}
