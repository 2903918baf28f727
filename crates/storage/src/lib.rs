#![forbid(unsafe_code)]

mod atomic;
pub mod csv_bank;
pub mod progress_json;
pub mod repository;
pub mod xml_commands;

pub use csv_bank::{CsvBankWriter, QuestionBank};
pub use progress_json::JsonProgressRepository;
pub use repository::{BankWriter, InMemoryRepository, ProgressRepository, StorageError};
