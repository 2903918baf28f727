#![forbid(unsafe_code)]

pub mod bank_report;
pub mod error;
pub mod metrics_service;
pub mod progress_service;
pub mod sessions;
pub mod sql_trainer;

pub use quiz_core::Clock;
pub use sessions as session;

pub use bank_report::{ModuleReport, module_reports};
pub use error::{SessionError, TrainerError};
pub use metrics_service::{MetricsService, OutcomeRecorded, Persistence};
pub use progress_service::ProgressService;
pub use sessions::{BankFilter, QuizLoopService, QuizSession, SessionPlan};
pub use sql_trainer::{FragmentDrill, SqlTrainer, TrainerMode};
