#![forbid(unsafe_code)]

pub mod error;
pub mod mastery;
pub mod model;
pub mod time;

pub use error::Error;
pub use mastery::{MasteryLevel, MasteryPolicy, MasteryPreset, classify};
pub use time::Clock;
