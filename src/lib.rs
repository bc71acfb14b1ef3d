pub mod adapters;
pub mod config;
pub mod console;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{FlatFileStore, MemoryStore, SystemClock};
pub use config::AppConfig;
pub use console::Console;
pub use crate::core::{Command, Outcome, Session, SubmitOutcome, SystemSettings, UniversitySystem};
pub use utils::error::{RecordsError, Result};
