pub mod command;
pub mod summary;
pub mod university;

pub use crate::core::command::{Command, Outcome, Session};
pub use crate::core::university::{SubmitOutcome, SystemSettings, TakeoverSummary, UniversitySystem};
pub use crate::domain::ports::{Clock, GradeObserver, Store};
pub use crate::utils::error::Result;
