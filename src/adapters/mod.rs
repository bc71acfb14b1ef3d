// Adapters layer: concrete implementations of the domain ports (storage, clock, notifications).

pub mod flat_file;
pub mod memory;

use crate::domain::ports::{Clock, GradeNotice, GradeObserver};
use chrono::{Local, NaiveDateTime, Timelike, TimeDelta};
use std::cell::Cell;
use std::rc::Rc;

pub use flat_file::FlatFileStore;
pub use memory::MemoryStore;

/// Local wall-clock time, truncated to whole seconds to match the stored format.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        let now = Local::now().naive_local();
        now.with_nanosecond(0).unwrap_or(now)
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<NaiveDateTime>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        self.now.set(now);
    }

    pub fn advance(&self, by: TimeDelta) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now.get()
    }
}

/// Logs every grade announcement.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl GradeObserver for TracingObserver {
    fn grade_updated(&mut self, notice: &GradeNotice) {
        tracing::info!(
            student = notice.student_id,
            "{} received {:.2} for {} '{}' in '{}'",
            notice.student_name,
            notice.score,
            notice.kind,
            notice.item_name,
            notice.subject_name
        );
    }
}
