//! The grind accountability engine.
//!
//! [`GrindEngine`] owns the database handle, the problem source and the
//! clock, and exposes every grind operation as a method. Operations are
//! grouped by concern:
//!
//! - directory: registering and resolving users
//! - lifecycle: creating, finding, updating and deleting grinds
//! - scheduler: daily tasks and lazy problem assignment
//! - ledger: participation records, missed days, penalties, quitting
//! - invitations: invitation state machine and plain messages
//!
//! The engine is `Send + Sync`; share it behind an `Arc`.

mod directory;
mod invitations;
mod ledger;
mod lifecycle;
mod scheduler;
#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::clock::{Clock, SystemClock};
use crate::storage::Database;

/// Default bound on a single problem-source call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct GrindEngine<P> {
    db: Database,
    problems: P,
    clock: Arc<dyn Clock>,
    fetch_timeout: Duration,
}

impl<P> GrindEngine<P> {
    pub fn new(db: Database, problems: P) -> Self {
        Self {
            db,
            problems,
            clock: Arc::new(SystemClock),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn problems(&self) -> &P {
        &self.problems
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
