//! # Terriyaki Core Library
//!
//! Core business logic for Terriyaki, a shared-commitment "grind" tracker.
//! A group of people agree to solve one coding problem a day for a fixed
//! number of days; every missed day costs a share of a money budget, and
//! quitting costs all of it. Everyone in a grind gets the same problem on
//! the same day.
//!
//! The `terriyaki` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Engine**: [`GrindEngine`] ties storage, the problem source and the
//!   clock together and exposes every operation
//! - **Storage**: SQLite persistence and TOML configuration
//! - **Problems**: where daily problems come from (LeetCode or a fixed list)
//!
//! ## Key Components
//!
//! - [`GrindEngine`]: grind lifecycle, scheduling, accounting and invitations
//! - [`Database`]: persistence with serialized, transactional access
//! - [`Config`]: application configuration
//! - [`ProblemSource`]: trait for anything that can hand out problems

pub mod auth;
pub mod clock;
pub mod engine;
pub mod error;
pub mod grind;
pub mod message;
pub mod participation;
pub mod problems;
pub mod storage;
pub mod task;
pub mod user;

pub use auth::{AuthProvider, TokenTable};
pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{GrindEngine, DEFAULT_FETCH_TIMEOUT};
pub use error::{ConfigError, CoreError, DatabaseError, ErrorCode, ValidationError};
pub use grind::{
    CreateGrindRequest, Grind, GrindDeletion, GrindOverview, GrindUpdate, MAX_DURATION_DAYS,
};
pub use message::{InvitationStatus, Message, MessageType};
pub use participation::{Accounting, ParticipantStanding, ParticipateRecord};
pub use problems::{ConfiguredSource, Problem, ProblemListCache, ProblemSelector, ProblemSource};
pub use storage::{Config, Database};
pub use task::{ProblemPayload, ProgressEntry, Task, TaskStatus};
pub use user::{RegisterUser, User, UserDirectory};
