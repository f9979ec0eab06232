//! Shared fixtures for engine unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use super::GrindEngine;
use crate::clock::FixedClock;
use crate::error::{CoreError, Result};
use crate::grind::CreateGrindRequest;
use crate::problems::{Problem, ProblemSource, StaticProblemSource};
use crate::storage::Database;
use crate::user::{RegisterUser, User};

pub(crate) fn two_sum() -> Problem {
    Problem {
        id: 1,
        title: "Two Sum".into(),
        slug: "two-sum".into(),
        difficulty: "Easy".into(),
        topic_tags: vec!["Array".into(), "Hash Table".into()],
        description: None,
    }
}

pub(crate) struct Fixture<P = StaticProblemSource> {
    pub engine: GrindEngine<P>,
    pub clock: Arc<FixedClock>,
    pub now: DateTime<Utc>,
    pub alice: User,
    pub bob: User,
    pub carol: User,
}

/// Engine pinned to 2024-03-10T12:00:00Z whose only problem is Two Sum.
pub(crate) fn fixture() -> Fixture {
    fixture_with(StaticProblemSource::new(vec![two_sum()]))
}

pub(crate) fn fixture_with<P>(source: P) -> Fixture<P> {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
    let clock = Arc::new(FixedClock::new(now));
    let engine = GrindEngine::new(Database::open_memory().unwrap(), source)
        .with_clock(clock.clone())
        .with_fetch_timeout(Duration::from_millis(200));
    let register = |name: &str| {
        engine
            .register_user(RegisterUser::new(name, format!("{name}@example.com")))
            .unwrap()
    };
    let alice = register("alice");
    let bob = register("bob");
    let carol = register("carol");
    Fixture {
        engine,
        clock,
        now,
        alice,
        bob,
        carol,
    }
}

pub(crate) fn request(
    duration: i64,
    budget: i64,
    participants: &[&str],
    start_date: DateTime<Utc>,
) -> CreateGrindRequest {
    CreateGrindRequest {
        duration,
        budget,
        participants: participants.iter().map(|p| p.to_string()).collect(),
        start_date,
    }
}

/// Counts fetches; can be made slow or failing. Every fetch returns a
/// different problem, titled after its call number.
#[derive(Default)]
pub(crate) struct CountingSource {
    pub calls: AtomicUsize,
    pub delay: Duration,
    pub fail: bool,
}

impl CountingSource {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ProblemSource for CountingSource {
    async fn fetch_by_id(&self, _id: u32) -> Result<Problem> {
        self.fetch_random().await
    }

    async fn fetch_random(&self) -> Result<Problem> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(CoreError::ProblemSourceUnavailable("down".into()));
        }
        Ok(numbered(call))
    }
}

pub(crate) fn numbered(call: usize) -> Problem {
    Problem {
        id: 1000 + call as u32,
        title: format!("Problem {call}"),
        slug: format!("problem-{call}"),
        ..two_sum()
    }
}
