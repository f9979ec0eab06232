//! Problem sources.
//!
//! A [`ProblemSource`] hands out coding problems by catalog id or at random.
//! The remote catalog is LeetCode ([`LeetCodeClient`]); a static list
//! ([`StaticProblemSource`]) serves offline use and tests.

mod cache;
mod leetcode;
mod static_list;

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use cache::{parse_problem_list, ProblemListCache};
pub use leetcode::{LeetCodeClient, DEFAULT_ENDPOINT};
pub use static_list::{builtin_problems, StaticProblemSource};

use crate::error::Result;
use crate::storage::config::{ProblemSourceKind, ProblemsConfig};
use crate::task::ProblemPayload;

const PROBLEM_URL_BASE: &str = "https://leetcode.com/problems";
const DEFAULT_DESCRIPTION: &str = "A daily problem from LeetCode";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    /// Catalog (frontend) id.
    pub id: u32,
    pub title: String,
    pub slug: String,
    pub difficulty: String,
    #[serde(default)]
    pub topic_tags: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Problem {
    pub fn url(&self) -> String {
        format!("{PROBLEM_URL_BASE}/{}/description", self.slug)
    }

    pub fn to_payload(&self) -> ProblemPayload {
        ProblemPayload {
            title: self.title.clone(),
            description: self
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            url: self.url(),
            difficulty: self.difficulty.clone(),
            topic_tags: self.topic_tags.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemSelector {
    Id(u32),
    Random,
}

pub trait ProblemSource: Send + Sync {
    fn fetch_by_id(&self, id: u32) -> impl Future<Output = Result<Problem>> + Send;

    fn fetch_random(&self) -> impl Future<Output = Result<Problem>> + Send;

    fn fetch(&self, selector: ProblemSelector) -> impl Future<Output = Result<Problem>> + Send {
        async move {
            match selector {
                ProblemSelector::Id(id) => self.fetch_by_id(id).await,
                ProblemSelector::Random => self.fetch_random().await,
            }
        }
    }
}

impl<T: ProblemSource> ProblemSource for Arc<T> {
    async fn fetch_by_id(&self, id: u32) -> Result<Problem> {
        self.as_ref().fetch_by_id(id).await
    }

    async fn fetch_random(&self) -> Result<Problem> {
        self.as_ref().fetch_random().await
    }
}

/// The source selected by configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredSource {
    LeetCode(LeetCodeClient),
    Static(StaticProblemSource),
}

impl ConfiguredSource {
    pub fn from_config(config: &ProblemsConfig, cache: &ProblemListCache) -> Result<Self> {
        let list = match config.list.trim() {
            "" => None,
            path => Some(cache.load(path)?),
        };
        Ok(match config.source {
            ProblemSourceKind::LeetCode => {
                let mut client = LeetCodeClient::new(&config.endpoint)?
                    .with_random_offset_limit(config.random_offset_limit);
                if let Some(list) = list {
                    client = client.with_list(list);
                }
                ConfiguredSource::LeetCode(client)
            }
            ProblemSourceKind::Static => match list {
                Some(list) => ConfiguredSource::Static(StaticProblemSource::from_shared(list)),
                None => ConfiguredSource::Static(StaticProblemSource::builtin()),
            },
        })
    }
}

impl ProblemSource for ConfiguredSource {
    async fn fetch_by_id(&self, id: u32) -> Result<Problem> {
        match self {
            ConfiguredSource::LeetCode(client) => client.fetch_by_id(id).await,
            ConfiguredSource::Static(source) => source.fetch_by_id(id).await,
        }
    }

    async fn fetch_random(&self) -> Result<Problem> {
        match self {
            ConfiguredSource::LeetCode(client) => client.fetch_random().await,
            ConfiguredSource::Static(source) => source.fetch_random().await,
        }
    }
}

/// "two-sum" -> "Two Sum"
pub(crate) fn title_from_slug(slug: &str) -> String {
    slug.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
