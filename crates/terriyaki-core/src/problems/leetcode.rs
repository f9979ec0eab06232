//! LeetCode catalog client over the public GraphQL API.

use std::sync::Arc;

use indoc::indoc;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{Problem, ProblemSource};
use crate::error::{ConfigError, CoreError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://leetcode.com/graphql";

const DEFAULT_RANDOM_OFFSET_LIMIT: u32 = 2000;

const QUESTION_LIST_QUERY: &str = indoc! {"
    query problemsetQuestionList($categorySlug: String, $limit: Int, $skip: Int, $filters: QuestionListFilterInput) {
      problemsetQuestionList: questionList(categorySlug: $categorySlug, limit: $limit, skip: $skip, filters: $filters) {
        total: totalNum
        questions: data {
          frontendQuestionId: questionFrontendId
          title
          titleSlug
          difficulty
          topicTags { name }
        }
      }
    }
"};

#[derive(Debug, Clone)]
pub struct LeetCodeClient {
    client: Client,
    endpoint: Url,
    random_offset_limit: u32,
    /// When set, random picks come from this list instead of the whole catalog.
    list: Option<Arc<Vec<Problem>>>,
}

impl LeetCodeClient {
    pub fn new(endpoint: &str) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| ConfigError::InvalidValue {
            key: "problems.endpoint".to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            random_offset_limit: DEFAULT_RANDOM_OFFSET_LIMIT,
            list: None,
        })
    }

    pub fn with_random_offset_limit(mut self, limit: u32) -> Self {
        self.random_offset_limit = limit.max(1);
        self
    }

    pub fn with_list(mut self, list: Arc<Vec<Problem>>) -> Self {
        self.list = Some(list);
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// One page of the catalog, `skip` problems in.
    async fn question_page(&self, skip: u32, limit: u32) -> Result<Vec<Problem>> {
        let body = json!({
            "query": QUESTION_LIST_QUERY,
            "variables": {
                "categorySlug": "",
                "skip": skip,
                "limit": limit,
                "filters": {},
            },
        });

        let resp = self
            .client
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .header("Referer", "https://leetcode.com")
            .json(&body)
            .send()
            .await
            .map_err(unavailable)?;

        if !resp.status().is_success() {
            return Err(CoreError::ProblemSourceUnavailable(format!(
                "LeetCode API error: HTTP {}",
                resp.status()
            )));
        }

        let data: Value = resp.json().await.map_err(unavailable)?;
        if let Some(err) = data.get("errors") {
            return Err(CoreError::ProblemSourceUnavailable(format!(
                "LeetCode GraphQL error: {err}"
            )));
        }

        let questions = data["data"]["problemsetQuestionList"]["questions"]
            .as_array()
            .ok_or_else(|| {
                CoreError::ProblemSourceUnavailable("missing questions in response".to_string())
            })?;

        let problems: Vec<Problem> = questions.iter().filter_map(parse_question).collect();
        debug!(skip, limit, count = problems.len(), "fetched LeetCode question page");
        Ok(problems)
    }
}

fn unavailable(err: reqwest::Error) -> CoreError {
    CoreError::ProblemSourceUnavailable(err.to_string())
}

fn parse_question(node: &Value) -> Option<Problem> {
    let id = match &node["frontendQuestionId"] {
        Value::String(s) => s.parse().ok()?,
        Value::Number(n) => u32::try_from(n.as_u64()?).ok()?,
        _ => return None,
    };
    let slug = node["titleSlug"].as_str()?.to_string();
    let topic_tags = node["topicTags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t["name"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    Some(Problem {
        id,
        title: node["title"].as_str().unwrap_or(&slug).to_string(),
        difficulty: node["difficulty"].as_str().unwrap_or("Unknown").to_string(),
        slug,
        topic_tags,
        description: None,
    })
}

impl ProblemSource for LeetCodeClient {
    async fn fetch_by_id(&self, id: u32) -> Result<Problem> {
        if id == 0 {
            return Err(CoreError::ProblemNotFound(id.to_string()));
        }
        // Catalog pages are zero-indexed by frontend id.
        self.question_page(id - 1, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::ProblemNotFound(id.to_string()))
    }

    async fn fetch_random(&self) -> Result<Problem> {
        if let Some(list) = &self.list {
            let id = list
                .choose(&mut rand::thread_rng())
                .map(|p| p.id)
                .ok_or_else(|| {
                    CoreError::ProblemSourceUnavailable("problem list is empty".to_string())
                })?;
            return self.fetch_by_id(id).await;
        }

        let offset = rand::thread_rng().gen_range(0..self.random_offset_limit.max(1));
        self.question_page(offset, 1)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                CoreError::ProblemSourceUnavailable(format!("no problem at offset {offset}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn page(questions: Value) -> String {
        json!({
            "data": {
                "problemsetQuestionList": {
                    "total": 3000,
                    "questions": questions,
                }
            }
        })
        .to_string()
    }

    #[test]
    fn rejects_malformed_endpoint() {
        assert!(LeetCodeClient::new("not a url").is_err());
    }

    #[test]
    fn parses_string_and_numeric_ids() {
        let node = json!({
            "frontendQuestionId": "1",
            "title": "Two Sum",
            "titleSlug": "two-sum",
            "difficulty": "Easy",
            "topicTags": [{"name": "Array"}],
        });
        let problem = parse_question(&node).unwrap();
        assert_eq!(problem.id, 1);
        assert_eq!(problem.topic_tags, vec!["Array"]);

        let node = json!({"frontendQuestionId": 7, "titleSlug": "reverse-integer"});
        let problem = parse_question(&node).unwrap();
        assert_eq!(problem.id, 7);
        assert_eq!(problem.title, "reverse-integer");
    }

    #[tokio::test]
    async fn fetch_by_id_reads_first_question() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(page(json!([{
                "frontendQuestionId": "1",
                "title": "Two Sum",
                "titleSlug": "two-sum",
                "difficulty": "Easy",
                "topicTags": [{"name": "Array"}, {"name": "Hash Table"}],
            }])))
            .create_async()
            .await;

        let client = LeetCodeClient::new(&format!("{}/graphql", server.url())).unwrap();
        let problem = client.fetch_by_id(1).await.unwrap();
        assert_eq!(problem.title, "Two Sum");
        assert_eq!(problem.url(), "https://leetcode.com/problems/two-sum/description");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_page_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(page(json!([])))
            .create_async()
            .await;

        let client = LeetCodeClient::new(&format!("{}/graphql", server.url())).unwrap();
        let err = client.fetch_by_id(4000).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(503)
            .create_async()
            .await;

        let client = LeetCodeClient::new(&format!("{}/graphql", server.url()))
            .unwrap()
            .with_random_offset_limit(10);
        let err = client.fetch_random().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::UpstreamUnavailable);
    }

    #[tokio::test]
    async fn graphql_errors_are_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/graphql")
            .with_status(200)
            .with_body(r#"{"errors":[{"message":"rate limited"}]}"#)
            .create_async()
            .await;

        let client = LeetCodeClient::new(&format!("{}/graphql", server.url())).unwrap();
        let err = client.fetch_by_id(1).await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }
}
