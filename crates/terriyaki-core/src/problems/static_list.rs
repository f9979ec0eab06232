use std::sync::Arc;

use rand::seq::SliceRandom;

use super::{Problem, ProblemSource};
use crate::error::{CoreError, Result};

/// Serves problems from an in-memory list.
#[derive(Debug, Clone)]
pub struct StaticProblemSource {
    problems: Arc<Vec<Problem>>,
}

impl StaticProblemSource {
    pub fn new(problems: Vec<Problem>) -> Self {
        Self {
            problems: Arc::new(problems),
        }
    }

    pub fn from_shared(problems: Arc<Vec<Problem>>) -> Self {
        Self { problems }
    }

    pub fn builtin() -> Self {
        Self::new(builtin_problems())
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }
}

impl ProblemSource for StaticProblemSource {
    async fn fetch_by_id(&self, id: u32) -> Result<Problem> {
        self.problems
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| CoreError::ProblemNotFound(id.to_string()))
    }

    async fn fetch_random(&self) -> Result<Problem> {
        self.problems
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| CoreError::ProblemSourceUnavailable("problem list is empty".to_string()))
    }
}

/// A small classic list used when no remote catalog is configured.
pub fn builtin_problems() -> Vec<Problem> {
    const ENTRIES: &[(u32, &str, &str, &str, &[&str])] = &[
        (1, "Two Sum", "two-sum", "Easy", &["Array", "Hash Table"]),
        (3, "Longest Substring Without Repeating Characters", "longest-substring-without-repeating-characters", "Medium", &["Hash Table", "String", "Sliding Window"]),
        (11, "Container With Most Water", "container-with-most-water", "Medium", &["Array", "Two Pointers", "Greedy"]),
        (15, "3Sum", "3sum", "Medium", &["Array", "Two Pointers", "Sorting"]),
        (20, "Valid Parentheses", "valid-parentheses", "Easy", &["String", "Stack"]),
        (21, "Merge Two Sorted Lists", "merge-two-sorted-lists", "Easy", &["Linked List", "Recursion"]),
        (33, "Search in Rotated Sorted Array", "search-in-rotated-sorted-array", "Medium", &["Array", "Binary Search"]),
        (49, "Group Anagrams", "group-anagrams", "Medium", &["Array", "Hash Table", "String", "Sorting"]),
        (53, "Maximum Subarray", "maximum-subarray", "Medium", &["Array", "Divide and Conquer", "Dynamic Programming"]),
        (56, "Merge Intervals", "merge-intervals", "Medium", &["Array", "Sorting"]),
        (70, "Climbing Stairs", "climbing-stairs", "Easy", &["Math", "Dynamic Programming", "Memoization"]),
        (121, "Best Time to Buy and Sell Stock", "best-time-to-buy-and-sell-stock", "Easy", &["Array", "Dynamic Programming"]),
        (200, "Number of Islands", "number-of-islands", "Medium", &["Array", "Depth-First Search", "Breadth-First Search", "Union Find", "Matrix"]),
        (206, "Reverse Linked List", "reverse-linked-list", "Easy", &["Linked List", "Recursion"]),
        (238, "Product of Array Except Self", "product-of-array-except-self", "Medium", &["Array", "Prefix Sum"]),
    ];

    ENTRIES
        .iter()
        .map(|(id, title, slug, difficulty, tags)| Problem {
            id: *id,
            title: title.to_string(),
            slug: slug.to_string(),
            difficulty: difficulty.to_string(),
            topic_tags: tags.iter().map(|t| t.to_string()).collect(),
            description: None,
        })
        .collect()
}
