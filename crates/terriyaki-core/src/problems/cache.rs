use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::{title_from_slug, Problem};
use crate::error::{ConfigError, Result};

/// Loaded problem lists, keyed by the path they were read from.
///
/// Owned by whoever builds the problem source; nothing here is global.
#[derive(Debug, Default)]
pub struct ProblemListCache {
    lists: RwLock<HashMap<String, Arc<Vec<Problem>>>>,
}

impl ProblemListCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the list at `path`, reading it on first use.
    pub fn load(&self, path: &str) -> Result<Arc<Vec<Problem>>> {
        if let Some(list) = self
            .lists
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(path)
        {
            return Ok(Arc::clone(list));
        }

        let mut lists = self.lists.write().unwrap_or_else(|e| e.into_inner());
        // Another caller may have loaded it while we waited for the lock.
        if let Some(list) = lists.get(path) {
            return Ok(Arc::clone(list));
        }

        let text = std::fs::read_to_string(Path::new(path)).map_err(|e| {
            ConfigError::LoadFailed {
                path: path.into(),
                message: e.to_string(),
            }
        })?;
        let problems = parse_problem_list(&text).map_err(|message| ConfigError::InvalidValue {
            key: "problems.list".to_string(),
            message: format!("{path}: {message}"),
        })?;
        debug!(path, count = problems.len(), "loaded problem list");

        let list = Arc::new(problems);
        lists.insert(path.to_string(), Arc::clone(&list));
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.lists.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every loaded list.
    pub fn reset(&self) {
        self.lists.write().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// Parses a problem list in `id,slug,tag[,difficulty]` CSV form. The first
/// row is a header. Quoted fields may contain commas. Rows with too few
/// columns, a non-numeric id or broken quoting are skipped.
pub fn parse_problem_list(text: &str) -> std::result::Result<Vec<Problem>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let problems: Vec<Problem> = reader
        .records()
        .filter_map(|row| row.ok())
        .filter_map(|row| problem_from_row(&row))
        .collect();

    if problems.is_empty() {
        return Err("no problems found".to_string());
    }
    Ok(problems)
}

fn problem_from_row(row: &csv::StringRecord) -> Option<Problem> {
    if row.len() < 3 {
        return None;
    }
    let id = row.get(0)?.parse::<u32>().ok()?;
    let slug = row.get(1)?.to_string();
    if slug.is_empty() {
        return None;
    }
    let topic_tags = match row.get(2)? {
        "" => Vec::new(),
        tag => vec![tag.to_string()],
    };
    let difficulty = row
        .get(3)
        .filter(|d| !d.is_empty())
        .unwrap_or("Unknown")
        .to_string();
    Some(Problem {
        id,
        title: title_from_slug(&slug),
        slug,
        difficulty,
        topic_tags,
        description: None,
    })
}
