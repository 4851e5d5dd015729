//! Task Resolver: Matches operator references to tasks.

use super::repo::TaskRepo;
use super::types::DeliveryTask;
use anyhow::{bail, Result};
use rusqlite::Connection;
use std::collections::HashSet;

const MIN_SCORE: f64 = 0.3;

pub struct ResolveResult {
    pub task: DeliveryTask,
    pub confidence: f64,
}

pub struct TaskResolver<'a> {
    repo: TaskRepo<'a>,
    strict: bool,
}

impl<'a> TaskResolver<'a> {
    /// Creates a new resolver.
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self {
            repo: TaskRepo::new(conn),
            strict: false,
        }
    }

    /// Creates a resolver in strict mode (ID or exact name only).
    #[must_use]
    pub fn strict(conn: &'a Connection) -> Self {
        Self {
            repo: TaskRepo::new(conn),
            strict: true,
        }
    }

    /// Resolves an operator reference into a task.
    ///
    /// Tries, in order: numeric ID, exact name (case-insensitive), fuzzy match.
    ///
    /// # Errors
    /// Returns an error if no task matches.
    pub fn resolve(&self, query: &str) -> Result<ResolveResult> {
        if let Ok(id) = query.parse::<i64>() {
            if let Some(task) = self.repo.find_by_id(id)? {
                return Ok(ResolveResult {
                    task,
                    confidence: 1.0,
                });
            }
        }

        if let Some(task) = self.repo.find_by_name(query)? {
            return Ok(ResolveResult {
                task,
                confidence: 1.0,
            });
        }

        if self.strict {
            bail!("No exact match for '{query}' in strict mode.");
        }
        self.fuzzy_resolve(query)
    }

    fn fuzzy_resolve(&self, query: &str) -> Result<ResolveResult> {
        let tasks = self.repo.get_all()?;
        let query_lower = query.to_lowercase();
        let words: Vec<_> = query_lower.split_whitespace().collect();

        let mut matches: Vec<_> = tasks
            .into_iter()
            .map(|t| (calculate_score(&t, &query_lower, &words), t))
            .filter(|(s, _)| *s > MIN_SCORE)
            .collect();

        matches.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let (confidence, task) = matches
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("No task matches '{query}'"))?;

        tracing::debug!(query, task = %task.name, confidence, "fuzzy match");
        Ok(ResolveResult { task, confidence })
    }
}

/// Calculates a match score between a task and a query.
fn calculate_score(task: &DeliveryTask, query: &str, query_words: &[&str]) -> f64 {
    let name_lower = task.name.to_lowercase();
    let description_lower = task
        .description
        .as_deref()
        .unwrap_or_default()
        .to_lowercase();

    let mut score = 0.0;

    if name_lower.contains(query) {
        score += 0.8;
    }
    if name_lower.starts_with(query) {
        score += 0.5;
    }

    for word in query_words {
        if name_lower.contains(word) {
            score += 0.3;
        }
        if description_lower.contains(word) {
            score += 0.15;
        }
    }

    score += string_similarity(&name_lower, query) * 0.4;

    score.min(1.0)
}

#[allow(clippy::cast_precision_loss)]
fn string_similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let a_chars: HashSet<char> = a.chars().collect();
    let b_chars: HashSet<char> = b.chars().collect();

    let intersection = a_chars.intersection(&b_chars).count();
    let union = a_chars.union(&b_chars).count();

    if union == 0 {
        return 0.0;
    }

    intersection as f64 / union as f64
}
