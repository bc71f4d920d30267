// Power reading domain models
use chrono::{DateTime, Utc};

/// One sample of a source's rolling history.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerPoint {
    pub epoch_secs: i64,
    pub watts: f64,
}

impl PowerPoint {
    pub fn new(epoch_secs: i64, watts: f64) -> Self {
        Self { epoch_secs, watts }
    }
}

/// One measured power channel as reported by the monitor.
///
/// Immutable once built from a poll response; the next poll supersedes it
/// wholesale. `watts` is the most recent sample of `history`.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    pub id: String,
    pub label: String,
    pub watts: f64,
    pub history: Vec<PowerPoint>,
}

impl Source {
    pub fn new(id: String, label: String, watts: f64, history: Vec<PowerPoint>) -> Self {
        Self {
            id,
            label,
            watts,
            history,
        }
    }
}

/// The result of one successful poll. Source order is the monitor's stable
/// order and drives view rotation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingSet {
    pub sources: Vec<Source>,
    pub fetched_at: DateTime<Utc>,
}

impl ReadingSet {
    pub fn new(sources: Vec<Source>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            sources,
            fetched_at,
        }
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}
