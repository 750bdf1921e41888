//! Data models for the listening survey.
//!
//! This module contains the core data structures shared by the session
//! controller, storage and aggregation: tasks, ratings, session state and
//! the tables that get persisted and averaged.

use crate::error::{Result, SurveyError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

/// Position on the 4-point similarity scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Similarity {
    /// 0 - playlist has nothing in common with the reference
    NotSimilar,
    /// 1
    SomewhatSimilar,
    /// 2
    QuiteSimilar,
    /// 3 - playlist is a natural follow-up to the reference
    VerySimilar,
}

impl Similarity {
    /// All scale points in ascending order.
    pub const SCALE: [Similarity; 4] = [
        Similarity::NotSimilar,
        Similarity::SomewhatSimilar,
        Similarity::QuiteSimilar,
        Similarity::VerySimilar,
    ];

    /// Numeric value stored in response records.
    pub fn score(&self) -> u8 {
        match self {
            Similarity::NotSimilar => 0,
            Similarity::SomewhatSimilar => 1,
            Similarity::QuiteSimilar => 2,
            Similarity::VerySimilar => 3,
        }
    }

    /// Inverse of [`Similarity::score`].
    pub fn from_score(score: u8) -> Option<Self> {
        Self::SCALE.get(score as usize).copied()
    }
}

impl fmt::Display for Similarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Similarity::NotSimilar => write!(f, "Not similar"),
            Similarity::SomewhatSimilar => write!(f, "Somewhat similar"),
            Similarity::QuiteSimilar => write!(f, "Quite similar"),
            Similarity::VerySimilar => write!(f, "Very similar"),
        }
    }
}

/// A rating for one playlist. `None` marks a skipped task.
pub type Rating = Option<Similarity>;

/// One unit of work: a reference item and the candidate playlists to rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Reference item id.
    pub reference: u64,
    /// Playlist label -> ordered item ids. Sorted by label.
    pub options: BTreeMap<String, Vec<u64>>,
}

impl Task {
    /// Playlist labels in canonical (sorted) order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }
}

/// The ordered sequence of tasks for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSet {
    tasks: Vec<Task>,
}

impl TaskSet {
    /// Build a task set, validating it.
    ///
    /// `playlist_len`, when set, requires every playlist to hold exactly
    /// that many items.
    pub fn new(tasks: Vec<Task>, playlist_len: Option<usize>) -> Result<Self> {
        let set = Self { tasks };
        set.validate(playlist_len)?;
        Ok(set)
    }

    /// Load a task set from a JSON document.
    pub fn load(path: &Path, playlist_len: Option<usize>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content, playlist_len)
    }

    /// Parse a task set from JSON text.
    pub fn from_json(json: &str, playlist_len: Option<usize>) -> Result<Self> {
        let tasks: Vec<Task> = serde_json::from_str(json)?;
        Self::new(tasks, playlist_len)
    }

    /// Number of tasks.
    pub fn total(&self) -> usize {
        self.tasks.len()
    }

    /// Task at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    fn validate(&self, playlist_len: Option<usize>) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(SurveyError::InvalidTaskSet("no tasks defined".to_string()));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.reference) {
                return Err(SurveyError::InvalidTaskSet(format!(
                    "reference {} appears more than once",
                    task.reference
                )));
            }

            if task.options.is_empty() {
                return Err(SurveyError::InvalidTaskSet(format!(
                    "reference {} has no playlists",
                    task.reference
                )));
            }

            for (label, items) in &task.options {
                if items.is_empty() {
                    return Err(SurveyError::InvalidTaskSet(format!(
                        "playlist {} of reference {} is empty",
                        label, task.reference
                    )));
                }
                if let Some(expected) = playlist_len {
                    if items.len() != expected {
                        return Err(SurveyError::InvalidTaskSet(format!(
                            "playlist {} of reference {} has {} items, expected {}",
                            label,
                            task.reference,
                            items.len(),
                            expected
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// Ratings given for one task, keyed by playlist label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnsweredTask {
    /// Reference id of the answered task.
    pub reference: u64,
    /// Playlist label -> rating.
    pub ratings: BTreeMap<String, Rating>,
}

/// One participant's progress through a task set.
///
/// `progress` always equals the number of answered tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    progress: usize,
    results: Vec<AnsweredTask>,
}

impl SessionState {
    /// Index of the next task to answer.
    pub fn progress(&self) -> usize {
        self.progress
    }

    /// Answered tasks, in answer order.
    pub fn results(&self) -> &[AnsweredTask] {
        &self.results
    }

    /// Load a state previously written with [`SessionState::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the state as JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub(crate) fn record_answer(&mut self, answer: AnsweredTask) {
        self.results.push(answer);
        self.progress += 1;
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.progress == self.results.len()
    }
}

/// A finalized session: one row per reference id, one column per label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    /// Every label seen across tasks, sorted.
    pub labels: Vec<String>,
    /// Reference id -> label -> rating, sorted by reference id.
    pub rows: BTreeMap<u64, BTreeMap<String, Rating>>,
}

impl ResponseRecord {
    /// Build the record from a session's answers.
    pub fn from_results(results: &[AnsweredTask]) -> Self {
        let labels: BTreeSet<String> = results
            .iter()
            .flat_map(|answer| answer.ratings.keys().cloned())
            .collect();

        let rows = results
            .iter()
            .map(|answer| (answer.reference, answer.ratings.clone()))
            .collect();

        Self {
            labels: labels.into_iter().collect(),
            rows,
        }
    }

    /// Numeric table form; skipped ratings become missing cells.
    pub fn to_table(&self) -> RatingTable {
        let columns = self.labels.iter().cloned().collect();
        let rows = self
            .rows
            .iter()
            .map(|(reference, ratings)| {
                let cells = ratings
                    .iter()
                    .filter_map(|(label, rating)| {
                        rating.map(|r| (label.clone(), f64::from(r.score())))
                    })
                    .collect();
                (*reference, cells)
            })
            .collect();

        RatingTable { columns, rows }
    }
}

/// A numeric table keyed by reference id and label.
///
/// Absent entries in a row are missing cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RatingTable {
    /// Column labels.
    pub columns: BTreeSet<String>,
    /// Reference id -> label -> value.
    pub rows: BTreeMap<u64, BTreeMap<String, f64>>,
}

impl RatingTable {
    /// Value at (reference, label), if present.
    #[cfg(test)]
    pub fn get(&self, reference: u64, label: &str) -> Option<f64> {
        self.rows.get(&reference).and_then(|row| row.get(label)).copied()
    }
}

/// Element-wise mean of all aggregated response records.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    /// Per-cell means.
    pub means: RatingTable,
    /// Number of records aggregated.
    pub records: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(reference: u64, labels: &[&str]) -> Task {
        Task {
            reference,
            options: labels
                .iter()
                .map(|l| (l.to_string(), vec![1, 2, 3, 4]))
                .collect(),
        }
    }

    #[test]
    fn test_similarity_scores() {
        for (i, point) in Similarity::SCALE.iter().enumerate() {
            assert_eq!(point.score() as usize, i);
            assert_eq!(Similarity::from_score(i as u8), Some(*point));
        }
        assert_eq!(Similarity::from_score(4), None);
        assert_eq!(Similarity::QuiteSimilar.to_string(), "Quite similar");
    }

    #[test]
    fn test_task_set_from_json() {
        let json = r#"[
            {"reference": 7, "options": {"B": [1, 2, 3, 4], "A": [5, 6, 7, 8]}},
            {"reference": 3, "options": {"A": [9, 10, 11, 12]}}
        ]"#;

        let set = TaskSet::from_json(json, Some(4)).unwrap();
        assert_eq!(set.total(), 2);
        let first = set.get(0).unwrap();
        assert_eq!(first.reference, 7);
        assert_eq!(first.labels().collect::<Vec<_>>(), vec!["A", "B"]);
        assert!(set.get(2).is_none());
    }

    #[test]
    fn test_task_set_rejects_duplicates() {
        let result = TaskSet::new(vec![task(1, &["A"]), task(1, &["B"])], None);
        assert!(matches!(result, Err(SurveyError::InvalidTaskSet(_))));
    }

    #[test]
    fn test_task_set_rejects_empty() {
        assert!(matches!(
            TaskSet::new(Vec::new(), None),
            Err(SurveyError::InvalidTaskSet(_))
        ));
        assert!(matches!(
            TaskSet::new(vec![task(1, &[])], None),
            Err(SurveyError::InvalidTaskSet(_))
        ));
    }

    #[test]
    fn test_task_set_playlist_len() {
        assert!(TaskSet::new(vec![task(1, &["A"])], Some(4)).is_ok());
        assert!(matches!(
            TaskSet::new(vec![task(1, &["A"])], Some(5)),
            Err(SurveyError::InvalidTaskSet(_))
        ));
    }

    #[test]
    fn test_response_record_sorts_rows_and_unions_labels() {
        let results = vec![
            AnsweredTask {
                reference: 20,
                ratings: [("B".to_string(), Some(Similarity::VerySimilar))].into(),
            },
            AnsweredTask {
                reference: 10,
                ratings: [
                    ("A".to_string(), Some(Similarity::NotSimilar)),
                    ("C".to_string(), None),
                ]
                .into(),
            },
        ];

        let record = ResponseRecord::from_results(&results);
        assert_eq!(record.labels, vec!["A", "B", "C"]);
        assert_eq!(record.rows.keys().copied().collect::<Vec<_>>(), vec![10, 20]);

        let table = record.to_table();
        assert_eq!(table.get(10, "A"), Some(0.0));
        assert_eq!(table.get(10, "C"), None);
        assert_eq!(table.get(20, "B"), Some(3.0));
        assert_eq!(table.columns.len(), 3);
    }

    #[test]
    fn test_session_state_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = SessionState::default();
        state.record_answer(AnsweredTask {
            reference: 1,
            ratings: [("A".to_string(), Some(Similarity::QuiteSimilar))].into(),
        });
        state.save(&path).unwrap();

        let loaded = SessionState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert_eq!(loaded.progress(), 1);
        assert!(loaded.is_consistent());
    }
}
