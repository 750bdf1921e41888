//! Session state machine.
//!
//! A session moves through `AwaitingTask(0) .. AwaitingTask(total - 1)` and
//! ends in `Complete`. Each task is answered exactly once, in order; the
//! submission that answers the last task also writes the response record.
//! The controller holds no per-participant state: callers own the
//! [`SessionState`] and pass it into every operation.

use crate::error::{Result, SurveyError};
use crate::models::{AnsweredTask, Rating, ResponseRecord, SessionState, Task, TaskSet};
use crate::report::render_response_record;
use crate::storage::RecordStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Ratings for the current task, keyed by playlist label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Must cover exactly the current task's labels.
    pub ratings: BTreeMap<String, Rating>,
    /// Record every label as skipped, ignoring `ratings` values.
    pub skip: bool,
}

impl Submission {
    /// A regular answer.
    pub fn rated(ratings: BTreeMap<String, Rating>) -> Self {
        Self {
            ratings,
            skip: false,
        }
    }

    /// Opt out of `task`.
    pub fn skipped(task: &Task) -> Self {
        Self {
            ratings: task.labels().map(|label| (label.to_string(), None)).collect(),
            skip: true,
        }
    }
}

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// More tasks remain.
    Next { progress: usize, total: usize },
    /// The last task was answered and the record stored under this name.
    Completed { record: String },
}

/// One playlist as shown to the participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playlist<'a> {
    /// 1-based display position.
    pub number: usize,
    /// Label the rating must be recorded against.
    pub label: &'a str,
    /// Item ids in playlist order.
    pub items: &'a [u64],
}

/// Playlists of one task in random display order.
///
/// Draws lazily and cannot be restarted; the task itself is never reordered.
#[derive(Debug)]
pub struct ShuffledPlaylists<'a> {
    remaining: Vec<(&'a str, &'a [u64])>,
    shown: usize,
    rng: StdRng,
}

impl<'a> ShuffledPlaylists<'a> {
    fn new(task: &'a Task, seed: u64) -> Self {
        Self {
            remaining: task
                .options
                .iter()
                .map(|(label, items)| (label.as_str(), items.as_slice()))
                .collect(),
            shown: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<'a> Iterator for ShuffledPlaylists<'a> {
    type Item = Playlist<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let pick = self.rng.gen_range(0..self.remaining.len());
        let (label, items) = self.remaining.swap_remove(pick);
        self.shown += 1;

        Some(Playlist {
            number: self.shown,
            label,
            items,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining.len(), Some(self.remaining.len()))
    }
}

impl ExactSizeIterator for ShuffledPlaylists<'_> {}

/// The task awaiting an answer, prepared for display.
#[derive(Debug)]
pub struct TaskView<'a> {
    /// 0-based index of the task.
    pub index: usize,
    /// Number of tasks in the session.
    pub total: usize,
    /// The task in canonical order.
    pub task: &'a Task,
    /// Its playlists in display order.
    pub playlists: ShuffledPlaylists<'a>,
}

/// What `current_task` found.
#[derive(Debug)]
pub enum CurrentTask<'a> {
    Pending(TaskView<'a>),
    Complete,
}

/// Drives participants through a task set and persists their records.
pub struct SessionController<S> {
    tasks: TaskSet,
    store: S,
    shuffle_seed: Option<u64>,
}

impl<S: RecordStore> SessionController<S> {
    /// Create a controller over a loaded task set.
    pub fn new(tasks: TaskSet, store: S) -> Self {
        Self {
            tasks,
            store,
            shuffle_seed: None,
        }
    }

    /// Derive every task's display order from `seed` instead of fresh entropy.
    pub fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Number of tasks per session.
    pub fn total(&self) -> usize {
        self.tasks.total()
    }

    /// The record store finished sessions are written to.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Start a session, or resume `existing` unchanged.
    ///
    /// A resumed state must fit this task set: its answers must line up with
    /// the tasks they claim to answer.
    pub fn initialize(&self, existing: Option<SessionState>) -> Result<SessionState> {
        let state = match existing {
            Some(state) => state,
            None => {
                debug!("Starting new session with {} tasks", self.total());
                return Ok(SessionState::default());
            }
        };

        if !state.is_consistent() {
            return Err(SurveyError::InvalidSessionState(format!(
                "progress {} does not match {} recorded answers",
                state.progress(),
                state.results().len()
            )));
        }

        if state.progress() > self.total() {
            return Err(SurveyError::InvalidSessionState(format!(
                "progress {} exceeds task count {}",
                state.progress(),
                self.total()
            )));
        }

        for (index, answer) in state.results().iter().enumerate() {
            let matches = self.tasks.get(index).map_or(false, |task| {
                task.reference == answer.reference && task.options.keys().eq(answer.ratings.keys())
            });
            if !matches {
                return Err(SurveyError::InvalidSessionState(format!(
                    "answer {} (reference {}) does not match the task set",
                    index + 1,
                    answer.reference
                )));
            }
        }

        info!(
            "Resuming session at task {}/{}",
            state.progress(),
            self.total()
        );
        Ok(state)
    }

    /// The task to answer next, with a freshly shuffled playlist order.
    pub fn current_task(&self, state: &SessionState) -> CurrentTask<'_> {
        let seed = match self.shuffle_seed {
            Some(base) => base.wrapping_add(state.progress() as u64),
            None => rand::random(),
        };
        self.current_task_seeded(state, seed)
    }

    /// Like [`SessionController::current_task`] with an explicit shuffle seed.
    pub fn current_task_seeded(&self, state: &SessionState, seed: u64) -> CurrentTask<'_> {
        match self.tasks.get(state.progress()) {
            Some(task) => CurrentTask::Pending(TaskView {
                index: state.progress(),
                total: self.total(),
                task,
                playlists: ShuffledPlaylists::new(task, seed),
            }),
            None => CurrentTask::Complete,
        }
    }

    /// Record the answer to the current task.
    ///
    /// Rejected submissions leave `state` untouched. Answering the last task
    /// writes the response record; if that write fails the session is still
    /// complete and the error is returned as [`SurveyError::Persistence`].
    pub fn submit(&self, state: &mut SessionState, submission: Submission) -> Result<SubmitOutcome> {
        let task = self.tasks.get(state.progress()).ok_or_else(|| {
            SurveyError::InvalidSubmission("session is already complete".to_string())
        })?;

        if !task.options.keys().eq(submission.ratings.keys()) {
            let missing: Vec<_> = task
                .labels()
                .filter(|label| !submission.ratings.contains_key(*label))
                .collect();
            let extra: Vec<_> = submission
                .ratings
                .keys()
                .filter(|label| !task.options.contains_key(*label))
                .collect();
            return Err(SurveyError::InvalidSubmission(format!(
                "ratings for reference {} do not match its playlists (missing {:?}, unexpected {:?})",
                task.reference, missing, extra
            )));
        }

        let ratings = if submission.skip {
            submission
                .ratings
                .into_keys()
                .map(|label| (label, None))
                .collect()
        } else {
            submission.ratings
        };

        state.record_answer(AnsweredTask {
            reference: task.reference,
            ratings,
        });
        debug!(
            "Recorded answer for reference {} (skipped: {})",
            task.reference, submission.skip
        );

        if state.progress() < self.total() {
            return Ok(SubmitOutcome::Next {
                progress: state.progress(),
                total: self.total(),
            });
        }

        let record = self.finalize(state)?;
        Ok(SubmitOutcome::Completed { record })
    }

    /// Write the completed session's record.
    fn finalize(&self, state: &SessionState) -> Result<String> {
        let record = ResponseRecord::from_results(state.results());
        let contents = render_response_record(&record);

        let name = self
            .store
            .write_record(&contents)
            .map_err(|source| SurveyError::Persistence { source })?;

        info!(
            "Session complete: stored record {} ({} tasks)",
            name,
            record.rows.len()
        );
        Ok(name)
    }
}
