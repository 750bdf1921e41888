//! Display/input contract between the session controller and a front end.

use super::controller::{CurrentTask, SessionController, Submission, SubmitOutcome, TaskView};
use crate::error::Result;
use crate::models::SessionState;
use crate::storage::RecordStore;
use std::io;
use tracing::{debug, info, warn};

/// Front end that shows tasks to a participant and reads their answers.
pub trait Presenter {
    /// Show how far the participant has come.
    fn show_progress(&mut self, answered: usize, total: usize) -> io::Result<()>;

    /// Present one task and collect the answer.
    ///
    /// `None` means the participant left; the session stays unfinished.
    fn collect(&mut self, view: TaskView<'_>) -> io::Result<Option<Submission>>;

    /// Thank the participant once every task is answered.
    fn show_complete(&mut self) -> io::Result<()>;
}

/// How a call to [`run_session`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// All tasks answered. `record` is `None` when the session was already
    /// complete on entry, so nothing new was written.
    Completed { record: Option<String> },
    /// The participant left before the last task.
    Abandoned,
}

/// Drive `state` to completion through `presenter`.
///
/// `checkpoint` sees the state after every submission that changed it,
/// including the final one, so the host can keep it across restarts.
/// A failing checkpoint aborts the session, except once the record has
/// been stored or the store refused it: then it is only logged.
pub fn run_session<S, P, F>(
    controller: &SessionController<S>,
    state: &mut SessionState,
    presenter: &mut P,
    mut checkpoint: F,
) -> Result<SessionEnd>
where
    S: RecordStore,
    P: Presenter + ?Sized,
    F: FnMut(&SessionState) -> Result<()>,
{
    loop {
        presenter.show_progress(state.progress(), controller.total())?;

        let view = match controller.current_task(state) {
            CurrentTask::Pending(view) => view,
            CurrentTask::Complete => {
                presenter.show_complete()?;
                return Ok(SessionEnd::Completed { record: None });
            }
        };

        let submission = match presenter.collect(view)? {
            Some(submission) => submission,
            None => {
                info!(
                    "Participant left at task {}/{}",
                    state.progress() + 1,
                    controller.total()
                );
                return Ok(SessionEnd::Abandoned);
            }
        };

        let before = state.progress();
        match controller.submit(state, submission) {
            Ok(SubmitOutcome::Next { progress, total }) => {
                checkpoint(state)?;
                debug!("Answered {}/{}", progress, total);
            }
            Ok(SubmitOutcome::Completed { record }) => {
                // The record is stored; a stale checkpoint must not fail the session.
                if let Err(e) = checkpoint(state) {
                    warn!("Could not save completed session state: {}", e);
                }
                presenter.show_progress(state.progress(), controller.total())?;
                presenter.show_complete()?;
                return Ok(SessionEnd::Completed {
                    record: Some(record),
                });
            }
            Err(e) => {
                if state.progress() != before {
                    if let Err(checkpoint_err) = checkpoint(state) {
                        warn!("Could not save session state: {}", checkpoint_err);
                    }
                }
                return Err(e);
            }
        }
    }
}
