//! Participant sessions.
//!
//! The controller owns the task sequencing rules; the runner connects it to
//! a [`runner::Presenter`] front end such as the terminal one.

pub mod controller;
pub mod runner;
pub mod terminal;

pub use controller::SessionController;
pub use runner::{run_session, SessionEnd};
pub use terminal::TerminalPresenter;
