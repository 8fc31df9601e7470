//! Client side of the task manager.
//!
//! [`TaskApiClient`] talks to the REST API, [`SessionStore`] keeps the bearer
//! token between runs and [`TaskBoard`] holds the state a task screen renders.

pub mod api;
pub mod board;
pub mod session;

pub use api::TaskApiClient;
pub use board::{TaskBoard, TaskForm, View};
pub use session::{FileSessionStore, MemorySessionStore, SessionStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("api error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },
    #[error("session storage error: {0}")]
    Session(#[from] std::io::Error),
    #[error("not logged in")]
    NotLoggedIn,
    #[error("task {0} is not on the board")]
    UnknownTask(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
