use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported when no HTTP status was obtained.
pub const TRANSPORT_FAILURE_STATUS: u16 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Local validation failure; nothing was sent.
    Precondition,
    /// No usable HTTP response (network, timeout, undecodable body).
    Transport,
    /// The agent answered with a failure status or an unexpected body.
    Domain,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct QueryError {
    pub kind: ErrorKind,
    pub message: String,
    pub status: u16,
}

impl QueryError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Precondition,
            message: message.into(),
            status: TRANSPORT_FAILURE_STATUS,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            message: message.into(),
            status: TRANSPORT_FAILURE_STATUS,
        }
    }

    pub fn domain(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Domain,
            message: message.into(),
            status,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn has_status(&self) -> bool {
        self.status != TRANSPORT_FAILURE_STATUS
    }
}
