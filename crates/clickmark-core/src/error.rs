//! Error handling
//!
//! Typed errors for entry operations, split the same way failures are
//! handled: validation problems are caught locally and never reach the
//! network, remote problems come back from the directory.

use std::time::Duration;
use thiserror::Error;

/// Input rejected before any remote call is made
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Collection is already at its size cap
    #[error("You can only save up to {limit} URLs.")]
    CapacityExceeded { limit: usize },

    /// Nothing but whitespace was entered
    #[error("Please enter a URL.")]
    EmptyInput,

    /// URL exceeds the accepted length
    #[error("URL is {len} characters long; the limit is {limit}.")]
    InputTooLong { len: usize, limit: usize },

    /// Another entry already has this URL
    #[error("This URL is already added: {url}")]
    DuplicateEntry { url: String },

    /// Edited value normalizes to the URL already stored
    #[error("URL is unchanged")]
    Unchanged,
}

/// Failure reported by the remote directory
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Transport or authentication failure
    #[error("Remote directory unavailable: {0}")]
    Unavailable(String),

    /// Server declined a well-formed request
    #[error("Remote directory rejected the request: {0}")]
    Rejected(String),

    /// No answer within the request timeout
    #[error("Remote directory did not answer within {0:?}")]
    Timeout(Duration),
}

impl RemoteError {
    /// Transport, auth and timeout failures all count as unavailable
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_) | RemoteError::Timeout(_))
    }
}

/// Errors surfaced by the entry store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No identity is present
    #[error("Not signed in")]
    NotSignedIn,

    /// Transport or authentication failure
    #[error("{0}")]
    RemoteUnavailable(RemoteError),

    /// Server declined the request
    #[error("{0}")]
    RemoteRejected(RemoteError),

    /// A rename for this URL is still in flight
    #[error("A rename of '{url}' is already in progress")]
    RenameInFlight { url: String },

    /// Edits can only be buffered while edit mode is on
    #[error("Not in edit mode")]
    NotEditing,

    /// No entry has this URL
    #[error("No entry for '{url}'")]
    NotFound { url: String },

    /// The result arrived after sign-out or a reload and was discarded
    #[error("Result discarded: the collection changed while the request was in flight")]
    Stale,

    /// A delete failed and the corrective reload failed as well
    #[error("Delete of '{url}' failed ({cause}) and the reload failed too: {reload}")]
    Reload {
        url: String,
        cause: RemoteError,
        reload: RemoteError,
    },
}

impl From<RemoteError> for StoreError {
    fn from(error: RemoteError) -> Self {
        if error.is_unavailable() {
            StoreError::RemoteUnavailable(error)
        } else {
            StoreError::RemoteRejected(error)
        }
    }
}

impl StoreError {
    /// Check if the caller can retry the same action
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::RemoteUnavailable(_)
                | StoreError::RenameInFlight { .. }
                | StoreError::Reload { .. }
        )
    }

    /// Whether this was caught locally without touching the network
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Validation(_))
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            StoreError::NotSignedIn => Some("Sign in first; a token is required for remote operations."),
            StoreError::RemoteUnavailable(_) => {
                Some("Check the network connection and credentials, then try again.")
            }
            StoreError::RenameInFlight { .. } => {
                Some("Wait for the pending rename to finish before editing this entry again.")
            }
            StoreError::Reload { .. } => Some("Reload the collection to see the server's current state."),
            StoreError::Validation(ValidationError::CapacityExceeded { .. }) => {
                Some("Delete an entry before adding another.")
            }
            _ => None,
        }
    }
}

/// Result type for remote directory calls
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
