// Centralized error types for the client

use std::path::PathBuf;
use thiserror::Error;

/// Input problems caught before any request is sent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field must be a number: {0}")]
    NotANumber(&'static str),

    #[error("Auth level must be 1 (admin) or 2 (standard), got {0}")]
    InvalidAuthLevel(i64),

    #[error("Channel must be between 1 and 5, got {0}")]
    ChannelOutOfRange(i64),

    #[error("No user selected")]
    NoSelection,

    #[error("Server address is required")]
    MissingBaseUrl,

    #[error("Invalid server address: {0}")]
    InvalidAddress(String),
}

/// Failures of a single backend call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("HTTP error {0}")]
    Status(u16),

    #[error("Invalid response from backend: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status code, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status(code) => Some(*code),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to access preference store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupted preference store {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },

    #[error("Failed to encode preferences: {0}")]
    Encode(String),
}

/// Errors surfaced to the presentation layer by controller actions.
/// None of them is fatal; the controller stays on a valid screen.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Channel {0} is already assigned to another user")]
    ChannelOccupied(u8),

    #[error("No channel assigned to this user")]
    ChannelUnavailable,

    #[error("Action unavailable: {0}")]
    NotReady(&'static str),
}

impl ClientError {
    /// True for transport failures, the "generic network error" class
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Api(err) if err.is_transport())
    }
}
