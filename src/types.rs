// Error taxonomy shared by the client, the session controller and the UI

use crate::session::Pending;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppError {
    /// Rejected locally before reaching the network (empty question, empty selection)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Operation not allowed in the current session state (no dataset yet)
    #[error("{0}")]
    Precondition(String),

    /// Another operation is still in flight
    #[error("Busy: {} in progress", .0.label())]
    Busy(Pending),

    /// Network unreachable, connection reset or timeout
    #[error("Network error: {0}")]
    Transport(String),

    /// The remote answered with a failure status or an unreadable body
    #[error("{message}")]
    Service {
        status: Option<u16>,
        message: String,
    },
}

impl AppError {
    pub fn service(status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::Service {
            status,
            message: message.into(),
        }
    }

    /// True for failures produced by the remote call itself
    pub fn is_remote(&self) -> bool {
        matches!(self, AppError::Transport(_) | AppError::Service { .. })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return AppError::service(
                err.status().map(|s| s.as_u16()),
                format!("Malformed response: {}", err),
            );
        }
        if err.is_timeout() {
            return AppError::Transport(format!("request timed out: {}", err));
        }
        AppError::Transport(err.to_string())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
