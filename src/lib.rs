// AskMyDoc - terminal client for asking questions about uploaded spreadsheets

pub mod client;    // Remote document-QA service
pub mod config;
pub mod models;
pub mod session;   // Session state and operation gating
pub mod tui;       // Terminal User Interface
pub mod types;
pub mod utils;

// Re-exports for convenience
pub use client::{HttpRemoteService, RemoteService};
pub use config::Config;
pub use session::SessionController;
pub use types::{AppError, AppResult};
