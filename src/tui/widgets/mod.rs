//! TUI Widgets
//!
//! Custom widgets for the AskMyDoc TUI.

mod activity;
mod schema;
mod selection;

pub use activity::render_activity;
pub use schema::render_schema;
pub use selection::{render_selection, selection_height};
