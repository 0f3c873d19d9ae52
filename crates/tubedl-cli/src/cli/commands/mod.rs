//! CLI command handlers.

mod console;
mod session;

pub use console::ConsoleProgress;
pub use session::run_session;
