//! Terminal output for the command-line tool
//!
//! Per-file status lines go to stderr; stdout is reserved for data
//! (forwarded paths, cache listings) so the tool composes in shell pipelines.

mod context;
mod reporter;

pub use context::UiContext;
pub use reporter::ConsoleReporter;
