//! Presentation layer for mdt-consult
//!
//! This crate contains CLI definitions, output formatters,
//! progress reporters, and the console intervention channel.

pub mod cli;
pub mod intervention;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputArg};
pub use intervention::ConsoleIntervention;
pub use output::console::ConsoleFormatter;
pub use output::formatter::OutputFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
