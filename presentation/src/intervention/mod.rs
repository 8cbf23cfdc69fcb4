//! Interactive intervention channel for the terminal.

mod console;

pub use console::{ConsoleIntervention, Parsed, TextRequest, parse_line, resolve_target};
