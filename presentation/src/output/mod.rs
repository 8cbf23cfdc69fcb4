//! Output formatting for finished discussions

pub mod console;
pub mod formatter;
