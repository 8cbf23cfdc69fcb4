//! Output format value object

use serde::{Deserialize, Serialize};

/// How a finished discussion is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Transcript, interventions and the report
    Full,
    /// Only the consensus report (default)
    #[default]
    Report,
    /// Session and report as JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(OutputFormat::Full),
            "report" | "synthesis" => Ok(OutputFormat::Report),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Unknown output format: {}. Valid: full, report, json",
                s
            )),
        }
    }
}
