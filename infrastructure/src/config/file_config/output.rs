//! How a finished consultation is printed (`[output]` section)
//!
//! ```toml
//! [output]
//! format = "report"   # full | report | json
//! color = false
//! ```

use mdt_domain::OutputFormat;
use serde::{Deserialize, Serialize};

/// Printing preferences for the consultation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Preferred view when `--output` is not given
    pub format: Option<OutputFormat>,
    /// ANSI styling for the transcript and report
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

impl FileOutputConfig {
    /// Pick the view to print: the command line wins over this section,
    /// which wins over [`OutputFormat::default`].
    pub fn resolve_format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.or(self.format).unwrap_or_default()
    }

    /// Whether styling should be emitted.
    ///
    /// A non-empty `NO_COLOR` turns it off regardless of the file.
    pub fn color_enabled(&self) -> bool {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        self.color && !no_color
    }
}
