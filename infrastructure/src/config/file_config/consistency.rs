//! Consistency rules from TOML (`[consistency]` section)
//!
//! ```toml
//! [[consistency.rules]]
//! name = "volume-management"
//! kind = "recommendation"
//! categories = ["diuresis", "iv fluids"]
//! ```

use mdt_domain::{ClaimKind, ExclusivityRule};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileExclusivityRule {
    pub name: String,
    pub kind: ClaimKind,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConsistencyConfig {
    pub rules: Vec<FileExclusivityRule>,
}

impl FileConsistencyConfig {
    /// Build domain rules; validation happens in the checker constructor.
    pub fn to_rules(&self) -> Vec<ExclusivityRule> {
        self.rules
            .iter()
            .map(|r| ExclusivityRule::new(r.name.clone(), r.kind, &r.categories))
            .collect()
    }
}
