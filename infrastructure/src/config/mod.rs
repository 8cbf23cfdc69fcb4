//! Configuration file loading for mdt-consult
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `MDT_*` environment variables (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./mdt.toml` or `./.mdt.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/mdt-consult/config.toml`
//! 5. Default values
//!
//! CLI flags are applied on top by the binary.

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileAgentConfig, FileConfig, FileConsistencyConfig,
    FileDiscussionConfig, FileEngineConfig, FileExclusivityRule, FileOutputConfig,
    FileProviderConfig, FileStorageConfig, default_agents,
};
pub use loader::ConfigLoader;
