//! Reasoning provider configuration from TOML (`[provider]` section)
//!
//! Any OpenAI-compatible chat-completions endpoint (vLLM, Ollama, hosted
//! APIs) can back the specialist agents.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileProviderConfig {
    /// Base URL up to and including the version segment (e.g. `.../v1`)
    pub api_base: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Direct API key (prefer `api_key_env`)
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for FileProviderConfig {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:7778/v1".to_string(),
            model: "qwen3-next".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            temperature: 0.3,
            max_tokens: 2000,
        }
    }
}

impl FileProviderConfig {
    /// Resolve the API key, preferring the environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}
