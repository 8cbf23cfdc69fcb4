//! Application-level configuration.
//!
//! - [`EngineParams`] - retry, intervention wait and drain control

pub mod engine_params;

pub use engine_params::EngineParams;
