//! Core domain concepts shared across all subdomains.
//!
//! - [`error::DomainError`] - domain-level errors
//! - [`error::SessionStateError`] - rejected state machine operations

pub mod error;
