//! Session persistence.
//!
//! Provides [`JsonlSessionStore`], an append-only JSONL event log that
//! implements the [`SessionStore`](mdt_application::SessionStore) port.

mod jsonl_store;

pub use jsonl_store::JsonlSessionStore;
