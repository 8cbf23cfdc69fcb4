//! Discussion session model.
//!
//! A [`session::DiscussionSession`] owns the case, the participants and an
//! ordered transcript of [`turn::Turn`]s. It is only ever changed through
//! [`event::SessionEvent`]s, which makes the stored event log the single
//! source of truth for resume.

pub mod config;
pub mod event;
pub mod intervention;
pub mod session;
pub mod snapshot;
pub mod state;
pub mod statement;
pub mod transcript;
pub mod turn;
