//! Consistency checking.

pub mod checker;
pub mod rule;

pub use checker::ConsistencyChecker;
pub use rule::ExclusivityRule;
