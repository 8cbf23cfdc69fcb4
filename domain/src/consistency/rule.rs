//! Mutual exclusivity rules between claim categories.

use crate::claims::{ClaimKind, normalize_category};
use crate::core::error::DomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Declares that any two distinct categories of the set, asserted for the
/// same claim kind, cannot both hold.
///
/// # Example
///
/// ```
/// use mdt_domain::claims::ClaimKind;
/// use mdt_domain::consistency::ExclusivityRule;
///
/// let rule = ExclusivityRule::new(
///     "volume-management",
///     ClaimKind::Recommendation,
///     ["Diuresis", "IV fluids"],
/// );
/// assert!(rule.conflicts(ClaimKind::Recommendation, "diuresis", "iv fluids"));
/// assert!(!rule.conflicts(ClaimKind::Diagnosis, "diuresis", "iv fluids"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusivityRule {
    pub name: String,
    pub kind: ClaimKind,
    pub categories: BTreeSet<String>,
}

impl ExclusivityRule {
    /// Build a rule; categories are normalised the same way claims are.
    pub fn new<I, S>(name: impl Into<String>, kind: ClaimKind, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            kind,
            categories: categories
                .into_iter()
                .map(|c| normalize_category(c.as_ref()))
                .filter(|c| !c.is_empty())
                .collect(),
        }
    }

    /// A rule needs at least two categories to exclude anything.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.name.trim().is_empty() {
            return Err(DomainError::InvalidConfig(
                "exclusivity rule name must not be empty".to_string(),
            ));
        }
        if self.categories.len() < 2 {
            return Err(DomainError::InvalidConfig(format!(
                "exclusivity rule '{}' needs at least two categories",
                self.name
            )));
        }
        Ok(())
    }

    pub fn covers(&self, kind: ClaimKind, category: &str) -> bool {
        self.kind == kind && self.categories.contains(category)
    }

    /// Whether asserting both categories for `kind` breaks this rule.
    pub fn conflicts(&self, kind: ClaimKind, a: &str, b: &str) -> bool {
        a != b && self.covers(kind, a) && self.covers(kind, b)
    }
}
