//! Clinical case input.

use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The case under discussion (Value Object).
///
/// Supplied once when a session is created and never modified afterwards;
/// information added during the discussion is kept as [`SuppliedNote`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    chief_complaint: String,
    #[serde(default)]
    history: String,
    #[serde(default)]
    findings: String,
    question: String,
}

impl CaseRecord {
    /// Create a case record.
    ///
    /// The chief complaint and the question put to the team are required.
    pub fn new(
        chief_complaint: impl Into<String>,
        history: impl Into<String>,
        findings: impl Into<String>,
        question: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let case = Self {
            chief_complaint: chief_complaint.into(),
            history: history.into(),
            findings: findings.into(),
            question: question.into(),
        };
        case.validate()?;
        Ok(case)
    }

    /// Check the required fields (also used after deserialization).
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.chief_complaint.trim().is_empty() {
            return Err(DomainError::InvalidCase(
                "chief complaint cannot be empty".to_string(),
            ));
        }
        if self.question.trim().is_empty() {
            return Err(DomainError::InvalidCase(
                "discussion question cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn chief_complaint(&self) -> &str {
        &self.chief_complaint
    }

    pub fn history(&self) -> &str {
        &self.history
    }

    pub fn findings(&self) -> &str {
        &self.findings
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    /// Render the case as a plain-text block for agent prompts.
    pub fn render(&self) -> String {
        let mut out = format!("Chief complaint: {}\n", self.chief_complaint.trim());
        if !self.history.trim().is_empty() {
            out.push_str(&format!("History: {}\n", self.history.trim()));
        }
        if !self.findings.trim().is_empty() {
            out.push_str(&format!("Examination / laboratory findings: {}\n", self.findings.trim()));
        }
        out.push_str(&format!("Question for the team: {}", self.question.trim()));
        out
    }
}

/// Information a human added to the case during the discussion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppliedNote {
    pub text: String,
    /// Round during which the note was supplied
    pub round: u32,
    pub supplied_at: DateTime<Utc>,
}
