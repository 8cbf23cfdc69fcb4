//! Advisory consistency checking of candidate statements.
//!
//! The checker only annotates. It never rejects, reorders or rewrites a
//! statement; the resulting flags feed the transcript and the synthesizer.

use super::rule::ExclusivityRule;
use crate::claims::Claim;
use crate::core::error::DomainError;
use crate::discussion::statement::{ConsistencyFlags, StatementDraft};
use crate::discussion::transcript::Transcript;
use crate::util::excerpt;

/// Evaluates candidate statements against prior statements.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyChecker {
    rules: Vec<ExclusivityRule>,
}

impl ConsistencyChecker {
    pub fn new(rules: Vec<ExclusivityRule>) -> Result<Self, DomainError> {
        for rule in &rules {
            rule.validate()?;
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[ExclusivityRule] {
        &self.rules
    }

    /// Compute flags for `draft` against the delivered statements of `prior`.
    ///
    /// Contradiction links point at earlier statements only; the session
    /// adds the reciprocal back references when the statement is recorded.
    pub fn check(&self, draft: &StatementDraft, prior: Transcript<'_>) -> ConsistencyFlags {
        let mut flags = ConsistencyFlags::default();
        if !draft.is_delivered() {
            return flags;
        }

        for line in &draft.extraction.unparseable {
            flags
                .low_confidence
                .push(format!("unparseable claim line: {}", excerpt(line, 80)));
        }

        let claims = &draft.extraction.claims;
        for claim in claims {
            let covering: Vec<&str> = self
                .rules
                .iter()
                .filter(|r| r.covers(claim.kind, &claim.category))
                .map(|r| r.name.as_str())
                .collect();
            if covering.len() > 1 {
                flags.low_confidence.push(format!(
                    "{} '{}' matches several rules: {}",
                    claim.kind,
                    claim.category,
                    covering.join(", ")
                ));
            }
        }

        for (i, a) in claims.iter().enumerate() {
            for b in &claims[i + 1..] {
                if let Some(rule) = self.violated_rule(a, b) {
                    flags.low_confidence.push(format!(
                        "asserts exclusive {}s '{}' and '{}' ({})",
                        a.kind, a.category, b.category, rule.name
                    ));
                }
            }
        }

        for earlier in prior.delivered() {
            let conflicting = claims.iter().any(|mine| {
                earlier
                    .extraction()
                    .claims
                    .iter()
                    .any(|theirs| self.violated_rule(mine, theirs).is_some())
            });
            if conflicting {
                flags.contradicts.insert(earlier.id());
            }
        }

        flags
    }

    /// Return `draft` with its flags set by [`check`](Self::check).
    pub fn annotate(&self, draft: StatementDraft, prior: Transcript<'_>) -> StatementDraft {
        let flags = self.check(&draft, prior);
        draft.with_flags(flags)
    }

    fn violated_rule(&self, a: &Claim, b: &Claim) -> Option<&ExclusivityRule> {
        if a.kind != b.kind {
            return None;
        }
        self.rules
            .iter()
            .find(|r| r.conflicts(a.kind, &a.category, &b.category))
    }
}
