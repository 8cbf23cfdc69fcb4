//! Claim extraction from specialist statements.
//!
//! Statements are free text. The engine never interprets clinical meaning;
//! it only reads tagged lines that agents are instructed to emit:
//!
//! ```text
//! Diagnosis: heart failure with reduced ejection fraction
//! Recommendation: loop diuretic
//! ```
//!
//! | Tag | Aliases | Kind |
//! |-----|---------|------|
//! | `Diagnosis` | `Dx`, `Primary diagnosis` | [`ClaimKind::Diagnosis`] |
//! | `Recommendation` | `Plan`, `Primary recommendation` | [`ClaimKind::Recommendation`] |
//!
//! Tags are case-insensitive, may be preceded by list markers or markdown
//! emphasis, and accept both `:` and the full-width `：`.

use serde::{Deserialize, Serialize};

/// Kind of discrete claim a statement can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimKind {
    Diagnosis,
    Recommendation,
}

impl ClaimKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimKind::Diagnosis => "diagnosis",
            ClaimKind::Recommendation => "recommendation",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "diagnosis" | "dx" | "primary diagnosis" => Some(ClaimKind::Diagnosis),
            "recommendation" | "plan" | "primary recommendation" => {
                Some(ClaimKind::Recommendation)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ClaimKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClaimKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimKind::from_tag(&s.trim().to_lowercase())
            .ok_or_else(|| format!("Unknown claim kind: {}. Valid: diagnosis, recommendation", s))
    }
}

/// A single declared claim with its normalised category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Claim {
    pub kind: ClaimKind,
    pub category: String,
}

impl Claim {
    pub fn new(kind: ClaimKind, category: &str) -> Self {
        Self {
            kind,
            category: normalize_category(category),
        }
    }
}

/// Result of scanning a statement for claims.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimExtraction {
    pub claims: Vec<Claim>,
    /// Tagged lines whose value could not be read (e.g. `Diagnosis:` with nothing after it)
    pub unparseable: Vec<String>,
}

impl ClaimExtraction {
    /// The primary recommendation category: first recommendation claim,
    /// falling back to the first diagnosis claim.
    pub fn primary_category(&self) -> Option<&str> {
        self.first_of(ClaimKind::Recommendation)
            .or_else(|| self.first_of(ClaimKind::Diagnosis))
    }

    pub fn first_of(&self, kind: ClaimKind) -> Option<&str> {
        self.claims
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.category.as_str())
    }
}

/// Normalise a category for comparison: trim, lower-case, collapse
/// internal whitespace and drop trailing punctuation.
pub fn normalize_category(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(['.', '。', ';', ','])
        .to_lowercase()
}

/// Extract tagged claims from a statement body.
///
/// # Examples
///
/// ```
/// use mdt_domain::claims::{extract_claims, ClaimKind};
///
/// let extraction = extract_claims("Assessment...\n**Diagnosis:** Heart Failure.\n- Plan: diuretics");
/// assert_eq!(extraction.first_of(ClaimKind::Diagnosis), Some("heart failure"));
/// assert_eq!(extraction.primary_category(), Some("diuretics"));
/// ```
pub fn extract_claims(content: &str) -> ClaimExtraction {
    let mut extraction = ClaimExtraction::default();

    for line in content.lines() {
        let stripped = line
            .trim()
            .trim_start_matches(['-', '*', '#', '>', '•'])
            .trim();

        let Some((tag, value)) = split_tag(stripped) else {
            continue;
        };

        let tag = tag.trim_matches('*').trim().to_lowercase();
        let Some(kind) = ClaimKind::from_tag(&tag) else {
            continue;
        };

        let value = value.trim().trim_matches('*').trim();
        let category = normalize_category(value);
        if category.is_empty() {
            extraction.unparseable.push(line.trim().to_string());
        } else {
            extraction.claims.push(Claim { kind, category });
        }
    }

    extraction
}

fn split_tag(line: &str) -> Option<(&str, &str)> {
    let pos = line.find([':', '：'])?;
    let sep_len = line[pos..].chars().next().map(char::len_utf8).unwrap_or(1);
    Some((&line[..pos], &line[pos + sep_len..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_both_kinds() {
        let text = "The echo shows reduced EF.\nDiagnosis: HFrEF\nRecommendation: Start ARNI.";
        let extraction = extract_claims(text);
        assert_eq!(extraction.claims.len(), 2);
        assert_eq!(extraction.first_of(ClaimKind::Diagnosis), Some("hfref"));
        assert_eq!(extraction.primary_category(), Some("start arni"));
    }

    #[test]
    fn test_primary_falls_back_to_diagnosis() {
        let extraction = extract_claims("Dx: acute kidney injury");
        assert_eq!(extraction.primary_category(), Some("acute kidney injury"));
    }

    #[test]
    fn test_markdown_and_fullwidth_colon() {
        let extraction = extract_claims("- **Diagnosis**：Cardiorenal   Syndrome");
        assert_eq!(
            extraction.first_of(ClaimKind::Diagnosis),
            Some("cardiorenal syndrome")
        );
    }

    #[test]
    fn test_empty_value_is_unparseable() {
        let extraction = extract_claims("Diagnosis:\nRecommendation: observe");
        assert_eq!(extraction.unparseable, vec!["Diagnosis:".to_string()]);
        assert_eq!(extraction.claims.len(), 1);
    }

    #[test]
    fn test_untagged_text_has_no_claims() {
        let extraction = extract_claims("Note: the patient is stable. Time: 10:30");
        assert!(extraction.claims.is_empty());
        assert!(extraction.unparseable.is_empty());
        assert_eq!(extraction.primary_category(), None);
    }

    #[test]
    fn test_claim_kind_from_str() {
        assert_eq!("Diagnosis".parse::<ClaimKind>(), Ok(ClaimKind::Diagnosis));
        assert_eq!("plan".parse::<ClaimKind>(), Ok(ClaimKind::Recommendation));
        assert!("prognosis".parse::<ClaimKind>().is_err());
    }
}
