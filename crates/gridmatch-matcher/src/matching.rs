//! Two-way matching engine over parsed descriptors.

use crate::expr::{evaluate_requirements, parse, Descriptor};
use thiserror::Error;

/// Result of matching two descriptors against each other's `Requirements`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    /// `a`'s requirements are satisfied by `b`.
    pub ltr: bool,
    /// `b`'s requirements are satisfied by `a`.
    pub rtl: bool,
}

impl MatchOutcome {
    /// Both directions hold.
    #[must_use]
    pub const fn symmetric(&self) -> bool {
        self.ltr && self.rtl
    }
}

/// Reserved for callers that pass raw descriptor text through [`match_text`]
/// instead of already-parsed descriptors; this crate's own callers always
/// match already-parsed [`Descriptor`]s via [`match_descriptors`], which never
/// fails.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("cannot match: {0}")]
pub struct MatchError(pub String);

/// Evaluates both directions of `Requirements` satisfaction between `a` and
/// `b`. An evaluation error on one side taints only that side's result — it
/// never aborts the other direction's evaluation.
#[must_use]
pub fn match_descriptors(a: &Descriptor, b: &Descriptor) -> MatchOutcome {
    MatchOutcome {
        ltr: evaluate_requirements(a, b),
        rtl: evaluate_requirements(b, a),
    }
}

/// Convenience wrapper for callers holding raw descriptor text on both sides.
pub fn match_text(a: &str, b: &str) -> Result<MatchOutcome, MatchError> {
    let da = parse(a).map_err(|e| MatchError(format!("left descriptor: {e}")))?;
    let db = parse(b).map_err(|e| MatchError(format!("right descriptor: {e}")))?;
    Ok(match_descriptors(&da, &db))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_match() {
        let a = crate::expr::parse(r#"[ CPUs = 4; Requirements = (other.CPUs <= self.CPUs); ]"#).unwrap();
        let b = crate::expr::parse(r#"[ CPUs = 2; Requirements = (other.CPUs >= self.CPUs); ]"#).unwrap();
        let outcome = match_descriptors(&a, &b);
        assert!(outcome.ltr);
        assert!(outcome.rtl);
        assert!(outcome.symmetric());
    }

    #[test]
    fn test_one_sided_match_is_not_symmetric() {
        let a = crate::expr::parse(r#"[ CPUs = 4; Requirements = (other.CPUs <= self.CPUs); ]"#).unwrap();
        let b = crate::expr::parse("[ CPUs = 8; ]").unwrap();
        let outcome = match_descriptors(&a, &b);
        assert!(!outcome.ltr);
        assert!(outcome.rtl); // b has no Requirements, defaults to true
        assert!(!outcome.symmetric());
    }

    #[test]
    fn test_match_symmetry_property() {
        let a = crate::expr::parse(r#"[ Site = "CERN"; Requirements = (other.Site == self.Site); ]"#).unwrap();
        let b = crate::expr::parse(r#"[ Site = "CERN"; Requirements = (other.Site == self.Site); ]"#).unwrap();
        let forward = match_descriptors(&a, &b);
        let backward = match_descriptors(&b, &a);
        assert_eq!(forward.symmetric(), backward.symmetric());
    }

    #[test]
    fn test_match_text() {
        let result = match_text("[ CPUs = 4; ]", "[ CPUs = 2; ]").unwrap();
        assert!(result.symmetric());
    }
}
