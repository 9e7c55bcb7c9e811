// Hallucination guard
// A model's claim of "this matches criteria X" is only trusted when X is an
// exact member of the known title set

use std::collections::HashSet;

/// Sentinel the matcher prompt instructs the model to emit when nothing
/// matches; also what any unverifiable title collapses to.
pub const NO_MATCHES: &str = "NO_MATCHES";

/// Outcome of screening a candidate title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// The candidate is an exact member of the reference set.
    Existing(String),
    /// Anything else: the sentinel itself, near-matches, truncations, or
    /// free-form elaborations. Callers must route to the generation path.
    NoMatch,
}

/// Screen a candidate title against the authoritative reference set.
///
/// Membership is exact and case-sensitive: the matcher's free-text output is
/// never trusted to faithfully quote an existing title, so everything short
/// of an exact quote is a no-match.
pub fn screen_title(candidate: &str, known_titles: &HashSet<String>) -> MatchOutcome {
    if candidate == NO_MATCHES {
        return MatchOutcome::NoMatch;
    }
    if known_titles.contains(candidate) {
        MatchOutcome::Existing(candidate.to_string())
    } else {
        MatchOutcome::NoMatch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> HashSet<String> {
        ["web_application", "general_usage"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn exact_member_passes_through_unchanged() {
        assert_eq!(
            screen_title("web_application", &reference()),
            MatchOutcome::Existing("web_application".to_string())
        );
    }

    #[test]
    fn sentinel_is_a_no_match() {
        assert_eq!(screen_title(NO_MATCHES, &reference()), MatchOutcome::NoMatch);
    }

    #[test]
    fn unknown_title_is_rejected() {
        assert_eq!(
            screen_title("new_profile_extra", &reference()),
            MatchOutcome::NoMatch
        );
    }

    #[test]
    fn near_matches_and_truncations_are_rejected() {
        assert_eq!(screen_title("web_app", &reference()), MatchOutcome::NoMatch);
        assert_eq!(
            screen_title("web_application_v2", &reference()),
            MatchOutcome::NoMatch
        );
        assert_eq!(
            screen_title(" web_application", &reference()),
            MatchOutcome::NoMatch
        );
    }

    #[test]
    fn membership_is_case_sensitive() {
        assert_eq!(
            screen_title("Web_Application", &reference()),
            MatchOutcome::NoMatch
        );
    }

    #[test]
    fn empty_reference_set_rejects_everything() {
        let empty = HashSet::new();
        assert_eq!(screen_title("web_application", &empty), MatchOutcome::NoMatch);
    }
}
