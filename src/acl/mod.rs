//! Wildcard ACL matching.
//!
//! ACLs are dot-segmented permission strings. A granted pattern may contain
//! three special segments:
//!
//! - `*` matches exactly one segment, whatever its value
//! - `#` matches a run of segments: at least one when it closes the
//!   pattern, zero or more when more pattern segments follow
//! - `me` matches the literal segment `me` or the token's own `auth_id`
//!
//! Matching is case-sensitive and segment-aligned: a pattern and a required
//! ACL match only when both cursors reach their end through some valid
//! expansion of `#`/`*`.

/// Evaluate a single granted pattern against a required ACL.
///
/// Pure and deterministic; `auth_id` is only consulted for `me` segments.
#[must_use]
pub fn matches(granted_pattern: &str, required_acl: &str, auth_id: &str) -> bool {
    let pattern: Vec<&str> = granted_pattern.split('.').collect();
    let required: Vec<&str> = required_acl.split('.').collect();

    matches_segments(&pattern, &required, auth_id)
}

fn matches_segments(pattern: &[&str], required: &[&str], auth_id: &str) -> bool {
    let Some((head, tail)) = pattern.split_first() else {
        return required.is_empty();
    };

    match *head {
        "#" => {
            if tail.is_empty() {
                // A closing `#` stands for a non-empty remainder:
                // `foo.bar.#` grants everything below `foo.bar`, not
                // `foo.bar` itself.
                !required.is_empty()
            } else {
                // Try every possible consumption count, shortest first,
                // so the following segments get a chance to align
                // (including directly, consuming nothing).
                (0..=required.len())
                    .any(|taken| matches_segments(tail, &required[taken..], auth_id))
            }
        }
        "*" => !required.is_empty() && matches_segments(tail, &required[1..], auth_id),
        literal => {
            let Some((current, rest)) = required.split_first() else {
                return false;
            };
            let aligned = if literal == "me" {
                *current == "me" || *current == auth_id
            } else {
                literal == *current
            };
            aligned && matches_segments(tail, rest, auth_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::matches;

    const AUTH_ID: &str = "123";

    #[test]
    fn trailing_hashtag_requires_at_least_one_more_segment() {
        assert!(!matches("foo.bar.#", "foo.bar", AUTH_ID));
        assert!(matches("foo.bar.#", "foo.bar.toto", AUTH_ID));
        assert!(matches("foo.bar.#", "foo.bar.toto.tata", AUTH_ID));
        assert!(!matches("foo.bar.#", "other.bar.toto", AUTH_ID));
    }

    #[test]
    fn literal_patterns_match_exactly() {
        assert!(matches("foo.bar.toto", "foo.bar.toto", AUTH_ID));
        assert!(!matches("foo.bar.toto", "foo.bar.toto.tata", AUTH_ID));
        assert!(!matches("foo.bar.toto", "other.bar.toto", AUTH_ID));
        assert!(!matches("foo.bar.toto", "foo.bar", AUTH_ID));
    }

    #[test]
    fn asterisk_matches_exactly_one_segment() {
        assert!(matches("foo.*.*", "foo.bar.toto", AUTH_ID));
        assert!(!matches("foo.*.*", "foo.bar.toto.tata", AUTH_ID));
        assert!(!matches("foo.*.*", "other.bar.toto", AUTH_ID));
        assert!(!matches("foo.*.*", "foo.bar", AUTH_ID));
    }

    #[test]
    fn hashtag_in_middle_requires_the_tail_to_align() {
        assert!(!matches("foo.bar.#.titi", "foo.bar", AUTH_ID));
        assert!(!matches("foo.bar.#.titi", "foo.bar.toto", AUTH_ID));
        assert!(!matches("foo.bar.#.titi", "foo.bar.toto.tata", AUTH_ID));
        assert!(matches("foo.bar.#.titi", "foo.bar.toto.tata.titi", AUTH_ID));
        // Zero-consumption case: the tail aligns directly.
        assert!(matches("foo.bar.#.titi", "foo.bar.titi", AUTH_ID));
    }

    #[test]
    fn me_matches_the_auth_id_or_the_literal() {
        assert!(!matches("foo.#.me", "foo.bar", AUTH_ID));
        assert!(matches("foo.#.me", "foo.bar.me", AUTH_ID));
        assert!(matches("foo.#.me", "foo.bar.123", AUTH_ID));
        assert!(matches("foo.#.me", "foo.bar.toto.me", AUTH_ID));
        assert!(matches("foo.#.me", "foo.bar.toto.123", AUTH_ID));
        assert!(!matches("foo.#.me", "foo.bar.toto.me.titi", AUTH_ID));
        assert!(!matches("foo.#.me", "foo.bar.toto.123.titi", AUTH_ID));
    }

    #[test]
    fn me_in_middle() {
        assert!(!matches("foo.#.me.bar", "foo.bar.123", AUTH_ID));
        assert!(!matches("foo.#.me.bar", "foo.bar.me", AUTH_ID));
        assert!(matches("foo.#.me.bar", "foo.bar.123.bar", AUTH_ID));
        assert!(matches("foo.#.me.bar", "foo.bar.me.bar", AUTH_ID));
        assert!(matches("foo.#.me.bar", "foo.bar.toto.123.bar", AUTH_ID));
        assert!(matches("foo.#.me.bar", "foo.bar.toto.me.bar", AUTH_ID));
    }

    #[test]
    fn me_never_matches_another_literal() {
        assert!(!matches("foo.me", "foo.456", AUTH_ID));
        assert!(!matches("foo.me", "foo.toto", AUTH_ID));
    }

    #[test]
    fn single_segment_patterns() {
        assert!(matches("foo", "foo", AUTH_ID));
        assert!(!matches("foo", "foo.bar", AUTH_ID));
        assert!(!matches("foo", "bar", AUTH_ID));
    }

    #[test]
    fn hashtag_only_matches_everything() {
        assert!(matches("#", "foo", AUTH_ID));
        assert!(matches("#", "foo.bar.toto", AUTH_ID));
    }

    #[test]
    fn consecutive_hashtags_collapse() {
        assert!(matches("foo.#.#", "foo.bar", AUTH_ID));
        assert!(matches("foo.#.#.bar", "foo.bar", AUTH_ID));
        assert!(!matches("foo.#.#.bar", "foo.baz", AUTH_ID));
    }

    #[test]
    fn matching_is_case_sensitive() {
        assert!(!matches("foo.bar", "foo.BAR", AUTH_ID));
        assert!(!matches("Foo.bar", "foo.bar", AUTH_ID));
    }
}
