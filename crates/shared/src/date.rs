use time::OffsetDateTime;

/// Normalizes a user-supplied tag the same way everywhere a tag is written
/// or matched against: trimmed and lowercased. `by_user_and_tag` lookups and
/// `Subscribe`/selector writes all go through this so "Work", " work " and
/// "work" are the same tag.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim().to_lowercase()
}

/// `true` once `at` is no longer in the future relative to `now`, the test
/// schedulers use to decide whether a reminder offset would fire in the past
/// and should be skipped rather than scheduled (see the scheduler's
/// `create_for`).
pub fn is_past(at: OffsetDateTime, now: OffsetDateTime) -> bool {
    at <= now
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn normalize_tag_trims_and_lowercases() {
        assert_eq!(normalize_tag("  Work  "), "work");
        assert_eq!(normalize_tag("URGENT"), "urgent");
    }

    #[test]
    fn is_past_boundary_is_inclusive() {
        let now = datetime!(2026-01-01 12:00:00 UTC);
        assert!(is_past(now, now));
        assert!(is_past(now - time::Duration::seconds(1), now));
        assert!(!is_past(now + time::Duration::seconds(1), now));
    }
}
