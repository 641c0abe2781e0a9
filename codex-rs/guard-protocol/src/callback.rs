use std::str::FromStr;

use crate::decision::Decision;
use crate::ids::ReviewId;

/// Render a callback payload as `ACTION:review_id`. See spec §6.
pub fn format_callback(decision: Decision, review_id: ReviewId) -> String {
    format!("{decision}:{review_id}")
}

/// Parse a callback payload produced by [`format_callback`].
///
/// Splits on the *first* `:` — anything remaining in the id, including
/// further colons, is preserved verbatim.
pub fn parse_callback(payload: &str) -> Option<(Decision, ReviewId)> {
    let (action, id) = payload.split_once(':')?;
    let decision = Decision::from_str(action).ok()?;
    let review_id = ReviewId::from_str(id).ok()?;
    Some((decision, review_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn round_trips_for_every_decision() {
        let id = ReviewId::new();
        for decision in [Decision::Approve, Decision::Decline] {
            let payload = format_callback(decision, id);
            let (parsed_decision, parsed_id) = parse_callback(&payload).expect("parses");
            assert_eq!(parsed_decision, decision);
            assert_eq!(parsed_id, id);
        }
    }

    #[test]
    fn rejects_malformed_payloads() {
        assert_eq!(parse_callback("not-a-payload"), None);
        assert_eq!(parse_callback("MAYBE:not-a-uuid"), None);
        assert_eq!(parse_callback(""), None);
    }

    #[test]
    fn splits_on_first_colon_only() {
        let id = ReviewId::new();
        let payload = format!("APPROVE:{id}");
        assert!(payload.matches(':').count() == 1);
        let (decision, parsed_id) = parse_callback(&payload).expect("parses");
        assert_eq!(decision, Decision::Approve);
        assert_eq!(parsed_id, id);
    }
}
