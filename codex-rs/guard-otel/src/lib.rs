//! A minimal metrics facade modeled on the upstream `OtelManager`, stripped
//! down to what this workspace actually needs: counters and point-in-time
//! events surfaced as structured `tracing` records. There is no exporter
//! pipeline here — whoever operates the bot wires `tracing-subscriber` to
//! whatever sink they like (stdout, a log shipper, an OTLP collector
//! listening on the fmt layer) the same way `guard-cli` sets up logging.

use tracing::field::display;

/// Handle reconciliation and dispatch code call on every notable event.
/// Cloned freely; all state is immutable.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuardMetrics;

impl GuardMetrics {
    pub fn new() -> Self {
        Self
    }

    /// Record a counter increment, e.g. `counter("review.transition", 1,
    /// &[("from", "NEED_TO_APPROVE"), ("to", "WAITING_FOR_APPROVE")])`.
    pub fn counter(&self, name: &str, inc: i64, tags: &[(&str, &str)]) {
        let tag_list = render_tags(tags);
        tracing::info!(
            target: "guard_otel::counter",
            metric = display(name),
            inc,
            tags = display(tag_list),
            "counter"
        );
    }

    /// Record a one-off event with no numeric value, e.g. a state machine
    /// invariant violation or an adapter falling back to a retry.
    pub fn event(&self, name: &str, tags: &[(&str, &str)]) {
        let tag_list = render_tags(tags);
        tracing::info!(
            target: "guard_otel::event",
            metric = display(name),
            tags = display(tag_list),
            "event"
        );
    }
}

fn render_tags(tags: &[(&str, &str)]) -> String {
    tags.iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_tags_joins_with_commas() {
        assert_eq!(render_tags(&[("a", "1"), ("b", "2")]), "a=1,b=2");
        assert_eq!(render_tags(&[]), "");
    }

    #[test]
    fn counter_and_event_do_not_panic_without_a_subscriber() {
        let metrics = GuardMetrics::new();
        metrics.counter("review.transition", 1, &[("to", "APPROVED")]);
        metrics.event("family_index.refresh", &[("login", "jdoe")]);
    }
}
