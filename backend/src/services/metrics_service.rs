//! Prometheus metric names and recording helpers.

use metrics::{counter, gauge};

/// Record a completed contract analysis, labeled by input kind
/// ("text" or "attachment").
pub fn record_analysis(input_kind: &'static str) {
    counter!("leaseguard_analyses_total", "input" => input_kind).increment(1);
}

/// Record a rejected analysis (validation or entitlement).
pub fn record_analysis_rejected(reason: &'static str) {
    counter!("leaseguard_analyses_rejected_total", "reason" => reason).increment(1);
}

/// Record a processed webhook event by type.
pub fn record_webhook_event(event_type: &str) {
    counter!("leaseguard_webhook_events_total", "type" => event_type.to_string()).increment(1);
}

/// Record an AI provider retry.
pub fn record_ai_retry() {
    counter!("leaseguard_ai_retries_total").increment(1);
}

/// Update database-derived gauges.
pub fn set_usage_gauges(users: i64, analyses: i64) {
    gauge!("leaseguard_users").set(users as f64);
    gauge!("leaseguard_analyses_stored").set(analyses as f64);
}
