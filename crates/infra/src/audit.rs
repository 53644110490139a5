//! Structured audit log of access-control changes.

use atrium_auth::{AccessEvent, AccessEventSink};

/// Writes every [`AccessEvent`] as one `info` line on the `atrium::audit`
/// target, with the full event as a JSON field.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AccessEventSink for TracingAuditSink {
    fn publish(&self, event: &AccessEvent) {
        let payload = serde_json::to_string(event).unwrap_or_else(|e| format!("\"<unserializable: {e}>\""));
        tracing::info!(
            target: "atrium::audit",
            event_type = event.event_type(),
            group = ?event.group_id(),
            occurred_at = %event.occurred_at(),
            payload = %payload,
            "access changed"
        );
    }
}
