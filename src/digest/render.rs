//! Digest rendering
//!
//! Channel-type-specific presentation of a compiled `DigestPayload`
//! into `(title, message, data)` consumed by `Dispatcher::dispatch`
//! (spec §4.4).

use serde_json::{json, Value};

use crate::models::DigestPayload;

fn normalized_entries(payload: &DigestPayload) -> Vec<Value> {
    payload
        .entries
        .iter()
        .map(|e| {
            json!({
                "id": e.id,
                "alertId": e.alert_id,
                "ruleId": e.rule_id,
                "severity": e.severity.to_string(),
                "eventType": e.event_type,
                "title": e.title,
                "message": e.message,
                "queuedAt": e.queued_at.to_rfc3339(),
            })
        })
        .collect()
}

fn plaintext_summary(payload: &DigestPayload) -> String {
    let mut lines = Vec::with_capacity(payload.entries.len() + 1);
    lines.push(format!(
        "{} alerts between {} and {}",
        payload.total_count,
        payload.oldest.to_rfc3339(),
        payload.newest.to_rfc3339()
    ));
    for entry in &payload.entries {
        lines.push(format!("- [{}] {}: {}", entry.severity, entry.title, entry.message));
    }
    lines.join("\n")
}

fn title(payload: &DigestPayload) -> String {
    format!("Alert Digest ({} alerts)", payload.total_count)
}

/// Email rendering: an HTML body alongside the plaintext summary,
/// carried in `data.html` since `Dispatcher::dispatch` only takes one
/// message string.
pub fn render_email(payload: &DigestPayload) -> (String, String, Value) {
    let message = plaintext_summary(payload);
    let html_rows: String = payload
        .entries
        .iter()
        .map(|e| format!("<li><b>[{}]</b> {}: {}</li>", e.severity, e.title, e.message))
        .collect();
    let data = json!({
        "digestId": payload.digest_id,
        "channelId": payload.channel_id,
        "severityCounts": payload.severity_counts,
        "totalCount": payload.total_count,
        "oldest": payload.oldest.to_rfc3339(),
        "newest": payload.newest.to_rfc3339(),
        "entries": normalized_entries(payload),
        "html": format!("<ul>{html_rows}</ul>"),
    });
    (title(payload), message, data)
}

/// Webhook rendering: structured JSON of summaries, no HTML.
pub fn render_webhook(payload: &DigestPayload) -> (String, String, Value) {
    let message = plaintext_summary(payload);
    let data = json!({
        "digestId": payload.digest_id,
        "channelId": payload.channel_id,
        "severityCounts": payload.severity_counts,
        "totalCount": payload.total_count,
        "oldest": payload.oldest.to_rfc3339(),
        "newest": payload.newest.to_rfc3339(),
        "entries": normalized_entries(payload),
    });
    (title(payload), message, data)
}

/// Generic rendering: plaintext summary only.
pub fn render_generic(payload: &DigestPayload) -> (String, String, Value) {
    let message = plaintext_summary(payload);
    let data = json!({
        "digestId": payload.digest_id,
        "channelId": payload.channel_id,
        "totalCount": payload.total_count,
    });
    (title(payload), message, data)
}

pub fn render(channel_type: &str, payload: &DigestPayload) -> (String, String, Value) {
    match channel_type {
        "email" => render_email(payload),
        "webhook" => render_webhook(payload),
        _ => render_generic(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use chrono::Utc;
    use std::collections::HashMap;

    fn sample_payload() -> DigestPayload {
        let now = Utc::now();
        DigestPayload {
            digest_id: "d1".to_string(),
            channel_id: "c1".to_string(),
            channel_type: "email".to_string(),
            entries: vec![crate::models::AlertDigestEntry {
                id: "e1".to_string(),
                alert_id: "a1".to_string(),
                rule_id: "r1".to_string(),
                channel_id: "c1".to_string(),
                channel_type: "email".to_string(),
                severity: Severity::Critical,
                event_type: "router.offline".to_string(),
                title: "Router offline".to_string(),
                message: "edge-12 unreachable".to_string(),
                data: None,
                bypass_sent: false,
                queued_at: now,
                delivered_at: None,
                digest_id: None,
            }],
            severity_counts: HashMap::from([("critical".to_string(), 1)]),
            oldest: now,
            newest: now,
            total_count: 1,
        }
    }

    #[test]
    fn email_title_includes_total_count() {
        let (title, _, _) = render_email(&sample_payload());
        assert_eq!(title, "Alert Digest (1 alerts)");
    }

    #[test]
    fn webhook_data_carries_normalized_entries() {
        let (_, _, data) = render_webhook(&sample_payload());
        assert_eq!(data["entries"][0]["alertId"], "a1");
    }

    #[test]
    fn generic_render_omits_entry_detail() {
        let (_, message, data) = render_generic(&sample_payload());
        assert!(message.contains("Router offline"));
        assert!(data.get("entries").is_none());
    }
}
