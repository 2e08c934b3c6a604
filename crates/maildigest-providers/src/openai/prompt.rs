//! Prompt, output schema and response parsing for thread summaries.

use maildigest_core::{EmailThread, MAX_REPLIES, ThreadSummary};
use serde_json::{Value, json};
use tracing::warn;

/// Name of the structured-output schema sent to the model.
pub const SCHEMA_NAME: &str = "digest_schema";

const INSTRUCTIONS: &str = "You are an executive assistant creating an email digest entry.
Given the email thread, produce a JSON object with:
- summary: 2–4 sentences summarizing the thread (professional, concise).
- action: one clear suggested action for the user.
- replies: an array with up to 3 objects, each with:
  - label: single-word lowercase label for a button.
  - body: 2–6 sentences, first person, no quotes/signatures.
Return ONLY valid JSON.";

/// Builds the single-turn prompt for `thread`.
pub fn build_prompt(thread: &EmailThread) -> String {
    format!(
        "{INSTRUCTIONS}\n\nFrom: {}\nSubject: {}\nConversation:\n{}",
        thread.sender, thread.subject, thread.text
    )
}

/// JSON schema the model output must conform to.
pub fn summary_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["summary", "action", "replies"],
        "properties": {
            "summary": {"type": "string"},
            "action": {"type": "string"},
            "replies": {
                "type": "array",
                "maxItems": MAX_REPLIES,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["label", "body"],
                    "properties": {
                        "label": {"type": "string"},
                        "body": {"type": "string"}
                    }
                }
            }
        }
    })
}

/// Parses model output into a normalized [`ThreadSummary`].
///
/// Tries the whole text first, then the span between the first `{` and the
/// last `}`. Output that still does not parse yields an empty summary.
pub fn parse_summary(raw: &str) -> ThreadSummary {
    if let Some(summary) = parse_object(raw) {
        return summary.normalized();
    }

    if let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}'))
        && start < end
        && let Some(summary) = parse_object(&raw[start..=end])
    {
        return summary.normalized();
    }

    warn!(len = raw.len(), "model output is not valid JSON, using empty summary");
    ThreadSummary::default()
}

fn parse_object(text: &str) -> Option<ThreadSummary> {
    let value: Value = serde_json::from_str(text.trim()).ok()?;
    if !value.is_object() {
        return None;
    }
    Some(lenient_summary(&value))
}

// Field-by-field so a wrongly typed field only loses itself.
fn lenient_summary(value: &Value) -> ThreadSummary {
    let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).unwrap_or_default().to_string();

    let replies = value
        .get("replies")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .map(|item| maildigest_core::ReplyOption {
                    label: text(item, "label"),
                    body: text(item, "body"),
                })
                .collect()
        })
        .unwrap_or_default();

    ThreadSummary {
        summary: text(value, "summary"),
        action: text(value, "action"),
        replies,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread() -> EmailThread {
        EmailThread {
            conversation_id: "c1".to_string(),
            subject: "Q3 budget".to_string(),
            sender: "Ann <ann@example.com>".to_string(),
            text: "ann@example.com said: Can you review?".to_string(),
            reply_to: Some("ann@example.com".to_string()),
            message_count: 1,
            last_received: None,
        }
    }

    #[test]
    fn prompt_ends_with_thread() {
        let prompt = build_prompt(&thread());
        assert!(prompt.starts_with("You are an executive assistant creating an email digest entry."));
        assert!(prompt.contains("Return ONLY valid JSON.\n\nFrom: Ann <ann@example.com>\nSubject: Q3 budget\n"));
        assert!(prompt.ends_with("Conversation:\nann@example.com said: Can you review?"));
    }

    #[test]
    fn schema_limits_replies() {
        let schema = summary_schema();
        assert_eq!(schema["properties"]["replies"]["maxItems"], 3);
        assert_eq!(schema["additionalProperties"], false);
        assert_eq!(schema["required"], json!(["summary", "action", "replies"]));
    }

    #[test]
    fn parses_clean_json() {
        let raw = r#"{"summary": " Ann wants a review. ", "action": "Review it.",
            "replies": [{"label": "Sure thing", "body": "I will look today."}]}"#;
        let summary = parse_summary(raw);
        assert_eq!(summary.summary, "Ann wants a review.");
        assert_eq!(summary.action, "Review it.");
        assert_eq!(summary.replies.len(), 1);
        assert_eq!(summary.replies[0].label, "sure-thing");
    }

    #[test]
    fn parses_json_inside_prose() {
        let raw = "Here you go:\n```json\n{\"summary\": \"S\", \"action\": \"A\", \"replies\": []}\n```";
        let summary = parse_summary(raw);
        assert_eq!(summary.summary, "S");
        assert_eq!(summary.action, "A");
    }

    #[test]
    fn garbage_yields_empty_summary() {
        assert_eq!(parse_summary("I cannot help with that."), ThreadSummary::default());
        assert_eq!(parse_summary("} nope {"), ThreadSummary::default());
        assert_eq!(parse_summary("[1, 2]"), ThreadSummary::default());
    }

    #[test]
    fn drops_empty_and_extra_replies() {
        let raw = r#"{"summary": "S", "action": "A", "replies": [
            {"label": "a", "body": "one"},
            {"label": "b", "body": "   "},
            {"label": "c", "body": "three"},
            {"label": "d", "body": "four"}
        ]}"#;
        let labels: Vec<_> = parse_summary(raw).replies.into_iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["a", "c"]);
    }

    #[test]
    fn wrongly_typed_fields_are_ignored() {
        let raw = r#"{"summary": 42, "action": "A", "replies": "none"}"#;
        let summary = parse_summary(raw);
        assert_eq!(summary.summary, "");
        assert_eq!(summary.action, "A");
        assert!(summary.replies.is_empty());
    }
}
