//! RawMessage to EmailThread grouping.
//!
//! Messages are grouped by conversation id, in the order each conversation
//! is first seen. Within a thread messages are ordered oldest first and
//! flattened into one `"<address> said: <preview>"` line each.

use std::collections::HashMap;

use maildigest_core::{EmailThread, NO_SUBJECT, is_digest_subject};
use tracing::debug;

use crate::raw_message::RawMessage;

/// Groups messages into conversation threads.
///
/// Messages without a conversation id are ignored, as are threads whose
/// subject is one of our own digest subjects.
pub fn group_into_threads(messages: &[RawMessage]) -> Vec<EmailThread> {
    let mut order: Vec<(&str, Vec<&RawMessage>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for msg in messages {
        let Some(cid) = msg.conversation_id.as_deref().filter(|c| !c.is_empty()) else {
            debug!(id = %msg.id, "skipping message without conversation id");
            continue;
        };
        match index.get(cid) {
            Some(&i) => order[i].1.push(msg),
            None => {
                index.insert(cid, order.len());
                order.push((cid, vec![msg]));
            }
        }
    }

    debug!(conversations = order.len(), messages = messages.len(), "grouped messages");

    order
        .into_iter()
        .filter_map(|(cid, mut msgs)| {
            // Stable sort: messages without a timestamp come first.
            msgs.sort_by_key(|m| m.received_date_time);
            build_thread(cid, &msgs)
        })
        .collect()
}

fn build_thread(conversation_id: &str, msgs: &[&RawMessage]) -> Option<EmailThread> {
    let first = msgs.first()?;

    let subject = first
        .subject
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(NO_SUBJECT)
        .to_string();

    if is_digest_subject(&subject) {
        debug!(%subject, "skipping our own digest thread");
        return None;
    }

    let text = msgs
        .iter()
        .map(|m| {
            let addr = m.from_address().unwrap_or_else(|| "unknown".to_string());
            format!("{addr} said: {}", m.preview())
        })
        .collect::<Vec<_>>()
        .join("\n");

    let reply_to = msgs.iter().rev().find_map(|m| m.reply_address());
    let sender = first.from.as_ref().map(|f| f.display()).unwrap_or_else(|| "<>".to_string());

    debug!(
        conversation_id,
        %subject,
        messages = msgs.len(),
        reply_to = reply_to.as_deref().unwrap_or(""),
        "built thread"
    );

    Some(EmailThread {
        conversation_id: conversation_id.to_string(),
        subject,
        sender,
        text,
        reply_to,
        message_count: msgs.len(),
        last_received: msgs.iter().filter_map(|m| m.received_date_time).max(),
    })
}
