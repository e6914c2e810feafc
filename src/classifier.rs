//! The message classifier (C5, spec §4.4).
//!
//! A pure function from a raw Discord message to zero or more `ChatEvent`s.
//! No parsing happens here: `content` is plain text, mention-rewritten and
//! then pattern-matched; the markdown compiler only ever runs once an event
//! actually needs to be rendered as a block tree, which is out of this
//! module's concern.

use tracing::debug;

use crate::error::ClassifierDrop;
use crate::ingest::{ChatEvent, EventSource, UserRef};
use crate::mention::rewrite_inbound_mentions;

/// One incoming Discord message, already stripped of anything gateway- or
/// transport-specific.
pub struct RawMessage {
    pub author_id: u64,
    pub channel_id: u64,
    pub display_name: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

pub struct Attachment {
    pub filename: String,
    pub url: String,
}

/// Classifies `message` into zero or more events. Returns an empty vec for
/// the drop cases (self-authored, empty after rewrite) per spec §4.4 steps
/// 1-2 and §7's `ClassifierDrop`.
///
/// `resolve_mention` looks up a display name for a raw `<@id>` token found
/// in `message.content`; `is_direct` reports whether `channel_id` is a DM.
pub fn classify(
    message: &RawMessage,
    bot_user_id: u64,
    cmd_prefix: &str,
    is_direct: impl FnOnce(u64) -> bool,
    resolve_mention: impl Fn(u64) -> Option<String>,
) -> Vec<ChatEvent> {
    if message.author_id == bot_user_id {
        debug!(reason = %ClassifierDrop::SelfAuthored, "dropping message");
        return Vec::new();
    }

    let text = rewrite_inbound_mentions(&message.content, |id| resolve_mention(id.get()));
    if text.is_empty() && message.attachments.is_empty() {
        debug!(reason = %ClassifierDrop::EmptyAfterRewrite, "dropping message");
        return Vec::new();
    }

    let direct = is_direct(message.channel_id);
    let user = UserRef { id: message.author_id, display_name: message.display_name.clone() };
    let source = if direct { EventSource::User(user.clone()) } else { EventSource::Channel { channel_id: message.channel_id, user: user.clone() } };

    let action_text = strip_action_wrapping(&text);
    let bot_mention_prefix = format!("<@{bot_user_id}>");

    let mut events = Vec::new();
    let primary = match (direct, action_text) {
        (true, Some(action)) => ChatEvent::PrivateAction { source, text: action },
        (true, None) => ChatEvent::PrivateMessage { source, text },
        (false, Some(action)) => ChatEvent::Action { source, text: action },
        (false, None) if text.starts_with(cmd_prefix) && !cmd_prefix.is_empty() => {
            let rest = &text[cmd_prefix.len()..];
            let (command, arg) = match rest.split_once(char::is_whitespace) {
                Some((command, arg)) => (command.to_string(), arg.trim_start().to_string()),
                None => (rest.to_string(), String::new()),
            };
            ChatEvent::Command { source, command, arg }
        }
        (false, None) if message.content.starts_with(&bot_mention_prefix) => {
            let raw_rest = message.content[bot_mention_prefix.len()..].trim_start();
            let rewritten_rest = rewrite_inbound_mentions(raw_rest, |id| resolve_mention(id.get()));
            ChatEvent::Mention { source, text: rewritten_rest }
        }
        (false, None) => ChatEvent::Message { source, text },
    };
    events.push(primary);

    for attachment in &message.attachments {
        events.push(ChatEvent::Message {
            source: if direct { EventSource::User(user.clone()) } else { EventSource::Channel { channel_id: message.channel_id, user: user.clone() } },
            text: format!("{}: {}", attachment.filename, attachment.url),
        });
    }

    events
}

/// `text` begins and ends with a single `_`, length > 2, no interior `_`.
/// The inverse of the Go source's `ActionText`. Returns the stripped text.
fn strip_action_wrapping(text: &str) -> Option<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= 2 || chars[0] != '_' || chars[chars.len() - 1] != '_' {
        return None;
    }
    let inner = &chars[1..chars.len() - 1];
    if inner.contains(&'_') {
        return None;
    }
    Some(inner.iter().collect())
}
