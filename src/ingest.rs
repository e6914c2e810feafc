//! The ingest adapter interface (C6, spec §4.5-§6).
//!
//! This module only defines the *shape* of the boundary: the `ChatEvent`
//! schema the classifier emits into, the bounded lossy outbound queue that
//! carries them toward the upstream stream, and the `ChatRequest` schema the
//! upstream sends back. Actually talking to Discord's REST API over these
//! requests is `discord/mod.rs`'s job; actually talking to the upstream gRPC
//! stream is `backend.rs`'s job.

use tokio::sync::mpsc;

use crate::error::{RpcOperationError, UNIMPLEMENTED_FOR_DISCORD};

/// Who an event is attributed to: either a guild channel plus the acting
/// user, or just a user (DMs and acks have no channel).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventSource {
    Channel { channel_id: u64, user: UserRef },
    User(UserRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRef {
    pub id: u64,
    pub display_name: String,
}

/// The discriminated event envelope of spec §6.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    JoinChannel { channel_id: u64 },
    LeaveChannel { channel_id: u64 },
    Message { source: EventSource, text: String },
    PrivateMessage { source: EventSource, text: String },
    Action { source: EventSource, text: String },
    PrivateAction { source: EventSource, text: String },
    Command { source: EventSource, command: String, arg: String },
    Mention { source: EventSource, text: String },
    Success { request_id: String },
    Failed { request_id: String, reason: String },
    Hello { instance_id: String },
}

/// Inbound request variants the upstream can send (spec §4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatRequest {
    SendMessage { request_id: String, channel_id: u64, text: String },
    SendPrivateMessage { request_id: String, user_id: u64, text: String },
    /// Wraps `text` in single underscores before sending, mirroring `/me`.
    PerformAction { request_id: String, channel_id: u64, text: String },
    PerformPrivateAction { request_id: String, user_id: u64, text: String },
    UpdateChannelInfo { request_id: String, channel_id: u64, topic: String },
    JoinChannel { request_id: String, channel_id: u64 },
    LeaveChannel { request_id: String, channel_id: u64 },
}

impl ChatRequest {
    pub fn request_id(&self) -> &str {
        match self {
            ChatRequest::SendMessage { request_id, .. }
            | ChatRequest::SendPrivateMessage { request_id, .. }
            | ChatRequest::PerformAction { request_id, .. }
            | ChatRequest::PerformPrivateAction { request_id, .. }
            | ChatRequest::UpdateChannelInfo { request_id, .. }
            | ChatRequest::JoinChannel { request_id, .. }
            | ChatRequest::LeaveChannel { request_id, .. } => request_id,
        }
    }

    /// `JoinChannel`/`LeaveChannel` have no Discord equivalent and always
    /// fail with the fixed reason of spec §4.5, independent of any REST
    /// call; everything else must actually be attempted against Discord.
    pub fn is_unimplemented(&self) -> bool {
        matches!(self, ChatRequest::JoinChannel { .. } | ChatRequest::LeaveChannel { .. })
    }
}

/// Turns a dispatch outcome into the `Success`/`Failed` ack event, paired
/// with the request's correlation id.
pub fn ack_event(request_id: &str, result: Result<(), RpcOperationError>) -> ChatEvent {
    match result {
        Ok(()) => ChatEvent::Success { request_id: request_id.to_string() },
        Err(err) => ChatEvent::Failed { request_id: request_id.to_string(), reason: err.0 },
    }
}

/// The fixed failure for `JoinChannel`/`LeaveChannel`, matching the Go
/// source exactly.
pub fn unimplemented_failure() -> RpcOperationError {
    RpcOperationError(UNIMPLEMENTED_FOR_DISCORD.to_string())
}

/// Single-producer/single-consumer, bounded, lossy: `push` never blocks and
/// drops the newest event when the queue is full, so a stalled upstream
/// never stalls the gateway reader (spec §4.5, §5).
pub struct OutboundQueue {
    tx: mpsc::Sender<ChatEvent>,
}

pub struct OutboundReceiver {
    rx: mpsc::Receiver<ChatEvent>,
}

/// Reference capacity from spec §5.
pub const OUTBOUND_CAPACITY: usize = 10;

pub fn outbound_queue() -> (OutboundQueue, OutboundReceiver) {
    let (tx, rx) = mpsc::channel(OUTBOUND_CAPACITY);
    (OutboundQueue { tx }, OutboundReceiver { rx })
}

impl OutboundQueue {
    /// Returns `true` if the event was enqueued, `false` if it was dropped
    /// because the queue was full.
    pub fn push(&self, event: ChatEvent) -> bool {
        self.tx.try_send(event).is_ok()
    }
}

impl OutboundReceiver {
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_leave_channel_are_always_unimplemented() {
        let join = ChatRequest::JoinChannel { request_id: "1".into(), channel_id: 1 };
        let leave = ChatRequest::LeaveChannel { request_id: "1".into(), channel_id: 1 };
        let send = ChatRequest::SendMessage { request_id: "1".into(), channel_id: 1, text: "hi".into() };
        assert!(join.is_unimplemented());
        assert!(leave.is_unimplemented());
        assert!(!send.is_unimplemented());
    }

    #[test]
    fn ack_event_pairs_failure_with_request_id() {
        let event = ack_event("abc", Err(unimplemented_failure()));
        assert_eq!(
            event,
            ChatEvent::Failed { request_id: "abc".into(), reason: "unimplemented for discord".into() }
        );
    }

    #[tokio::test]
    async fn push_is_lossy_once_full() {
        let (queue, mut rx) = outbound_queue();
        for i in 0..OUTBOUND_CAPACITY {
            assert!(queue.push(ChatEvent::JoinChannel { channel_id: i as u64 }));
        }
        assert!(!queue.push(ChatEvent::JoinChannel { channel_id: 999 }), "queue should be full and drop this push");
        assert_eq!(rx.recv().await, Some(ChatEvent::JoinChannel { channel_id: 0 }));
    }
}
