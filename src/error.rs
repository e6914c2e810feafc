//! Error taxonomy (spec §7).
//!
//! Parsing and classification errors are contained per-message; transport
//! errors propagate to the supervising task which restarts the ingest loop;
//! only startup failures (gateway session, upstream client construction) are
//! fatal, and those are represented with `anyhow` at the `main.rs` boundary
//! rather than here.

use thiserror::Error;

/// Errors raised by the markdown→block lowering pass (C3).
///
/// Parsing itself is total for any valid UTF-8 input and never fails;
/// `UnsupportedNode` only fires if the lowering pass encounters an AST node
/// kind it doesn't know how to lower, which indicates a parser bug rather
/// than malformed input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unsupported AST node kind during lowering: {kind}")]
    UnsupportedNode { kind: &'static str },
}

/// Upstream ingest stream failure. Triggers ingest-loop exit, a 5s backoff,
/// and reconnect; never surfaced to the Discord gateway side.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open ingest stream: {0}")]
    Connect(String),
    #[error("ingest stream send failed: {0}")]
    Send(String),
    #[error("ingest stream ended unexpectedly")]
    StreamClosed,
}

/// A single inbound `ChatRequest` failed against the Discord REST API.
/// Paired with the request's correlation id and returned as a `Failed` ack.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct RpcOperationError(pub String);

/// `JoinChannel` / `LeaveChannel` inbound requests have no Discord
/// equivalent and always fail with this fixed reason.
pub const UNIMPLEMENTED_FOR_DISCORD: &str = "unimplemented for discord";

/// Reasons a raw Discord message never reaches the classifier's dispatch
/// table. Logged at debug/warn and never surfaced past the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierDrop {
    /// The message's author is the bot itself; the upstream ingest contract
    /// requires at-most-once delivery, so self-authored messages must not
    /// loop back in.
    SelfAuthored,
    /// After mention rewriting, the message has no text and no attachments.
    EmptyAfterRewrite,
}

impl std::fmt::Display for ClassifierDrop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassifierDrop::SelfAuthored => write!(f, "message authored by the bot itself"),
            ClassifierDrop::EmptyAfterRewrite => write!(f, "message empty after mention rewrite, no attachments"),
        }
    }
}
