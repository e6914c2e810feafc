//! Top-level wiring, analogous to the Go source's `Backend` struct
//! (`backend.go`): owns the gateway client and the outbound queue, and runs
//! the long-lived ingest task alongside the gateway connection.

use std::sync::Arc;
use std::time::Duration;

use serenity::model::gateway::GatewayIntents;
use serenity::prelude::*;
use tracing::warn;

use crate::config::Config;
use crate::discord::Handler;
use crate::error::TransportError;
use crate::ingest::{outbound_queue, OutboundReceiver};
use crate::mention::MentionCache;

/// 5 seconds, matching `runGrpc`'s retry sleep in the Go source.
const INGEST_RECONNECT_DELAY: Duration = Duration::from_secs(5);

pub struct Backend {
    client: Client,
    outbound: OutboundReceiver,
}

impl Backend {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let intents = GatewayIntents::non_privileged() | GatewayIntents::GUILD_MEMBERS | GatewayIntents::GUILD_PRESENCES;

        let (outbound_tx, outbound_rx) = outbound_queue();

        // The bot's own user id is only known once the gateway session is
        // established; `Handler` reads it lazily from the cache's current
        // user on each message instead of requiring it up front.
        let handler = Handler {
            cmd_prefix: config.command_prefix.clone(),
            outbound: outbound_tx,
            mentions: MentionCache::new(),
        };

        let client = Client::builder(&config.discord_token, intents).event_handler(handler).await?;

        Ok(Self { client, outbound: outbound_rx })
    }

    /// Runs the gateway connection and the ingest loop concurrently until
    /// either exits; mirrors `Backend.Run()`'s errgroup of `runGrpc` and
    /// `discord.Open()`.
    pub async fn run(self) -> anyhow::Result<()> {
        let Backend { mut client, mut outbound } = self;

        let shard_manager = client.shard_manager.clone();
        let http = client.http.clone();

        let ingest = tokio::spawn(async move {
            run_ingest_supervisor(http, &mut outbound).await;
        });
        let ingest_abort = ingest.abort_handle();

        let gateway = client.start();

        tokio::select! {
            result = gateway => {
                ingest_abort.abort();
                result.map_err(anyhow::Error::from)
            }
            _ = ingest => {
                shard_manager.shutdown_all().await;
                Ok(())
            }
        }
    }
}

/// Mirrors `runGrpc`: call `run_ingest_loop` in a loop, and on a
/// `TransportError` sleep 5 seconds before reconnecting (spec §7's
/// propagation policy for `TransportError`).
async fn run_ingest_supervisor(http: Arc<serenity::http::Http>, outbound: &mut OutboundReceiver) {
    loop {
        if let Err(err) = run_ingest_loop(&http, outbound).await {
            warn!(error = %err, "ingest loop exited, reconnecting");
            tokio::time::sleep(INGEST_RECONNECT_DELAY).await;
        }
    }
}

/// Drains the outbound queue into the upstream stream and dispatches
/// inbound requests, until the stream ends.
async fn run_ingest_loop(http: &Arc<serenity::http::Http>, outbound: &mut OutboundReceiver) -> Result<(), TransportError> {
    loop {
        match outbound.recv().await {
            Some(event) => {
                // TODO: forward `event` over the upstream gRPC stream once the
                // generated client for the ingest protocol is wired in.
                let _ = (http, event);
            }
            None => return Err(TransportError::StreamClosed),
        }
    }
}
