//! Environment-driven configuration (ambient stack, spec §6).
//!
//! Loaded once at startup by `main.rs`, after `dotenvy` has had a chance to
//! populate the process environment from a `.env` file. Missing required
//! variables are a fatal startup error, matching `Env()` in the Go source's
//! `main.go`.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub command_prefix: String,
    pub seabird_id: String,
    pub seabird_host: String,
    pub seabird_token: String,
    pub channel_map: Vec<(u64, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            discord_token: required("DISCORD_TOKEN")?,
            command_prefix: optional("DISCORD_COMMAND_PREFIX", "!"),
            seabird_id: optional("SEABIRD_ID", "seabird"),
            seabird_host: required("SEABIRD_HOST")?,
            seabird_token: required("SEABIRD_TOKEN")?,
            channel_map: parse_channel_map(&optional("DISCORD_CHANNEL_MAP", "")),
        })
    }
}

fn required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("missing required environment variable {name}"))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// `discord_id:upstream_id,discord_id:upstream_id,...`; malformed entries are
/// skipped rather than failing startup, since this only feeds the
/// out-of-core voice-notification feature.
fn parse_channel_map(raw: &str) -> Vec<(u64, String)> {
    raw.split(',')
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (discord_id, upstream_id) = entry.split_once(':')?;
            let discord_id: u64 = discord_id.trim().parse().ok()?;
            Some((discord_id, upstream_id.trim().to_string()))
        })
        .collect()
}
