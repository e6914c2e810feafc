//! The per-guild mention cache (C4, spec §4.3).
//!
//! A single mutex guards the whole per-guild-id map, per spec §5: rebuilds
//! are O(members) and expected to be infrequent, so no finer-grained
//! locking is needed, and no operation under the lock ever suspends on I/O
//! (the roster is read from the gateway library's in-memory cache).
//! Builders construct the replacement table in a temporary `HashMap` and
//! publish it atomically by swapping it into the guild's slot, so readers
//! never observe a half-built table.

use std::collections::HashMap;

use parking_lot::Mutex;
use serenity::model::id::{GuildId, UserId};

/// `@username → <@id>` for one guild, plus whether it needs rebuilding.
struct MentionTable {
    replacements: HashMap<String, String>,
    stale: bool,
}

impl MentionTable {
    fn stale_placeholder() -> Self {
        Self { replacements: HashMap::new(), stale: true }
    }
}

/// A guild member roster, as the caller's gateway library snapshot exposes
/// it. Kept deliberately minimal so the cache doesn't depend on any one
/// gateway crate's member type.
pub struct RosterMember {
    pub user_id: UserId,
    pub username: String,
}

/// The outbound (`@name` → `<@id>`) mention cache, shared across the whole
/// bridge session and mutated only by this type.
#[derive(Default)]
pub struct MentionCache {
    guilds: Mutex<HashMap<GuildId, MentionTable>>,
    rebuild_count: std::sync::atomic::AtomicU64,
}

impl MentionCache {
    pub fn new() -> Self {
        Self { guilds: Mutex::new(HashMap::new()), rebuild_count: std::sync::atomic::AtomicU64::new(0) }
    }

    /// Marks guild `id`'s table stale. Called on any member add, update,
    /// remove, or members-chunk event for that guild; the next lookup
    /// rebuilds from scratch.
    pub fn invalidate(&self, id: GuildId) {
        let mut guilds = self.guilds.lock();
        match guilds.get_mut(&id) {
            Some(table) => table.stale = true,
            None => {
                guilds.insert(id, MentionTable::stale_placeholder());
            }
        }
    }

    /// Rewrites every `@username` occurrence in `text` to `<@id>` form for
    /// guild `id`, rebuilding the table first if it's missing or stale.
    /// `roster` is only consulted when a rebuild is actually needed.
    pub fn rewrite(&self, id: GuildId, text: &str, roster: impl FnOnce() -> Vec<RosterMember>) -> String {
        let mut guilds = self.guilds.lock();
        let needs_rebuild = guilds.get(&id).map(|t| t.stale).unwrap_or(true);
        if needs_rebuild {
            let mut replacements = HashMap::new();
            for member in roster() {
                replacements.insert(format!("@{}", member.username), format!("<@{}>", member.user_id));
            }
            guilds.insert(id, MentionTable { replacements, stale: false });
            self.rebuild_count.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
        let table = guilds.get(&id).expect("just inserted or already present");
        apply_replacements(text, &table.replacements)
    }

    /// Exposed for tests: counts how many times a table has actually been
    /// rebuilt from a stale/missing state.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count.load(std::sync::atomic::Ordering::Relaxed)
    }
}

/// Longest-match-first replacement so `@alice` doesn't get clobbered by a
/// shorter `@al` entry that happens to also be a member name.
fn apply_replacements(text: &str, replacements: &HashMap<String, String>) -> String {
    if replacements.is_empty() {
        return text.to_string();
    }
    let mut keys: Vec<&String> = replacements.keys().collect();
    keys.sort_unstable_by_key(|k| std::cmp::Reverse(k.len()));

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    'outer: while !rest.is_empty() {
        for key in &keys {
            if rest.starts_with(key.as_str()) {
                out.push_str(&replacements[*key]);
                rest = &rest[key.len()..];
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        let ch = chars.next().expect("rest is non-empty");
        out.push(ch);
        rest = chars.as_str();
    }
    out
}

/// Inbound direction (Discord → bridge): `<@id>` → display name. Used when
/// relaying text that came *from* Discord back toward the upstream chat
/// ingest. Unlike the outbound cache this has no staleness model: it's a
/// point-in-time lookup against whatever member metadata the caller has,
/// and a failed resolution falls back to leaving the raw `<@id>` token in
/// place rather than dropping the whole message.
pub fn rewrite_inbound_mentions(text: &str, resolve: impl Fn(UserId) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("<@") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let bang_len = if after.starts_with('!') { 1 } else { 0 };
        let digits = &after[bang_len..];
        match digits.find('>') {
            Some(end) => {
                let id_str = &digits[..end];
                let raw_token = &after[..bang_len + end + 1];
                match id_str.parse::<u64>().ok().map(UserId::new).and_then(&resolve) {
                    Some(name) => out.push_str(&name),
                    None => {
                        out.push_str("<@");
                        out.push_str(raw_token);
                    }
                }
                rest = &digits[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: u64, name: &str) -> RosterMember {
        RosterMember { user_id: UserId::new(id), username: name.to_string() }
    }

    #[test]
    fn builds_lazily_on_first_read() {
        let cache = MentionCache::new();
        let guild = GuildId::new(1);
        let mut calls = 0;
        let out = cache.rewrite(guild, "hi @alice", || {
            calls += 1;
            vec![member(42, "alice")]
        });
        assert_eq!(out, "hi <@42>");
        assert_eq!(calls, 1);
        assert_eq!(cache.rebuild_count(), 1);
    }

    #[test]
    fn second_read_does_not_rebuild() {
        let cache = MentionCache::new();
        let guild = GuildId::new(1);
        cache.rewrite(guild, "hi @alice", || vec![member(42, "alice")]);
        cache.rewrite(guild, "hi @alice again", || panic!("should not rebuild"));
        assert_eq!(cache.rebuild_count(), 1);
    }

    #[test]
    fn invalidate_forces_a_rebuild_on_next_read() {
        let cache = MentionCache::new();
        let guild = GuildId::new(1);
        cache.rewrite(guild, "hi @alice", || vec![member(42, "alice")]);
        cache.invalidate(guild);
        let out = cache.rewrite(guild, "hi @alice", || vec![member(99, "alice")]);
        assert_eq!(out, "hi <@99>");
        assert_eq!(cache.rebuild_count(), 2);
    }

    #[test]
    fn inbound_fallback_leaves_unresolved_ids_in_place() {
        let out = rewrite_inbound_mentions("hey <@42> and <@99>", |id| {
            if id.get() == 42 { Some("alice".to_string()) } else { None }
        });
        assert_eq!(out, "hey alice and <@99>");
    }
}
