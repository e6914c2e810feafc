//! Gateway glue: a `serenity` `EventHandler` that feeds the classifier (C5)
//! and mention cache (C4), and the inbound `ChatRequest` → Discord REST
//! dispatch table (`backend.go`'s `handleIngest` switch).

use serenity::async_trait;
use serenity::model::channel::{ChannelType, Message};
use serenity::model::gateway::Ready;
use serenity::model::guild::{Guild, Member, UnavailableGuild};
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::user::User;
use serenity::prelude::*;
use tracing::{debug, warn};

use crate::classifier::{self, Attachment, RawMessage};
use crate::ingest::{ack_event, unimplemented_failure, ChatEvent, ChatRequest, OutboundQueue};
use crate::mention::MentionCache;

pub struct Handler {
    pub cmd_prefix: String,
    pub outbound: OutboundQueue,
    pub mentions: MentionCache,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        debug!(user = %ready.user.name, "gateway session ready");
    }

    async fn guild_create(&self, _ctx: Context, guild: Guild, _is_new: Option<bool>) {
        for channel in guild.channels.values() {
            if channel.kind != ChannelType::Text {
                continue;
            }
            self.outbound.push(ChatEvent::JoinChannel { channel_id: channel.id.get() });
        }
    }

    async fn guild_delete(&self, _ctx: Context, incomplete: UnavailableGuild, full: Option<Guild>) {
        let Some(guild) = full else {
            return;
        };
        let _ = incomplete;
        for channel in guild.channels.values() {
            if channel.kind != ChannelType::Text {
                continue;
            }
            self.outbound.push(ChatEvent::LeaveChannel { channel_id: channel.id.get() });
        }
    }

    async fn guild_member_addition(&self, _ctx: Context, _member: Member) {
        self.mentions.invalidate(_member.guild_id);
    }

    async fn guild_member_update(
        &self,
        _ctx: Context,
        _old: Option<Member>,
        _new: Option<Member>,
        event: serenity::model::event::GuildMemberUpdateEvent,
    ) {
        self.mentions.invalidate(event.guild_id);
    }

    async fn guild_member_removal(&self, _ctx: Context, guild_id: GuildId, _user: User, _member: Option<Member>) {
        self.mentions.invalidate(guild_id);
    }

    async fn guild_members_chunk(&self, _ctx: Context, chunk: serenity::model::event::GuildMembersChunkEvent) {
        self.mentions.invalidate(chunk.guild_id);
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let bot_id = ctx.cache.current_user().id;
        if msg.author.id == bot_id {
            return;
        }

        let direct = msg.guild_id.is_none();
        let raw = RawMessage {
            author_id: msg.author.id.get(),
            channel_id: msg.channel_id.get(),
            display_name: msg.author.name.clone(),
            content: msg.content.clone(),
            attachments: msg
                .attachments
                .iter()
                .map(|a| Attachment { filename: a.filename.clone(), url: a.url.clone() })
                .collect(),
        };

        let guild_id = msg.guild_id;
        let cache = ctx.cache.clone();
        let events = classifier::classify(
            &raw,
            bot_id.get(),
            &self.cmd_prefix,
            |_channel_id| direct,
            |id| guild_id.and_then(|g| cache.member(g, UserId::new(id)).map(|m| m.display_name().to_string())),
        );

        for event in events {
            self.outbound.push(event);
        }
    }
}

/// Executes one inbound request against the Discord REST API, returning the
/// ack event paired with its correlation id (spec §4.5, §7's
/// `RpcOperationError`).
pub async fn dispatch(ctx: &Context, request: ChatRequest) -> ChatEvent {
    let request_id = request.request_id().to_string();

    if request.is_unimplemented() {
        return ack_event(&request_id, Err(unimplemented_failure()));
    }

    let result = match request {
        ChatRequest::SendMessage { channel_id, text, .. } => {
            ChannelId::new(channel_id).say(&ctx.http, text).await.map(|_| ()).map_err(stringify_err)
        }
        ChatRequest::SendPrivateMessage { user_id, text, .. } => send_private(ctx, user_id, text).await,
        ChatRequest::PerformAction { channel_id, text, .. } => {
            ChannelId::new(channel_id).say(&ctx.http, format!("_{text}_")).await.map(|_| ()).map_err(stringify_err)
        }
        ChatRequest::PerformPrivateAction { user_id, text, .. } => send_private(ctx, user_id, format!("_{text}_")).await,
        ChatRequest::UpdateChannelInfo { channel_id, topic, .. } => ChannelId::new(channel_id)
            .edit(&ctx.http, serenity::builder::EditChannel::new().topic(topic))
            .await
            .map(|_| ())
            .map_err(stringify_err),
        ChatRequest::JoinChannel { .. } | ChatRequest::LeaveChannel { .. } => unreachable!("handled above"),
    };

    if let Err(err) = &result {
        warn!(request_id = %request_id, error = %err, "inbound request failed");
    }
    ack_event(&request_id, result.map_err(crate::error::RpcOperationError))
}

async fn send_private(ctx: &Context, user_id: u64, text: String) -> Result<(), String> {
    let user = UserId::new(user_id).to_user(&ctx.http).await.map_err(stringify_err)?;
    let dm = user.create_dm_channel(&ctx.http).await.map_err(stringify_err)?;
    dm.say(&ctx.http, text).await.map(|_| ()).map_err(stringify_err)
}

fn stringify_err(err: serenity::Error) -> String {
    err.to_string()
}
