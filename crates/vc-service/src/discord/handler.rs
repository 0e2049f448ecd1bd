//! Gateway event handler.
//!
//! - `ready`: marks the service ready.
//! - `voice_state_update`: forwarded to the [`EventDispatcher`].
//! - `message`: the `{prefix}team` command posts a team panel; any other
//!   message in a room chat goes to the [`MentionForwarder`].
//! - `reaction_add`: reactions on a team panel assign, split or gather.

use super::platform::{member_handle, DiscordPlatform};
use crate::actors::LifecycleControllerHandle;
use crate::dispatcher::{EventDispatcher, VoiceStateChange};
use crate::errors::LifecycleError;
use crate::forward::{MentionForwarder, RoomMessage};
use crate::observability::HealthState;
use crate::session::PanelAction;
use async_trait::async_trait;
use chrono::Utc;
use crate::collaborators::MemberHandle;
use common::types::{GuildId, MemberId, MessageRef, RoomId};
use serenity::all::{Context, EventHandler, Message, Reaction, ReactionType, Ready, VoiceState};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shown when the team command is used outside a voice room.
const JOIN_FIRST_REPLY: &str = "ボイスチャンネルに参加してから実行してください。";

pub struct Handler {
    dispatcher: EventDispatcher,
    forwarder: MentionForwarder,
    controller: LifecycleControllerHandle,
    platform: Arc<DiscordPlatform>,
    health: Arc<HealthState>,
    team_command: String,
}

impl Handler {
    #[must_use]
    pub fn new(
        dispatcher: EventDispatcher,
        forwarder: MentionForwarder,
        controller: LifecycleControllerHandle,
        platform: Arc<DiscordPlatform>,
        health: Arc<HealthState>,
        command_prefix: &str,
    ) -> Self {
        Self {
            dispatcher,
            forwarder,
            controller,
            platform,
            health,
            team_command: format!("{command_prefix}team"),
        }
    }

    async fn reply(ctx: &Context, msg: &Message, text: &str) {
        if let Err(e) = msg.reply(ctx, text).await {
            warn!(target: "vc.discord", error = %e, "Failed to reply to command");
        }
    }

    async fn handle_panel_action(
        &self,
        anchor: RoomId,
        guild: GuildId,
        member: MemberId,
        action: PanelAction,
    ) -> Result<(), LifecycleError> {
        match action {
            PanelAction::Assign(label) => {
                self.controller
                    .assign_team(anchor, member, label.as_str(), Utc::now())
                    .await
            }
            PanelAction::Split => {
                let requester = self.platform.requester(guild, member);
                self.controller
                    .split_teams(anchor, requester, Utc::now())
                    .await
                    .map(|_| ())
            }
            PanelAction::Gather => {
                let requester = self.platform.requester(guild, member);
                self.controller
                    .gather_teams(anchor, requester, Utc::now())
                    .await
                    .map(|_| ())
            }
        }
    }

    async fn forward_mentions(&self, msg: &Message) {
        let author = MemberHandle {
            id: MemberId(msg.author.id.get()),
            display_name: msg
                .member
                .as_ref()
                .and_then(|member| member.nick.clone())
                .unwrap_or_else(|| msg.author.display_name().to_string()),
            is_bot: msg.author.bot,
        };
        let message = RoomMessage {
            room: RoomId(msg.channel_id.get()),
            author,
            content: msg.content.clone(),
            mentions: msg
                .mentions
                .iter()
                .map(|user| MemberHandle {
                    id: MemberId(user.id.get()),
                    display_name: user.display_name().to_string(),
                    is_bot: user.bot,
                })
                .collect(),
            mentions_everyone: msg.mention_everyone,
            jump_url: msg.link(),
        };
        let outcome = self.forwarder.forward(&message).await;
        debug!(target: "vc.discord", room = %message.room, ?outcome, "Room message handled");
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!(
            target: "vc.discord",
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "Gateway ready"
        );
        self.health.set_ready();
    }

    async fn voice_state_update(&self, _ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };
        let guild = GuildId(guild_id.get());
        let member_id = MemberId(new.user_id.get());

        let member = new
            .member
            .as_ref()
            .map(member_handle)
            .or_else(|| self.platform.member(guild, member_id));
        let Some(member) = member else {
            debug!(
                target: "vc.discord",
                member = %member_id,
                "Voice update for member missing from cache"
            );
            return;
        };

        let change = VoiceStateChange {
            guild_id: guild,
            member,
            before: old
                .and_then(|state| state.channel_id)
                .map(|channel| RoomId(channel.get())),
            after: new.channel_id.map(|channel| RoomId(channel.get())),
            at: Utc::now(),
        };
        self.dispatcher.dispatch(change).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let Some(guild_id) = msg.guild_id else {
            return;
        };
        if msg.content.trim() != self.team_command {
            if !msg.mentions.is_empty() || msg.mention_everyone {
                self.forward_mentions(&msg).await;
            }
            return;
        }
        let guild = GuildId(guild_id.get());
        let member = MemberId(msg.author.id.get());

        let Some(room) = self.platform.voice_room_of(guild, member) else {
            Self::reply(&ctx, &msg, JOIN_FIRST_REPLY).await;
            return;
        };

        let requester = self.platform.requester(guild, member);
        match self
            .controller
            .post_team_panel(room, requester, Utc::now())
            .await
        {
            Ok(panel) => debug!(
                target: "vc.discord",
                room = %room,
                message = panel.message_id,
                "Team panel posted"
            ),
            Err(e) => {
                debug!(target: "vc.discord", room = %room, error = %e, "Team command failed");
                Self::reply(&ctx, &msg, &e.client_message()).await;
            }
        }
    }

    async fn reaction_add(&self, ctx: Context, reaction: Reaction) {
        let (Some(user), Some(guild_id)) = (reaction.user_id, reaction.guild_id) else {
            return;
        };
        if user == ctx.cache.current_user().id {
            return;
        }
        let ReactionType::Unicode(emoji) = &reaction.emoji else {
            return;
        };
        let Some(action) = PanelAction::from_emoji(emoji) else {
            return;
        };

        let message = MessageRef::new(reaction.channel_id.get(), reaction.message_id.get());
        let anchor = match self.controller.room_for_panel(message).await {
            Ok(Some(anchor)) => anchor,
            Ok(None) => return,
            Err(e) => {
                warn!(target: "vc.discord", error = %e, "Panel lookup failed");
                return;
            }
        };

        let member = MemberId(user.get());
        if let Err(e) = self
            .handle_panel_action(anchor, GuildId(guild_id.get()), member, action)
            .await
        {
            debug!(
                target: "vc.discord",
                anchor = %anchor,
                member = %member,
                error = %e,
                "Panel action rejected"
            );
        }
    }
}
