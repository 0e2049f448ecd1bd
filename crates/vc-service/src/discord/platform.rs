//! Chat platform adapter.
//!
//! [`DiscordPlatform`] implements the collaborator traits on top of the
//! serenity REST client and gateway cache. Room and member reads come from
//! the cache and are never held across an await.

use super::embeds::render;
use crate::collaborators::{
    ChannelProvisioning, CollaboratorError, MemberHandle, Membership, Notice, NoticeTarget,
    Notifier, Provisioned, Requester, RoomHandle, RoomSpec,
};
use crate::session::teams::{GATHER_EMOJI, SPLIT_EMOJI};
use crate::session::TeamLabel;
use async_trait::async_trait;
use common::types::{CategoryId, GuildId, MemberId, MessageRef, RoomId};
use serenity::all::{
    Cache, ChannelId, ChannelType, CreateChannel, CreateMessage, EditMessage, Guild,
    GuildChannel, Member, MessageId, PremiumTier, ReactionType, RoleId, UserId,
};
use serenity::http::{Http, HttpError};
use std::num::NonZeroU64;
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Platform error codes meaning the target no longer exists
/// (unknown channel, member, message).
const NOT_FOUND_CODES: [isize; 3] = [10003, 10007, 10008];

/// Bitrate used when the cache has no value for a room.
const DEFAULT_BITRATE: u32 = 64_000;

/// Name of a member's personal room.
#[must_use]
pub fn personal_room_name(display_name: &str) -> String {
    format!("{display_name}のVC")
}

/// Highest bitrate a guild's boost tier allows.
#[must_use]
pub fn tier_bitrate_limit(tier: PremiumTier) -> u32 {
    match tier {
        PremiumTier::Tier1 => 128_000,
        PremiumTier::Tier2 => 256_000,
        PremiumTier::Tier3 => 384_000,
        _ => 96_000,
    }
}

#[must_use]
pub fn member_handle(member: &Member) -> MemberHandle {
    MemberHandle {
        id: MemberId(member.user.id.get()),
        display_name: member.display_name().to_string(),
        is_bot: member.user.bot,
    }
}

fn channel_id(raw: u64) -> Option<ChannelId> {
    NonZeroU64::new(raw).map(ChannelId::from)
}

fn serenity_guild(guild: GuildId) -> Option<serenity::all::GuildId> {
    NonZeroU64::new(guild.get()).map(serenity::all::GuildId::from)
}

fn user_id(member: MemberId) -> Option<UserId> {
    NonZeroU64::new(member.get()).map(UserId::from)
}

fn invalid_id(what: &str, raw: u64) -> CollaboratorError {
    CollaboratorError::Rejected(format!("invalid {what} id: {raw}"))
}

fn message_ids(message: MessageRef) -> Result<(ChannelId, MessageId), CollaboratorError> {
    let channel =
        channel_id(message.channel_id).ok_or_else(|| invalid_id("channel", message.channel_id))?;
    let id = NonZeroU64::new(message.message_id)
        .map(MessageId::from)
        .ok_or_else(|| invalid_id("message", message.message_id))?;
    Ok((channel, id))
}

/// Map a serenity error onto the collaborator error kinds.
fn classify(operation: &str, error: &serenity::Error) -> CollaboratorError {
    let message = format!("{operation}: {error}");
    match error {
        serenity::Error::Http(HttpError::UnsuccessfulRequest(response)) => {
            let status = response.status_code.as_u16();
            if status == 404 || NOT_FOUND_CODES.contains(&response.error.code) {
                CollaboratorError::NotFound(message)
            } else if (400..500).contains(&status) {
                CollaboratorError::Rejected(message)
            } else {
                CollaboratorError::Unavailable(message)
            }
        }
        _ => CollaboratorError::Unavailable(message),
    }
}

fn is_voice(channel: &GuildChannel) -> bool {
    matches!(channel.kind, ChannelType::Voice | ChannelType::Stage)
}

fn room_handle(channel: &GuildChannel) -> RoomHandle {
    RoomHandle {
        id: RoomId(channel.id.get()),
        guild_id: GuildId(channel.guild_id.get()),
        name: channel.name.clone(),
        category: channel.parent_id.map(|parent| CategoryId(parent.get())),
        capacity: channel.user_limit.unwrap_or(0),
        bitrate: channel.bitrate.unwrap_or(DEFAULT_BITRATE),
    }
}

/// Collaborator implementation backed by the chat platform.
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: OnceLock<Arc<Cache>>,
    category: CategoryId,
    notice_channel: u64,
}

impl DiscordPlatform {
    #[must_use]
    pub fn new(http: Arc<Http>, category: CategoryId, notice_channel: u64) -> Self {
        Self {
            http,
            cache: OnceLock::new(),
            category,
            notice_channel,
        }
    }

    /// Attach the gateway cache once the client is built. Reads before this
    /// see no rooms.
    pub fn attach_cache(&self, cache: Arc<Cache>) {
        if self.cache.set(cache).is_err() {
            debug!(target: "vc.discord", "Cache already attached");
        }
    }

    fn with_guild<T>(&self, guild: GuildId, f: impl FnOnce(&Guild) -> T) -> Option<T> {
        let cache = self.cache.get()?;
        let guild = cache.guild(serenity_guild(guild)?)?;
        Some(f(&guild))
    }

    fn with_channel<T>(
        &self,
        room: RoomId,
        f: impl FnOnce(&Guild, &GuildChannel) -> T,
    ) -> Option<T> {
        let cache = self.cache.get()?;
        let id = channel_id(room.get())?;
        let guild_id = cache.guilds().into_iter().find(|guild_id| {
            cache
                .guild(*guild_id)
                .is_some_and(|guild| guild.channels.contains_key(&id))
        })?;
        let guild = cache.guild(guild_id)?;
        let channel = guild.channels.get(&id)?;
        Some(f(&guild, channel))
    }

    /// Member as seen in the cache.
    #[must_use]
    pub fn member(&self, guild: GuildId, member: MemberId) -> Option<MemberHandle> {
        let user = user_id(member)?;
        self.with_guild(guild, |g| g.members.get(&user).map(member_handle))
            .flatten()
    }

    /// Voice room the member is connected to, if any.
    #[must_use]
    pub fn voice_room_of(&self, guild: GuildId, member: MemberId) -> Option<RoomId> {
        let user = user_id(member)?;
        self.with_guild(guild, |g| {
            g.voice_states
                .get(&user)
                .and_then(|state| state.channel_id)
                .map(|channel| RoomId(channel.get()))
        })
        .flatten()
    }

    /// Requester with the administrator flag resolved from guild roles.
    #[must_use]
    pub fn requester(&self, guild: GuildId, member: MemberId) -> Requester {
        let is_admin = user_id(member)
            .and_then(|user| {
                self.with_guild(guild, |g| {
                    if g.owner_id == user {
                        return true;
                    }
                    let everyone = RoleId::new(g.id.get());
                    let Some(m) = g.members.get(&user) else {
                        return false;
                    };
                    m.roles
                        .iter()
                        .chain(std::iter::once(&everyone))
                        .filter_map(|role| g.roles.get(role))
                        .any(|role| role.permissions.administrator())
                })
            })
            .unwrap_or(false);

        Requester {
            id: member,
            is_admin,
        }
    }

    fn personal_room_in_cache(&self, guild: GuildId, name: &str) -> Option<RoomId> {
        let category = channel_id(self.category.get())?;
        self.with_guild(guild, |g| {
            g.channels
                .values()
                .find(|c| is_voice(c) && c.parent_id == Some(category) && c.name == name)
                .map(|c| RoomId(c.id.get()))
        })
        .flatten()
    }

    async fn add_panel_reactions(&self, channel: ChannelId, message: MessageId) {
        let http: &Http = &self.http;
        let emojis = TeamLabel::ALL
            .iter()
            .map(TeamLabel::emoji)
            .chain([SPLIT_EMOJI, GATHER_EMOJI]);
        for emoji in emojis {
            if let Err(e) = channel
                .create_reaction(http, message, ReactionType::Unicode(emoji.to_string()))
                .await
            {
                warn!(
                    target: "vc.discord",
                    error = %e,
                    "Failed to add panel reaction"
                );
            }
        }
    }
}

#[async_trait]
impl ChannelProvisioning for DiscordPlatform {
    async fn ensure_personal_room(
        &self,
        guild: GuildId,
        owner: &MemberHandle,
    ) -> Result<Provisioned, CollaboratorError> {
        let name = personal_room_name(&owner.display_name);
        if let Some(room) = self.personal_room_in_cache(guild, &name) {
            return Ok(Provisioned {
                room,
                created: false,
            });
        }

        let guild_id = serenity_guild(guild).ok_or_else(|| invalid_id("guild", guild.get()))?;
        let category = channel_id(self.category.get())
            .ok_or_else(|| invalid_id("category", self.category.get()))?;
        let http: &Http = &self.http;
        let channel = guild_id
            .create_channel(
                http,
                CreateChannel::new(name)
                    .kind(ChannelType::Voice)
                    .category(category),
            )
            .await
            .map_err(|e| classify("create_channel", &e))?;

        debug!(
            target: "vc.discord",
            room = %channel.id,
            owner = %owner.id,
            "Personal room created"
        );
        Ok(Provisioned {
            room: RoomId(channel.id.get()),
            created: true,
        })
    }

    async fn create_room(&self, spec: RoomSpec) -> Result<RoomHandle, CollaboratorError> {
        let guild_id =
            serenity_guild(spec.guild_id).ok_or_else(|| invalid_id("guild", spec.guild_id.get()))?;

        let mut builder = CreateChannel::new(spec.name)
            .kind(ChannelType::Voice)
            .bitrate(spec.bitrate)
            .user_limit(spec.capacity);
        if let Some(category) = spec.category.and_then(|c| channel_id(c.get())) {
            builder = builder.category(category);
        }

        let http: &Http = &self.http;
        let channel = guild_id
            .create_channel(http, builder)
            .await
            .map_err(|e| classify("create_channel", &e))?;
        Ok(room_handle(&channel))
    }

    async fn delete_room(&self, room: RoomId) -> Result<(), CollaboratorError> {
        let channel = channel_id(room.get()).ok_or_else(|| invalid_id("room", room.get()))?;
        let http: &Http = &self.http;
        channel
            .delete(http)
            .await
            .map(|_| ())
            .map_err(|e| classify("delete_channel", &e))
    }

    async fn move_member(
        &self,
        guild: GuildId,
        member: MemberId,
        to: RoomId,
    ) -> Result<(), CollaboratorError> {
        let guild_id = serenity_guild(guild).ok_or_else(|| invalid_id("guild", guild.get()))?;
        let user = user_id(member).ok_or_else(|| invalid_id("member", member.get()))?;
        let channel = channel_id(to.get()).ok_or_else(|| invalid_id("room", to.get()))?;
        let http: &Http = &self.http;
        guild_id
            .move_member(http, user, channel)
            .await
            .map(|_| ())
            .map_err(|e| classify("move_member", &e))
    }
}

#[async_trait]
impl Notifier for DiscordPlatform {
    async fn send_notice(
        &self,
        target: NoticeTarget,
        notice: Notice,
    ) -> Result<MessageRef, CollaboratorError> {
        let http: &Http = &self.http;
        let channel = match target {
            NoticeTarget::Room(room) => {
                channel_id(room.get()).ok_or_else(|| invalid_id("channel", room.get()))?
            }
            NoticeTarget::NoticeChannel => channel_id(self.notice_channel)
                .ok_or_else(|| invalid_id("channel", self.notice_channel))?,
            NoticeTarget::DirectMessage(member) => {
                let user = user_id(member).ok_or_else(|| invalid_id("user", member.get()))?;
                user.create_dm_channel(http)
                    .await
                    .map_err(|e| classify("create_dm_channel", &e))?
                    .id
            }
        };
        let is_panel = matches!(notice, Notice::TeamPanel { .. });

        let message = channel
            .send_message(http, CreateMessage::new().embed(render(&notice).into_embed()))
            .await
            .map_err(|e| classify("send_message", &e))?;

        if is_panel {
            self.add_panel_reactions(channel, message.id).await;
        }

        Ok(MessageRef::new(channel.get(), message.id.get()))
    }

    async fn edit_message(
        &self,
        message: MessageRef,
        notice: Notice,
    ) -> Result<(), CollaboratorError> {
        let (channel, id) = message_ids(message)?;
        let http: &Http = &self.http;
        channel
            .edit_message(http, id, EditMessage::new().embed(render(&notice).into_embed()))
            .await
            .map(|_| ())
            .map_err(|e| classify("edit_message", &e))
    }

    async fn delete_message(&self, message: MessageRef) -> Result<(), CollaboratorError> {
        let (channel, id) = message_ids(message)?;
        let http: &Http = &self.http;
        channel
            .delete_message(http, id)
            .await
            .map_err(|e| classify("delete_message", &e))
    }
}

impl Membership for DiscordPlatform {
    fn room(&self, room: RoomId) -> Option<RoomHandle> {
        self.with_channel(room, |_, channel| is_voice(channel).then(|| room_handle(channel)))
            .flatten()
    }

    fn members(&self, room: RoomId) -> Vec<MemberHandle> {
        let Some(id) = channel_id(room.get()) else {
            return Vec::new();
        };
        self.with_channel(room, |guild, _| {
            guild
                .voice_states
                .values()
                .filter(|state| state.channel_id == Some(id))
                .map(|state| {
                    guild
                        .members
                        .get(&state.user_id)
                        .or(state.member.as_ref())
                        .map_or_else(
                            || MemberHandle {
                                id: MemberId(state.user_id.get()),
                                display_name: state.user_id.to_string(),
                                is_bot: false,
                            },
                            member_handle,
                        )
                })
                .collect()
        })
        .unwrap_or_default()
    }

    fn bitrate_limit(&self, guild: GuildId) -> u32 {
        self.with_guild(guild, |g| tier_bitrate_limit(g.premium_tier))
            .unwrap_or_else(|| tier_bitrate_limit(PremiumTier::Tier0))
    }
}
