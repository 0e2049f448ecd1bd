//! Notice rendering.
//!
//! [`render`] turns a [`Notice`] into plain [`EmbedContent`] so wording and
//! colours are testable without the SDK; [`EmbedContent::into_embed`] builds
//! the serenity embed.

use crate::collaborators::{Notice, TeamOverview};
use crate::format::{fmt_duration, fmt_jst};
use crate::session::teams::{GATHER_EMOJI, SPLIT_EMOJI};
use serenity::all::CreateEmbed;

pub const COLOUR_JOIN: u32 = 0x2E_CC71;
pub const COLOUR_LEAVE: u32 = 0xE7_4C3C;
pub const COLOUR_PANEL: u32 = 0x58_65F2;

/// Rendered embed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedContent {
    pub title: Option<String>,
    pub description: String,
    pub colour: u32,
    pub fields: Vec<(String, String)>,
}

impl EmbedContent {
    fn plain(description: String, colour: u32) -> Self {
        Self {
            title: None,
            description,
            colour,
            fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn into_embed(self) -> CreateEmbed {
        let mut embed = CreateEmbed::new()
            .description(self.description)
            .colour(self.colour);
        if let Some(title) = self.title {
            embed = embed.title(title);
        }
        for (name, value) in self.fields {
            embed = embed.field(name, value, true);
        }
        embed
    }
}

#[must_use]
pub fn render(notice: &Notice) -> EmbedContent {
    match notice {
        Notice::MemberJoined { display_name, .. } => EmbedContent::plain(
            format!("{display_name} がボイスチャンネルに接続しました。"),
            COLOUR_JOIN,
        ),
        Notice::MemberLeft { display_name, .. } => EmbedContent::plain(
            format!("{display_name} がボイスチャンネルから切断しました。"),
            COLOUR_LEAVE,
        ),
        Notice::EmptyWarning => EmbedContent::plain(
            "全員が退出したため、まもなく削除されます。".to_string(),
            COLOUR_LEAVE,
        ),
        Notice::SessionStarted {
            starter_name,
            started_at,
            ..
        } => EmbedContent {
            title: Some(format!("{starter_name}がVCを開始しました。")),
            description: format!(
                "VC開始時刻：{} (<t:{}:R>)",
                fmt_jst(*started_at),
                started_at.timestamp()
            ),
            colour: COLOUR_JOIN,
            fields: Vec::new(),
        },
        Notice::SessionEnded {
            room_name,
            started_at,
            ended_at,
            participants,
        } => {
            let block = if participants.is_empty() {
                "- (該当者なし)".to_string()
            } else {
                participants
                    .iter()
                    .map(|p| format!("- {}（参加時間: {}）", p.name, fmt_duration(p.total_seconds)))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            EmbedContent {
                title: Some(format!("{room_name}が終了しました。")),
                description: format!(
                    "VC開始時刻：{}\nVC終了時刻：{}\nVC継続時間：{}\n参加ユーザー：\n{block}",
                    fmt_jst(*started_at),
                    fmt_jst(*ended_at),
                    fmt_duration((*ended_at - *started_at).num_seconds()),
                ),
                colour: COLOUR_LEAVE,
                fields: Vec::new(),
            }
        }
        Notice::TeamPanel {
            room_name,
            overview,
        } => render_panel(room_name, overview),
        Notice::MentionForward {
            author_name,
            room_name,
            excerpt,
            jump_url,
        } => {
            let mut fields = Vec::new();
            if !excerpt.is_empty() {
                fields.push(("メッセージ内容".to_string(), excerpt.clone()));
            }
            fields.push(("リンク".to_string(), format!("[ジャンプ]({jump_url})")));
            EmbedContent {
                title: Some(format!("\u{1F514} {author_name}がVCであなたを呼んでいます。")),
                description: format!(
                    "{author_name} さんが **{room_name}** であなたをメンションしました。"
                ),
                colour: COLOUR_PANEL,
                fields,
            }
        }
        Notice::MentionEveryoneWarning => EmbedContent::plain(
            "\u{26A0}\u{FE0F} `@everyone` / `@here` はDM転送されません。".to_string(),
            COLOUR_LEAVE,
        ),
        Notice::DirectMessageFailed { member } => EmbedContent::plain(
            format!("\u{26A0}\u{FE0F} <@{member}> へDMを送信できませんでした。"),
            COLOUR_LEAVE,
        ),
    }
}

fn render_panel(room_name: &str, overview: &TeamOverview) -> EmbedContent {
    let mut description = format!(
        "リアクションでチームを選んでください。\n{SPLIT_EMOJI} チームごとに分かれる / {GATHER_EMOJI} 元のVCに集合"
    );
    if let Some(starter) = &overview.starter_name {
        description.push_str(&format!("\n開始ユーザー: {starter}"));
    }

    let mut fields: Vec<(String, String)> = overview
        .teams
        .iter()
        .map(|(label, names)| {
            (
                format!("{} チーム{label}", label.emoji()),
                name_list(names),
            )
        })
        .collect();
    fields.push(("未割り当て".to_string(), name_list(&overview.unassigned)));

    EmbedContent {
        title: Some(format!("{room_name} チーム分けパネル")),
        description,
        colour: COLOUR_PANEL,
        fields,
    }
}

fn name_list(names: &[String]) -> String {
    if names.is_empty() {
        "-".to_string()
    } else {
        names.join("\n")
    }
}
