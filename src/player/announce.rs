//! Messages the player sends on its own, without a command to reply to.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::ChannelId;
use serenity::CreateEmbed;
use serenity::CreateMessage;

use super::SinkError;
use crate::data::Track;
use crate::serenity;

/// Embed colour of everything the player posts.
pub const EMBED_COLOUR: u32 = 0x00ff00;

#[derive(Debug, Clone, PartialEq)]
pub enum Announcement {
    NowPlaying { track: Track, remaining: usize },
    Failed { track: Track, error: SinkError },
    QueueEmpty,
}

/// Posts [Announcement]s to a text channel.
#[async_trait]
pub trait Announcer: Send + Sync + 'static {
    /// Failures are logged, never returned, the player keeps going regardless.
    async fn announce(&self, channel: ChannelId, announcement: Announcement);
}

/// Announces through the Discord http api.
#[derive(Clone)]
pub struct ChannelAnnouncer {
    http: Arc<serenity::Http>,
}

impl ChannelAnnouncer {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Announcer for ChannelAnnouncer {
    async fn announce(&self, channel: ChannelId, announcement: Announcement) {
        let message = match announcement {
            Announcement::NowPlaying { track, remaining } => {
                CreateMessage::new().embed(track_embed("🎵 Now Playing", &track, remaining))
            }
            Announcement::Failed { track, error } => CreateMessage::new()
                .content(format!("❌ Error playing **{}**: {error}", track.title())),
            Announcement::QueueEmpty => CreateMessage::new().content("📭 Queue is empty."),
        };

        if let Err(e) = channel.send_message(&self.http, message).await {
            tracing::error!("Failed to announce in {channel}: {e}");
        }
    }
}

/// Embed describing `track` with the number of tracks behind it.
pub fn track_embed(heading: &str, track: &Track, remaining: usize) -> CreateEmbed {
    let title = match track.page_url() {
        Some(url) => format!("**[{}]({url})**", track.title()),
        None => format!("**{}**", track.title()),
    };

    let mut embed = CreateEmbed::new()
        .title(heading)
        .description(title)
        .colour(EMBED_COLOUR)
        .field("Requested by", track.requester(), true);

    if let Some(duration) = track.duration_string() {
        embed = embed.field("Duration", duration, true);
    }

    embed.field("Queue", format!("{remaining} songs remaining"), true)
}
