//! Implements the `/nowplaying` command.

use poise::CreateReply;
use tracing::instrument;

use crate::data::GetData;
use crate::player::announce::track_embed;
use crate::player::PlaybackError;
use crate::Context;
use crate::PhonographError;

/// Show the current track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn nowplaying(ctx: Context<'_>) -> Result<(), PhonographError> {
    let now = super::playing_session(ctx.session().await?, PlaybackError::NothingPlaying)?
        .now_playing()
        .await?;

    let heading = if now.paused {
        "⏸️ Currently Paused"
    } else {
        "🎵 Currently Playing"
    };
    let embed = track_embed(heading, &now.track, now.remaining);

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}
