//! Implements the `/pause` command.

use tracing::instrument;

use crate::data::GetData;
use crate::player::PlaybackError;
use crate::Context;
use crate::PhonographError;

/// Pause the current track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn pause(ctx: Context<'_>) -> Result<(), PhonographError> {
    let paused = super::playing_session(ctx.session().await?, PlaybackError::NothingPlaying)?
        .pause()
        .await?;
    tracing::info!("Paused {}", paused.title());
    ctx.say("⏸️ Paused!").await?;
    Ok(())
}
