//! Implements the `/skip` command.
//!
//! The bot will skip the current track and start playing the next one
//! in the queue (if there is one).

use tracing::instrument;

use crate::data::GetData;
use crate::player::PlaybackError;
use crate::Context;
use crate::PhonographError;

/// Skips the current audio track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, guild_cooldown = 2)]
pub async fn skip(ctx: Context<'_>) -> Result<(), PhonographError> {
    let skipped = super::playing_session(ctx.session().await?, PlaybackError::NothingPlaying)?
        .skip()
        .await?;

    tracing::info!("Skipping {}", skipped.title());
    ctx.say(format!("⏭️ Skipped **{}**", skipped.title()))
        .await?;
    Ok(())
}
