//! Implements the `/resume` command.

use tracing::instrument;

use crate::data::GetData;
use crate::player::PlaybackError;
use crate::Context;
use crate::PhonographError;

/// Resume a paused track.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn resume(ctx: Context<'_>) -> Result<(), PhonographError> {
    let resumed = super::playing_session(ctx.session().await?, PlaybackError::NotPaused)?
        .resume()
        .await?;
    tracing::info!("Resumed {}", resumed.title());
    ctx.say("▶️ Resumed!").await?;
    Ok(())
}
