//! Implements the `/stop` command.
//!
//! This stops playback, clears the queue, and disconnects the
//! bot from the current voice channel.

use tracing::instrument;

use crate::data::GetData;
use crate::error::UserError;
use crate::Context;
use crate::PhonographError;

/// Stop the bot, delete the queue, and leave the call.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn stop(ctx: Context<'_>) -> Result<(), PhonographError> {
    let session = ctx.session().await?.ok_or(UserError::NotConnected)?;

    tracing::info!("Stopping the queue.");
    session.stop().await?;
    ctx.say("⏹️ Stopped and disconnected.").await?;
    Ok(())
}
