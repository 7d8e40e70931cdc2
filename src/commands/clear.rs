//! Implements the `/clear` command.
//!
//! Only the waiting tracks are removed, the current one keeps playing.

use tracing::instrument;

use crate::data::GetData;
use crate::Context;
use crate::PhonographError;

/// Remove every track waiting in the queue.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn clear(ctx: Context<'_>) -> Result<(), PhonographError> {
    // Nothing to remove before the first `/play`.
    let removed = match ctx.session().await? {
        Some(session) => session.clear().await?,
        None => 0,
    };
    tracing::info!("Cleared {removed} tracks.");
    ctx.say("🗑️ Queue cleared!").await?;
    Ok(())
}
