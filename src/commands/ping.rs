//! Implements the `/ping` command.

use tracing::instrument;

use crate::Context;
use crate::PhonographError;

/// Check the bot's gateway latency.
#[instrument(skip(ctx))]
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), PhonographError> {
    let latency = ctx.ping().await;
    ctx.say(format!("Pong! Latency: {}ms", latency.as_millis()))
        .await?;
    Ok(())
}
