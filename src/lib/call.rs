//! Manages [voice calls](songbird::Call).

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::instrument;

use crate::error::UserError;
use crate::Context;
use crate::PhonographError;

/// Convenience type alias for [songbird::Call].
pub type CallRef = Arc<Mutex<songbird::Call>>;
/// Convenience type alias for [songbird::Songbird].
type Manager = Arc<songbird::Songbird>;

/// Get the [Manager] from [Context]
pub async fn get_manager(ctx: &Context<'_>) -> Result<Manager, PhonographError> {
    songbird::get(ctx.serenity_context())
        .await
        .ok_or(PhonographError::MissingFromSetup {
            reason: "Expecting songbird manager.".to_string(),
        })
}

/// A call the bot is in.
pub struct Connection {
    pub call: CallRef,
    /// Name of the voice channel if it was just joined.
    pub joined: Option<String>,
}

/// Join the author's voice channel, unless the bot is already there.
#[instrument(skip(ctx), fields(author=%ctx.author(), guild=?ctx.guild_id(), channel=?ctx.channel_id()))]
pub async fn join_author(ctx: &Context<'_>) -> Result<Connection, PhonographError> {
    let manager = get_manager(ctx).await?;
    let author = ctx.author();

    // Try to find the user's guild and voice channel.
    let (guild_id, channel_id, channel_name) = {
        let guild = ctx.guild().ok_or(UserError::GuildOnly)?;
        let channel_id = guild
            .voice_states
            .get(&author.id)
            .and_then(|vs| vs.channel_id)
            .ok_or(UserError::NotInVoice)?;
        let channel_name = guild
            .channels
            .get(&channel_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "<MISSING CHANNEL>".to_string());
        (guild.id, channel_id, channel_name)
    };

    if let Some(call) = manager.get(guild_id) {
        let current = call.lock().await.current_channel();
        if current == Some(channel_id.into()) {
            return Ok(Connection { call, joined: None });
        }
    }

    tracing::info!(
        "Joining {user} in {channel_name}",
        user = author.name,
    );

    // Try to join the call.
    let call = manager.join(guild_id, channel_id).await?;

    Ok(Connection {
        call,
        joined: Some(channel_name),
    })
}
