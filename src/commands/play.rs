//! Implements the `/play` command.
//!
//! Joins the author's voice channel, looks the query up and queues the result.
//! Playback starts right away if nothing else is playing.

use serenity::AutocompleteChoice;
use serenity::Mentionable;
use tracing::instrument;

use crate::lib;
use crate::serenity;
use crate::Context;
use crate::PhonographError;

/// Min length before doing actual searches.
const MIN_PARTIAL_LEN: usize = 2;
/// How many suggestions discord gets.
const SUGGESTIONS: u8 = 5;

/// Plays from the given link or does a youtube search on the query.
///
/// Suggestions are only searched once the query is longer than 2 characters.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Youtube query or url"]
    #[autocomplete = "autocomplete_query"]
    query: String,
) -> Result<(), PhonographError> {
    // Looking up the track can take a while.
    ctx.defer().await?;

    let conn = lib::call::join_author(&ctx).await?;
    if let Some(channel) = &conn.joined {
        ctx.say(format!("🔗 Connected to **{channel}**")).await?;
    }

    let session = lib::events::init_session(&ctx, &conn.call).await?;

    let requester = ctx.author().mention().to_string();
    let track = ctx
        .data()
        .resolver
        .resolve(&query, requester, ctx.channel_id())
        .await?;

    let title = track.title().to_string();
    tracing::info!("Queueing {title}");
    let position = session.play(track).await?;

    ctx.say(format!("✅ **{title}** added to queue! (Position: {position})"))
        .await?;
    Ok(())
}

#[instrument(skip(ctx))]
async fn autocomplete_query(ctx: Context<'_>, partial: &str) -> Vec<AutocompleteChoice> {
    if partial.len() <= MIN_PARTIAL_LEN {
        tracing::trace!(
            "Skipping search, query length ({}) not over min ({MIN_PARTIAL_LEN}).",
            partial.len()
        );
        return Vec::new();
    };

    tracing::trace!("Searching for '{partial}'.");

    match ctx.data().resolver.suggest(partial, SUGGESTIONS).await {
        Ok(results) => results
            .into_iter()
            .map(|res| AutocompleteChoice::new(res.name, res.url))
            .collect(),
        Err(e) => {
            tracing::error!("{e}");
            Vec::new()
        }
    }
}
