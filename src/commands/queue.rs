//! Implements the `/queue` command.
//!
//! The bot responds with an embed listing the first page of waiting tracks.

use itertools::Itertools;
use poise::CreateReply;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use tracing::instrument;

use crate::data::GetData;
use crate::data::Track;
use crate::player::announce::EMBED_COLOUR;
use crate::player::controller::QueueView;
use crate::serenity;
use crate::Context;
use crate::PhonographError;

/// Show what's coming up
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, guild_cooldown = 2)]
pub async fn queue(ctx: Context<'_>) -> Result<(), PhonographError> {
    let page_size = ctx.data().player.queue_page_size;
    let view = match ctx.session().await? {
        Some(session) => session.queue(page_size).await?,
        // Nothing was ever queued here.
        None => QueueView::default(),
    };

    if view.total == 0 {
        ctx.say("📭 Queue is empty.").await?;
        return Ok(());
    }

    let embed = CreateEmbed::new()
        .title("🎵 Music Queue")
        .description(queue_listing(&view.upcoming, view.total))
        .colour(EMBED_COLOUR)
        .footer(CreateEmbedFooter::new(format!("Total songs: {}", view.total)));

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// One numbered line per track, with a note about the ones left out.
fn queue_listing(upcoming: &[Track], total: usize) -> String {
    let mut listing = upcoming
        .iter()
        .enumerate()
        .map(|(i, track)| format!("`{}.` {track}", i + 1))
        .join("\n");

    let hidden = total.saturating_sub(upcoming.len());
    if hidden > 0 {
        listing.push_str(&format!("\n... and {hidden} more songs"));
    }
    listing
}
