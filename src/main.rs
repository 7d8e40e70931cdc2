//! A Discord bot that plays YouTube audio into voice channels from a simple queue.

mod commands;
mod data;
mod error;
mod lib;
mod log;
mod player;
mod setup;

use poise::serenity_prelude as serenity;

pub use data::Data;
pub use error::PhonographError;
pub use setup::Config;

/// Convenient type alias for [poise::Context].
pub type Context<'a> = poise::Context<'a, Data, PhonographError>;

#[tokio::main]
async fn main() {
    // Config is needed before tracing, so errors here go straight to stderr.
    let config = match Config::read() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return;
        }
    };

    // Keep the guard alive for the whole program, otherwise file logs are lost.
    let _guard = log::install_tracing(&config);

    let mut client = match setup::client(config).await {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to build client: {e}");
            return;
        }
    };

    if let Err(e) = client.start().await {
        tracing::error!("Client stopped: {e}");
    }
}
