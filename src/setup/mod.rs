//! Builds the client: config, framework and voice.

mod config;
mod framework;

use songbird::SerenityInit;

use crate::data::HttpKey;
use crate::serenity;
use crate::PhonographError;

pub use config::Config;
pub use config::PlayerConfig;

/// Constructs a [serenity::Client] with initialized [songbird] and [reqwest::Client].
pub(super) async fn client(config: Config) -> Result<serenity::Client, PhonographError> {
    // Get discord token from config file
    let token = config.token()?.clone();

    // Intents we wish to use
    // See https://discord.com/developers/docs/topics/gateway#gateway-intents
    let intents = serenity::GatewayIntents::non_privileged();

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework::framework(config))
        .register_songbird()
        .type_map_insert::<HttpKey>(reqwest::Client::new())
        .await?;

    Ok(client)
}
