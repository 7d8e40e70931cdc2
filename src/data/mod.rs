//! This module contains everything relating to [Data].

mod track;

use std::collections::HashMap;
use std::collections::HashSet;

use std::sync::Arc;

use reqwest::Client;
use serenity::GuildId;
use serenity::UserId;
use tokio::sync::Mutex;

use crate::error::UserError;
use crate::lib::youtube::Resolver;
use crate::player::SessionHandle;
use crate::serenity;
use crate::setup::PlayerConfig;
use crate::Context;
pub use track::Track;

/// Convenience type alias for [GuildData]
type GuildDataRef = Arc<Mutex<GuildData>>;

/// The data kept between shards
#[derive(Debug)]
pub struct Data {
    /// List of users to send bug notifications
    pub notify_list: HashSet<UserId>,
    /// Per-Guild data
    pub guild_data: Mutex<HashMap<GuildId, GuildDataRef>>,
    /// Shared by every guild, bounds concurrent yt-dlp processes.
    pub resolver: Resolver,
    /// Playback settings from the config file.
    pub player: PlayerConfig,
}

impl Data {
    pub fn new(notify_list: HashSet<UserId>, player: PlayerConfig) -> Self {
        Self {
            notify_list,
            guild_data: Default::default(),
            resolver: Resolver::new(player.search_workers),
            player,
        }
    }
}

/// Data stored on a per-guild basis.
#[derive(Debug, Default)]
pub struct GuildData {
    /// The guild's playback session, started on the first `/play`.
    pub session: Option<SessionHandle>,
}

/// Key to store a [Client] in a [TypeMapKey](serenity::prelude::TypeMapKey)
pub struct HttpKey;
impl serenity::prelude::TypeMapKey for HttpKey {
    type Value = Client;
}

/// Is able to get a [GuildData] and [Client].
pub trait GetData {
    /// Returns a [Client].
    async fn http_client(&self) -> Client;
    /// Returns a reference to [GuildData]. Errors if not in a guild.
    async fn guild_data(&self) -> Result<GuildDataRef, UserError>;
    /// Returns the guild's session, `None` until the first `/play`.
    async fn session(&self) -> Result<Option<SessionHandle>, UserError>;
}

impl GetData for Context<'_> {
    async fn http_client(&self) -> Client {
        self.serenity_context()
            .data
            .read()
            .await
            .get::<HttpKey>()
            // Client internally uses an Arc, so this is cheap to clone
            .cloned()
            .expect("Expected http client")
    }

    async fn guild_data(&self) -> Result<GuildDataRef, UserError> {
        let guild = self.guild_id().ok_or(UserError::GuildOnly)?;
        let mut map = self.data().guild_data.lock().await;

        match map.get(&guild) {
            Some(data) => Ok(data.clone()),
            None => {
                let default_data: GuildDataRef = Default::default();
                map.insert(guild, default_data.clone());
                Ok(default_data)
            }
        }
    }

    async fn session(&self) -> Result<Option<SessionHandle>, UserError> {
        let guild_data = self.guild_data().await?;
        let lock = guild_data.lock().await;
        Ok(lock.session.clone())
    }
}
