//! Error types.
//!
//! [UserError]s are expected and shown to the user, everything else in
//! [PhonographError] is unexpected and logged as an error.

use std::time::Duration;

use thiserror::Error;

use crate::lib::youtube::ResolveError;
use crate::player::controller::PlayerError;
use crate::player::PlaybackError;
use crate::player::SinkError;
use crate::serenity;

/// Top level error of the bot.
#[derive(Debug, Error)]
pub enum PhonographError {
    /// Errors caused by users, shown to them.
    #[error(transparent)]
    UserError(#[from] UserError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Discord error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("Failed to join voice channel: {0}")]
    Join(#[from] songbird::error::JoinError),

    #[error("Track resolution failed: {0}")]
    Resolve(ResolveError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    /// The playback session of a guild is no longer running.
    #[error("Playback session closed.")]
    SessionClosed,

    #[error("Missing from setup: {reason}")]
    MissingFromSetup { reason: String },

    #[error("Command check failed: {}", .reason.as_deref().unwrap_or("no reason"))]
    CheckFailed { reason: Option<String> },

    #[error("Command panicked: {}", .payload.as_deref().unwrap_or("no payload"))]
    Panic { payload: Option<String> },

    #[error("Command structure mismatch: {description}")]
    CommandStructureMismatch { description: String },
}

/// Searches that found nothing are the user's problem, the rest are ours.
impl From<ResolveError> for PhonographError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NoResults | ResolveError::NoStream | ResolveError::Exited { .. } => {
                UserError::SearchFailed {
                    reason: err.to_string(),
                }
                .into()
            }
            other => PhonographError::Resolve(other),
        }
    }
}

impl From<PlaybackError> for PhonographError {
    fn from(err: PlaybackError) -> Self {
        UserError::Playback(err).into()
    }
}

impl From<PlayerError> for PhonographError {
    fn from(err: PlayerError) -> Self {
        match err {
            PlayerError::Playback(e) => e.into(),
            PlayerError::Sink(e) => e.into(),
        }
    }
}

/// Errors that are shown to users as ephemeral replies.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("❌ {0}")]
    Playback(#[from] PlaybackError),

    #[error("❌ Could not find that song: {reason}\nTry a direct YouTube URL or a simpler search term.")]
    SearchFailed { reason: String },

    #[error("❌ You need to be in a voice channel!")]
    NotInVoice,

    #[error("❌ Not connected to a voice channel.")]
    NotConnected,

    #[error("This command only works in a server.")]
    GuildOnly,

    #[error("This command only works in direct messages.")]
    DmOnly,

    #[error("This command only works in NSFW channels.")]
    NsfwOnly,

    #[error("Only bot owners can use this command.")]
    NotOwner,

    #[error("Missing subcommand, try one of: {subcmds}")]
    MissingSubcommand { subcmds: String },

    #[error("Could not understand the arguments{}.", .input.as_deref().map(|i| format!(" '{i}'")).unwrap_or_default())]
    BadArgs { input: Option<String> },

    #[error("Slow down! Try again in {:.1}s.", .remaining_cooldown.as_secs_f32())]
    OnCooldown { remaining_cooldown: Duration },

    #[error("I'm missing permissions: {missing_permissions}")]
    MissingBotPermissions {
        missing_permissions: serenity::Permissions,
    },

    #[error("You're missing permissions{}", .missing_permissions.map(|p| format!(": {p}")).unwrap_or_default())]
    MissingUserPermissions {
        missing_permissions: Option<serenity::Permissions>,
    },
}

/// Errors while reading `config.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    #[error("Missing config file. {action_msg}")]
    MissingConfig { action_msg: String },

    #[error("Config file error: {0}")]
    IoError(#[from] std::io::Error),
}
