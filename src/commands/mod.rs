//! Bot commands.

mod clear;
mod nowplaying;
mod pause;
mod ping;
mod play;
mod queue;
mod resume;
mod skip;
mod stop;

use crate::player::PlaybackError;
use crate::player::SessionHandle;
use crate::Data;
use crate::PhonographError;

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, PhonographError>;

/// Lists all the implemented commands
pub fn list() -> Vec<Command> {
    vec![
        play::play(),
        skip::skip(),
        pause::pause(),
        resume::resume(),
        stop::stop(),
        queue::queue(),
        clear::clear(),
        nowplaying::nowplaying(),
        ping::ping(),
    ]
}

/// A guild without a session has never played anything, so commands that need
/// a track fail the same way they would on an idle session.
fn playing_session(
    session: Option<SessionHandle>,
    idle: PlaybackError,
) -> Result<SessionHandle, PlaybackError> {
    session.ok_or(idle)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::UserError;

    #[test]
    fn missing_session_is_idle() {
        let err = playing_session(None, PlaybackError::NothingPlaying).unwrap_err();
        assert_eq!(err, PlaybackError::NothingPlaying);

        let err = PhonographError::from(playing_session(None, PlaybackError::NotPaused).unwrap_err());
        assert!(matches!(
            err,
            PhonographError::UserError(UserError::Playback(PlaybackError::NotPaused))
        ));
        assert_eq!(err.to_string(), "❌ Nothing is paused.");
    }
}
