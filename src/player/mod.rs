//! Playback of queued tracks.
//!
//! - [queue] holds pending tracks in play order.
//! - [controller] is the playback state machine for a single voice session.
//! - [sink] is where audio actually goes (a songbird call).
//! - [announce] posts what the player does to text channels.
//! - [session] runs one controller per guild on its own task, so that command
//!   handlers and sink notifications never mutate playback state concurrently.

pub mod announce;
pub mod controller;
pub mod queue;
pub mod session;
pub mod sink;

use thiserror::Error;

pub use controller::Advance;
pub use controller::Controller;
pub use queue::TrackQueue;
pub use session::SessionHandle;
pub use sink::AudioSink;
pub use sink::SinkError;

/// Queue state errors. These end a single command and nothing else.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Queue is empty.")]
    EmptyQueue,
    #[error("Nothing is playing.")]
    NothingPlaying,
    #[error("Nothing is paused.")]
    NotPaused,
}

/// Identifies one start of the sink.
///
/// Every notification from the sink carries the id it was started with, so
/// notifications about tracks that are no longer current can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PlaybackId(u64);

impl PlaybackId {
    /// The id after this one.
    fn next(self) -> Self {
        PlaybackId(self.0.wrapping_add(1))
    }
}

