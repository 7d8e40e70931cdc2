//! Where the audio goes.

use async_trait::async_trait;
use songbird::input::HttpRequest;
use songbird::input::Input;
use songbird::tracks::ControlError;
use songbird::tracks::TrackHandle;
use songbird::Event;
use songbird::TrackEvent;
use thiserror::Error;
use tokio::sync::mpsc::WeakUnboundedSender;

use super::session::Request;
use super::PlaybackId;
use crate::data::Track;
use crate::lib::call::CallRef;
use crate::lib::events::NotifyEnd;

/// Failures of the audio backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Could not start stream: {reason}")]
    Start { reason: String },
    #[error("Playback failed: {reason}")]
    Playback { reason: String },
    #[error("Could not control track: {reason}")]
    Control { reason: String },
    #[error("Could not leave voice channel: {reason}")]
    Release { reason: String },
}

impl From<ControlError> for SinkError {
    fn from(e: ControlError) -> Self {
        SinkError::Control {
            reason: e.to_string(),
        }
    }
}

/// Plays one track at a time and reports when it ends.
///
/// Implementations must report the end of every started track (naturally,
/// stopped, or failed) back to the session with the [PlaybackId] it was
/// started with.
#[async_trait]
pub trait AudioSink: Send + 'static {
    /// Start streaming `track`, replacing anything playing.
    async fn start(&mut self, track: &Track, id: PlaybackId) -> Result<(), SinkError>;
    /// Stop the current track, if any.
    async fn stop(&mut self) -> Result<(), SinkError>;
    async fn pause(&mut self) -> Result<(), SinkError>;
    async fn resume(&mut self) -> Result<(), SinkError>;
    /// Drop the voice connection.
    async fn release(&mut self) -> Result<(), SinkError>;
}

/// A [songbird::Call] as an [AudioSink].
pub struct CallSink {
    /// The guild's call.
    call: CallRef,
    /// Used to stream track urls.
    http: reqwest::Client,
    /// Volume applied to every track.
    volume: f32,
    /// Where track ends are reported. Weak so the session can shut down.
    session: WeakUnboundedSender<Request>,
    /// The last started track.
    current: Option<TrackHandle>,
}

impl std::fmt::Debug for CallSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSink")
            .field("volume", &self.volume)
            .field("current", &self.current.as_ref().map(TrackHandle::uuid))
            .finish_non_exhaustive()
    }
}

impl CallSink {
    pub fn new(
        call: CallRef,
        http: reqwest::Client,
        volume: f32,
        session: WeakUnboundedSender<Request>,
    ) -> Self {
        Self {
            call,
            http,
            volume,
            session,
            current: None,
        }
    }

    /// The songbird track for `track`, at the configured volume.
    fn prepare(&self, track: &Track) -> songbird::tracks::Track {
        let input: Input = HttpRequest::new(self.http.clone(), track.stream_url().to_string()).into();
        songbird::tracks::Track::new(input).volume(self.volume)
    }

    fn current(&self) -> Result<&TrackHandle, SinkError> {
        self.current.as_ref().ok_or(SinkError::Control {
            reason: "no track started".to_string(),
        })
    }
}

#[async_trait]
impl AudioSink for CallSink {
    async fn start(&mut self, track: &Track, id: PlaybackId) -> Result<(), SinkError> {
        let handle = {
            let mut call = self.call.lock().await;
            call.play_only(self.prepare(track))
        };

        // Both fire for a failed track in some cases, the session drops the second.
        let notify = NotifyEnd::new(id, self.session.clone());
        let registered = handle
            .add_event(Event::Track(TrackEvent::End), notify.clone())
            .and_then(|()| handle.add_event(Event::Track(TrackEvent::Error), notify));

        if let Err(e) = registered {
            // Its end would never be reported, so it must not keep playing.
            if let Err(stop_err) = handle.stop() {
                tracing::debug!("Unregistered track already over: {stop_err}");
            }
            self.current = None;
            return Err(SinkError::Start {
                reason: e.to_string(),
            });
        }

        self.current = Some(handle);
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), SinkError> {
        match self.current.as_ref().map(TrackHandle::stop) {
            // Already over, nothing to do.
            None | Some(Ok(())) | Some(Err(ControlError::Finished)) => Ok(()),
            Some(Err(e)) => Err(e.into()),
        }
    }

    async fn pause(&mut self) -> Result<(), SinkError> {
        Ok(self.current()?.pause()?)
    }

    async fn resume(&mut self) -> Result<(), SinkError> {
        Ok(self.current()?.play()?)
    }

    async fn release(&mut self) -> Result<(), SinkError> {
        self.current = None;
        let mut call = self.call.lock().await;
        call.stop();
        call.leave().await.map_err(|e| SinkError::Release {
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;
    use tokio::sync::Mutex;

    use super::*;
    use crate::player::controller::tests::track;
    use crate::serenity;

    fn sink(volume: f32) -> CallSink {
        let call = songbird::Call::standalone(serenity::GuildId::new(1), serenity::UserId::new(2));
        let (tx, _rx) = mpsc::unbounded_channel();
        CallSink::new(
            Arc::new(Mutex::new(call)),
            reqwest::Client::new(),
            volume,
            tx.downgrade(),
        )
    }

    #[tokio::test]
    async fn volume_is_set_before_playing() {
        let sink = sink(0.3);
        let prepared = sink.prepare(&track("a"));
        assert_eq!(prepared.volume, 0.3);
    }

    #[tokio::test]
    async fn controls_need_a_started_track() {
        let mut sink = sink(0.5);
        assert!(matches!(sink.pause().await, Err(SinkError::Control { .. })));
        // Stopping nothing is fine.
        assert_eq!(sink.stop().await, Ok(()));
    }
}
