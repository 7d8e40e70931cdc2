//! The playback state machine of one voice session.
//!
//! ```text
//!            request_play (idle) / on_track_ended
//!   Idle  ------------------------------------------>  advance()
//!    ^                                                   |
//!    |  queue empty                         track started |
//!    +------------------- advance() <------- Playing <---+
//!                             ^                 |
//!                             |  on_track_ended | skip: sink.stop()
//!                             +-----------------+
//! ```
//!
//! `advance` is only ever reached from [Controller::request_play] and
//! [Controller::on_track_ended], so at most one track is started per
//! notification no matter how `skip` and natural track ends interleave.

use thiserror::Error;
use tracing::instrument;

use super::AudioSink;
use super::PlaybackError;
use super::PlaybackId;
use super::SinkError;
use super::TrackQueue;
use crate::data::Track;

/// What the controller is doing right now.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing(Current),
}

/// The active track.
#[derive(Debug, Clone, PartialEq)]
pub struct Current {
    pub id: PlaybackId,
    pub track: Track,
    pub paused: bool,
}

/// Failure of a controller command.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PlayerError {
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Outcome of trying to start the next track.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Advance {
    /// Tracks that failed on the way, in the order they failed.
    pub failed: Vec<(Track, SinkError)>,
    /// The track now playing, `None` if the queue ran out.
    pub started: Option<Track>,
    /// Tracks still waiting after this advance.
    pub remaining: usize,
}

/// Result of [Controller::request_play].
#[derive(Debug, Clone, PartialEq)]
pub struct Enqueued {
    /// Position of the new track in the queue, starting at 1.
    pub position: usize,
    /// Set when the controller was idle and advanced immediately.
    pub advance: Option<Advance>,
}

/// Snapshot of the active track for display.
#[derive(Debug, Clone, PartialEq)]
pub struct NowPlaying {
    pub track: Track,
    pub paused: bool,
    pub remaining: usize,
}

/// Snapshot of the front of the queue for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueView {
    pub upcoming: Vec<Track>,
    pub total: usize,
}

/// Owns the queue and playback state of a single voice session.
#[derive(Debug)]
pub struct Controller<S> {
    queue: TrackQueue,
    state: PlaybackState,
    sink: S,
    last_id: PlaybackId,
}

impl<S: AudioSink> Controller<S> {
    pub fn new(sink: S) -> Self {
        Self {
            queue: TrackQueue::default(),
            state: PlaybackState::Idle,
            sink,
            last_id: PlaybackId::default(),
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    #[cfg(test)]
    pub fn queue(&self) -> &TrackQueue {
        &self.queue
    }

    /// Queue a track and start playing if nothing is.
    #[instrument(skip_all, fields(title = track.title()))]
    pub async fn request_play(&mut self, track: Track) -> Enqueued {
        let position = self.queue.enqueue(track);
        tracing::debug!("Queued at position {position}.");

        let advance = match self.state {
            PlaybackState::Idle => Some(self.advance().await),
            PlaybackState::Playing(_) => None,
        };
        Enqueued { position, advance }
    }

    /// Start the track at the front of the queue.
    ///
    /// Tracks that fail to start are dropped and the next one is tried, so this
    /// only returns once something is playing or the queue is empty.
    pub async fn advance(&mut self) -> Advance {
        self.advance_after(Vec::new()).await
    }

    async fn advance_after(&mut self, mut failed: Vec<(Track, SinkError)>) -> Advance {
        loop {
            let track = match self.queue.dequeue_next() {
                Ok(track) => track,
                Err(_) => {
                    tracing::info!("Queue is empty.");
                    self.state = PlaybackState::Idle;
                    return Advance {
                        failed,
                        started: None,
                        remaining: 0,
                    };
                }
            };

            self.last_id = self.last_id.next();
            let id = self.last_id;
            self.state = PlaybackState::Playing(Current {
                id,
                track: track.clone(),
                paused: false,
            });

            match self.sink.start(&track, id).await {
                Ok(()) => {
                    tracing::info!("Now playing {}", track.title());
                    return Advance {
                        failed,
                        started: Some(track),
                        remaining: self.queue.len(),
                    };
                }
                Err(e) => {
                    tracing::warn!("Failed to start {}: {e}", track.title());
                    self.state = PlaybackState::Idle;
                    failed.push((track, e));
                }
            }
        }
    }

    /// Entry point for sink notifications: the track started as `id` is over.
    ///
    /// Returns `None` for notifications about anything but the current track,
    /// e.g. one stopped by [Controller::stop] before a new track was queued.
    #[instrument(skip(self))]
    pub async fn on_track_ended(
        &mut self,
        id: PlaybackId,
        error: Option<SinkError>,
    ) -> Option<Advance> {
        let current = match &self.state {
            PlaybackState::Playing(current) if current.id == id => current.track.clone(),
            _ => {
                tracing::debug!("Ignoring stale end notification.");
                return None;
            }
        };
        self.state = PlaybackState::Idle;

        let failed = match error {
            Some(e) => {
                tracing::error!("Player error on {}: {e}", current.title());
                vec![(current, e)]
            }
            None => Vec::new(),
        };
        Some(self.advance_after(failed).await)
    }

    /// Stop the current track. The next one starts once the sink reports the end.
    pub async fn skip(&mut self) -> Result<Track, PlayerError> {
        let track = match &self.state {
            PlaybackState::Idle => return Err(PlaybackError::NothingPlaying.into()),
            PlaybackState::Playing(current) => current.track.clone(),
        };
        self.sink.stop().await?;
        Ok(track)
    }

    /// Clear the queue, stop playback and leave the voice channel.
    pub async fn stop(&mut self) {
        self.halt().await;
        if let Err(e) = self.sink.release().await {
            tracing::warn!("Failed to release voice connection: {e}");
        }
    }

    /// Like [Controller::stop], for when the voice connection is already gone.
    pub async fn disconnected(&mut self) {
        self.halt().await;
    }

    async fn halt(&mut self) {
        self.queue.clear();
        self.state = PlaybackState::Idle;
        if let Err(e) = self.sink.stop().await {
            tracing::warn!("Failed to stop track: {e}");
        }
    }

    pub async fn pause(&mut self) -> Result<Track, PlayerError> {
        let track = match &self.state {
            PlaybackState::Playing(current) if !current.paused => current.track.clone(),
            _ => return Err(PlaybackError::NothingPlaying.into()),
        };
        self.sink.pause().await?;
        self.set_paused(true);
        Ok(track)
    }

    pub async fn resume(&mut self) -> Result<Track, PlayerError> {
        let track = match &self.state {
            PlaybackState::Playing(current) if current.paused => current.track.clone(),
            _ => return Err(PlaybackError::NotPaused.into()),
        };
        self.sink.resume().await?;
        self.set_paused(false);
        Ok(track)
    }

    fn set_paused(&mut self, paused: bool) {
        if let PlaybackState::Playing(current) = &mut self.state {
            current.paused = paused;
        }
    }

    /// Remove every waiting track, returning how many there were.
    pub fn clear(&mut self) -> usize {
        let cleared = self.queue.len();
        self.queue.clear();
        cleared
    }

    pub fn now_playing(&self) -> Result<NowPlaying, PlaybackError> {
        match &self.state {
            PlaybackState::Idle => Err(PlaybackError::NothingPlaying),
            PlaybackState::Playing(current) => Ok(NowPlaying {
                track: current.track.clone(),
                paused: current.paused,
                remaining: self.queue.len(),
            }),
        }
    }

    pub fn queue_view(&self, limit: usize) -> QueueView {
        QueueView {
            upcoming: self.queue.peek_all(limit).cloned().collect(),
            total: self.queue.len(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::serenity;

    /// Everything the controller asked of the sink.
    #[derive(Debug, Clone, PartialEq)]
    pub(crate) enum SinkCall {
        Start(String, PlaybackId),
        Stop,
        Pause,
        Resume,
        Release,
    }

    /// Records calls and fails to start tracks with a chosen title.
    #[derive(Debug, Clone, Default)]
    pub(crate) struct FakeSink {
        pub calls: Arc<Mutex<Vec<SinkCall>>>,
        pub broken: Arc<Mutex<HashSet<String>>>,
    }

    impl FakeSink {
        pub fn calls(&self) -> Vec<SinkCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn break_title(&self, title: &str) {
            self.broken.lock().unwrap().insert(title.to_string());
        }

        fn record(&self, call: SinkCall) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl AudioSink for FakeSink {
        async fn start(&mut self, track: &Track, id: PlaybackId) -> Result<(), SinkError> {
            self.record(SinkCall::Start(track.title().to_string(), id));
            if self.broken.lock().unwrap().contains(track.title()) {
                return Err(SinkError::Start {
                    reason: "unsupported codec".to_string(),
                });
            }
            Ok(())
        }

        async fn stop(&mut self) -> Result<(), SinkError> {
            self.record(SinkCall::Stop);
            Ok(())
        }

        async fn pause(&mut self) -> Result<(), SinkError> {
            self.record(SinkCall::Pause);
            Ok(())
        }

        async fn resume(&mut self) -> Result<(), SinkError> {
            self.record(SinkCall::Resume);
            Ok(())
        }

        async fn release(&mut self) -> Result<(), SinkError> {
            self.record(SinkCall::Release);
            Ok(())
        }
    }

    pub(crate) fn track(title: &str) -> Track {
        Track::builder()
            .stream_url(format!("https://stream.example/{title}"))
            .title(title)
            .requester("<@1>")
            .source_channel(serenity::ChannelId::new(99))
            .build()
    }

    fn controller() -> (Controller<FakeSink>, FakeSink) {
        let sink = FakeSink::default();
        (Controller::new(sink.clone()), sink)
    }

    fn current(controller: &Controller<FakeSink>) -> Option<(PlaybackId, String)> {
        match controller.state() {
            PlaybackState::Idle => None,
            PlaybackState::Playing(c) => Some((c.id, c.track.title().to_string())),
        }
    }

    fn queued(controller: &Controller<FakeSink>) -> Vec<String> {
        controller
            .queue()
            .peek_all(usize::MAX)
            .map(|t| t.title().to_string())
            .collect()
    }

    #[tokio::test]
    async fn advance_on_empty_queue_stays_idle() {
        let (mut c, sink) = controller();
        let advance = c.advance().await;

        assert_eq!(advance, Advance::default());
        assert_eq!(c.state(), &PlaybackState::Idle);
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn play_while_idle_starts_track() {
        let (mut c, sink) = controller();
        let enqueued = c.request_play(track("a")).await;

        assert_eq!(enqueued.position, 1);
        let advance = enqueued.advance.expect("idle controller advances");
        assert_eq!(advance.started, Some(track("a")));
        assert_eq!(advance.remaining, 0);

        match c.state() {
            PlaybackState::Playing(cur) => {
                assert_eq!(cur.track, track("a"));
                assert!(!cur.paused);
            }
            PlaybackState::Idle => panic!("expected to be playing"),
        }
        assert_eq!(sink.calls().len(), 1);
    }

    #[tokio::test]
    async fn play_while_playing_only_queues() {
        let (mut c, sink) = controller();
        c.request_play(track("a")).await;
        let enqueued = c.request_play(track("b")).await;

        assert_eq!(enqueued.position, 1);
        assert_eq!(enqueued.advance, None);
        assert_eq!(queued(&c), ["b"]);
        assert_eq!(sink.calls().len(), 1);
    }

    #[tokio::test]
    async fn failure_moves_to_next_track() {
        let (mut c, _sink) = controller();
        c.request_play(track("a")).await;
        c.request_play(track("b")).await;
        c.request_play(track("c")).await;
        assert_eq!(queued(&c), ["b", "c"]);

        let (id, title) = current(&c).unwrap();
        assert_eq!(title, "a");

        let error = SinkError::Playback {
            reason: "decode failed".to_string(),
        };
        let advance = c.on_track_ended(id, Some(error.clone())).await.unwrap();

        assert_eq!(advance.failed, vec![(track("a"), error)]);
        assert_eq!(advance.started, Some(track("b")));
        assert_eq!(current(&c).unwrap().1, "b");
        assert_eq!(queued(&c), ["c"]);
    }

    #[tokio::test]
    async fn failure_on_last_track_goes_idle() {
        let (mut c, _sink) = controller();
        c.request_play(track("a")).await;
        let (id, _) = current(&c).unwrap();

        let error = SinkError::Playback {
            reason: "connection reset".to_string(),
        };
        let advance = c.on_track_ended(id, Some(error)).await.unwrap();

        assert_eq!(advance.started, None);
        assert_eq!(advance.failed.len(), 1);
        assert_eq!(c.state(), &PlaybackState::Idle);
    }

    #[tokio::test]
    async fn start_failures_are_skipped_in_one_call() {
        let (mut c, sink) = controller();
        sink.break_title("a");
        sink.break_title("b");
        c.request_play(track("a")).await;

        // Nothing was queued behind "a".
        assert_eq!(c.state(), &PlaybackState::Idle);
        c.queue.enqueue(track("b"));
        c.queue.enqueue(track("c"));

        let advance = c.advance().await;
        let failed: Vec<_> = advance.failed.iter().map(|(t, _)| t.title()).collect();
        assert_eq!(failed, ["b"]);
        assert_eq!(advance.started, Some(track("c")));
        assert_eq!(current(&c).unwrap().1, "c");
    }

    #[tokio::test]
    async fn natural_end_plays_next() {
        let (mut c, _sink) = controller();
        c.request_play(track("a")).await;
        c.request_play(track("b")).await;
        let (id, _) = current(&c).unwrap();

        let advance = c.on_track_ended(id, None).await.unwrap();
        assert!(advance.failed.is_empty());
        assert_eq!(advance.started, Some(track("b")));

        let (id, _) = current(&c).unwrap();
        let advance = c.on_track_ended(id, None).await.unwrap();
        assert_eq!(advance.started, None);
        assert_eq!(c.state(), &PlaybackState::Idle);
    }

    #[tokio::test]
    async fn stale_end_is_ignored() {
        let (mut c, _sink) = controller();
        c.request_play(track("a")).await;
        let (old, _) = current(&c).unwrap();

        c.stop().await;
        c.request_play(track("b")).await;

        // The end of "a" arrives after "b" already started.
        assert_eq!(c.on_track_ended(old, None).await, None);
        assert_eq!(current(&c).unwrap().1, "b");
    }

    #[tokio::test]
    async fn skip_while_idle_fails_without_touching_queue() {
        let (mut c, sink) = controller();
        c.queue.enqueue(track("a"));

        let result = c.skip().await;
        assert_eq!(result, Err(PlaybackError::NothingPlaying.into()));
        assert_eq!(queued(&c), ["a"]);
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn skip_stops_but_does_not_advance() {
        let (mut c, sink) = controller();
        c.request_play(track("a")).await;
        c.request_play(track("b")).await;

        let skipped = c.skip().await.unwrap();
        assert_eq!(skipped, track("a"));
        assert_eq!(current(&c).unwrap().1, "a");
        assert_eq!(queued(&c), ["b"]);
        assert_eq!(sink.calls().last(), Some(&SinkCall::Stop));
    }

    #[tokio::test]
    async fn stop_always_ends_idle_and_empty() {
        let (mut c, sink) = controller();
        c.stop().await;
        assert_eq!(c.state(), &PlaybackState::Idle);
        assert!(c.queue().is_empty());

        c.request_play(track("a")).await;
        c.request_play(track("b")).await;
        c.pause().await.unwrap();
        c.stop().await;

        assert_eq!(c.state(), &PlaybackState::Idle);
        assert!(c.queue().is_empty());
        assert_eq!(sink.calls().last(), Some(&SinkCall::Release));
    }

    #[tokio::test]
    async fn disconnect_does_not_release() {
        let (mut c, sink) = controller();
        c.request_play(track("a")).await;
        c.disconnected().await;

        assert_eq!(c.state(), &PlaybackState::Idle);
        assert!(!sink.calls().contains(&SinkCall::Release));
    }

    #[tokio::test]
    async fn pause_and_resume() {
        let (mut c, sink) = controller();
        assert_eq!(c.pause().await, Err(PlaybackError::NothingPlaying.into()));
        assert_eq!(c.resume().await, Err(PlaybackError::NotPaused.into()));

        c.request_play(track("a")).await;
        assert_eq!(c.resume().await, Err(PlaybackError::NotPaused.into()));

        c.pause().await.unwrap();
        assert!(c.now_playing().unwrap().paused);
        assert_eq!(c.pause().await, Err(PlaybackError::NothingPlaying.into()));

        c.resume().await.unwrap();
        assert!(!c.now_playing().unwrap().paused);

        let calls = sink.calls();
        assert_eq!(&calls[1..], [SinkCall::Pause, SinkCall::Resume]);
    }

    #[tokio::test]
    async fn clear_keeps_current_track() {
        let (mut c, _sink) = controller();
        c.request_play(track("a")).await;
        c.request_play(track("b")).await;
        c.request_play(track("c")).await;

        assert_eq!(c.clear(), 2);
        assert!(c.queue().is_empty());
        assert_eq!(current(&c).unwrap().1, "a");
    }

    #[tokio::test]
    async fn views() {
        let (mut c, _sink) = controller();
        assert_eq!(c.now_playing(), Err(PlaybackError::NothingPlaying));

        for title in ["a", "b", "c", "d"] {
            c.request_play(track(title)).await;
        }

        let now = c.now_playing().unwrap();
        assert_eq!(now.track, track("a"));
        assert_eq!(now.remaining, 3);

        let view = c.queue_view(2);
        assert_eq!(view.upcoming, vec![track("b"), track("c")]);
        assert_eq!(view.total, 3);
    }
}
