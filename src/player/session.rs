//! One playback session per guild.
//!
//! A session is a task that owns a [Controller]. Commands and sink
//! notifications are sent to it as [Request]s and handled one at a time, so
//! playback state is only ever touched from that task.

use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::sync::oneshot;

use super::announce::Announcement;
use super::announce::Announcer;
use super::controller::NowPlaying;
use super::controller::PlayerError;
use super::controller::QueueView;
use super::Advance;
use super::AudioSink;
use super::Controller;
use super::PlaybackError;
use super::PlaybackId;
use super::SinkError;
use crate::data::Track;
use crate::serenity::ChannelId;
use crate::PhonographError;

/// Everything a session can be asked to do.
#[derive(Debug)]
pub enum Request {
    Play {
        track: Track,
        reply: oneshot::Sender<usize>,
    },
    Skip {
        reply: oneshot::Sender<Result<Track, PlayerError>>,
    },
    Pause {
        reply: oneshot::Sender<Result<Track, PlayerError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<Track, PlayerError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Clear {
        reply: oneshot::Sender<usize>,
    },
    NowPlaying {
        reply: oneshot::Sender<Result<NowPlaying, PlaybackError>>,
    },
    Queue {
        limit: usize,
        reply: oneshot::Sender<QueueView>,
    },
    /// Sent by the sink when the track started as `id` is over.
    TrackEnded {
        id: PlaybackId,
        error: Option<SinkError>,
    },
    /// The voice connection dropped.
    Disconnected,
}

/// Cheap to clone handle to a running session.
/// The session stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    requests: UnboundedSender<Request>,
}

/// Start a session on a new task.
///
/// `make_sink` receives the sender the sink reports track ends to.
pub fn spawn<S, A>(
    make_sink: impl FnOnce(WeakUnboundedSender<Request>) -> S,
    announcer: A,
) -> SessionHandle
where
    S: AudioSink,
    A: Announcer,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let controller = Controller::new(make_sink(tx.downgrade()));
    tokio::spawn(run(controller, rx, announcer));
    SessionHandle { requests: tx }
}

impl SessionHandle {
    /// Send a request and wait for its reply.
    async fn ask<T>(
        &self,
        request: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, PhonographError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(request(reply))
            .map_err(|_| PhonographError::SessionClosed)?;
        response.await.map_err(|_| PhonographError::SessionClosed)
    }

    /// Queue a track, returning its position.
    pub async fn play(&self, track: Track) -> Result<usize, PhonographError> {
        self.ask(|reply| Request::Play { track, reply }).await
    }

    /// Skip the current track, returning it.
    pub async fn skip(&self) -> Result<Track, PhonographError> {
        Ok(self.ask(|reply| Request::Skip { reply }).await??)
    }

    pub async fn pause(&self) -> Result<Track, PhonographError> {
        Ok(self.ask(|reply| Request::Pause { reply }).await??)
    }

    pub async fn resume(&self) -> Result<Track, PhonographError> {
        Ok(self.ask(|reply| Request::Resume { reply }).await??)
    }

    /// Clear the queue, stop playing and leave the voice channel.
    pub async fn stop(&self) -> Result<(), PhonographError> {
        self.ask(|reply| Request::Stop { reply }).await
    }

    /// Clear the queue, returning how many tracks were removed.
    pub async fn clear(&self) -> Result<usize, PhonographError> {
        self.ask(|reply| Request::Clear { reply }).await
    }

    pub async fn now_playing(&self) -> Result<NowPlaying, PhonographError> {
        Ok(self.ask(|reply| Request::NowPlaying { reply }).await??)
    }

    /// The first `limit` queued tracks.
    pub async fn queue(&self, limit: usize) -> Result<QueueView, PhonographError> {
        self.ask(|reply| Request::Queue { limit, reply }).await
    }

    /// Tell the session its voice connection is gone.
    pub fn disconnected(&self) -> Result<(), PhonographError> {
        self.requests
            .send(Request::Disconnected)
            .map_err(|_| PhonographError::SessionClosed)
    }
}

/// Reply to a request, the asker may have given up already.
fn respond<T>(reply: oneshot::Sender<T>, value: T) {
    if reply.send(value).is_err() {
        tracing::debug!("Request dropped before its reply.");
    }
}

/// The session loop.
async fn run<S, A>(
    mut controller: Controller<S>,
    mut requests: UnboundedReceiver<Request>,
    announcer: A,
) where
    S: AudioSink,
    A: Announcer,
{
    // Where to say the queue ran out.
    let mut last_channel: Option<ChannelId> = None;

    while let Some(request) = requests.recv().await {
        let advance = match request {
            Request::Play { track, reply } => {
                last_channel = Some(track.source_channel());
                let enqueued = controller.request_play(track).await;
                respond(reply, enqueued.position);
                enqueued.advance
            }
            Request::TrackEnded { id, error } => controller.on_track_ended(id, error).await,
            Request::Skip { reply } => {
                respond(reply, controller.skip().await);
                None
            }
            Request::Pause { reply } => {
                respond(reply, controller.pause().await);
                None
            }
            Request::Resume { reply } => {
                respond(reply, controller.resume().await);
                None
            }
            Request::Stop { reply } => {
                controller.stop().await;
                respond(reply, ());
                None
            }
            Request::Disconnected => {
                controller.disconnected().await;
                None
            }
            Request::Clear { reply } => {
                respond(reply, controller.clear());
                None
            }
            Request::NowPlaying { reply } => {
                respond(reply, controller.now_playing());
                None
            }
            Request::Queue { limit, reply } => {
                respond(reply, controller.queue_view(limit));
                None
            }
        };

        if let Some(advance) = advance {
            announce(&announcer, &mut last_channel, advance).await;
        }
    }

    tracing::debug!("Session closed.");
}

/// Tell users what an [Advance] did.
async fn announce<A: Announcer>(
    announcer: &A,
    last_channel: &mut Option<ChannelId>,
    advance: Advance,
) {
    for (track, error) in advance.failed {
        let channel = track.source_channel();
        *last_channel = Some(channel);
        announcer
            .announce(channel, Announcement::Failed { track, error })
            .await;
    }

    match advance.started {
        Some(track) => {
            let channel = track.source_channel();
            *last_channel = Some(channel);
            let remaining = advance.remaining;
            announcer
                .announce(channel, Announcement::NowPlaying { track, remaining })
                .await;
        }
        None => {
            if let Some(channel) = *last_channel {
                announcer.announce(channel, Announcement::QueueEmpty).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::UserError;
    use crate::player::controller::tests::track;
    use crate::player::controller::tests::FakeSink;
    use crate::player::controller::tests::SinkCall;

    #[derive(Debug, Clone, Default)]
    struct RecordingAnnouncer {
        said: Arc<Mutex<Vec<(ChannelId, Announcement)>>>,
    }

    impl RecordingAnnouncer {
        fn said(&self) -> Vec<Announcement> {
            let said = self.said.lock().unwrap();
            said.iter().map(|(_, a)| a.clone()).collect()
        }
    }

    #[async_trait]
    impl Announcer for RecordingAnnouncer {
        async fn announce(&self, channel: ChannelId, announcement: Announcement) {
            self.said.lock().unwrap().push((channel, announcement));
        }
    }

    fn session() -> (SessionHandle, FakeSink, RecordingAnnouncer) {
        let sink = FakeSink::default();
        let announcer = RecordingAnnouncer::default();
        let handle = spawn(|_| sink.clone(), announcer.clone());
        (handle, sink, announcer)
    }

    #[tokio::test]
    async fn plays_and_announces() {
        let (handle, _sink, announcer) = session();

        assert_eq!(handle.play(track("a")).await.unwrap(), 1);
        assert_eq!(handle.play(track("b")).await.unwrap(), 1);

        let now = handle.now_playing().await.unwrap();
        assert_eq!(now.track, track("a"));
        assert_eq!(now.remaining, 1);

        assert_eq!(
            announcer.said(),
            vec![Announcement::NowPlaying {
                track: track("a"),
                remaining: 0
            }]
        );
    }

    #[tokio::test]
    async fn failed_track_is_reported_and_skipped() {
        let (handle, _sink, announcer) = session();
        handle.play(track("a")).await.unwrap();
        handle.play(track("b")).await.unwrap();

        let error = SinkError::Playback {
            reason: "403 Forbidden".to_string(),
        };
        handle
            .requests
            .send(Request::TrackEnded {
                id: PlaybackId(1),
                error: Some(error.clone()),
            })
            .unwrap();

        assert_eq!(handle.now_playing().await.unwrap().track, track("b"));
        assert_eq!(
            announcer.said()[1..],
            [
                Announcement::Failed {
                    track: track("a"),
                    error
                },
                Announcement::NowPlaying {
                    track: track("b"),
                    remaining: 0
                },
            ]
        );
    }

    #[tokio::test]
    async fn end_of_queue_is_announced() {
        let (handle, _sink, announcer) = session();
        handle.play(track("a")).await.unwrap();
        handle
            .requests
            .send(Request::TrackEnded {
                id: PlaybackId(1),
                error: None,
            })
            .unwrap();

        assert!(handle.now_playing().await.is_err());
        assert_eq!(announcer.said().last(), Some(&Announcement::QueueEmpty));
    }

    #[tokio::test]
    async fn skip_waits_for_end_notification() {
        let (handle, sink, _announcer) = session();
        handle.play(track("a")).await.unwrap();
        handle.play(track("b")).await.unwrap();

        assert_eq!(handle.skip().await.unwrap(), track("a"));
        // Still "a" until the sink reports the end.
        assert_eq!(handle.now_playing().await.unwrap().track, track("a"));
        assert_eq!(sink.calls().last(), Some(&SinkCall::Stop));

        handle
            .requests
            .send(Request::TrackEnded {
                id: PlaybackId(1),
                error: None,
            })
            .unwrap();
        assert_eq!(handle.now_playing().await.unwrap().track, track("b"));
    }

    #[tokio::test]
    async fn stop_ignores_late_end() {
        let (handle, _sink, announcer) = session();
        handle.play(track("a")).await.unwrap();
        handle.stop().await.unwrap();
        handle.play(track("b")).await.unwrap();

        handle
            .requests
            .send(Request::TrackEnded {
                id: PlaybackId(1),
                error: None,
            })
            .unwrap();

        assert_eq!(handle.now_playing().await.unwrap().track, track("b"));
        assert!(!announcer.said().contains(&Announcement::QueueEmpty));
    }

    #[tokio::test]
    async fn queue_errors_reach_the_caller() {
        let (handle, _sink, _announcer) = session();
        let err = handle.skip().await.unwrap_err();
        assert!(matches!(
            err,
            PhonographError::UserError(UserError::Playback(PlaybackError::NothingPlaying))
        ));

        handle.play(track("a")).await.unwrap();
        handle.play(track("b")).await.unwrap();
        handle.play(track("c")).await.unwrap();

        let view = handle.queue(1).await.unwrap();
        assert_eq!(view.upcoming, vec![track("b")]);
        assert_eq!(view.total, 2);
        assert_eq!(handle.clear().await.unwrap(), 2);
    }
}
