//! Event handling

use std::time::Duration;

use async_trait::async_trait;
use songbird::tracks::PlayMode;
use songbird::CoreEvent;
use songbird::Event;
use songbird::EventContext;
use songbird::EventHandler;
use tokio::sync::mpsc::WeakUnboundedSender;

use super::call::CallRef;
use crate::data::GetData;
use crate::player::announce::ChannelAnnouncer;
use crate::player::session;
use crate::player::session::Request;
use crate::player::sink::CallSink;
use crate::player::PlaybackId;
use crate::player::SessionHandle;
use crate::player::SinkError;
use crate::serenity;
use crate::Context;
use crate::PhonographError;

/// Get the guild's playback session, starting it if needed.
/// Global events are registered on the call along with a new session.
pub async fn init_session(
    ctx: &Context<'_>,
    call: &CallRef,
) -> Result<SessionHandle, PhonographError> {
    let guild_data = ctx.guild_data().await?;
    let mut guild_data = guild_data.lock().await;

    if let Some(session) = &guild_data.session {
        return Ok(session.clone());
    }

    tracing::info!("Starting playback session.");

    let http = ctx.http_client().await;
    let volume = ctx.data().player.volume;
    let sink_call = call.clone();
    let announcer = ChannelAnnouncer::new(ctx.serenity_context().http.clone());
    let session = session::spawn(
        move |notify| CallSink::new(sink_call, http, volume, notify),
        announcer,
    );

    // Create the events.
    let idle_timeout = Duration::from_secs(ctx.data().player.idle_timeout_secs);
    let idle_event = CheckIdle::new(call, ctx, &session);
    let dc_event = DisconnectStop::new(call, &session);

    // Register them as global events.
    idle_event.register(idle_timeout).await;
    dc_event.register().await;

    guild_data.session = Some(session.clone());
    Ok(session)
}

/// Check if there are non-bot users in the call, if not then stop and disconnect.
struct CheckIdle {
    /// The call to check.
    call: CallRef,
    /// Needed to find channels and guilds.
    ctx: serenity::Context,
    /// Stopped when idle.
    session: SessionHandle,
}

impl CheckIdle {
    /// Constructor for [CheckIdle]
    fn new(call: &CallRef, ctx: &Context<'_>, session: &SessionHandle) -> Self {
        // Should be cheap to clone
        let ctx = ctx.serenity_context().clone();
        let call = call.clone();
        let session = session.clone();
        Self { call, ctx, session }
    }

    /// Register this as a global event
    async fn register(self, duration: Duration) {
        tracing::debug!("Registering check idle global event.");
        let call = self.call.clone();
        let mut call = call.lock().await;
        call.add_global_event(Event::Periodic(duration, None), self);
    }
}

#[async_trait]
impl EventHandler for CheckIdle {
    async fn act(&self, _ctx: &EventContext<'_>) -> Option<Event> {
        // Convert songbird::ChannelId -> NonZeroU64 -> serenity::ChannelId
        // The call lock must be released before stopping, which locks it again.
        let channel_id = {
            let call = self.call.lock().await;
            call.current_channel().map(|c| serenity::ChannelId::from(c.0))
        };

        // Not connected, nothing to check.
        let channel_id = channel_id?;

        // A series of conversions, each try operator (?) causes this handler
        // to retry on it's next trigger if the operator fails.
        let channel = channel_id.to_channel(&self.ctx).await.ok()?;
        let guild = channel.guild()?;
        let members = guild.members(&self.ctx).ok()?;

        // Check if there are any non-bot members.
        let has_members = members.iter().any(|m| !m.user.bot);

        if !has_members {
            tracing::info!("Idle! Disconnecting from voice channel.");
            if let Err(e) = self.session.stop().await {
                tracing::error!("Failed to stop idle session: {e}");
            }
        }
        None
    }
}

/// Reset the session when the bot disconnects.
/// 'Resetting' means:
/// - End anything currently playing.
/// - Clear the queue.
struct DisconnectStop {
    /// Reference to the call.
    call: CallRef,
    /// Session to reset.
    session: SessionHandle,
}

impl DisconnectStop {
    /// Constructor for [DisconnectStop]
    fn new(call: &CallRef, session: &SessionHandle) -> Self {
        let call = call.clone();
        let session = session.clone();
        Self { call, session }
    }

    /// Register this as a global event.
    async fn register(self) {
        tracing::debug!("Registering disconnect on stop global event.");
        let call = self.call.clone();
        let mut call = call.lock().await;
        call.add_global_event(Event::Core(CoreEvent::DriverDisconnect), self);
    }
}

#[async_trait]
impl EventHandler for DisconnectStop {
    async fn act(&self, _ectx: &EventContext<'_>) -> Option<Event> {
        tracing::info!("Stopping on disconnect!");
        if let Err(e) = self.session.disconnected() {
            tracing::error!("Failed to reset session: {e}");
        }
        None
    }
}

/// Report the end of a track to its session.
/// Registered on every started track for both end and error events.
#[derive(Clone)]
pub struct NotifyEnd {
    /// The playback the track was started as.
    id: PlaybackId,
    /// The session, gone if it already shut down.
    session: WeakUnboundedSender<Request>,
}

impl NotifyEnd {
    /// Constructor for [NotifyEnd]
    pub fn new(id: PlaybackId, session: WeakUnboundedSender<Request>) -> Self {
        Self { id, session }
    }
}

#[async_trait]
impl EventHandler for NotifyEnd {
    async fn act(&self, ectx: &EventContext<'_>) -> Option<Event> {
        let error = match ectx {
            EventContext::Track(tracks) => tracks.iter().find_map(|(state, _)| match &state.playing {
                PlayMode::Errored(e) => Some(SinkError::Playback {
                    reason: e.to_string(),
                }),
                _ => None,
            }),
            _ => None,
        };

        let id = self.id;
        match self.session.upgrade() {
            Some(session) => {
                if session.send(Request::TrackEnded { id, error }).is_err() {
                    tracing::debug!("Session closed before track end.");
                }
            }
            None => tracing::debug!("Track ended after its session closed."),
        }

        // The track is over, no need to listen anymore.
        Some(Event::Cancel)
    }
}
