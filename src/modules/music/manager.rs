use crate::error::CommandError;
use crate::modules::music::resolver::MediaResolver;
use crate::modules::music::session::{PlaybackState, SessionState, TrackInfo, TransitionError};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serenity::all::{ChannelId, Context, GuildId, Http, UserId};
use songbird::events::{EventContext, EventHandler as VoiceEventHandler};
use songbird::input::{HttpRequest, Input};
use songbird::tracks::TrackHandle;
use songbird::{Event, Songbird, TrackEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info};

struct Session {
    state: SessionState,
    track: Option<TrackHandle>,
}

/// Read-only snapshot for the `status` command.
pub struct SessionView {
    pub channel_id: ChannelId,
    pub playback: PlaybackState,
    pub volume: u8,
    pub now_playing: Option<TrackInfo>,
}

enum PlaybackOutcome {
    Finished,
    Failed(String),
}

/// Marshaled from the driver's execution context back onto the worker that
/// owns the session map.
struct PlaybackNotice {
    guild_id: GuildId,
    channel_id: ChannelId,
    http: Arc<Http>,
    /// Stream generation this notice belongs to; stale ones are dropped.
    generation: u64,
    outcome: PlaybackOutcome,
}

/// Owns the guild→session map: at most one session per guild, created on
/// join, destroyed on leave or idle timeout. All session mutation happens
/// through this type.
pub struct VoiceSessionManager {
    songbird: Arc<Songbird>,
    resolver: Arc<dyn MediaResolver>,
    http: reqwest::Client,
    sessions: DashMap<GuildId, Session>,
    notices: mpsc::Sender<PlaybackNotice>,
    grace: Duration,
}

impl VoiceSessionManager {
    pub fn new(
        songbird: Arc<Songbird>,
        resolver: Arc<dyn MediaResolver>,
        http: reqwest::Client,
        grace: Duration,
    ) -> Arc<Self> {
        let (notices, rx) = mpsc::channel(16);
        let manager = Arc::new(Self {
            songbird,
            resolver,
            http,
            sessions: DashMap::new(),
            notices,
            grace,
        });
        manager.clone().spawn_notice_worker(rx);
        manager
    }

    /// Track-end callbacks fire on the driver's context; every session-map
    /// mutation they cause happens here instead.
    fn spawn_notice_worker(self: Arc<Self>, mut rx: mpsc::Receiver<PlaybackNotice>) {
        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                self.handle_notice(notice).await;
            }
        });
    }

    async fn handle_notice(&self, notice: PlaybackNotice) {
        // A notice from a stream that was since replaced says nothing about
        // the session's current state.
        if let Some(mut session) = self.sessions.get_mut(&notice.guild_id) {
            if !session.state.play_is_current(notice.generation) {
                return;
            }
            session.state.finish();
            session.track = None;
        }

        let text = match notice.outcome {
            PlaybackOutcome::Finished => "✅ Playback finished".to_string(),
            PlaybackOutcome::Failed(detail) => {
                error!("Playback error in guild {}: {}", notice.guild_id, detail);
                "❌ Playback error".to_string()
            }
        };
        if let Err(e) = notice.channel_id.say(&notice.http, text).await {
            error!("Failed to report playback outcome: {}", e);
        }
    }

    /// Connects to the invoker's voice channel, moving the existing session
    /// there if one is already open. Returns the channel and whether this
    /// was a move rather than a fresh join.
    pub async fn join(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<(ChannelId, bool), CommandError> {
        let target = user_voice_channel(ctx, guild_id, user_id).ok_or_else(|| {
            CommandError::ResourceNotFound("You are not in a voice channel.".to_string())
        })?;
        let existed = self.sessions.contains_key(&guild_id);

        self.songbird
            .join(guild_id, target)
            .await
            .map_err(|e| CommandError::Unexpected(format!("joining voice channel: {e}")))?;

        match self.sessions.entry(guild_id) {
            Entry::Occupied(mut entry) => entry.get_mut().state.channel_id = target,
            Entry::Vacant(entry) => {
                entry.insert(Session {
                    state: SessionState::new(target),
                    track: None,
                });
            }
        }
        Ok((target, existed))
    }

    pub async fn leave(&self, guild_id: GuildId) -> Result<(), CommandError> {
        let Some((_, session)) = self.sessions.remove(&guild_id) else {
            return Err(CommandError::ResourceNotFound(
                "I'm not in a voice channel.".to_string(),
            ));
        };
        if let Some(track) = session.track {
            let _ = track.stop();
        }
        self.songbird
            .remove(guild_id)
            .await
            .map_err(|e| CommandError::Unexpected(format!("leaving voice channel: {e}")))?;
        Ok(())
    }

    /// Joins the invoker's channel if no session is open yet. Returns the
    /// channel when a fresh connection was made.
    pub async fn ensure_session(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<Option<ChannelId>, CommandError> {
        // Playing always requires the invoker to be in voice, session or not.
        let channel = user_voice_channel(ctx, guild_id, user_id).ok_or_else(|| {
            CommandError::ResourceNotFound("You are not in a voice channel.".to_string())
        })?;
        if self.sessions.contains_key(&guild_id) {
            return Ok(None);
        }
        self.join(ctx, guild_id, user_id).await?;
        Ok(Some(channel))
    }

    /// Resolves the query and starts it on the session's call, stopping any
    /// stream that is already up first; a session never has two streams.
    pub async fn start_playback(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        text_channel: ChannelId,
        query: &str,
    ) -> Result<TrackInfo, CommandError> {
        let source = self.resolver.resolve(query).await?;

        let call = self.songbird.get(guild_id).ok_or_else(|| {
            CommandError::Playback("no active voice connection".to_string())
        })?;

        let info = TrackInfo {
            title: source.title.clone(),
            duration: source.duration,
            uploader: source.uploader.clone(),
        };
        let (volume, generation) = {
            let Some(mut session) = self.sessions.get_mut(&guild_id) else {
                return Err(CommandError::Playback("voice session is gone".to_string()));
            };
            if let Some(track) = session.track.take() {
                let _ = track.stop();
            }
            let generation = session.state.begin(info.clone());
            (session.state.volume, generation)
        };

        let input: Input = HttpRequest::new(self.http.clone(), source.url.clone()).into();
        let handle = {
            let mut call = call.lock().await;
            call.play_only_input(input)
        };

        if let Err(e) = self.wire_track(ctx, &handle, guild_id, text_channel, generation, volume) {
            let _ = handle.stop();
            if let Some(mut session) = self.sessions.get_mut(&guild_id) {
                session.state.finish();
            }
            return Err(e);
        }

        if let Some(mut session) = self.sessions.get_mut(&guild_id) {
            session.track = Some(handle);
        }
        Ok(info)
    }

    fn wire_track(
        &self,
        ctx: &Context,
        handle: &TrackHandle,
        guild_id: GuildId,
        text_channel: ChannelId,
        generation: u64,
        volume: u8,
    ) -> Result<(), CommandError> {
        handle
            .set_volume(volume as f32 / 100.0)
            .map_err(|e| CommandError::Playback(e.to_string()))?;

        for (event, failed) in [
            (Event::Track(TrackEvent::End), false),
            (Event::Track(TrackEvent::Error), true),
        ] {
            handle
                .add_event(
                    event,
                    PlaybackNotifier {
                        guild_id,
                        channel_id: text_channel,
                        http: ctx.http.clone(),
                        notices: self.notices.clone(),
                        generation,
                        failed,
                    },
                )
                .map_err(|e| CommandError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    pub fn stop(&self, guild_id: GuildId) -> Result<(), CommandError> {
        let Some(mut session) = self.sessions.get_mut(&guild_id) else {
            return Err(TransitionError::NotPlaying.into());
        };
        session.state.stop()?;
        if let Some(track) = session.track.take() {
            let _ = track.stop();
        }
        Ok(())
    }

    pub fn pause(&self, guild_id: GuildId) -> Result<(), CommandError> {
        let Some(mut session) = self.sessions.get_mut(&guild_id) else {
            return Err(TransitionError::NotPlaying.into());
        };
        session.state.pause()?;
        if let Some(track) = &session.track {
            track
                .pause()
                .map_err(|e| CommandError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    pub fn resume(&self, guild_id: GuildId) -> Result<(), CommandError> {
        let Some(mut session) = self.sessions.get_mut(&guild_id) else {
            return Err(TransitionError::NotPaused.into());
        };
        session.state.resume()?;
        if let Some(track) = &session.track {
            track
                .play()
                .map_err(|e| CommandError::Playback(e.to_string()))?;
        }
        Ok(())
    }

    pub fn set_volume(&self, guild_id: GuildId, volume: i64) -> Result<u8, CommandError> {
        if !(0..=100).contains(&volume) {
            return Err(TransitionError::VolumeOutOfRange(volume).into());
        }
        let Some(mut session) = self.sessions.get_mut(&guild_id) else {
            return Err(TransitionError::NoSource.into());
        };
        let applied = session.state.set_volume(volume)?;
        if let Some(track) = &session.track {
            track
                .set_volume(applied as f32 / 100.0)
                .map_err(|e| CommandError::Playback(e.to_string()))?;
        }
        Ok(applied)
    }

    pub fn status(&self, guild_id: GuildId) -> Option<SessionView> {
        self.sessions.get(&guild_id).map(|session| SessionView {
            channel_id: session.state.channel_id,
            playback: session.state.playback,
            volume: session.state.volume,
            now_playing: session.state.now_playing.clone(),
        })
    }

    /// Idle-watch entry point, called on every voice-state change. Arms a
    /// grace timer when the session's channel has no human occupants left;
    /// any newer observation invalidates timers armed before it.
    pub fn occupancy_changed(self: &Arc<Self>, ctx: &Context, guild_id: GuildId) {
        let armed = {
            let Some(mut session) = self.sessions.get_mut(&guild_id) else {
                return;
            };
            let channel_id = session.state.channel_id;
            let humans = human_occupants(ctx, guild_id, channel_id);
            session
                .state
                .observe_occupancy(humans)
                .map(|generation| (channel_id, generation))
        };
        let Some((channel_id, generation)) = armed else {
            return;
        };

        let manager = self.clone();
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(manager.grace).await;
            manager.idle_fire(&ctx, guild_id, channel_id, generation).await;
        });
    }

    async fn idle_fire(
        &self,
        ctx: &Context,
        guild_id: GuildId,
        channel_id: ChannelId,
        generation: u64,
    ) {
        {
            let Some(session) = self.sessions.get(&guild_id) else {
                return;
            };
            if !session.state.watch_is_current(generation)
                || session.state.channel_id != channel_id
            {
                return;
            }
        }
        if human_occupants(ctx, guild_id, channel_id) > 0 {
            return;
        }

        info!(
            "Voice channel {} in guild {} stayed empty, disconnecting",
            channel_id, guild_id
        );
        if let Err(e) = self.leave(guild_id).await {
            error!("Failed to tear down idle voice session: {}", e);
        }
    }
}

/// One-shot bridge out of the driver context: posts the outcome onto the
/// bounded notice channel and unregisters itself.
struct PlaybackNotifier {
    guild_id: GuildId,
    channel_id: ChannelId,
    http: Arc<Http>,
    notices: mpsc::Sender<PlaybackNotice>,
    generation: u64,
    failed: bool,
}

#[async_trait]
impl VoiceEventHandler for PlaybackNotifier {
    async fn act(&self, ctx: &EventContext<'_>) -> Option<Event> {
        let outcome = if self.failed {
            let detail = match ctx {
                EventContext::Track(tracks) => tracks
                    .iter()
                    .map(|(state, _)| format!("{:?}", state.playing))
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => "unknown".to_string(),
            };
            PlaybackOutcome::Failed(detail)
        } else {
            PlaybackOutcome::Finished
        };

        let notice = PlaybackNotice {
            guild_id: self.guild_id,
            channel_id: self.channel_id,
            http: self.http.clone(),
            generation: self.generation,
            outcome,
        };
        if self.notices.try_send(notice).is_err() {
            error!("Playback notice channel full, dropping notice");
        }
        Some(Event::Cancel)
    }
}

fn user_voice_channel(ctx: &Context, guild_id: GuildId, user_id: UserId) -> Option<ChannelId> {
    ctx.cache.guild(guild_id).and_then(|guild| {
        guild
            .voice_states
            .get(&user_id)
            .and_then(|state| state.channel_id)
    })
}

/// Non-bot occupants of a voice channel; members missing from the cache
/// count as human so an unknown never triggers a premature disconnect.
fn human_occupants(ctx: &Context, guild_id: GuildId, channel_id: ChannelId) -> usize {
    let Some(guild) = ctx.cache.guild(guild_id) else {
        return 0;
    };
    guild
        .voice_states
        .values()
        .filter(|state| state.channel_id == Some(channel_id))
        .filter(|state| {
            !guild
                .members
                .get(&state.user_id)
                .map(|member| member.user.bot)
                .unwrap_or(false)
        })
        .count()
}
