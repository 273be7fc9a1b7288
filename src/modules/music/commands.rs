use crate::error::CommandError;
use crate::modules::commands::router::Invocation;
use crate::modules::music::session::PlaybackState;
use crate::utils::format_duration;
use serenity::all::{ChannelId, Context, EditMessage};

async fn channel_name(ctx: &Context, channel_id: ChannelId) -> String {
    channel_id
        .name(ctx)
        .await
        .unwrap_or_else(|_| "voice".to_string())
}

pub async fn join(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    let (channel, moved) = inv
        .data
        .voice
        .join(&inv.ctx, guild_id, inv.msg.author.id)
        .await?;

    let name = channel_name(&inv.ctx, channel).await;
    let text = if moved {
        format!("Moved to: {name}")
    } else {
        format!("Joined in: {name}")
    };
    inv.msg.channel_id.say(&inv.ctx.http, text).await?;
    Ok(())
}

pub async fn leave(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    inv.data.voice.leave(guild_id).await?;
    inv.msg.channel_id.say(&inv.ctx.http, "Disconnected.").await?;
    Ok(())
}

/// Resolve-and-play. The search placeholder is edited in place with the
/// outcome; a failed resolution aborts this attempt only, never the session.
pub async fn play(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    let query = inv.args.join(" ");

    if let Some(channel) = inv
        .data
        .voice
        .ensure_session(&inv.ctx, guild_id, inv.msg.author.id)
        .await?
    {
        let name = channel_name(&inv.ctx, channel).await;
        inv.msg
            .channel_id
            .say(&inv.ctx.http, format!("Connected to: {name}"))
            .await?;
    }

    let mut search = inv
        .msg
        .channel_id
        .say(&inv.ctx.http, "🔍 Searching...")
        .await?;

    match inv
        .data
        .voice
        .start_playback(&inv.ctx, guild_id, inv.msg.channel_id, &query)
        .await
    {
        Ok(track) => {
            let duration = track
                .duration
                .map(format_duration)
                .unwrap_or_else(|| "Unknown".to_string());
            let mut text = format!("🎵 Now Playing: **{}** ({duration})", track.title);
            if let Some(uploader) = track.uploader {
                text.push_str(&format!(" — {uploader}"));
            }
            search
                .edit(&inv.ctx, EditMessage::new().content(text))
                .await?;
        }
        Err(err @ (CommandError::MediaResolution(_) | CommandError::Playback(_))) => {
            search
                .edit(&inv.ctx, EditMessage::new().content(err.user_message()))
                .await?;
        }
        Err(other) => return Err(other),
    }
    Ok(())
}

pub async fn stop(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    inv.data.voice.stop(guild_id)?;
    inv.msg
        .channel_id
        .say(&inv.ctx.http, "⏹️ Stopped playing.")
        .await?;
    Ok(())
}

pub async fn pause(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    inv.data.voice.pause(guild_id)?;
    inv.msg.channel_id.say(&inv.ctx.http, "⏸️ Paused.").await?;
    Ok(())
}

pub async fn resume(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    inv.data.voice.resume(guild_id)?;
    inv.msg.channel_id.say(&inv.ctx.http, "▶️ Resumed.").await?;
    Ok(())
}

pub async fn volume(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    let requested: i64 = inv.args[0]
        .parse()
        .map_err(|_| CommandError::BadArguments("Invalid argument.".to_string()))?;
    let applied = inv.data.voice.set_volume(guild_id, requested)?;
    inv.msg
        .channel_id
        .say(&inv.ctx.http, format!("🔊 Volume set to {applied}%"))
        .await?;
    Ok(())
}

pub async fn status(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    let Some(view) = inv.data.voice.status(guild_id) else {
        return Err(CommandError::ResourceNotFound(
            "Not connected to any voice channel.".to_string(),
        ));
    };

    let name = channel_name(&inv.ctx, view.channel_id).await;
    let playback = match view.playback {
        PlaybackState::Playing => "🟢 Playing",
        PlaybackState::Paused => "🟡 Paused",
        PlaybackState::Idle => "🔴 Nothing",
    };
    let latency = match inv.data.gateway_latency(&inv.ctx).await {
        Some(latency) => format!("{}ms", latency.as_millis()),
        None => "n/a".to_string(),
    };

    let mut response = String::from("🤖 **Bot Status**\n");
    response.push_str(&format!("Voice Channel: {name}\n"));
    response.push_str(&format!("Status: {playback}\n"));
    if let Some(track) = &view.now_playing {
        response.push_str(&format!("Track: {}\n", track.title));
    }
    response.push_str(&format!("Volume: {}%\n", view.volume));
    response.push_str(&format!("Latency: {latency}"));

    inv.msg.channel_id.say(&inv.ctx.http, response).await?;
    Ok(())
}
