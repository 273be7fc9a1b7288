use crate::error::{http_status, CommandError};
use crate::modules::commands::router::Invocation;
use crate::utils::send_temporary;
use chrono::Utc;
use serenity::all::{ChannelType, EditMessage, Mentionable, RoleId};
use std::time::{Duration, Instant};

async fn latency_text(inv: &Invocation) -> String {
    match inv.data.gateway_latency(&inv.ctx).await {
        Some(latency) => format!("{}ms", latency.as_millis()),
        None => "n/a".to_string(),
    }
}

/// Round-trip check: the edit carries both the gateway heartbeat latency and
/// the measured REST latency.
pub async fn ping(inv: Invocation) -> Result<(), CommandError> {
    let start = Instant::now();
    let mut message = inv
        .msg
        .channel_id
        .say(&inv.ctx.http, "🏓 Calculating ping...")
        .await?;
    let api_ms = start.elapsed().as_millis();
    let ws_text = latency_text(&inv).await;

    message
        .edit(
            &inv.ctx,
            EditMessage::new().content(format!(
                "🏓 Pong! WebSocket: {ws_text} | API: {api_ms}ms"
            )),
        )
        .await?;
    Ok(())
}

pub async fn assign(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    let role_name = inv.data.config.assign_role.clone();

    let role_id: Option<RoleId> = {
        let guild = inv.ctx.cache.guild(guild_id);
        guild.and_then(|g| g.role_by_name(&role_name).map(|role| role.id))
    };
    let Some(role_id) = role_id else {
        return Err(CommandError::ResourceNotFound(format!(
            "Role {role_name} not found in this server."
        )));
    };

    let member = guild_id.member(&inv.ctx, inv.msg.author.id).await?;
    if let Err(e) = member.add_role(&inv.ctx.http, role_id).await {
        return Err(match http_status(&e) {
            Some(403) => CommandError::PermissionDenied("assign roles".to_string()),
            _ => e.into(),
        });
    }

    send_temporary(
        &inv.ctx,
        inv.msg.channel_id,
        format!(
            "{} has been assigned the role {role_name}.",
            inv.msg.author.mention()
        ),
        Duration::from_secs(10),
    )
    .await;
    Ok(())
}

pub async fn myroles(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;
    let Some(member) = &inv.msg.member else {
        return Err(CommandError::ResourceNotFound(
            "Could not resolve your member entry.".to_string(),
        ));
    };

    let names: Vec<String> = {
        let guild = inv.ctx.cache.guild(guild_id);
        match guild {
            Some(g) => member
                .roles
                .iter()
                .filter_map(|role_id| g.roles.get(role_id).map(|role| role.name.clone()))
                .collect(),
            None => Vec::new(),
        }
    };

    let (text, ttl) = if names.is_empty() {
        (
            format!("{}, you have no roles.", inv.msg.author.mention()),
            Duration::from_secs(10),
        )
    } else {
        (
            format!(
                "{}, your roles: {}",
                inv.msg.author.mention(),
                names.join(", ")
            ),
            Duration::from_secs(15),
        )
    };
    send_temporary(&inv.ctx, inv.msg.channel_id, text, ttl).await;
    Ok(())
}

pub async fn serverstatus(inv: Invocation) -> Result<(), CommandError> {
    let guilds = inv.ctx.cache.guild_count();
    let users = inv.ctx.cache.user_count();
    let channels: usize = inv
        .ctx
        .cache
        .guilds()
        .iter()
        .filter_map(|guild_id| inv.ctx.cache.guild(*guild_id).map(|g| g.channels.len()))
        .sum();

    let latency = latency_text(&inv).await;
    let uptime = Utc::now().signed_duration_since(inv.data.started_at);
    let uptime_text = format!("{}h {}m", uptime.num_hours(), uptime.num_minutes() % 60);

    let mut response = String::from("🌐 **Server Status**\n");
    response.push_str(&format!(
        "**Servers:** {guilds}\n**Users:** {users}\n**Channels:** {channels}\n"
    ));
    response.push_str(&format!("**Latency:** {latency}\n**Uptime:** {uptime_text}"));

    inv.msg.channel_id.say(&inv.ctx.http, response).await?;
    Ok(())
}

pub async fn help(inv: Invocation) -> Result<(), CommandError> {
    let allowed = inv
        .data
        .config
        .allowed_channels
        .iter()
        .map(|name| format!("#{name}"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut response = String::from("🤖 **Bot Commands**\n");
    response.push_str(&format!("Commands work only in: {allowed}\n\n"));
    response.push_str(
        "**General**\n\
         **!ping** — check latency\n\
         **!assign** — get the 'test bot' role\n\
         **!myroles** — list your roles\n\
         **!serverstatus** — bot and server status\n\
         **!channels** — list allowed channels\n\
         **!help** — this list\n\n",
    );
    response.push_str(
        "**Network**\n\
         **!nettest** — network diagnostic\n\
         **!speedtest** — response speed test\n\n",
    );
    response.push_str(
        "**Music**\n\
         **!join** / **!leave** — enter or leave your voice channel\n\
         **!play <url or search>** — play audio\n\
         **!stop** / **!pause** / **!resume** — playback control\n\
         **!volume <0-100>** — adjust volume\n\
         **!status** — voice session status\n\n",
    );
    response.push_str("**AI**\n**!chat <prompt>** — talk to the AI (works in any channel)\n");

    inv.msg.channel_id.say(&inv.ctx.http, response).await?;
    Ok(())
}

/// Shows the allow-list, marking which of its channels actually exist here.
pub async fn channels(inv: Invocation) -> Result<(), CommandError> {
    let guild_id = inv.guild_id()?;

    let existing: Vec<String> = {
        let guild = inv.ctx.cache.guild(guild_id);
        match guild {
            Some(g) => g
                .channels
                .values()
                .filter(|channel| channel.kind == ChannelType::Text)
                .map(|channel| channel.name.to_lowercase())
                .collect(),
            None => Vec::new(),
        }
    };

    let mut response = String::from("📍 **Allowed Channels**\n");
    for name in &inv.data.config.allowed_channels {
        if existing.contains(&name.to_lowercase()) {
            response.push_str(&format!("✅ #{name}\n"));
        } else {
            response.push_str(&format!("❌ #{name} (not found)\n"));
        }
    }
    response.push_str("Commands only work in the channels listed above.");

    inv.msg.channel_id.say(&inv.ctx.http, response).await?;
    Ok(())
}
