use crate::events::{EventHandler, GatewayEvent};
use crate::Data;
use async_trait::async_trait;
use serenity::all::{ChannelType, Context, CreateMessage, GuildId, Mentionable};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Logs the connected identity and posts the one-time online broadcast to
/// the first allowed channel of each guild.
pub struct ReadyHandler {
    data: Arc<Data>,
    announced: AtomicBool,
}

impl ReadyHandler {
    pub fn new(data: Arc<Data>) -> Self {
        Self {
            data,
            announced: AtomicBool::new(false),
        }
    }

    async fn announce_online(&self, ctx: &Context, guild_id: GuildId) {
        let channels = match guild_id.channels(&ctx.http).await {
            Ok(channels) => channels,
            Err(e) => {
                error!("Failed to list channels for guild {}: {}", guild_id, e);
                return;
            }
        };

        // First match in allow-list order, like the broadcast always worked.
        let target = self.data.config.allowed_channels.iter().find_map(|name| {
            channels
                .values()
                .find(|channel| {
                    channel.kind == ChannelType::Text && channel.name.eq_ignore_ascii_case(name)
                })
                .map(|channel| channel.id)
        });

        if let Some(channel_id) = target {
            if let Err(e) = channel_id.say(&ctx.http, "✅ Bot is now online!").await {
                error!("Failed to announce in guild {}: {}", guild_id, e);
            }
        }
    }
}

#[async_trait]
impl EventHandler for ReadyHandler {
    fn name(&self) -> &'static str {
        "Ready"
    }

    async fn handle(&self, ctx: &Context, event: &GatewayEvent) -> Result<(), crate::Error> {
        let GatewayEvent::Ready(ready) = event else {
            return Ok(());
        };
        info!("Logged in as {} ({})", ready.user.name, ready.user.id);

        // Gateway reconnects replay Ready; the broadcast happens once.
        if self.announced.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        for guild in &ready.guilds {
            self.announce_online(ctx, guild.id).await;
        }
        Ok(())
    }
}

/// Greets new members: a best-effort DM plus a message in the welcome
/// channel when the guild has one.
pub struct WelcomeHandler {
    data: Arc<Data>,
}

impl WelcomeHandler {
    pub fn new(data: Arc<Data>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl EventHandler for WelcomeHandler {
    fn name(&self) -> &'static str {
        "Welcome"
    }

    async fn handle(&self, ctx: &Context, event: &GatewayEvent) -> Result<(), crate::Error> {
        let GatewayEvent::MemberJoined(member) = event else {
            return Ok(());
        };
        if member.user.bot {
            return Ok(());
        }

        let guild_name = ctx
            .cache
            .guild(member.guild_id)
            .map(|guild| guild.name.clone())
            .unwrap_or_else(|| "the server".to_string());

        // Many users have DMs closed; that is not an error.
        let dm = CreateMessage::new().content(format!("Welcome to the server {guild_name}!"));
        let _ = member.user.direct_message(ctx, dm).await;

        let channels = member.guild_id.channels(&ctx.http).await?;
        let welcome = channels.values().find(|channel| {
            channel.kind == ChannelType::Text
                && channel
                    .name
                    .eq_ignore_ascii_case(&self.data.config.welcome_channel)
        });
        if let Some(channel) = welcome {
            channel
                .id
                .say(
                    &ctx.http,
                    format!("👋 Welcome {} to the server!", member.mention()),
                )
                .await?;
        }
        Ok(())
    }
}
