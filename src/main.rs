use chrono::{DateTime, Utc};
use config::Config;
use events::{EventDispatcher, GatewayBridge};
use modules::commands::router::CommandRouter;
use modules::moderation::filter::ModerationFilter;
use modules::moderation::handler::MessageHandler;
use modules::music::handler::VoiceActivityHandler;
use modules::music::manager::VoiceSessionManager;
use modules::music::resolver::YtDlp;
use modules::system::events::{ReadyHandler, WelcomeHandler};
use serenity::all::GatewayIntents;
use serenity::gateway::ShardManager;
use serenity::Client;
use songbird::{SerenityInit, Songbird};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{error, info};

mod config;
mod error;
mod events;
mod modules;
mod utils;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

pub struct Data {
    pub config: Config,
    pub http: reqwest::Client,
    pub voice: Arc<VoiceSessionManager>,
    pub shards: OnceLock<Arc<ShardManager>>,
    pub started_at: DateTime<Utc>,
}

impl Data {
    /// Heartbeat latency of the shard that delivered the current event.
    pub async fn gateway_latency(&self, ctx: &serenity::all::Context) -> Option<Duration> {
        let shards = self.shards.get()?;
        let runners = shards.runners.lock().await;
        runners.get(&ctx.shard_id).and_then(|runner| runner.latency)
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    info!("starting oyabot");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    info!(
        "Commands restricted to channels: {}",
        config.allowed_channels.join(", ")
    );

    let http = reqwest::Client::new();
    let songbird = Songbird::serenity();
    let resolver = Arc::new(YtDlp::new(config.resolve_timeout));
    let voice = VoiceSessionManager::new(
        songbird.clone(),
        resolver,
        http.clone(),
        config.idle_grace,
    );

    let token = config.token.clone();
    let data = Arc::new(Data {
        config,
        http,
        voice,
        shards: OnceLock::new(),
        started_at: Utc::now(),
    });

    let router = CommandRouter::new(&data.config, modules::commands::registry());
    let filter = ModerationFilter::new(&data.config.banned_words);

    let dispatcher = Arc::new(
        EventDispatcher::new()
            .register(MessageHandler::new(router, filter, data.clone()))
            .register(VoiceActivityHandler::new(data.clone()))
            .register(WelcomeHandler::new(data.clone()))
            .register(ReadyHandler::new(data.clone())),
    );

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_VOICE_STATES;

    let mut client = match Client::builder(&token, intents)
        .event_handler(GatewayBridge::new(dispatcher))
        .register_songbird_with(songbird)
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("Error creating client: {}", e);
            std::process::exit(1);
        }
    };

    let _ = data.shards.set(client.shard_manager.clone());

    if let Err(e) = client.start().await {
        error!("Client error: {}", e);
        std::process::exit(1);
    }
}
