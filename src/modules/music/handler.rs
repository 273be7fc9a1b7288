use crate::events::{EventHandler, GatewayEvent};
use crate::Data;
use async_trait::async_trait;
use serenity::all::Context;
use std::sync::Arc;

/// Feeds voice-membership changes into the session manager's idle watch.
pub struct VoiceActivityHandler {
    data: Arc<Data>,
}

impl VoiceActivityHandler {
    pub fn new(data: Arc<Data>) -> Self {
        Self { data }
    }
}

#[async_trait]
impl EventHandler for VoiceActivityHandler {
    fn name(&self) -> &'static str {
        "VoiceActivity"
    }

    async fn handle(&self, ctx: &Context, event: &GatewayEvent) -> Result<(), crate::Error> {
        let GatewayEvent::VoiceStateChanged { new, .. } = event else {
            return Ok(());
        };
        let Some(guild_id) = new.guild_id else {
            return Ok(());
        };
        // The bot's own join/leave transitions are not occupancy changes.
        if new.user_id == ctx.cache.current_user().id {
            return Ok(());
        }

        self.data.voice.occupancy_changed(ctx, guild_id);
        Ok(())
    }
}
