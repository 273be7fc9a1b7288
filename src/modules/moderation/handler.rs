use crate::error::http_status;
use crate::events::{EventHandler, GatewayEvent};
use crate::modules::commands::router::CommandRouter;
use crate::modules::moderation::filter::{Action, ModerationFilter};
use crate::utils::send_temporary;
use crate::Data;
use async_trait::async_trait;
use serenity::all::{Context, Mentionable, Message};
use std::sync::Arc;
use tracing::error;

/// Message pipeline: moderation first, then command dispatch. A message the
/// filter acts on never reaches the router.
pub struct MessageHandler {
    router: CommandRouter,
    filter: ModerationFilter,
    data: Arc<Data>,
}

impl MessageHandler {
    pub fn new(router: CommandRouter, filter: ModerationFilter, data: Arc<Data>) -> Self {
        Self {
            router,
            filter,
            data,
        }
    }

    async fn delete_and_warn(&self, ctx: &Context, msg: &Message) {
        let warning = format!("{} - don't say harsh words.", msg.author.mention());
        let ttl = self.data.config.feedback_ttl;

        match msg.delete(&ctx.http).await {
            Ok(()) => send_temporary(ctx, msg.channel_id, warning, ttl).await,
            Err(e) => match http_status(&e) {
                // Someone else beat us to the deletion.
                Some(404) => {}
                // Can't delete, but the warning can still land.
                Some(403) => send_temporary(ctx, msg.channel_id, warning, ttl).await,
                _ => error!("Failed to delete flagged message: {}", e),
            },
        }
    }
}

#[async_trait]
impl EventHandler for MessageHandler {
    fn name(&self) -> &'static str {
        "Messages"
    }

    async fn handle(&self, ctx: &Context, event: &GatewayEvent) -> Result<(), crate::Error> {
        let GatewayEvent::Message(msg) = event else {
            return Ok(());
        };
        if msg.author.id == ctx.cache.current_user().id {
            return Ok(());
        }

        match self.filter.inspect(&msg.content) {
            Action::DeleteAndWarn => self.delete_and_warn(ctx, msg).await,
            Action::NoAction => {
                // Other bots are moderated but never invoke commands.
                if !msg.author.bot {
                    self.router.dispatch(ctx, msg, &self.data).await;
                }
            }
        }
        Ok(())
    }
}
