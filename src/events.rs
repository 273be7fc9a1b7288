use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use serenity::all::{Context, Member, Message, Ready, VoiceState};
use std::sync::Arc;
use tracing::error;

/// Gateway events the bot reacts to, one variant per kind. Everything else
/// the gateway delivers is ignored at the bridge.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready(Box<Ready>),
    Message(Message),
    MemberJoined(Member),
    VoiceStateChanged {
        old: Option<VoiceState>,
        new: VoiceState,
    },
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn name(&self) -> &'static str;
    async fn handle(&self, ctx: &Context, event: &GatewayEvent) -> Result<(), crate::Error>;
}

/// Fans each event out to the handlers registered at startup. Handlers run
/// concurrently; a failing handler is logged by name and never takes the
/// event flow down with it.
#[derive(Default)]
pub struct EventDispatcher {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, handler: impl EventHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub async fn handle_event(&self, ctx: &Context, event: GatewayEvent) {
        let event = Arc::new(event);
        let mut futures = FuturesUnordered::new();

        for handler in self.handlers.iter() {
            let handler = handler.clone();
            let ctx = ctx.clone();
            let event = event.clone();

            futures.push(tokio::spawn(async move {
                if let Err(e) = handler.handle(&ctx, &event).await {
                    error!("Error in event handler {}: {}", handler.name(), e);
                }
            }));
        }

        while futures.next().await.is_some() {}
    }
}

/// Thin serenity-facing shim: wraps each callback into a [`GatewayEvent`]
/// and hands it to the dispatcher.
pub struct GatewayBridge {
    dispatcher: Arc<EventDispatcher>,
}

impl GatewayBridge {
    pub fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl serenity::client::EventHandler for GatewayBridge {
    async fn ready(&self, ctx: Context, ready: Ready) {
        self.dispatcher
            .handle_event(&ctx, GatewayEvent::Ready(Box::new(ready)))
            .await;
    }

    async fn message(&self, ctx: Context, message: Message) {
        self.dispatcher
            .handle_event(&ctx, GatewayEvent::Message(message))
            .await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        self.dispatcher
            .handle_event(&ctx, GatewayEvent::MemberJoined(new_member))
            .await;
    }

    async fn voice_state_update(&self, ctx: Context, old: Option<VoiceState>, new: VoiceState) {
        self.dispatcher
            .handle_event(&ctx, GatewayEvent::VoiceStateChanged { old, new })
            .await;
    }
}
