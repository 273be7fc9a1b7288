use crate::config::Config;
use crate::error::CommandError;
use crate::modules::commands::cooldown::{CooldownCheck, CooldownPolicy, CooldownScope, CooldownTracker};
use crate::modules::commands::gate::ChannelGate;
use crate::utils::send_temporary;
use crate::Data;
use futures::future::BoxFuture;
use serenity::all::{ChannelId, Context, GuildId, Message, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, trace};

/// Everything a command handler gets to work with.
pub struct Invocation {
    pub ctx: Context,
    pub msg: Message,
    pub args: Vec<String>,
    pub data: Arc<Data>,
}

impl Invocation {
    /// Guild of the invocation; gated commands can rely on this, but the
    /// gate already fails closed outside guilds so this is a backstop.
    pub fn guild_id(&self) -> Result<GuildId, CommandError> {
        self.msg.guild_id.ok_or_else(|| {
            CommandError::ResourceNotFound("This command only works in a server.".to_string())
        })
    }
}

pub type CommandHandler = fn(Invocation) -> BoxFuture<'static, Result<(), CommandError>>;

/// A registered text command and its dispatch policy.
pub struct Command {
    pub name: &'static str,
    pub gated: bool,
    pub min_args: usize,
    pub cooldown: Option<CooldownPolicy>,
    pub handler: CommandHandler,
}

/// Where a message came from, resolved once per dispatch. Kept gateway-free
/// so routing decisions can be exercised directly.
#[derive(Debug, Clone)]
pub struct Origin {
    pub guild_id: Option<GuildId>,
    pub channel_id: ChannelId,
    pub channel_name: Option<String>,
    pub user_id: UserId,
}

impl Origin {
    pub async fn resolve(ctx: &Context, msg: &Message) -> Self {
        let channel_name = match msg.guild_id {
            Some(_) => msg.channel_id.name(ctx).await.ok(),
            None => None,
        };
        Self {
            guild_id: msg.guild_id,
            channel_id: msg.channel_id,
            channel_name,
            user_id: msg.author.id,
        }
    }

    fn gate_input(&self) -> Option<&str> {
        match self.guild_id {
            Some(_) => self.channel_name.as_deref(),
            None => None,
        }
    }
}

/// Outcome of routing one message.
pub enum Route<'a> {
    /// No prefix, or a bare prefix: not addressed to the bot.
    NotACommand,
    /// Unknown command outside an allowed channel: stay silent rather than
    /// leaking gate chatter into unrelated channels.
    Ignore,
    Feedback(CommandError),
    Run {
        command: &'a Command,
        args: Vec<String>,
    },
}

pub struct CommandRouter {
    prefix: char,
    commands: Vec<Command>,
    gate: ChannelGate,
    cooldowns: CooldownTracker,
    feedback_ttl: Duration,
}

impl CommandRouter {
    pub fn new(config: &Config, commands: Vec<Command>) -> Self {
        Self {
            prefix: config.prefix,
            commands,
            gate: ChannelGate::new(&config.allowed_channels),
            cooldowns: CooldownTracker::new(),
            feedback_ttl: config.feedback_ttl,
        }
    }

    fn find(&self, name: &str) -> Option<&Command> {
        // Case-sensitive exact match on the token after the prefix.
        self.commands.iter().find(|command| command.name == name)
    }

    /// The routing decision: prefix parse, lookup, gate, cooldown, arity.
    pub fn route(&self, content: &str, origin: &Origin) -> Route<'_> {
        let Some(rest) = content.strip_prefix(self.prefix) else {
            return Route::NotACommand;
        };
        let mut tokens = rest.split_whitespace();
        let Some(name) = tokens.next() else {
            return Route::NotACommand;
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let in_allowed_channel = self.gate.permitted(origin.gate_input());

        let Some(command) = self.find(name) else {
            return if in_allowed_channel {
                Route::Feedback(CommandError::CommandNotFound)
            } else {
                Route::Ignore
            };
        };

        if command.gated && !in_allowed_channel {
            return Route::Feedback(CommandError::GateDenied(self.gate.describe()));
        }

        if let Some(policy) = command.cooldown {
            let scope_key = match policy.scope {
                CooldownScope::Guild => origin
                    .guild_id
                    .map(|id| id.get())
                    .unwrap_or_else(|| origin.user_id.get()),
                CooldownScope::User => origin.user_id.get(),
            };
            if let CooldownCheck::Denied { retry_after } =
                self.cooldowns
                    .check_and_record(command.name, scope_key, policy.window)
            {
                return Route::Feedback(CommandError::CooldownActive(retry_after));
            }
        }

        if args.len() < command.min_args {
            return Route::Feedback(CommandError::BadArguments(
                "Missing required argument.".to_string(),
            ));
        }

        Route::Run { command, args }
    }

    /// Runs one message through the router. Handler failures are mapped into
    /// the error taxonomy and rendered as self-deleting feedback; nothing
    /// propagates out of a single dispatch.
    pub async fn dispatch(&self, ctx: &Context, msg: &Message, data: &Arc<Data>) {
        if !msg.content.starts_with(self.prefix) {
            return;
        }
        let origin = Origin::resolve(ctx, msg).await;
        match self.route(&msg.content, &origin) {
            Route::NotACommand | Route::Ignore => {}
            Route::Feedback(err) => {
                send_temporary(ctx, msg.channel_id, err.user_message(), self.feedback_ttl).await;
            }
            Route::Run { command, args } => {
                trace!(
                    "Command {} used by {} in {}",
                    command.name,
                    msg.author.tag(),
                    msg.guild_id
                        .map_or_else(|| "DM".to_string(), |id| id.to_string())
                );
                let name = command.name;
                let handler = command.handler;
                let invocation = Invocation {
                    ctx: ctx.clone(),
                    msg: msg.clone(),
                    args,
                    data: data.clone(),
                };
                if let Err(err) = handler(invocation).await {
                    if let CommandError::Unexpected(detail) = &err {
                        error!("Command {} failed for {}: {}", name, msg.author.tag(), detail);
                    }
                    send_temporary(ctx, msg.channel_id, err.user_message(), self.feedback_ttl)
                        .await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_inv: Invocation) -> BoxFuture<'static, Result<(), CommandError>> {
        Box::pin(async { Ok(()) })
    }

    fn router() -> CommandRouter {
        let config = Config {
            token: "test".to_string(),
            prefix: '!',
            allowed_channels: vec!["bot".to_string(), "test_bot".to_string()],
            banned_words: vec![],
            welcome_channel: "welcome".to_string(),
            assign_role: "test bot".to_string(),
            feedback_ttl: Duration::from_secs(5),
            idle_grace: Duration::from_secs(5),
            resolve_timeout: Duration::from_secs(30),
            deepinfra_api_key: None,
        };
        let commands = vec![
            Command {
                name: "ping",
                gated: true,
                min_args: 0,
                cooldown: Some(CooldownPolicy::user(3)),
                handler: noop,
            },
            Command {
                name: "nettest",
                gated: true,
                min_args: 0,
                cooldown: Some(CooldownPolicy::guild(10)),
                handler: noop,
            },
            Command {
                name: "chat",
                gated: false,
                min_args: 1,
                cooldown: None,
                handler: noop,
            },
        ];
        CommandRouter::new(&config, commands)
    }

    fn origin_in(channel: Option<&str>) -> Origin {
        Origin {
            guild_id: channel.map(|_| GuildId::new(10)),
            channel_id: ChannelId::new(20),
            channel_name: channel.map(str::to_string),
            user_id: UserId::new(30),
        }
    }

    #[test]
    fn test_message_without_prefix_is_not_a_command() {
        assert!(matches!(
            router().route("ping", &origin_in(Some("bot"))),
            Route::NotACommand
        ));
    }

    #[test]
    fn test_bare_prefix_is_not_a_command() {
        assert!(matches!(
            router().route("!", &origin_in(Some("bot"))),
            Route::NotACommand
        ));
    }

    #[test]
    fn test_unknown_command_in_allowed_channel_reports_not_found() {
        assert!(matches!(
            router().route("!bogus", &origin_in(Some("bot"))),
            Route::Feedback(CommandError::CommandNotFound)
        ));
    }

    #[test]
    fn test_unknown_command_elsewhere_stays_silent() {
        assert!(matches!(
            router().route("!bogus", &origin_in(Some("general"))),
            Route::Ignore
        ));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert!(matches!(
            router().route("!PING", &origin_in(Some("bot"))),
            Route::Feedback(CommandError::CommandNotFound)
        ));
    }

    #[test]
    fn test_gated_command_denied_outside_allow_list() {
        assert!(matches!(
            router().route("!ping", &origin_in(Some("general"))),
            Route::Feedback(CommandError::GateDenied(_))
        ));
    }

    #[test]
    fn test_gate_accepts_mixed_case_channel() {
        assert!(matches!(
            router().route("!ping", &origin_in(Some("Test_Bot"))),
            Route::Run { .. }
        ));
    }

    #[test]
    fn test_gated_command_denied_in_dm() {
        assert!(matches!(
            router().route("!ping", &origin_in(None)),
            Route::Feedback(CommandError::GateDenied(_))
        ));
    }

    #[test]
    fn test_ungated_command_runs_anywhere() {
        assert!(matches!(
            router().route("!chat hello", &origin_in(Some("general"))),
            Route::Run { .. }
        ));
        assert!(matches!(
            router().route("!chat hello", &origin_in(None)),
            Route::Run { .. }
        ));
    }

    #[test]
    fn test_second_invocation_within_window_hits_cooldown() {
        let router = router();
        let origin = origin_in(Some("bot"));
        assert!(matches!(router.route("!ping", &origin), Route::Run { .. }));
        assert!(matches!(
            router.route("!ping", &origin),
            Route::Feedback(CommandError::CooldownActive(_))
        ));
    }

    #[test]
    fn test_guild_scoped_cooldown_spans_users() {
        let router = router();
        let first = origin_in(Some("bot"));
        let mut second = origin_in(Some("bot"));
        second.user_id = UserId::new(31);
        assert!(matches!(router.route("!nettest", &first), Route::Run { .. }));
        assert!(matches!(
            router.route("!nettest", &second),
            Route::Feedback(CommandError::CooldownActive(_))
        ));
    }

    #[test]
    fn test_user_scoped_cooldown_isolates_users() {
        let router = router();
        let first = origin_in(Some("bot"));
        let mut second = origin_in(Some("bot"));
        second.user_id = UserId::new(31);
        assert!(matches!(router.route("!ping", &first), Route::Run { .. }));
        assert!(matches!(router.route("!ping", &second), Route::Run { .. }));
    }

    #[test]
    fn test_missing_required_argument_is_reported() {
        assert!(matches!(
            router().route("!chat", &origin_in(Some("bot"))),
            Route::Feedback(CommandError::BadArguments(_))
        ));
    }

    #[test]
    fn test_arguments_are_split_on_whitespace() {
        match router().route("!chat hello   there", &origin_in(Some("bot"))) {
            Route::Run { args, .. } => assert_eq!(args, vec!["hello", "there"]),
            _ => panic!("expected Run"),
        }
    }
}
