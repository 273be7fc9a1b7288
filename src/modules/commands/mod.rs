pub mod chat;
pub mod cooldown;
pub mod diagnostics;
pub mod gate;
pub mod general;
pub mod router;

use crate::modules::music::commands as music;
use cooldown::CooldownPolicy;
use router::Command;

/// The full command set, wired once at startup. Cooldown windows follow the
/// policies the bot has always shipped with; `chat` is the one command that
/// opts out of channel gating.
pub fn registry() -> Vec<Command> {
    vec![
        Command {
            name: "ping",
            gated: true,
            min_args: 0,
            cooldown: Some(CooldownPolicy::user(3)),
            handler: |inv| Box::pin(general::ping(inv)),
        },
        Command {
            name: "assign",
            gated: true,
            min_args: 0,
            cooldown: Some(CooldownPolicy::user(5)),
            handler: |inv| Box::pin(general::assign(inv)),
        },
        Command {
            name: "myroles",
            gated: true,
            min_args: 0,
            cooldown: Some(CooldownPolicy::user(3)),
            handler: |inv| Box::pin(general::myroles(inv)),
        },
        Command {
            name: "serverstatus",
            gated: true,
            min_args: 0,
            cooldown: Some(CooldownPolicy::user(10)),
            handler: |inv| Box::pin(general::serverstatus(inv)),
        },
        Command {
            name: "help",
            gated: true,
            min_args: 0,
            cooldown: Some(CooldownPolicy::user(10)),
            handler: |inv| Box::pin(general::help(inv)),
        },
        Command {
            name: "channels",
            gated: true,
            min_args: 0,
            cooldown: Some(CooldownPolicy::user(10)),
            handler: |inv| Box::pin(general::channels(inv)),
        },
        Command {
            name: "nettest",
            gated: true,
            min_args: 0,
            cooldown: Some(CooldownPolicy::guild(10)),
            handler: |inv| Box::pin(diagnostics::nettest(inv)),
        },
        Command {
            name: "speedtest",
            gated: true,
            min_args: 0,
            cooldown: Some(CooldownPolicy::guild(30)),
            handler: |inv| Box::pin(diagnostics::speedtest(inv)),
        },
        Command {
            name: "chat",
            gated: false,
            min_args: 1,
            cooldown: None,
            handler: |inv| Box::pin(chat::chat(inv)),
        },
        Command {
            name: "join",
            gated: true,
            min_args: 0,
            cooldown: None,
            handler: |inv| Box::pin(music::join(inv)),
        },
        Command {
            name: "leave",
            gated: true,
            min_args: 0,
            cooldown: None,
            handler: |inv| Box::pin(music::leave(inv)),
        },
        Command {
            name: "play",
            gated: true,
            min_args: 1,
            cooldown: None,
            handler: |inv| Box::pin(music::play(inv)),
        },
        Command {
            name: "stop",
            gated: true,
            min_args: 0,
            cooldown: None,
            handler: |inv| Box::pin(music::stop(inv)),
        },
        Command {
            name: "pause",
            gated: true,
            min_args: 0,
            cooldown: None,
            handler: |inv| Box::pin(music::pause(inv)),
        },
        Command {
            name: "resume",
            gated: true,
            min_args: 0,
            cooldown: None,
            handler: |inv| Box::pin(music::resume(inv)),
        },
        Command {
            name: "volume",
            gated: true,
            min_args: 1,
            cooldown: None,
            handler: |inv| Box::pin(music::volume(inv)),
        },
        Command {
            name: "status",
            gated: true,
            min_args: 0,
            cooldown: None,
            handler: |inv| Box::pin(music::status(inv)),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_registry_names_are_unique() {
        let commands = registry();
        let names: HashSet<_> = commands.iter().map(|c| c.name).collect();
        assert_eq!(names.len(), commands.len());
    }

    #[test]
    fn test_only_chat_is_ungated() {
        let ungated: Vec<_> = registry()
            .into_iter()
            .filter(|c| !c.gated)
            .map(|c| c.name)
            .collect();
        assert_eq!(ungated, vec!["chat"]);
    }
}
