use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing DISCORD_TOKEN")]
    MissingToken,
}

/// Static configuration, loaded once at startup and immutable afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub prefix: char,
    /// Channel names (compared case-insensitively) where gated commands run.
    pub allowed_channels: Vec<String>,
    /// Substrings (compared case-insensitively) that get a message deleted.
    pub banned_words: Vec<String>,
    pub welcome_channel: String,
    pub assign_role: String,
    /// How long router/moderation feedback stays up before self-deleting.
    pub feedback_ttl: Duration,
    /// Grace period before an empty voice session is torn down.
    pub idle_grace: Duration,
    /// Upper bound on a single media resolution.
    pub resolve_timeout: Duration,
    pub deepinfra_api_key: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let token = std::env::var("DISCORD_TOKEN").map_err(|_| ConfigError::MissingToken)?;

        let allowed_channels = std::env::var("ALLOWED_CHANNELS")
            .map(|v| parse_list(&v))
            .unwrap_or_else(|_| {
                vec![
                    "bot".to_string(),
                    "test_bot".to_string(),
                    "music-bot".to_string(),
                ]
            });

        let banned_words = std::env::var("BANNED_WORDS")
            .map(|v| parse_list(&v))
            .unwrap_or_else(|_| vec!["kuy".to_string()]);

        Ok(Self {
            token,
            prefix: '!',
            allowed_channels,
            banned_words,
            welcome_channel: "welcome".to_string(),
            assign_role: "test bot".to_string(),
            feedback_ttl: Duration::from_secs(5),
            idle_grace: Duration::from_secs(5),
            resolve_timeout: Duration::from_secs(30),
            deepinfra_api_key: std::env::var("DEEPINFRA_API_KEY").ok(),
        })
    }
}

/// Splits a comma-separated env value, dropping empty segments.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_drops_empties() {
        assert_eq!(
            parse_list("bot, test_bot,,music-bot "),
            vec!["bot", "test_bot", "music-bot"]
        );
        assert!(parse_list("  ").is_empty());
    }
}
