use crate::modules::music::resolver::ResolveError;
use std::time::Duration;
use thiserror::Error;

/// Failures a command invocation can surface. Everything here is recovered
/// locally and rendered as short-lived feedback; only `Unexpected` is logged
/// with full detail.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("command not allowed in this channel, allowed: {0}")]
    GateDenied(String),
    #[error("command on cooldown for another {}s", .0.as_secs_f64())]
    CooldownActive(Duration),
    #[error("command not found")]
    CommandNotFound,
    #[error("bad arguments: {0}")]
    BadArguments(String),
    #[error("missing permission to {0}")]
    PermissionDenied(String),
    #[error("{0}")]
    ResourceNotFound(String),
    #[error("media resolution failed: {0}")]
    MediaResolution(#[from] ResolveError),
    #[error("playback failed: {0}")]
    Playback(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl CommandError {
    /// The short message shown in the originating channel.
    pub fn user_message(&self) -> String {
        match self {
            Self::GateDenied(channels) => {
                format!("❌ This command can only be used in: {channels}")
            }
            Self::CooldownActive(retry_after) => format!(
                "❌ Command on cooldown. Try again in {:.1}s",
                retry_after.as_secs_f64()
            ),
            Self::CommandNotFound => "❌ Command not found.".to_string(),
            Self::BadArguments(reason) => format!("❌ {reason}"),
            Self::PermissionDenied(action) => {
                format!("❌ I don't have permission to {action}.")
            }
            Self::ResourceNotFound(what) => format!("❌ {what}"),
            Self::MediaResolution(ResolveError::NotFound) => "❌ No results found.".to_string(),
            Self::MediaResolution(ResolveError::Timeout(_)) => "❌ Search timed out.".to_string(),
            Self::MediaResolution(ResolveError::Failed(_)) => {
                "❌ Failed to extract video information.".to_string()
            }
            Self::Playback(_) => "❌ Failed to play audio.".to_string(),
            Self::Unexpected(_) => "❌ An unexpected error occurred.".to_string(),
        }
    }
}

impl From<serenity::Error> for CommandError {
    fn from(err: serenity::Error) -> Self {
        match http_status(&err) {
            Some(403) => Self::PermissionDenied("do that".to_string()),
            Some(404) => Self::ResourceNotFound("That no longer exists.".to_string()),
            _ => Self::Unexpected(err.to_string()),
        }
    }
}

/// Status code of a failed REST call, when the error carries one.
pub fn http_status(err: &serenity::Error) -> Option<u16> {
    if let serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(resp)) = err {
        Some(resp.status_code.as_u16())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldown_message_has_one_decimal() {
        let err = CommandError::CooldownActive(Duration::from_millis(7_340));
        assert_eq!(err.user_message(), "❌ Command on cooldown. Try again in 7.3s");
    }

    #[test]
    fn test_not_found_resolve_renders_no_results() {
        let err = CommandError::MediaResolution(ResolveError::NotFound);
        assert_eq!(err.user_message(), "❌ No results found.");
    }

    #[test]
    fn test_unexpected_never_leaks_detail() {
        let err = CommandError::Unexpected("token=hunter2".to_string());
        assert!(!err.user_message().contains("hunter2"));
    }
}
