use serenity::all::{ChannelId, Context};
use std::time::Duration;
use tracing::error;

/// Sends a message that cleans itself up after `ttl`. Used for router and
/// moderation feedback so the channel does not fill with bot noise.
pub async fn send_temporary(ctx: &Context, channel: ChannelId, content: String, ttl: Duration) {
    match channel.say(&ctx.http, content).await {
        Ok(msg) => {
            let http = ctx.http.clone();
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                // The message may already be gone; nothing to do about it.
                let _ = msg.delete(&http).await;
            });
        }
        Err(e) => error!("Failed to send feedback message: {}", e),
    }
}

/// `M:SS` rendering for track durations.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(59)), "0:59");
        assert_eq!(format_duration(Duration::from_secs(225)), "3:45");
        assert_eq!(format_duration(Duration::from_secs(3600)), "60:00");
    }
}
