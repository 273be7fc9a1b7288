use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

/// Resolution failures the player cares to distinguish: an empty result set
/// is not the same thing as a resolver that hung or broke.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no results")]
    NotFound,
    #[error("resolution timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(String),
}

/// A playable stream plus the metadata shown to the user.
#[derive(Debug, Clone)]
pub struct AudioSource {
    pub url: String,
    pub title: String,
    pub duration: Option<Duration>,
    pub uploader: Option<String>,
}

#[async_trait]
pub trait MediaResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> Result<AudioSource, ResolveError>;
}

/// Shells out to yt-dlp: direct URLs pass through, anything else becomes a
/// YouTube search. The child is killed if it outlives the timeout.
pub struct YtDlp {
    timeout: Duration,
}

impl YtDlp {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl MediaResolver for YtDlp {
    async fn resolve(&self, query: &str) -> Result<AudioSource, ResolveError> {
        let mut command = Command::new("yt-dlp");
        command
            .args([
                "--dump-single-json",
                "--format",
                "bestaudio/best",
                "--no-playlist",
                "--default-search",
                "ytsearch",
                "--no-warnings",
                "--quiet",
                "--",
            ])
            .arg(query)
            // A timeout drops the output future; the child must die with it.
            .kill_on_drop(true);

        let output = timeout(self.timeout, command.output())
            .await
            .map_err(|_| ResolveError::Timeout(self.timeout))?
            .map_err(|e| ResolveError::Failed(format!("failed to run yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("yt-dlp failed").to_string();
            return Err(ResolveError::Failed(detail));
        }

        if output.stdout.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(ResolveError::NotFound);
        }
        let value: Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ResolveError::Failed(format!("unparseable yt-dlp output: {e}")))?;
        parse_entry(value)
    }
}

/// Pulls one playable entry out of the yt-dlp JSON dump. Search queries come
/// back wrapped in a playlist object whose first entry wins.
fn parse_entry(mut value: Value) -> Result<AudioSource, ResolveError> {
    if value.get("_type").and_then(Value::as_str) == Some("playlist") {
        let entries = value
            .get_mut("entries")
            .and_then(Value::as_array_mut)
            .ok_or(ResolveError::NotFound)?;
        if entries.is_empty() {
            return Err(ResolveError::NotFound);
        }
        value = entries.remove(0);
    }

    let url = value
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| ResolveError::Failed("could not extract audio url".to_string()))?
        .to_string();
    let title = value
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or("Unknown")
        .to_string();
    let duration = value
        .get("duration")
        .and_then(Value::as_f64)
        .filter(|secs| *secs > 0.0)
        .map(Duration::from_secs_f64);
    let uploader = value
        .get("uploader")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(AudioSource {
        url,
        title,
        duration,
        uploader,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_video_entry() {
        let source = parse_entry(json!({
            "url": "https://cdn.example/audio",
            "title": "Some Song",
            "duration": 225.0,
            "uploader": "Some Channel",
        }))
        .unwrap();
        assert_eq!(source.url, "https://cdn.example/audio");
        assert_eq!(source.title, "Some Song");
        assert_eq!(source.duration, Some(Duration::from_secs(225)));
        assert_eq!(source.uploader.as_deref(), Some("Some Channel"));
    }

    #[test]
    fn test_search_result_unwraps_first_entry() {
        let source = parse_entry(json!({
            "_type": "playlist",
            "entries": [
                { "url": "https://cdn.example/first", "title": "First" },
                { "url": "https://cdn.example/second", "title": "Second" },
            ],
        }))
        .unwrap();
        assert_eq!(source.url, "https://cdn.example/first");
    }

    #[test]
    fn test_empty_search_is_not_found() {
        let err = parse_entry(json!({ "_type": "playlist", "entries": [] })).unwrap_err();
        assert!(matches!(err, ResolveError::NotFound));
    }

    #[test]
    fn test_missing_url_is_a_failure_not_a_miss() {
        let err = parse_entry(json!({ "title": "No Stream" })).unwrap_err();
        assert!(matches!(err, ResolveError::Failed(_)));
    }

    #[test]
    fn test_metadata_defaults_are_tolerant() {
        let source = parse_entry(json!({ "url": "https://cdn.example/a" })).unwrap();
        assert_eq!(source.title, "Unknown");
        assert_eq!(source.duration, None);
        assert_eq!(source.uploader, None);
    }
}
