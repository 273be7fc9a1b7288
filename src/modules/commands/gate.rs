/// Decides whether a gated command may run where it was invoked. Compares
/// the channel's display name, case-insensitively, against the configured
/// allow-list. Fails closed: an invocation with no guild channel (a DM, or
/// a channel whose name could not be resolved) is denied.
#[derive(Debug, Clone)]
pub struct ChannelGate {
    allowed: Vec<String>,
}

impl ChannelGate {
    pub fn new(allowed: &[String]) -> Self {
        Self {
            allowed: allowed.iter().map(|name| name.to_lowercase()).collect(),
        }
    }

    pub fn permitted(&self, channel_name: Option<&str>) -> bool {
        match channel_name {
            Some(name) => {
                let name = name.to_lowercase();
                self.allowed.iter().any(|allowed| *allowed == name)
            }
            None => false,
        }
    }

    /// "#bot, #test_bot, ..." for gate-denial feedback.
    pub fn describe(&self) -> String {
        self.allowed
            .iter()
            .map(|name| format!("#{name}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> ChannelGate {
        ChannelGate::new(&["bot".to_string(), "Test_Bot".to_string()])
    }

    #[test]
    fn test_allows_listed_channel() {
        assert!(gate().permitted(Some("bot")));
    }

    #[test]
    fn test_comparison_ignores_case_on_both_sides() {
        assert!(gate().permitted(Some("TEST_BOT")));
        assert!(gate().permitted(Some("test_bot")));
    }

    #[test]
    fn test_denies_unlisted_channel() {
        assert!(!gate().permitted(Some("general")));
    }

    #[test]
    fn test_fails_closed_without_a_channel() {
        assert!(!gate().permitted(None));
    }

    #[test]
    fn test_describe_lists_channels() {
        assert_eq!(gate().describe(), "#bot, #test_bot");
    }
}
