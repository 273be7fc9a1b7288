/// What to do with an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NoAction,
    DeleteAndWarn,
}

/// Case-insensitive substring scan against the configured denylist. Unlike
/// commands, moderation applies to every guild message in every channel.
#[derive(Debug, Clone)]
pub struct ModerationFilter {
    banned: Vec<String>,
}

impl ModerationFilter {
    pub fn new(banned_words: &[String]) -> Self {
        Self {
            banned: banned_words
                .iter()
                .map(|word| word.to_lowercase())
                .filter(|word| !word.is_empty())
                .collect(),
        }
    }

    pub fn inspect(&self, content: &str) -> Action {
        let content = content.to_lowercase();
        if self.banned.iter().any(|word| content.contains(word)) {
            Action::DeleteAndWarn
        } else {
            Action::NoAction
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ModerationFilter {
        ModerationFilter::new(&["kuy".to_string()])
    }

    #[test]
    fn test_clean_message_passes() {
        assert_eq!(filter().inspect("hello there"), Action::NoAction);
    }

    #[test]
    fn test_banned_word_is_flagged() {
        assert_eq!(filter().inspect("kuy"), Action::DeleteAndWarn);
    }

    #[test]
    fn test_match_ignores_case() {
        assert_eq!(filter().inspect("KuY!"), Action::DeleteAndWarn);
    }

    #[test]
    fn test_match_inside_surrounding_text() {
        assert_eq!(
            filter().inspect("well KUY to you too"),
            Action::DeleteAndWarn
        );
    }

    #[test]
    fn test_empty_denylist_entries_are_ignored() {
        let filter = ModerationFilter::new(&["".to_string()]);
        assert_eq!(filter.inspect("anything"), Action::NoAction);
    }
}
