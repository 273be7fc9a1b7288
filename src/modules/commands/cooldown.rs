use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Which identifier a cooldown is keyed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownScope {
    Guild,
    User,
}

#[derive(Debug, Clone, Copy)]
pub struct CooldownPolicy {
    pub scope: CooldownScope,
    pub window: Duration,
}

impl CooldownPolicy {
    pub const fn guild(secs: u64) -> Self {
        Self {
            scope: CooldownScope::Guild,
            window: Duration::from_secs(secs),
        }
    }

    pub const fn user(secs: u64) -> Self {
        Self {
            scope: CooldownScope::User,
            window: Duration::from_secs(secs),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum CooldownCheck {
    Allowed,
    Denied { retry_after: Duration },
}

/// Per-(command, scope key) rate limiter. One entry per pair ever invoked;
/// entries are superseded by the next permitted check, never expired.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    entries: DashMap<(&'static str, u64), Instant>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check_and_record(
        &self,
        command: &'static str,
        scope_key: u64,
        window: Duration,
    ) -> CooldownCheck {
        self.check_at(Instant::now(), command, scope_key, window)
    }

    /// An invocation is permitted only if `now - last >= window`; permitting
    /// updates the entry. Denials leave the entry untouched.
    fn check_at(
        &self,
        now: Instant,
        command: &'static str,
        scope_key: u64,
        window: Duration,
    ) -> CooldownCheck {
        match self.entries.entry((command, scope_key)) {
            Entry::Occupied(mut entry) => {
                let elapsed = now.saturating_duration_since(*entry.get());
                if elapsed >= window {
                    entry.insert(now);
                    CooldownCheck::Allowed
                } else {
                    CooldownCheck::Denied {
                        retry_after: window - elapsed,
                    }
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(now);
                CooldownCheck::Allowed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(10);

    #[test]
    fn test_first_invocation_is_allowed() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();
        assert_eq!(
            tracker.check_at(now, "ping", 1, WINDOW),
            CooldownCheck::Allowed
        );
    }

    #[test]
    fn test_second_invocation_within_window_is_denied() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();
        tracker.check_at(now, "ping", 1, WINDOW);
        assert_eq!(
            tracker.check_at(now + Duration::from_secs(3), "ping", 1, WINDOW),
            CooldownCheck::Denied {
                retry_after: Duration::from_secs(7)
            }
        );
    }

    #[test]
    fn test_allowed_again_after_window_elapses() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();
        tracker.check_at(now, "ping", 1, WINDOW);
        assert_eq!(
            tracker.check_at(now + WINDOW, "ping", 1, WINDOW),
            CooldownCheck::Allowed
        );
    }

    #[test]
    fn test_denial_does_not_reset_the_window() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();
        tracker.check_at(now, "ping", 1, WINDOW);
        tracker.check_at(now + Duration::from_secs(9), "ping", 1, WINDOW);
        // Had the denial refreshed the entry, this would still be denied.
        assert_eq!(
            tracker.check_at(now + Duration::from_secs(10), "ping", 1, WINDOW),
            CooldownCheck::Allowed
        );
    }

    #[test]
    fn test_scope_keys_do_not_share_state() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();
        tracker.check_at(now, "ping", 1, WINDOW);
        assert_eq!(
            tracker.check_at(now, "ping", 2, WINDOW),
            CooldownCheck::Allowed
        );
    }

    #[test]
    fn test_commands_do_not_share_state() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();
        tracker.check_at(now, "ping", 1, WINDOW);
        assert_eq!(
            tracker.check_at(now, "nettest", 1, WINDOW),
            CooldownCheck::Allowed
        );
    }
}
