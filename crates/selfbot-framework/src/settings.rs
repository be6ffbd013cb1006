//! Dispatch behaviour settings.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use selfbot_core::ActorId;

/// How command responses are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyMode {
    /// Replace the triggering message with the response.
    #[default]
    Edit,
    /// Post the response as a new message in the same channel.
    Send,
}

/// Which actors may trigger commands.
///
/// The blocked list always wins. With `self_only` set, the logged-in account
/// and the explicitly allowed actors are accepted; otherwise every actor is
/// accepted unless an allow list is given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    pub self_only: bool,
    pub allowed: HashSet<ActorId>,
    pub blocked: HashSet<ActorId>,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            self_only: true,
            allowed: HashSet::new(),
            blocked: HashSet::new(),
        }
    }
}

impl AccessPolicy {
    /// A policy that accepts everyone.
    pub fn open() -> Self {
        Self {
            self_only: false,
            ..Self::default()
        }
    }

    pub fn self_only(mut self, self_only: bool) -> Self {
        self.self_only = self_only;
        self
    }

    pub fn allow(mut self, actor: impl Into<ActorId>) -> Self {
        self.allowed.insert(actor.into());
        self
    }

    pub fn block(mut self, actor: impl Into<ActorId>) -> Self {
        self.blocked.insert(actor.into());
        self
    }

    /// Whether `actor` may trigger commands given the logged-in account.
    pub fn permits(&self, actor: &ActorId, self_id: Option<&ActorId>) -> bool {
        if self.blocked.contains(actor) {
            return false;
        }
        if self.self_only {
            return self_id == Some(actor) || self.allowed.contains(actor);
        }
        self.allowed.is_empty() || self.allowed.contains(actor)
    }
}

/// Settings consumed by the [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Timeout for commands without their own override.
    pub command_timeout: Duration,
    pub reply_mode: ReplyMode,
    /// Send a cooldown notice when the rate limiter denies a dispatch.
    pub notify_rate_limited: bool,
    pub access: AccessPolicy,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            reply_mode: ReplyMode::Edit,
            notify_rate_limited: true,
            access: AccessPolicy::default(),
        }
    }
}

impl DispatchSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn reply_mode(mut self, mode: ReplyMode) -> Self {
        self.reply_mode = mode;
        self
    }

    pub fn notify_rate_limited(mut self, notify: bool) -> Self {
        self.notify_rate_limited = notify;
        self
    }

    pub fn access(mut self, access: AccessPolicy) -> Self {
        self.access = access;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_only_policy() {
        let me = ActorId::from("me");
        let friend = ActorId::from("friend");
        let other = ActorId::from("other");
        let policy = AccessPolicy::default().allow("friend");

        assert!(policy.permits(&me, Some(&me)));
        assert!(policy.permits(&friend, Some(&me)));
        assert!(!policy.permits(&other, Some(&me)));
        // Before login nobody but the allow list gets through.
        assert!(!policy.permits(&me, None));
    }

    #[test]
    fn test_open_policy() {
        let policy = AccessPolicy::open();
        assert!(policy.permits(&ActorId::from("anyone"), None));

        let restricted = AccessPolicy::open().allow("a");
        assert!(restricted.permits(&ActorId::from("a"), None));
        assert!(!restricted.permits(&ActorId::from("b"), None));
    }

    #[test]
    fn test_blocked_always_wins() {
        let me = ActorId::from("me");
        let policy = AccessPolicy::open().allow("me").block("me");
        assert!(!policy.permits(&me, Some(&me)));
    }

    #[test]
    fn test_reply_mode_deserializes_lowercase() {
        let mode: ReplyMode = serde_json::from_str("\"send\"").unwrap();
        assert_eq!(mode, ReplyMode::Send);
    }
}
