//! Per-actor token-bucket rate limiting.
//!
//! Every actor owns a bucket holding up to `max_invocations` tokens that
//! refills continuously at `max_invocations / window`. A dispatch consumes one
//! token; an empty bucket denies with the time until the next token.
//!
//! Buckets live in a sharded [`DashMap`]. A check holds the actor's entry lock
//! for the whole refill-and-take step, so concurrent checks for the same actor
//! are serialized while different actors never contend on the same lock.
//!
//! Commands may also carry a cooldown: the minimum time between two runs of
//! that command by one actor. Cooldowns are kept in a second map keyed by
//! (command, actor) and are claimed under the same entry-lock discipline.
//!
//! Token amounts are tracked in integer units (one token = `window` in
//! nanoseconds, refilling at `max_invocations` units per nanosecond), which
//! keeps window boundaries exact.
//!
//! # Example
//!
//! ```rust,ignore
//! let limiter = RateLimiter::new(RateLimitPolicy::new(3, Duration::from_secs(10))?);
//!
//! match limiter.check(&actor) {
//!     Decision::Allow => run_command().await,
//!     Decision::Deny { retry_after } => notify(retry_after).await,
//! }
//! ```

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::PolicyError;
use selfbot_core::ActorId;

/// How many invocations an actor may make per window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    max_invocations: u32,
    window: Duration,
}

impl RateLimitPolicy {
    /// Creates a policy, rejecting values that cannot limit anything.
    pub fn new(max_invocations: u32, window: Duration) -> Result<Self, PolicyError> {
        if max_invocations == 0 {
            return Err(PolicyError::InvalidPolicy(
                "max_invocations must be greater than zero".into(),
            ));
        }
        if window.is_zero() {
            return Err(PolicyError::InvalidPolicy(
                "window must be greater than zero".into(),
            ));
        }
        Ok(Self {
            max_invocations,
            window,
        })
    }

    pub fn max_invocations(&self) -> u32 {
        self.max_invocations
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Units per token.
    fn token_cost(&self) -> u128 {
        self.window.as_nanos()
    }

    /// Units in a full bucket.
    fn capacity(&self) -> u128 {
        self.token_cost() * u128::from(self.max_invocations)
    }

    /// Units regained per nanosecond.
    fn refill_rate(&self) -> u128 {
        u128::from(self.max_invocations)
    }
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The invocation may proceed; a token was consumed.
    Allow,
    /// The bucket is empty.
    Deny {
        /// Time until one token becomes available.
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

#[derive(Debug)]
struct Bucket {
    /// Available units (see module docs).
    tokens: u128,
    /// Last time the actor was checked; the bucket is refilled up to here.
    last_seen: Instant,
}

impl Bucket {
    fn full(policy: &RateLimitPolicy, now: Instant) -> Self {
        Self {
            tokens: policy.capacity(),
            last_seen: now,
        }
    }

    fn refill(&mut self, policy: &RateLimitPolicy, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_seen).as_nanos();
        let gained = elapsed.saturating_mul(policy.refill_rate());
        self.tokens = self.tokens.saturating_add(gained).min(policy.capacity());
        if now > self.last_seen {
            self.last_seen = now;
        }
    }
}

/// Per-actor rate limiter.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    buckets: DashMap<ActorId, Bucket>,
    /// When each (command, actor) pair may run again.
    cooldowns: DashMap<(String, ActorId), Instant>,
}

impl RateLimiter {
    /// Creates a limiter with no tracked actors.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            buckets: DashMap::new(),
            cooldowns: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &RateLimitPolicy {
        &self.policy
    }

    /// Checks (and on success consumes) one invocation for `actor`.
    pub fn check(&self, actor: &ActorId) -> Decision {
        self.check_at(actor, Instant::now())
    }

    /// Like [`check`](Self::check) with an explicit clock reading.
    pub fn check_at(&self, actor: &ActorId, now: Instant) -> Decision {
        let policy = &self.policy;
        let mut bucket = self
            .buckets
            .entry(actor.clone())
            .or_insert_with(|| Bucket::full(policy, now));

        bucket.refill(policy, now);

        let cost = policy.token_cost();
        if bucket.tokens >= cost {
            bucket.tokens -= cost;
            trace!(actor = %actor, remaining = bucket.tokens / cost, "Rate limit token consumed");
            Decision::Allow
        } else {
            let missing = cost - bucket.tokens;
            let nanos = missing.div_ceil(policy.refill_rate());
            let retry_after = Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX));
            debug!(actor = %actor, retry_after_ms = retry_after.as_millis() as u64, "Rate limit exceeded");
            Decision::Deny { retry_after }
        }
    }

    /// Claims one run of `command` for `actor` unless its cooldown is still
    /// running.
    pub fn check_cooldown(&self, command: &str, actor: &ActorId, cooldown: Duration) -> Decision {
        self.check_cooldown_at(command, actor, cooldown, Instant::now())
    }

    /// Like [`check_cooldown`](Self::check_cooldown) with an explicit clock reading.
    pub fn check_cooldown_at(
        &self,
        command: &str,
        actor: &ActorId,
        cooldown: Duration,
        now: Instant,
    ) -> Decision {
        if cooldown.is_zero() {
            return Decision::Allow;
        }

        let mut ready_at = self
            .cooldowns
            .entry((command.to_string(), actor.clone()))
            .or_insert(now);

        if now >= *ready_at {
            *ready_at = now + cooldown;
            Decision::Allow
        } else {
            let retry_after = *ready_at - now;
            debug!(
                command,
                actor = %actor,
                retry_after_ms = retry_after.as_millis() as u64,
                "Command cooldown active"
            );
            Decision::Deny { retry_after }
        }
    }

    /// Drops state for actors not seen for longer than `idle`, and every
    /// cooldown that has run out.
    ///
    /// Returns the number of evicted entries.
    pub fn sweep(&self, idle: Duration) -> usize {
        self.sweep_at(idle, Instant::now())
    }

    /// Like [`sweep`](Self::sweep) with an explicit clock reading.
    pub fn sweep_at(&self, idle: Duration, now: Instant) -> usize {
        let mut evicted = 0;
        self.buckets.retain(|_, bucket| {
            let keep = now.saturating_duration_since(bucket.last_seen) <= idle;
            if !keep {
                evicted += 1;
            }
            keep
        });
        self.cooldowns.retain(|_, ready_at| {
            let keep = *ready_at > now;
            if !keep {
                evicted += 1;
            }
            keep
        });
        if evicted > 0 {
            debug!(evicted, remaining = self.buckets.len(), "Swept idle rate limit state");
        }
        evicted
    }

    /// Number of actors currently holding state.
    pub fn tracked_actors(&self) -> usize {
        self.buckets.len()
    }

    /// Number of (command, actor) cooldowns still held.
    pub fn tracked_cooldowns(&self) -> usize {
        self.cooldowns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn limiter(max: u32, window_ms: u64) -> RateLimiter {
        RateLimiter::new(RateLimitPolicy::new(max, Duration::from_millis(window_ms)).unwrap())
    }

    #[test]
    fn test_policy_rejects_zero_values() {
        assert!(matches!(
            RateLimitPolicy::new(0, Duration::from_secs(1)),
            Err(PolicyError::InvalidPolicy(_))
        ));
        assert!(matches!(
            RateLimitPolicy::new(1, Duration::ZERO),
            Err(PolicyError::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_window_allows_max_then_recovers() {
        let limiter = limiter(3, 10_000);
        let actor = ActorId::from("u1");
        let t0 = Instant::now();

        for _ in 0..3 {
            assert_eq!(limiter.check_at(&actor, t0), Decision::Allow);
        }
        let denied = limiter.check_at(&actor, t0 + Duration::from_secs(1));
        assert!(!denied.is_allowed());

        let later = t0 + Duration::from_secs(10);
        for _ in 0..3 {
            assert_eq!(limiter.check_at(&actor, later), Decision::Allow);
        }
        assert!(!limiter.check_at(&actor, later).is_allowed());
    }

    #[test]
    fn test_retry_after_is_time_to_next_token() {
        let limiter = limiter(2, 10_000);
        let actor = ActorId::from("u1");
        let t0 = Instant::now();

        limiter.check_at(&actor, t0);
        limiter.check_at(&actor, t0);
        assert_eq!(
            limiter.check_at(&actor, t0),
            Decision::Deny {
                retry_after: Duration::from_secs(5)
            }
        );
        assert_eq!(
            limiter.check_at(&actor, t0 + Duration::from_secs(4)),
            Decision::Deny {
                retry_after: Duration::from_secs(1)
            }
        );
        assert_eq!(
            limiter.check_at(&actor, t0 + Duration::from_secs(5)),
            Decision::Allow
        );
    }

    #[test]
    fn test_actors_are_independent() {
        let limiter = limiter(1, 60_000);
        let t0 = Instant::now();

        assert!(limiter.check_at(&ActorId::from("a"), t0).is_allowed());
        assert!(!limiter.check_at(&ActorId::from("a"), t0).is_allowed());
        assert!(limiter.check_at(&ActorId::from("b"), t0).is_allowed());
    }

    #[test]
    fn test_bucket_does_not_overfill() {
        let limiter = limiter(2, 1_000);
        let actor = ActorId::from("u1");
        let t0 = Instant::now();

        limiter.check_at(&actor, t0);
        let much_later = t0 + Duration::from_secs(3600);
        assert!(limiter.check_at(&actor, much_later).is_allowed());
        assert!(limiter.check_at(&actor, much_later).is_allowed());
        assert!(!limiter.check_at(&actor, much_later).is_allowed());
    }

    #[test]
    fn test_sweep_evicts_idle_actors() {
        let limiter = limiter(5, 1_000);
        let t0 = Instant::now();

        limiter.check_at(&ActorId::from("old"), t0);
        limiter.check_at(&ActorId::from("fresh"), t0 + Duration::from_secs(50));
        assert_eq!(limiter.tracked_actors(), 2);

        let evicted = limiter.sweep_at(Duration::from_secs(30), t0 + Duration::from_secs(60));
        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked_actors(), 1);

        // An evicted actor starts over with a full bucket.
        let t1 = t0 + Duration::from_secs(61);
        for _ in 0..5 {
            assert!(limiter.check_at(&ActorId::from("old"), t1).is_allowed());
        }
    }

    #[test]
    fn test_cooldown_per_command_and_actor() {
        let limiter = limiter(100, 1_000);
        let u1 = ActorId::from("u1");
        let u2 = ActorId::from("u2");
        let cooldown = Duration::from_secs(2);
        let t0 = Instant::now();

        assert!(limiter.check_cooldown_at("help", &u1, cooldown, t0).is_allowed());
        assert_eq!(
            limiter.check_cooldown_at("help", &u1, cooldown, t0 + Duration::from_millis(500)),
            Decision::Deny {
                retry_after: Duration::from_millis(1_500)
            }
        );
        // Other actors and other commands are unaffected.
        assert!(limiter.check_cooldown_at("help", &u2, cooldown, t0).is_allowed());
        assert!(limiter.check_cooldown_at("ping", &u1, cooldown, t0).is_allowed());

        // A denied attempt does not extend the cooldown.
        assert!(
            limiter
                .check_cooldown_at("help", &u1, cooldown, t0 + cooldown)
                .is_allowed()
        );
        assert!(limiter.check_cooldown_at("x", &u1, Duration::ZERO, t0).is_allowed());
        assert_eq!(limiter.tracked_cooldowns(), 3);
    }

    #[test]
    fn test_sweep_drops_expired_cooldowns() {
        let limiter = limiter(100, 1_000);
        let actor = ActorId::from("u1");
        let t0 = Instant::now();

        limiter.check_cooldown_at("ping", &actor, Duration::from_secs(1), t0);
        limiter.check_cooldown_at("help", &actor, Duration::from_secs(10), t0);

        let evicted = limiter.sweep_at(Duration::from_secs(60), t0 + Duration::from_secs(5));
        assert_eq!(evicted, 1);
        assert_eq!(limiter.tracked_cooldowns(), 1);
        assert!(
            !limiter
                .check_cooldown_at("help", &actor, Duration::from_secs(10), t0 + Duration::from_secs(5))
                .is_allowed()
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_checks_allow_exactly_max() {
        let limiter = Arc::new(limiter(5, 60_000));
        let actor = ActorId::from("u1");
        let now = Instant::now();

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let actor = actor.clone();
                tokio::spawn(async move { limiter.check_at(&actor, now) })
            })
            .collect();

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap().is_allowed() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 5);
    }
}
