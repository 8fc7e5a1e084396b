//! Login attempt counter - the failed-login lockout state machine.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use sqlx::FromRow;

/// Lockout thresholds and windows. Loaded from configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LockoutPolicy {
    /// Failures within the window before a soft lock engages.
    pub soft_threshold: u32,
    /// Total failures before the hard lock engages.
    pub hard_threshold: u32,
    /// Sliding window for counting failures, in seconds.
    pub window_seconds: i64,
    /// Duration of a soft lock, in seconds.
    pub lock_seconds: i64,
}

impl LockoutPolicy {
    pub fn window(&self) -> Duration {
        Duration::seconds(self.window_seconds)
    }

    pub fn lock_duration(&self) -> Duration {
        Duration::seconds(self.lock_seconds)
    }
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            soft_threshold: 5,
            hard_threshold: 10,
            window_seconds: 900,
            lock_seconds: 900,
        }
    }
}

/// Observable lockout state for an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Normal,
    /// Failures recorded, attempts still permitted.
    Warning(u32),
    /// Soft lock: attempts rejected until the deadline passes.
    Locked { until: DateTime<Utc> },
    /// Hard lock: attempts rejected until an explicit unlock.
    HardLocked,
}

impl LockState {
    pub fn is_locked(&self) -> bool {
        matches!(self, LockState::Locked { .. } | LockState::HardLocked)
    }
}

/// Failure counter for one identifier (lowercased email).
///
/// Counters are independent per identifier and reset on any successful
/// login for that identifier.
#[derive(Debug, Clone, FromRow)]
pub struct LoginAttempt {
    pub identifier: String,
    pub fail_count: i32,
    pub window_start_utc: DateTime<Utc>,
    pub locked_until_utc: Option<DateTime<Utc>>,
    pub hard_locked: bool,
    pub updated_utc: DateTime<Utc>,
}

impl LoginAttempt {
    pub fn new(identifier: String, now: DateTime<Utc>) -> Self {
        Self {
            identifier,
            fail_count: 0,
            window_start_utc: now,
            locked_until_utc: None,
            hard_locked: false,
            updated_utc: now,
        }
    }

    /// Current state under `policy` at `now`.
    pub fn state(&self, policy: &LockoutPolicy, now: DateTime<Utc>) -> LockState {
        if self.hard_locked {
            return LockState::HardLocked;
        }
        if let Some(until) = self.locked_until_utc {
            if until > now {
                return LockState::Locked { until };
            }
        }
        if self.fail_count <= 0 {
            return LockState::Normal;
        }
        // Below the soft threshold the window slides: stale failures no
        // longer count. At or above it, only success or unlock clears.
        if (self.fail_count as u32) < policy.soft_threshold
            && now - self.window_start_utc > policy.window()
        {
            return LockState::Normal;
        }
        LockState::Warning(self.fail_count as u32)
    }

    /// Record one failed attempt and advance the state machine.
    ///
    /// Must run under the store's atomicity guarantee (row lock or map
    /// entry lock): two concurrent failures must both observe each other.
    pub fn register_failure(&mut self, policy: &LockoutPolicy, now: DateTime<Utc>) -> LockState {
        if self.hard_locked {
            self.fail_count += 1;
            self.updated_utc = now;
            return LockState::HardLocked;
        }

        let soft_lock_active = self.locked_until_utc.map_or(false, |t| t > now);
        let window_expired = now - self.window_start_utc > policy.window();

        // The window only slides while the counter is below the soft
        // threshold; once a lock has tripped, escalation persists until
        // success or unlock.
        if window_expired && !soft_lock_active && (self.fail_count as u32) < policy.soft_threshold
        {
            self.fail_count = 0;
            self.window_start_utc = now;
            self.locked_until_utc = None;
        }

        self.fail_count += 1;
        self.updated_utc = now;

        if self.fail_count as u32 >= policy.hard_threshold {
            self.hard_locked = true;
            self.locked_until_utc = None;
            LockState::HardLocked
        } else if self.fail_count as u32 >= policy.soft_threshold {
            let until = now + policy.lock_duration();
            self.locked_until_utc = Some(until);
            LockState::Locked { until }
        } else {
            LockState::Warning(self.fail_count as u32)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> LockoutPolicy {
        LockoutPolicy::default()
    }

    #[test]
    fn test_failures_below_threshold_warn() {
        let now = Utc::now();
        let mut attempt = LoginAttempt::new("a@example.com".into(), now);

        for n in 1..=4 {
            let state = attempt.register_failure(&policy(), now);
            assert_eq!(state, LockState::Warning(n));
        }
        assert!(!attempt.state(&policy(), now).is_locked());
    }

    #[test]
    fn test_fifth_failure_soft_locks() {
        let now = Utc::now();
        let mut attempt = LoginAttempt::new("a@example.com".into(), now);

        for _ in 0..4 {
            attempt.register_failure(&policy(), now);
        }
        let state = attempt.register_failure(&policy(), now);
        assert!(matches!(state, LockState::Locked { .. }));
        assert!(attempt.state(&policy(), now).is_locked());
    }

    #[test]
    fn test_soft_lock_expires() {
        let now = Utc::now();
        let mut attempt = LoginAttempt::new("a@example.com".into(), now);
        for _ in 0..5 {
            attempt.register_failure(&policy(), now);
        }

        let later = now + Duration::seconds(policy().lock_seconds + 1);
        assert!(!attempt.state(&policy(), later).is_locked());
    }

    #[test]
    fn test_tenth_failure_hard_locks() {
        let now = Utc::now();
        let mut attempt = LoginAttempt::new("a@example.com".into(), now);
        for _ in 0..9 {
            attempt.register_failure(&policy(), now);
        }

        let state = attempt.register_failure(&policy(), now);
        assert_eq!(state, LockState::HardLocked);
    }

    #[test]
    fn test_hard_lock_does_not_expire() {
        let now = Utc::now();
        let mut attempt = LoginAttempt::new("a@example.com".into(), now);
        for _ in 0..10 {
            attempt.register_failure(&policy(), now);
        }

        let much_later = now + Duration::days(30);
        assert_eq!(attempt.state(&policy(), much_later), LockState::HardLocked);
    }

    #[test]
    fn test_window_slides_below_threshold() {
        let now = Utc::now();
        let mut attempt = LoginAttempt::new("a@example.com".into(), now);
        for _ in 0..4 {
            attempt.register_failure(&policy(), now);
        }

        // Outside the window the stale failures are discarded; the next
        // failure counts as the first of a new window.
        let later = now + Duration::seconds(policy().window_seconds + 1);
        assert_eq!(attempt.state(&policy(), later), LockState::Normal);
        let state = attempt.register_failure(&policy(), later);
        assert_eq!(state, LockState::Warning(1));
    }

    #[test]
    fn test_escalation_persists_after_soft_lock() {
        let now = Utc::now();
        let mut attempt = LoginAttempt::new("a@example.com".into(), now);
        for _ in 0..5 {
            attempt.register_failure(&policy(), now);
        }

        // After the soft lock passes, the counter keeps climbing toward the
        // hard threshold instead of sliding back to zero.
        let mut t = now + Duration::seconds(policy().lock_seconds + 1);
        for _ in 0..5 {
            attempt.register_failure(&policy(), t);
            t += Duration::seconds(policy().lock_seconds + 1);
        }
        assert_eq!(attempt.state(&policy(), t), LockState::HardLocked);
    }
}
