//! Deadline progress tracking.
//!
//! Progress is the elapsed fraction of the negotiation deadline: 0 at the
//! start of a session, 1 at the deadline.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Source of negotiation progress.
pub trait DeadlineTracker {
    /// Current progress in `[0, 1]`, non-decreasing within a session.
    fn progress(&self) -> f64;

    /// Returns true once the deadline has been reached.
    fn is_past_deadline(&self) -> bool {
        self.progress() >= 1.0
    }
}

/// Progress measured in protocol rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundProgress {
    current: u32,
    total: u32,
}

impl RoundProgress {
    /// Starts a round counter with the given deadline in rounds.
    ///
    /// A zero-round deadline is already expired.
    #[must_use]
    pub const fn new(total: u32) -> Self {
        Self { current: 0, total }
    }

    /// Moves to the next round, saturating at the deadline.
    #[must_use]
    pub const fn advance(self) -> Self {
        let current = if self.current < self.total {
            self.current + 1
        } else {
            self.total
        };
        Self {
            current,
            total: self.total,
        }
    }

    /// Rounds completed so far.
    #[must_use]
    pub const fn current(&self) -> u32 {
        self.current
    }

    /// Deadline in rounds.
    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }
}

impl DeadlineTracker for RoundProgress {
    fn progress(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        f64::from(self.current) / f64::from(self.total)
    }
}

/// Progress measured against a wall-clock deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeProgress {
    started_at: DateTime<Utc>,
    duration_ms: i64,
}

impl TimeProgress {
    /// Starts a clock now with the given session length.
    #[must_use]
    pub fn start(duration: Duration) -> Self {
        Self::starting_at(Utc::now(), duration)
    }

    /// Starts a clock at a specific time (for testing).
    #[must_use]
    pub fn starting_at(started_at: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            started_at,
            duration_ms: duration.num_milliseconds(),
        }
    }

    /// Deadline of the session, saturating at the representable range.
    #[must_use]
    pub fn deadline(&self) -> DateTime<Utc> {
        Duration::try_milliseconds(self.duration_ms)
            .and_then(|duration| self.started_at.checked_add_signed(duration))
            .unwrap_or(if self.duration_ms < 0 {
                DateTime::<Utc>::MIN_UTC
            } else {
                DateTime::<Utc>::MAX_UTC
            })
    }

    /// Progress at a specific time, clamped to `[0, 1]`.
    #[must_use]
    pub fn progress_at(&self, now: DateTime<Utc>) -> f64 {
        if self.duration_ms <= 0 {
            return 1.0;
        }
        let elapsed = (now - self.started_at).num_milliseconds();
        (elapsed as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }
}

impl DeadlineTracker for TimeProgress {
    fn progress(&self) -> f64 {
        self.progress_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_progress_advances_to_deadline() {
        let mut rounds = RoundProgress::new(4);
        assert!((rounds.progress() - 0.0).abs() < f64::EPSILON);
        rounds = rounds.advance();
        assert!((rounds.progress() - 0.25).abs() < f64::EPSILON);
        for _ in 0..10 {
            rounds = rounds.advance();
        }
        assert_eq!(rounds.current(), 4);
        assert!((rounds.progress() - 1.0).abs() < f64::EPSILON);
        assert!(rounds.is_past_deadline());
    }

    #[test]
    fn zero_round_deadline_is_expired() {
        assert!(RoundProgress::new(0).is_past_deadline());
    }

    #[test]
    fn time_progress_is_linear_and_clamped() {
        let start = Utc::now();
        let clock = TimeProgress::starting_at(start, Duration::seconds(10));

        assert!((clock.progress_at(start) - 0.0).abs() < f64::EPSILON);
        assert!((clock.progress_at(start + Duration::seconds(5)) - 0.5).abs() < 1e-9);
        assert!((clock.progress_at(start + Duration::seconds(30)) - 1.0).abs() < f64::EPSILON);
        assert!((clock.progress_at(start - Duration::seconds(1)) - 0.0).abs() < f64::EPSILON);
        assert_eq!(clock.deadline(), start + Duration::seconds(10));
    }

    #[test]
    fn deadline_saturates_for_huge_durations() {
        let far: TimeProgress = serde_json::from_str(
            r#"{"started_at": "2026-01-01T00:00:00Z", "duration_ms": 9223372036854775807}"#,
        )
        .unwrap();
        assert_eq!(far.deadline(), DateTime::<Utc>::MAX_UTC);

        let past: TimeProgress = serde_json::from_str(
            r#"{"started_at": "2026-01-01T00:00:00Z", "duration_ms": -9223372036854775807}"#,
        )
        .unwrap();
        assert_eq!(past.deadline(), DateTime::<Utc>::MIN_UTC);
        assert!((past.progress_at(Utc::now()) - 1.0).abs() < f64::EPSILON);
    }
}
