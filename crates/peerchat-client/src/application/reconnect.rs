//! The single, replaceable reconnect timer.
//!
//! At most one reconnect attempt is ever pending.  Scheduling a new one
//! cancels whatever was pending before, so a burst of errors and disconnects
//! collapses into one attempt after the delay of the *last* trigger.
//!
//! The timer holds only a deadline; it does not sleep by itself.  The event
//! loop waits on [`ReconnectTimer::deadline`] with `tokio::time::sleep_until`
//! and then calls [`ReconnectTimer::take_due`].

use std::time::Duration;

use tokio::time::Instant;

/// What triggered a pending reconnect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectCause {
    /// The signaling server or socket reported an error.  The attempt only
    /// runs if the registration is actually disconnected.
    SignalingError,
    /// The signaling connection was lost.  A failed attempt is reported.
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingReconnect {
    cause: ReconnectCause,
    due: Instant,
}

/// Holds zero or one pending reconnect attempt.
#[derive(Debug, Default)]
pub struct ReconnectTimer {
    pending: Option<PendingReconnect>,
}

impl ReconnectTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an attempt `delay` after `now`, replacing any pending one.
    pub fn schedule(&mut self, cause: ReconnectCause, now: Instant, delay: Duration) {
        self.pending = Some(PendingReconnect {
            cause,
            due: now + delay,
        });
    }

    /// Drops the pending attempt, if any.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Cause of the pending attempt.
    pub fn pending(&self) -> Option<ReconnectCause> {
        self.pending.map(|p| p.cause)
    }

    /// When the pending attempt is due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.due)
    }

    /// Removes and returns the pending attempt if it is due at `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<ReconnectCause> {
        match self.pending {
            Some(p) if p.due <= now => {
                self.pending = None;
                Some(p.cause)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_timer_has_nothing_pending() {
        let timer = ReconnectTimer::new();
        assert_eq!(timer.pending(), None);
        assert_eq!(timer.deadline(), None);
    }

    #[test]
    fn test_schedule_sets_deadline_after_delay() {
        // Arrange
        let now = Instant::now();
        let mut timer = ReconnectTimer::new();

        // Act
        timer.schedule(ReconnectCause::Disconnected, now, Duration::from_secs(2));

        // Assert
        assert_eq!(timer.pending(), Some(ReconnectCause::Disconnected));
        assert_eq!(timer.deadline(), Some(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_second_schedule_replaces_first() {
        let now = Instant::now();
        let mut timer = ReconnectTimer::new();

        timer.schedule(ReconnectCause::SignalingError, now, Duration::from_secs(5));
        timer.schedule(ReconnectCause::Disconnected, now, Duration::from_secs(2));

        assert_eq!(timer.pending(), Some(ReconnectCause::Disconnected));
        assert_eq!(timer.deadline(), Some(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_take_due_before_deadline_keeps_attempt() {
        let now = Instant::now();
        let mut timer = ReconnectTimer::new();
        timer.schedule(ReconnectCause::Disconnected, now, Duration::from_secs(2));

        assert_eq!(timer.take_due(now + Duration::from_secs(1)), None);
        assert!(timer.pending().is_some());
    }

    #[test]
    fn test_take_due_at_deadline_clears_attempt() {
        let now = Instant::now();
        let mut timer = ReconnectTimer::new();
        timer.schedule(ReconnectCause::SignalingError, now, Duration::from_secs(5));

        assert_eq!(
            timer.take_due(now + Duration::from_secs(5)),
            Some(ReconnectCause::SignalingError)
        );
        assert_eq!(timer.pending(), None);
        assert_eq!(timer.take_due(now + Duration::from_secs(60)), None);
    }

    #[test]
    fn test_cancel_clears_attempt() {
        let mut timer = ReconnectTimer::new();
        timer.schedule(ReconnectCause::Disconnected, Instant::now(), Duration::ZERO);

        timer.cancel();

        assert_eq!(timer.deadline(), None);
    }
}
