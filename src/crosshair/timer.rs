use std::time::{Duration, Instant};

/// Fixed-cadence deadline tracker. Deadlines missed while the thread was busy
/// are dropped rather than replayed.
#[derive(Debug, Clone)]
pub struct FrameTimer {
    interval: Duration,
    next_deadline: Option<Instant>,
}

impl FrameTimer {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_deadline: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.next_deadline.is_none() {
            self.next_deadline = Some(now + self.interval);
        }
    }

    pub fn stop(&mut self) {
        self.next_deadline = None;
    }

    pub fn is_running(&self) -> bool {
        self.next_deadline.is_some()
    }

    /// `true` when a deadline has passed. The next deadline is scheduled one
    /// interval after the missed one, or after `now` if several were missed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(deadline) = self.next_deadline else {
            return false;
        };
        if now < deadline {
            return false;
        }
        let next = deadline + self.interval;
        self.next_deadline = Some(if next <= now { now + self.interval } else { next });
        true
    }

    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.next_deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }
}
