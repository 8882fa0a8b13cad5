use std::time::Duration;

/// Result of advancing the schedule by one polling interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Wait,
    Renew,
}

/// Counts polling intervals until the renewal interval has elapsed.
///
/// Time is measured in main-loop ticks, not wall-clock time.
#[derive(Debug, Clone)]
pub struct RenewalSchedule {
    poll_interval: Duration,
    renew_interval: Duration,
    ticks: u32,
}

impl RenewalSchedule {
    pub fn new(poll_interval: Duration, renew_interval: Duration) -> Self {
        Self {
            poll_interval,
            renew_interval,
            ticks: 0,
        }
    }

    /// Advance by one polling interval. Returns `Renew` once the accumulated
    /// time reaches the renewal interval and starts counting from zero again.
    pub fn tick(&mut self) -> Tick {
        self.ticks = self.ticks.saturating_add(1);
        if self.poll_interval.saturating_mul(self.ticks) >= self.renew_interval {
            self.ticks = 0;
            Tick::Renew
        } else {
            Tick::Wait
        }
    }

    /// Polling intervals counted since the last renewal
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn renew_interval(&self) -> Duration {
        self.renew_interval
    }
}
