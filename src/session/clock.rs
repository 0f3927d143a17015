use std::time::{Duration, Instant};

/// Default display refresh cadence.
pub const DEFAULT_REFRESH_HZ: u32 = 60;

const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// What became due since the previous check.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockDue {
    /// A refresh frame elapsed; poll the pipeline once.
    pub poll: bool,
    /// Whole countdown seconds that elapsed.
    pub ticks: u32,
}

/// Drives the two cadences of a running session from one time source.
///
/// Refresh frames and countdown seconds keep independent deadlines. Missed
/// refresh frames collapse into a single poll; missed seconds are all
/// reported so the countdown never drifts.
#[derive(Clone, Debug)]
pub struct SessionClock {
    refresh_interval: Duration,
    next_poll: Option<Instant>,
    next_tick: Option<Instant>,
}

impl SessionClock {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            refresh_interval: refresh_interval.max(Duration::from_millis(1)),
            next_poll: None,
            next_tick: None,
        }
    }

    pub fn with_refresh_hz(hz: u32) -> Self {
        Self::new(Duration::from_secs(1) / hz.max(1))
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    /// Start both cadences at `now`: first poll immediately, first countdown
    /// tick one second later.
    pub fn arm(&mut self, now: Instant) {
        self.next_poll = Some(now);
        self.next_tick = Some(now + COUNTDOWN_PERIOD);
    }

    pub fn disarm(&mut self) {
        self.next_poll = None;
        self.next_tick = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_poll.is_some()
    }

    pub fn due(&mut self, now: Instant) -> ClockDue {
        let mut due = ClockDue::default();
        if let Some(next_poll) = self.next_poll.as_mut()
            && now >= *next_poll
        {
            due.poll = true;
            while *next_poll <= now {
                *next_poll += self.refresh_interval;
            }
        }
        if let Some(next_tick) = self.next_tick.as_mut() {
            while *next_tick <= now {
                due.ticks += 1;
                *next_tick += COUNTDOWN_PERIOD;
            }
        }
        due
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::with_refresh_hz(DEFAULT_REFRESH_HZ)
    }
}
