/// Playback transport - logical song time and the column it falls in
use std::time::{Duration, Instant};

/// Source of monotonically increasing timestamps (a display refresh clock,
/// a timer, or a fake clock in tests).
pub trait Clock {
    fn now(&self) -> Duration;
}

/// Wall clock measured from its own creation
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Saved position, used to put the transport back after an export
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    pub time: f64,
    pub column: usize,
    pub running: bool,
}

#[derive(Debug, Clone)]
pub struct Transport {
    time: f64,
    column: usize,
    running: bool,
    columns: usize,
    tempo: f64,
    last_tick: Option<Duration>,
}

impl Transport {
    /// `tempo` is in columns per second.
    pub fn new(columns: usize, tempo: f64) -> Self {
        Self {
            time: 0.0,
            column: 0,
            running: false,
            columns,
            tempo,
            last_tick: None,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Song length in seconds
    pub fn duration(&self) -> f64 {
        self.columns as f64 / self.tempo
    }

    /// Resume from the current time.
    pub fn start(&mut self) {
        self.running = true;
        self.last_tick = None;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn reset(&mut self) {
        self.running = false;
        self.time = 0.0;
        self.column = 0;
    }

    /// Move the song forward by `delta` seconds and return the current
    /// column. Reaching the end of the song stops and rewinds; playback
    /// does not loop.
    pub fn advance(&mut self, delta: f64) -> usize {
        if !self.running {
            return self.column;
        }

        self.time += delta;
        if self.time >= self.duration() {
            self.reset();
            return self.column;
        }

        self.column = self.column_at(self.time);
        self.column
    }

    /// Clock-driven advance. The first tick after `start` only records the
    /// baseline.
    pub fn tick(&mut self, now: Duration) -> usize {
        if !self.running {
            return self.column;
        }

        let Some(previous) = self.last_tick.replace(now) else {
            return self.column;
        };

        self.advance(now.saturating_sub(previous).as_secs_f64())
    }

    /// Jump to `time` without the end-of-song check.
    pub fn seek(&mut self, time: f64) {
        self.time = time.max(0.0);
        self.column = self.column_at(self.time);
    }

    fn column_at(&self, time: f64) -> usize {
        (time * self.tempo).floor() as usize
    }

    pub fn state(&self) -> TransportState {
        TransportState {
            time: self.time,
            column: self.column,
            running: self.running,
        }
    }

    pub fn restore(&mut self, state: TransportState) {
        self.time = state.time;
        self.column = state.column;
        self.running = state.running;
        self.last_tick = None;
    }
}
