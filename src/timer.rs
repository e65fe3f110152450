use std::time;

/// Clock of the detection loop, counting from its creation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timer {
    pub(crate) start: time::Instant,
}

impl Timer {
    /// Create new timer based on current system time.
    pub fn new() -> Self {
        Self { start: time::Instant::now() }
    }

    /// Get period of time since timer creation in whole milliseconds.
    pub fn elapsed_ms(&self) -> i64 {
        let dt = self.start.elapsed();
        dt.as_secs() as i64 * 1000 + (dt.subsec_nanos() / 1_000_000) as i64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Timer::new()
    }
}
