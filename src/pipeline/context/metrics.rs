use std::time::{Duration, Instant};

/// Timings collected during one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleMetrics {
    dispatch_duration: Option<Duration>,
    aggregate_duration: Option<Duration>,
    render_duration: Option<Duration>,
    total_duration: Option<Duration>,
}

impl CycleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatch_duration(&mut self, duration: Duration) {
        self.dispatch_duration = Some(duration);
    }

    pub fn record_aggregate_duration(&mut self, duration: Duration) {
        self.aggregate_duration = Some(duration);
    }

    pub fn record_render_duration(&mut self, duration: Duration) {
        self.render_duration = Some(duration);
    }

    pub fn finalize(&mut self, start_time: Instant) {
        self.total_duration = Some(start_time.elapsed());
    }

    pub fn dispatch_duration(&self) -> Option<Duration> {
        self.dispatch_duration
    }

    pub fn aggregate_duration(&self) -> Option<Duration> {
        self.aggregate_duration
    }

    pub fn render_duration(&self) -> Option<Duration> {
        self.render_duration
    }

    pub fn total_us(&self) -> u64 {
        self.total_duration.map_or(0, |d| d.as_micros() as u64)
    }
}
