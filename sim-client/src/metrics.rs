//! Command latency metrics
//!
//! Every mutating command is timed in two parts: the Engine round trip and
//! the persistence write that follows it. Results go to the tracing log.

use std::time::{Duration, Instant};

/// Latency breakdown of one mutating command
#[derive(Debug, Clone, Default)]
pub struct CommandMetrics {
    pub command: &'static str,

    /// Engine call including the state export (milliseconds)
    pub engine_latency_ms: u64,

    /// Store write (milliseconds)
    pub persist_latency_ms: u64,

    /// Size of the persisted blob in bytes
    pub blob_bytes: usize,
}

impl CommandMetrics {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            ..Self::default()
        }
    }

    pub fn set_engine_latency(&mut self, duration: Duration) {
        self.engine_latency_ms = duration.as_millis() as u64;
    }

    pub fn set_persist_latency(&mut self, duration: Duration) {
        self.persist_latency_ms = duration.as_millis() as u64;
    }

    pub fn total_latency_ms(&self) -> u64 {
        self.engine_latency_ms + self.persist_latency_ms
    }

    /// Report metrics to tracing logs
    pub fn report(&self) {
        tracing::debug!(
            "Command metrics: command={}, engine={}ms, persist={}ms, total={}ms, blob={}B",
            self.command,
            self.engine_latency_ms,
            self.persist_latency_ms,
            self.total_latency_ms(),
            self.blob_bytes,
        );
    }
}

/// Timer helper for measuring operation latency
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Stop the timer and return elapsed duration
    pub fn stop(self) -> Duration {
        self.start.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_setters() {
        let mut metrics = CommandMetrics::new("advance_tick");
        metrics.set_engine_latency(Duration::from_millis(12));
        metrics.set_persist_latency(Duration::from_millis(3));

        assert_eq!(metrics.command, "advance_tick");
        assert_eq!(metrics.total_latency_ms(), 15);
    }

    #[test]
    fn test_timer() {
        let timer = MetricsTimer::start();
        std::thread::sleep(Duration::from_millis(10));
        assert!(timer.stop().as_millis() >= 10);
    }
}
