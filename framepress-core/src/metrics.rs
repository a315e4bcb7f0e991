//! Per-stage timing and throughput metrics
//!
//! The pipeline is single-threaded, so the collector is plain mutable
//! state owned by the runner. Rolling averages keep the last few seconds
//! of per-stage timings.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Maximum number of samples to keep for rolling averages
const MAX_SAMPLES: usize = 120;

/// Rolling average calculator for timing data
#[derive(Debug)]
struct RollingAverage {
    samples: VecDeque<Duration>,
    max_samples: usize,
}

impl RollingAverage {
    fn new(max_samples: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(max_samples),
            max_samples,
        }
    }

    fn add(&mut self, duration: Duration) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(duration);
    }

    fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.samples.iter().sum();
        total / self.samples.len() as u32
    }

    fn average_ms(&self) -> f64 {
        self.average().as_secs_f64() * 1000.0
    }
}

/// Metrics snapshot taken at the end of a run or on demand
#[derive(Debug, Clone)]
pub struct StatsSnapshot {
    /// Average time waiting on and reading the capture device
    pub read_ms: f64,
    /// Average pixel conversion time
    pub convert_ms: f64,
    /// Average encode time
    pub encode_ms: f64,
    /// Average output write time
    pub write_ms: f64,
    /// Effective throughput over the whole session
    pub fps: f64,
    pub frames: u64,
    pub units: u64,
    pub bytes_written: u64,
    pub short_writes: u64,
    pub failed_writes: u64,
    pub encode_failures: u64,
    pub elapsed: Duration,
}

impl std::fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} frames in {:.1}s ({:.1} fps), {} units, {} bytes written | \
             read={:.2}ms convert={:.2}ms encode={:.2}ms write={:.2}ms | \
             short writes: {}, failed writes: {}, encode failures: {}",
            self.frames,
            self.elapsed.as_secs_f64(),
            self.fps,
            self.units,
            self.bytes_written,
            self.read_ms,
            self.convert_ms,
            self.encode_ms,
            self.write_ms,
            self.short_writes,
            self.failed_writes,
            self.encode_failures
        )
    }
}

/// Per-stage metrics collector owned by the pipeline runner
#[derive(Debug)]
pub struct PipelineMetrics {
    read_time: RollingAverage,
    convert_time: RollingAverage,
    encode_time: RollingAverage,
    write_time: RollingAverage,
    frames: u64,
    units: u64,
    bytes_written: u64,
    short_writes: u64,
    failed_writes: u64,
    encode_failures: u64,
    started: Instant,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            read_time: RollingAverage::new(MAX_SAMPLES),
            convert_time: RollingAverage::new(MAX_SAMPLES),
            encode_time: RollingAverage::new(MAX_SAMPLES),
            write_time: RollingAverage::new(MAX_SAMPLES),
            frames: 0,
            units: 0,
            bytes_written: 0,
            short_writes: 0,
            failed_writes: 0,
            encode_failures: 0,
            started: Instant::now(),
        }
    }

    pub fn record_read(&mut self, duration: Duration) {
        self.read_time.add(duration);
    }

    pub fn record_convert(&mut self, duration: Duration) {
        self.convert_time.add(duration);
    }

    pub fn record_encode(&mut self, duration: Duration) {
        self.encode_time.add(duration);
    }

    pub fn record_write(&mut self, duration: Duration) {
        self.write_time.add(duration);
    }

    pub fn record_frame(&mut self) {
        self.frames += 1;
    }

    pub fn record_units(&mut self, count: u64) {
        self.units += count;
    }

    pub fn record_bytes_written(&mut self, bytes: u64) {
        self.bytes_written += bytes;
    }

    pub fn record_short_write(&mut self) {
        self.short_writes += 1;
    }

    pub fn record_failed_write(&mut self) {
        self.failed_writes += 1;
    }

    pub fn record_encode_failure(&mut self) {
        self.encode_failures += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let elapsed = self.started.elapsed();
        let fps = if elapsed.as_secs_f64() > 0.0 {
            self.frames as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        StatsSnapshot {
            read_ms: self.read_time.average_ms(),
            convert_ms: self.convert_time.average_ms(),
            encode_ms: self.encode_time.average_ms(),
            write_ms: self.write_time.average_ms(),
            fps,
            frames: self.frames,
            units: self.units,
            bytes_written: self.bytes_written,
            short_writes: self.short_writes,
            failed_writes: self.failed_writes,
            encode_failures: self.encode_failures,
            elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rolling_average() {
        let mut avg = RollingAverage::new(3);
        avg.add(Duration::from_millis(10));
        avg.add(Duration::from_millis(20));
        avg.add(Duration::from_millis(30));

        // Average of 10, 20, 30 = 20
        assert!((avg.average_ms() - 20.0).abs() < 0.1);

        // Add one more, should drop oldest
        avg.add(Duration::from_millis(40));
        // Average of 20, 30, 40 = 30
        assert!((avg.average_ms() - 30.0).abs() < 0.1);
    }

    #[test]
    fn test_pipeline_metrics() {
        let mut metrics = PipelineMetrics::new();

        metrics.record_read(Duration::from_millis(5));
        metrics.record_convert(Duration::from_millis(3));
        metrics.record_encode(Duration::from_millis(10));
        metrics.record_write(Duration::from_millis(2));
        metrics.record_frame();
        metrics.record_units(2);
        metrics.record_bytes_written(4096);

        let snapshot = metrics.snapshot();
        assert!(snapshot.read_ms > 0.0);
        assert!(snapshot.encode_ms > 0.0);
        assert_eq!(snapshot.frames, 1);
        assert_eq!(snapshot.units, 2);
        assert_eq!(snapshot.bytes_written, 4096);
        assert_eq!(snapshot.failed_writes, 0);
    }

    #[test]
    fn test_failure_counters() {
        let mut metrics = PipelineMetrics::new();

        metrics.record_short_write();
        metrics.record_failed_write();
        metrics.record_failed_write();
        metrics.record_encode_failure();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.short_writes, 1);
        assert_eq!(snapshot.failed_writes, 2);
        assert_eq!(snapshot.encode_failures, 1);
    }

    #[test]
    fn test_snapshot_display() {
        let mut metrics = PipelineMetrics::new();
        metrics.record_frame();
        metrics.record_bytes_written(1000);

        let line = metrics.snapshot().to_string();
        assert!(line.contains("1 frames"));
        assert!(line.contains("1000 bytes"));
    }
}
