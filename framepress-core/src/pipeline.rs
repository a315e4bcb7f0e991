//! Main capture-convert-encode-output pipeline
//!
//! Orchestrates the flow from the V4L2 capture device to the V4L2
//! output device. Everything runs on one thread: each `process()` call
//! waits for a frame, converts it to I420, encodes it, and writes the
//! concatenated compressed units to the sink in a single write.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::capture::{FrameSource, V4l2Source};
use crate::config::PipelineConfig;
use crate::convert::{ColorConverter, SwsConverter, init_ffmpeg};
use crate::encode::{Encoder, open_encoder};
use crate::error::{Result, ResultExt};
use crate::metrics::{PipelineMetrics, StatsSnapshot};
use crate::output::{FrameSink, V4l2Sink};
use crate::types::{CanonicalFrame, PipelineState, RawFrame, Readiness, StopToken};

/// How long one iteration waits for the capture device before giving up
/// and re-checking the stop token
const READINESS_TIMEOUT: Duration = Duration::from_secs(1);

/// Single-threaded transcoding pipeline
pub struct PipelineRunner {
    config: PipelineConfig,
    state: PipelineState,
    stop: StopToken,
    source: Box<dyn FrameSource>,
    sink: Box<dyn FrameSink>,
    converter: Box<dyn ColorConverter>,
    encoder: Box<dyn Encoder>,
    /// Reusable raw capture buffer, sized once from the source
    raw_buf: Vec<u8>,
    /// Reusable canonical I420 frame
    canonical: CanonicalFrame,
    /// Reusable scratch buffer for the concatenated payload
    unit_buf: Vec<u8>,
    metrics: PipelineMetrics,
}

/// Final pipeline statistics returned by `close()`
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub state: PipelineState,
    pub snapshot: StatsSnapshot,
}

impl std::fmt::Display for PipelineStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Pipeline {}: {}", self.state, self.snapshot)
    }
}

impl PipelineRunner {
    /// Open all pipeline stages in order: source, sink, converter,
    /// encoder. The source's negotiated format drives everything
    /// downstream. On failure, already-opened stages are released in
    /// reverse order as the partial state unwinds.
    pub fn open(config: PipelineConfig, stop: StopToken) -> Result<Self> {
        config.validate()?;
        init_ffmpeg()?;

        info!(
            "Opening pipeline: {} -> {} ({}, {} fps, {})",
            config.source, config.sink, config.codec, config.fps, config.rate_control
        );

        let source = V4l2Source::open(&config.source, config.source_io)
            .context("failed to open capture device")?;
        let (width, height) = source.dimensions();
        let src_fourcc = source.pixel_format();
        let max_frame_size = source.max_frame_size();

        let sink = V4l2Sink::open(
            &config.sink,
            config.codec.output_fourcc(),
            width,
            height,
            config.sink_io,
        )
        .context("failed to open output device")?;

        let converter =
            SwsConverter::new(src_fourcc, width, height).context("failed to create converter")?;

        let encoder = open_encoder(&config, width, height).context("failed to open encoder")?;

        Ok(Self {
            config,
            state: PipelineState::Running,
            stop,
            source: Box::new(source),
            sink: Box::new(sink),
            converter: Box::new(converter),
            encoder,
            raw_buf: vec![0; max_frame_size],
            canonical: CanonicalFrame::new(width, height),
            unit_buf: Vec::new(),
            metrics: PipelineMetrics::new(),
        })
    }

    /// Assemble a runner from already-constructed stages
    pub fn from_parts(
        config: PipelineConfig,
        stop: StopToken,
        source: Box<dyn FrameSource>,
        sink: Box<dyn FrameSink>,
        converter: Box<dyn ColorConverter>,
        encoder: Box<dyn Encoder>,
    ) -> Self {
        let (width, height) = source.dimensions();
        let max_frame_size = source.max_frame_size();
        Self {
            config,
            state: PipelineState::Running,
            stop,
            source,
            sink,
            converter,
            encoder,
            raw_buf: vec![0; max_frame_size],
            canonical: CanonicalFrame::new(width, height),
            unit_buf: Vec::new(),
            metrics: PipelineMetrics::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Run one pipeline iteration
    ///
    /// Call in a loop while it returns `Ok(true)`. A timeout on the
    /// capture device is not an error: the iteration is skipped and the
    /// loop keeps going. Device-level failures flip the state to
    /// Stopping and return `Ok(false)`.
    pub fn process(&mut self) -> Result<bool> {
        if self.state != PipelineState::Running {
            return Ok(false);
        }
        if self.stop.is_stopped() {
            info!("Stop requested");
            self.state = PipelineState::Stopping;
            return Ok(false);
        }

        let read_start = Instant::now();
        match self.source.poll_readable(READINESS_TIMEOUT) {
            Ok(Readiness::TimedOut) => {
                debug!("No frame within {:?}", READINESS_TIMEOUT);
                return Ok(true);
            }
            Ok(Readiness::Ready) => {}
            Err(e) => {
                warn!("Capture device failed: {}", e);
                self.state = PipelineState::Stopping;
                return Ok(false);
            }
        }

        let bytes_read = match self.source.read_frame(&mut self.raw_buf) {
            Ok(n) => n,
            Err(e) => {
                warn!("Frame read failed: {}", e);
                self.state = PipelineState::Stopping;
                return Ok(false);
            }
        };
        let read_time = read_start.elapsed();
        self.metrics.record_read(read_time);
        self.metrics.record_frame();

        let (width, height) = self.source.dimensions();
        let raw = RawFrame {
            data: &self.raw_buf[..bytes_read],
            fourcc: self.source.pixel_format(),
            width,
            height,
        };

        let convert_start = Instant::now();
        if let Err(e) = self.converter.convert(&raw, &mut self.canonical) {
            warn!("Conversion failed, skipping frame: {}", e);
            return Ok(true);
        }
        let convert_time = convert_start.elapsed();
        self.metrics.record_convert(convert_time);

        let encode_start = Instant::now();
        let units = match self.encoder.encode(&self.canonical) {
            Ok(units) => units,
            Err(e) => {
                warn!("Encode failed, skipping frame: {}", e);
                self.metrics.record_encode_failure();
                return Ok(true);
            }
        };
        let encode_time = encode_start.elapsed();
        self.metrics.record_encode(encode_time);
        self.metrics.record_units(units.len() as u64);

        // Only real writes feed the write-stage average; iterations that
        // produce no unit would drag it toward zero.
        let mut write_time = Duration::ZERO;
        if !units.is_empty() {
            let write_start = Instant::now();
            self.unit_buf.clear();
            for unit in &units {
                self.unit_buf.extend_from_slice(&unit.data);
            }
            self.write_payload();
            write_time = write_start.elapsed();
            self.metrics.record_write(write_time);
        }

        debug!(
            "Frame {}: read {} bytes, {} units | read={:?} convert={:?} encode={:?} write={:?}",
            self.metrics.frames(),
            bytes_read,
            units.len(),
            read_time,
            convert_time,
            encode_time,
            write_time
        );

        Ok(true)
    }

    /// Write the concatenated payload in `unit_buf` to the sink. Write
    /// failures and short writes are logged, never retried.
    fn write_payload(&mut self) {
        match self.sink.write_frame(&self.unit_buf) {
            Ok(n) => {
                self.metrics.record_bytes_written(n as u64);
                if n < self.unit_buf.len() {
                    warn!("Short write: {} of {} bytes", n, self.unit_buf.len());
                    self.metrics.record_short_write();
                }
            }
            Err(e) => {
                warn!("Write failed: {}", e);
                self.metrics.record_failed_write();
            }
        }
    }

    /// Run the pipeline to completion
    pub fn run(&mut self) -> Result<()> {
        info!("Pipeline running");
        while self.process()? {}
        Ok(())
    }

    /// Tear the pipeline down in reverse acquisition order, draining
    /// any units still buffered inside the encoder first
    pub fn close(mut self) -> PipelineStats {
        self.state = PipelineState::Stopping;

        match self.encoder.finish() {
            Ok(units) if !units.is_empty() => {
                debug!("Draining {} trailing units", units.len());
                self.unit_buf.clear();
                for unit in &units {
                    self.unit_buf.extend_from_slice(&unit.data);
                }
                self.metrics.record_units(units.len() as u64);
                self.write_payload();
            }
            Ok(_) => {}
            Err(e) => warn!("Encoder drain failed: {}", e),
        }

        let Self {
            encoder,
            sink,
            source,
            metrics,
            config,
            ..
        } = self;

        drop(encoder);
        debug!("Encoder released");
        drop(sink);
        debug!("Output device released");
        drop(source);
        debug!("Capture device released");

        let stats = PipelineStats {
            state: PipelineState::Terminated,
            snapshot: metrics.snapshot(),
        };

        info!(
            "Pipeline stopped ({} -> {}): {}",
            config.source, config.sink, stats.snapshot
        );
        stats
    }
}
