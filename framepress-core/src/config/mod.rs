//! Pipeline configuration

mod file;

pub use file::{ConfigFile, sample_config};

use std::fmt;
use std::str::FromStr;

use crate::error::{FramepressError, Result};
use crate::types::FourCc;

/// Output codec selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Codec {
    #[default]
    H264,
    Vp8,
    Vp9,
}

impl Codec {
    /// Map a V4L2 fourcc onto a codec, for `--format` style selection
    pub fn from_fourcc(fourcc: FourCc) -> Option<Self> {
        match &fourcc.0 {
            b"H264" => Some(Self::H264),
            b"VP80" => Some(Self::Vp8),
            b"VP90" => Some(Self::Vp9),
            _ => None,
        }
    }

    /// Fourcc announced on the output device
    pub fn output_fourcc(&self) -> FourCc {
        match self {
            Self::H264 => FourCc(*b"H264"),
            Self::Vp8 => FourCc(*b"VP80"),
            Self::Vp9 => FourCc(*b"VP90"),
        }
    }

    /// Name of the libavcodec encoder implementing this codec
    pub fn ffmpeg_encoder(&self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::Vp8 => "libvpx",
            Self::Vp9 => "libvpx-vp9",
        }
    }

    pub fn is_vpx(&self) -> bool {
        matches!(self, Self::Vp8 | Self::Vp9)
    }
}

impl FromStr for Codec {
    type Err = FramepressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "h264" | "x264" | "avc" => Ok(Self::H264),
            "vp8" => Ok(Self::Vp8),
            "vp9" => Ok(Self::Vp9),
            _ => Err(FramepressError::config(format!("unknown codec: {s}"))),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::H264 => "h264",
            Self::Vp8 => "vp8",
            Self::Vp9 => "vp9",
        };
        write!(f, "{s}")
    }
}

/// V4L2 I/O strategy for a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IoStrategy {
    #[default]
    Mmap,
    ReadWrite,
}

impl FromStr for IoStrategy {
    type Err = FramepressError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "mmap" => Ok(Self::Mmap),
            "rw" | "readwrite" => Ok(Self::ReadWrite),
            _ => Err(FramepressError::config(format!(
                "unknown I/O strategy: {s} (expected mmap or rw)"
            ))),
        }
    }
}

impl fmt::Display for IoStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mmap => "mmap",
            Self::ReadWrite => "rw",
        };
        write!(f, "{s}")
    }
}

/// Rate-control selection, resolved into codec-specific settings at
/// encoder open time
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum RateControl {
    /// Codec default (x264 defaults, or VBR at the default bitrate for VPx)
    #[default]
    Auto,
    /// Constant quantizer (H.264 only)
    ConstQp(u32),
    /// Constant rate factor (H.264 only)
    RateFactor(f32),
    /// Variable bitrate in kbit/s (VP8/VP9 only)
    Vbr { bitrate: u32 },
    /// Constant bitrate in kbit/s (VP8/VP9 only)
    Cbr { bitrate: u32 },
}

impl fmt::Display for RateControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::ConstQp(qp) => write!(f, "qp {qp}"),
            Self::RateFactor(rf) => write!(f, "crf {rf}"),
            Self::Vbr { bitrate } => write!(f, "vbr {bitrate} kbit/s"),
            Self::Cbr { bitrate } => write!(f, "cbr {bitrate} kbit/s"),
        }
    }
}

/// Full pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Capture device path
    pub source: String,
    /// Output device path
    pub sink: String,
    /// Nominal frame rate, drives the encoder time base and GOP length
    pub fps: u32,
    pub source_io: IoStrategy,
    pub sink_io: IoStrategy,
    pub codec: Codec,
    pub rate_control: RateControl,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source: "/dev/video0".to_string(),
            sink: "/dev/video1".to_string(),
            fps: 25,
            source_io: IoStrategy::Mmap,
            sink_io: IoStrategy::Mmap,
            codec: Codec::H264,
            rate_control: RateControl::Auto,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(mut self, source: impl Into<String>, sink: impl Into<String>) -> Self {
        self.source = source.into();
        self.sink = sink.into();
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_rate_control(mut self, rc: RateControl) -> Self {
        self.rate_control = rc;
        self
    }

    pub fn with_io(mut self, source_io: IoStrategy, sink_io: IoStrategy) -> Self {
        self.source_io = source_io;
        self.sink_io = sink_io;
        self
    }

    /// Check the configuration for contradictions before opening devices
    pub fn validate(&self) -> Result<()> {
        if self.fps == 0 {
            return Err(FramepressError::config("fps must be greater than zero"));
        }
        match self.rate_control {
            RateControl::ConstQp(_) | RateControl::RateFactor(_) if self.codec.is_vpx() => {
                Err(FramepressError::config(format!(
                    "{} rate control is not supported by {}",
                    self.rate_control, self.codec
                )))
            }
            RateControl::Vbr { .. } | RateControl::Cbr { .. } if !self.codec.is_vpx() => {
                Err(FramepressError::config(format!(
                    "{} rate control is not supported by {}",
                    self.rate_control, self.codec
                )))
            }
            _ => Ok(()),
        }
    }
}
