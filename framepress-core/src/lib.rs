//! Framepress Core Library
//!
//! Real-time V4L2-to-V4L2 video transcoding.
//!
//! This library provides:
//! - V4L2 capture and output device access (memory-mapped or read/write I/O)
//! - Pixel format conversion to planar I420 via swscale
//! - Software encoding with libx264 (low-latency H.264) or libvpx (VP8/VP9)
//! - A single-threaded pipeline runner tying the stages together
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌───────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ V4L2 Capture │───▶│ I420 Convert  │───▶│ x264 / vpx   │───▶│ V4L2 Output  │
//! │ (raw frames) │    │ (swscale)     │    │ Encode       │    │ (bitstream)  │
//! └──────────────┘    └───────────────┘    └──────────────┘    └──────────────┘
//! ```

pub mod capture;
pub mod config;
pub mod convert;
pub mod encode;
pub mod error;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod types;

pub use config::{Codec, IoStrategy, PipelineConfig, RateControl};
pub use error::{FramepressError, Result};
pub use pipeline::{PipelineRunner, PipelineStats};
pub use types::{FourCc, PipelineState, StopToken};
