//! Core types shared across the pipeline

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::FramepressError;

/// Four-character pixel format code as reported by V4L2 drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    pub fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }
}

impl FromStr for FourCc {
    type Err = FramepressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 {
            return Err(FramepressError::config(format!(
                "pixel format must be exactly 4 characters: {s}"
            )));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() || b == b' ' {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, ".")?;
            }
        }
        Ok(())
    }
}

/// Borrowed view of a raw frame as it came off the capture device
#[derive(Debug, Clone, Copy)]
pub struct RawFrame<'a> {
    pub data: &'a [u8],
    pub fourcc: FourCc,
    pub width: u32,
    pub height: u32,
}

/// Owned planar I420 frame, allocated once and reused for every iteration
#[derive(Debug, Clone)]
pub struct CanonicalFrame {
    width: u32,
    height: u32,
    y: Vec<u8>,
    u: Vec<u8>,
    v: Vec<u8>,
}

impl CanonicalFrame {
    pub fn new(width: u32, height: u32) -> Self {
        let luma = (width as usize) * (height as usize);
        let cw = width.div_ceil(2) as usize;
        let ch = height.div_ceil(2) as usize;
        Self {
            width,
            height,
            y: vec![0; luma],
            u: vec![0; cw * ch],
            v: vec![0; cw * ch],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row stride of the luma plane in bytes
    pub fn luma_stride(&self) -> usize {
        self.width as usize
    }

    /// Row stride of each chroma plane in bytes
    pub fn chroma_stride(&self) -> usize {
        self.width.div_ceil(2) as usize
    }

    /// Height of each chroma plane in rows
    pub fn chroma_height(&self) -> usize {
        self.height.div_ceil(2) as usize
    }

    pub fn y_plane(&self) -> &[u8] {
        &self.y
    }

    pub fn u_plane(&self) -> &[u8] {
        &self.u
    }

    pub fn v_plane(&self) -> &[u8] {
        &self.v
    }

    pub fn y_plane_mut(&mut self) -> &mut [u8] {
        &mut self.y
    }

    pub fn u_plane_mut(&mut self) -> &mut [u8] {
        &mut self.u
    }

    pub fn v_plane_mut(&mut self) -> &mut [u8] {
        &mut self.v
    }
}

/// A single compressed unit produced by the encoder (an access unit for
/// H.264, a frame for VP8/VP9)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedUnit {
    pub data: Vec<u8>,
    pub dts: i64,
    pub keyframe: bool,
}

/// Outcome of waiting on the capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Pipeline lifecycle state.
///
/// There is no uninitialized variant: a runner only exists once every
/// stage has been opened, so construction implies `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Running,
    Stopping,
    Terminated,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Terminated => "terminated",
        };
        write!(f, "{s}")
    }
}

/// Cooperative cancellation token, settable from a signal handler
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the pipeline stop at the next loop iteration
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
