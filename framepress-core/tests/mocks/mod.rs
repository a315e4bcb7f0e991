//! Mock infrastructure for testing
//!
//! Scripted stand-ins for the four pipeline stages so the runner can be
//! exercised without V4L2 devices or codecs. The pipeline is
//! single-threaded, so shared inspection handles use `Rc<RefCell<_>>`.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use framepress_core::capture::FrameSource;
use framepress_core::convert::ColorConverter;
use framepress_core::encode::Encoder;
use framepress_core::error::{FramepressError, Result};
use framepress_core::output::FrameSink;
use framepress_core::types::{CanonicalFrame, CompressedUnit, FourCc, RawFrame, Readiness};

/// One scripted capture event
pub enum SourceEvent {
    /// A frame with the given payload becomes available
    Ready(Vec<u8>),
    /// The readiness wait times out
    TimedOut,
    /// The readiness wait fails
    Error(String),
}

/// Frame source that replays a fixed script of events
pub struct ScriptedSource {
    events: Vec<SourceEvent>,
    cursor: usize,
    pending: Option<Vec<u8>>,
    width: u32,
    height: u32,
    frame_size: usize,
}

impl ScriptedSource {
    pub fn new(width: u32, height: u32, events: Vec<SourceEvent>) -> Self {
        let frame_size = (width as usize) * (height as usize) * 2;
        Self {
            events,
            cursor: 0,
            pending: None,
            width,
            height,
            frame_size,
        }
    }
}

impl FrameSource for ScriptedSource {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_format(&self) -> FourCc {
        FourCc(*b"YUYV")
    }

    fn max_frame_size(&self) -> usize {
        self.frame_size
    }

    fn poll_readable(&mut self, _timeout: Duration) -> Result<Readiness> {
        if self.cursor >= self.events.len() {
            // Script exhausted: report the device as failed so the
            // runner stops instead of spinning
            return Err(FramepressError::source("script exhausted"));
        }
        let event = &self.events[self.cursor];
        self.cursor += 1;
        match event {
            SourceEvent::Ready(data) => {
                self.pending = Some(data.clone());
                Ok(Readiness::Ready)
            }
            SourceEvent::TimedOut => Ok(Readiness::TimedOut),
            SourceEvent::Error(msg) => Err(FramepressError::source(msg.clone())),
        }
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize> {
        let data = self
            .pending
            .take()
            .ok_or_else(|| FramepressError::source("read without readiness"))?;
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }
}

/// Sink that records every payload it is handed
pub struct RecordingSink {
    writes: Rc<RefCell<Vec<Vec<u8>>>>,
    /// Accept at most this many bytes per write (None = accept all)
    short_write_cap: Option<usize>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> (Self, Rc<RefCell<Vec<Vec<u8>>>>) {
        let writes = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                writes: writes.clone(),
                short_write_cap: None,
                fail: false,
            },
            writes,
        )
    }

    pub fn with_short_writes(cap: usize) -> (Self, Rc<RefCell<Vec<Vec<u8>>>>) {
        let (mut sink, writes) = Self::new();
        sink.short_write_cap = Some(cap);
        (sink, writes)
    }

    pub fn failing() -> Self {
        Self {
            writes: Rc::new(RefCell::new(Vec::new())),
            short_write_cap: None,
            fail: true,
        }
    }
}

impl FrameSink for RecordingSink {
    fn write_frame(&mut self, data: &[u8]) -> Result<usize> {
        if self.fail {
            return Err(FramepressError::sink("injected write failure"));
        }
        let accepted = self.short_write_cap.map_or(data.len(), |c| c.min(data.len()));
        self.writes.borrow_mut().push(data[..accepted].to_vec());
        Ok(accepted)
    }
}

/// Converter that counts calls and records the byte length of each input
pub struct CountingConverter {
    pub inputs: Rc<RefCell<Vec<usize>>>,
    fail: bool,
}

impl CountingConverter {
    pub fn new() -> (Self, Rc<RefCell<Vec<usize>>>) {
        let inputs = Rc::new(RefCell::new(Vec::new()));
        (
            Self {
                inputs: inputs.clone(),
                fail: false,
            },
            inputs,
        )
    }

    pub fn failing() -> Self {
        Self {
            inputs: Rc::new(RefCell::new(Vec::new())),
            fail: true,
        }
    }
}

impl ColorConverter for CountingConverter {
    fn convert(&mut self, src: &RawFrame<'_>, dst: &mut CanonicalFrame) -> Result<()> {
        if self.fail {
            return Err(FramepressError::convert("injected conversion failure"));
        }
        self.inputs.borrow_mut().push(src.data.len());
        // Deterministic fill so downstream output depends only on input
        let seed = src.data.first().copied().unwrap_or(0);
        dst.y_plane_mut().fill(seed);
        dst.u_plane_mut().fill(128);
        dst.v_plane_mut().fill(128);
        Ok(())
    }
}

/// One scripted encoder response
pub enum EncodeStep {
    /// Return these units
    Units(Vec<Vec<u8>>),
    /// Fail this encode call
    Fail,
}

/// Encoder replaying a fixed script, with optional trailing units
/// returned by `finish()`. With an empty script it echoes one unit per
/// frame derived from the luma plane.
pub struct ScriptedEncoder {
    script: Vec<EncodeStep>,
    cursor: usize,
    trailing: Vec<Vec<u8>>,
    frame_count: i64,
}

impl ScriptedEncoder {
    pub fn new(script: Vec<EncodeStep>) -> Self {
        Self {
            script,
            cursor: 0,
            trailing: Vec::new(),
            frame_count: 0,
        }
    }

    pub fn echo() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_trailing(mut self, trailing: Vec<Vec<u8>>) -> Self {
        self.trailing = trailing;
        self
    }

    fn unit(&self, data: Vec<u8>) -> CompressedUnit {
        CompressedUnit {
            data,
            dts: self.frame_count,
            keyframe: self.frame_count == 0,
        }
    }
}

impl Encoder for ScriptedEncoder {
    fn encode(&mut self, frame: &CanonicalFrame) -> Result<Vec<CompressedUnit>> {
        let result = if self.script.is_empty() {
            // Echo mode: one unit holding the first luma byte
            let seed = frame.y_plane().first().copied().unwrap_or(0);
            Ok(vec![self.unit(vec![seed])])
        } else {
            let step = self
                .script
                .get(self.cursor)
                .ok_or_else(|| FramepressError::encoder("encode script exhausted"))?;
            self.cursor += 1;
            match step {
                EncodeStep::Units(payloads) => {
                    Ok(payloads.iter().map(|p| self.unit(p.clone())).collect())
                }
                EncodeStep::Fail => Err(FramepressError::encoder("injected encode failure")),
            }
        };
        self.frame_count += 1;
        result
    }

    fn finish(&mut self) -> Result<Vec<CompressedUnit>> {
        let trailing = std::mem::take(&mut self.trailing);
        Ok(trailing.into_iter().map(|p| self.unit(p)).collect())
    }
}
