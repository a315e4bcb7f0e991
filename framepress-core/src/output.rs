//! V4L2 output device handling
//!
//! The sink is announced with the codec's fourcc and the geometry
//! negotiated on the capture side, then fed one concatenated compressed
//! payload per iteration.

use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::OutputStream;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

use crate::config::IoStrategy;
use crate::error::{FramepressError, Result};
use crate::types::FourCc;

const BUFFER_COUNT: u32 = 4;

/// A sink for compressed frame payloads
pub trait FrameSink {
    /// Write one payload, returning the number of bytes accepted
    fn write_frame(&mut self, data: &[u8]) -> Result<usize>;
}

enum SinkIo {
    Mmap(MmapStream<'static>),
    Write,
}

/// V4L2 output device
pub struct V4l2Sink {
    dev: Device,
    io: SinkIo,
}

impl V4l2Sink {
    /// Open an output device and announce the compressed format on it
    pub fn open(path: &str, fourcc: FourCc, width: u32, height: u32, strategy: IoStrategy) -> Result<Self> {
        let dev = Device::with_path(path)
            .map_err(|e| FramepressError::sink(format!("failed to open {path}: {e}")))?;

        let fmt = Format::new(width, height, FourCC::new(&fourcc.0));
        let actual = Output::set_format(&dev, &fmt)
            .map_err(|e| FramepressError::sink(format!("failed to set format on {path}: {e}")))?;

        if actual.fourcc.repr != fourcc.0 {
            warn!(
                "Output device {} negotiated {} instead of {}",
                path,
                FourCc(actual.fourcc.repr),
                fourcc
            );
        }

        let io = match strategy {
            IoStrategy::Mmap => {
                let stream = MmapStream::with_buffers(&dev, Type::VideoOutput, BUFFER_COUNT)
                    .map_err(|e| {
                        FramepressError::sink(format!("failed to start mmap stream on {path}: {e}"))
                    })?;
                SinkIo::Mmap(stream)
            }
            IoStrategy::ReadWrite => SinkIo::Write,
        };

        info!(
            "Output device {} open: {}x{} {} ({})",
            path, actual.width, actual.height, FourCc(actual.fourcc.repr), strategy
        );

        Ok(Self { dev, io })
    }
}

impl FrameSink for V4l2Sink {
    fn write_frame(&mut self, data: &[u8]) -> Result<usize> {
        match &mut self.io {
            SinkIo::Mmap(stream) => {
                let (buf, meta) = stream
                    .next()
                    .map_err(|e| FramepressError::sink(format!("dequeue failed: {e}")))?;
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                meta.bytesused = n as u32;
                Ok(n)
            }
            SinkIo::Write => {
                // SAFETY: data is a valid readable slice for the duration of the call
                let ret = unsafe {
                    libc::write(
                        self.dev.handle().fd(),
                        data.as_ptr() as *const libc::c_void,
                        data.len(),
                    )
                };
                if ret < 0 {
                    let err = std::io::Error::last_os_error();
                    return Err(FramepressError::sink(format!("write failed: {err}")));
                }
                Ok(ret as usize)
            }
        }
    }
}

impl Drop for V4l2Sink {
    fn drop(&mut self) {
        debug!("Releasing output device");
    }
}
