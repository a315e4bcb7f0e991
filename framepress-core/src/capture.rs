//! V4L2 capture device handling
//!
//! The capture device's negotiated format is authoritative: whatever
//! width, height, and pixel format the driver reports after open is what
//! the rest of the pipeline is sized for.

use std::time::Duration;

use tracing::{debug, info};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::Device;

use crate::config::IoStrategy;
use crate::error::{FramepressError, Result};
use crate::types::{FourCc, Readiness};

/// Number of mmap buffers queued on the capture device
const BUFFER_COUNT: u32 = 4;

/// A source of raw video frames
pub trait FrameSource {
    /// Negotiated frame dimensions
    fn dimensions(&self) -> (u32, u32);

    /// Negotiated pixel format
    fn pixel_format(&self) -> FourCc;

    /// Upper bound on the size of a single frame in bytes
    fn max_frame_size(&self) -> usize;

    /// Wait until a frame is available or the timeout elapses
    fn poll_readable(&mut self, timeout: Duration) -> Result<Readiness>;

    /// Read one frame into `buf`, returning the number of bytes read
    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize>;
}

enum SourceIo {
    Mmap(MmapStream<'static>),
    Read,
}

/// V4L2 capture device
pub struct V4l2Source {
    dev: Device,
    io: SourceIo,
    width: u32,
    height: u32,
    fourcc: FourCc,
    frame_size: usize,
}

impl V4l2Source {
    /// Open a capture device and read back the driver's negotiated format
    pub fn open(path: &str, strategy: IoStrategy) -> Result<Self> {
        let dev = Device::with_path(path)
            .map_err(|e| FramepressError::source(format!("failed to open {path}: {e}")))?;

        let fmt = Capture::format(&dev)
            .map_err(|e| FramepressError::source(format!("failed to query format on {path}: {e}")))?;

        let fourcc = FourCc(fmt.fourcc.repr);
        let frame_size = if fmt.size > 0 {
            fmt.size as usize
        } else {
            // Driver did not report sizeimage, size generously
            (fmt.width as usize) * (fmt.height as usize) * 4
        };

        let io = match strategy {
            IoStrategy::Mmap => {
                let stream = MmapStream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT)
                    .map_err(|e| {
                        FramepressError::source(format!("failed to start mmap stream on {path}: {e}"))
                    })?;
                SourceIo::Mmap(stream)
            }
            IoStrategy::ReadWrite => SourceIo::Read,
        };

        info!(
            "Capture device {} open: {}x{} {} ({} bytes/frame, {})",
            path, fmt.width, fmt.height, fourcc, frame_size, strategy
        );

        Ok(Self {
            dev,
            io,
            width: fmt.width,
            height: fmt.height,
            fourcc,
            frame_size,
        })
    }
}

impl FrameSource for V4l2Source {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_format(&self) -> FourCc {
        self.fourcc
    }

    fn max_frame_size(&self) -> usize {
        self.frame_size
    }

    fn poll_readable(&mut self, timeout: Duration) -> Result<Readiness> {
        let mut pfd = libc::pollfd {
            fd: self.dev.handle().fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;

        // SAFETY: pfd is a valid pollfd for the lifetime of the call
        let ret = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        match ret {
            0 => Ok(Readiness::TimedOut),
            n if n > 0 => {
                if pfd.revents & (libc::POLLERR | libc::POLLNVAL) != 0 {
                    return Err(FramepressError::source(format!(
                        "poll reported device error (revents {:#x})",
                        pfd.revents
                    )));
                }
                Ok(Readiness::Ready)
            }
            _ => {
                let err = std::io::Error::last_os_error();
                if err.kind() == std::io::ErrorKind::Interrupted {
                    // Signal delivery, let the caller re-check its stop flag
                    return Ok(Readiness::TimedOut);
                }
                Err(FramepressError::source(format!("poll failed: {err}")))
            }
        }
    }

    fn read_frame(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.io {
            SourceIo::Mmap(stream) => {
                let (data, meta) = stream
                    .next()
                    .map_err(|e| FramepressError::source(format!("dequeue failed: {e}")))?;
                let n = (meta.bytesused as usize).min(data.len()).min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                debug!("Dequeued frame: {} bytes (seq {})", n, meta.sequence);
                Ok(n)
            }
            SourceIo::Read => {
                // SAFETY: buf is a valid writable slice for the duration of the call
                let ret = unsafe {
                    libc::read(
                        self.dev.handle().fd(),
                        buf.as_mut_ptr() as *mut libc::c_void,
                        buf.len(),
                    )
                };
                if ret < 0 {
                    let err = std::io::Error::last_os_error();
                    return Err(FramepressError::source(format!("read failed: {err}")));
                }
                Ok(ret as usize)
            }
        }
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        debug!("Releasing capture device");
    }
}
