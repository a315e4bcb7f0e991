//! Pixel format conversion to planar I420
//!
//! Every captured frame is normalized to I420 before encoding, using
//! libswscale at identical source and destination geometry.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as Scaler, Flags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use tracing::trace;

use crate::error::{FramepressError, Result};
use crate::types::{CanonicalFrame, FourCc, RawFrame};

/// Converts raw capture frames into the canonical I420 layout
pub trait ColorConverter {
    fn convert(&mut self, src: &RawFrame<'_>, dst: &mut CanonicalFrame) -> Result<()>;
}

/// Map a V4L2 fourcc onto a libswscale pixel format
fn pixel_from_fourcc(fourcc: FourCc) -> Result<Pixel> {
    match &fourcc.0 {
        b"YUYV" => Ok(Pixel::YUYV422),
        b"UYVY" => Ok(Pixel::UYVY422),
        b"RGB3" => Ok(Pixel::RGB24),
        b"BGR3" => Ok(Pixel::BGR24),
        b"NV12" => Ok(Pixel::NV12),
        b"YU12" => Ok(Pixel::YUV420P),
        _ => Err(FramepressError::convert(format!(
            "unsupported capture pixel format: {fourcc}"
        ))),
    }
}

/// libswscale-backed converter with pre-allocated frames
pub struct SwsConverter {
    scaler: Scaler,
    src_frame: VideoFrame,
    dst_frame: VideoFrame,
}

impl SwsConverter {
    pub fn new(src_fourcc: FourCc, width: u32, height: u32) -> Result<Self> {
        let src_pixel = pixel_from_fourcc(src_fourcc)?;
        let scaler = Scaler::get(
            src_pixel,
            width,
            height,
            Pixel::YUV420P,
            width,
            height,
            Flags::BILINEAR,
        )
        .map_err(|e| FramepressError::convert(format!("failed to create scaler: {e}")))?;

        Ok(Self {
            scaler,
            src_frame: VideoFrame::new(src_pixel, width, height),
            dst_frame: VideoFrame::new(Pixel::YUV420P, width, height),
        })
    }

    /// Scatter the packed capture bytes across the source frame's planes,
    /// honoring libav's per-plane strides. Short reads leave the tail of
    /// the frame untouched.
    fn fill_src(&mut self, src: &RawFrame<'_>) {
        let mut offset = 0usize;
        let planes = self.src_frame.planes();
        for i in 0..planes {
            if offset >= src.data.len() {
                break;
            }
            let stride = self.src_frame.stride(i);
            let plane_height = self.src_frame.plane_height(i) as usize;
            let row_bytes = plane_row_bytes(&self.src_frame, i);
            let data = self.src_frame.data_mut(i);
            for row in 0..plane_height {
                if offset >= src.data.len() {
                    return;
                }
                let n = row_bytes.min(src.data.len() - offset);
                data[row * stride..row * stride + n]
                    .copy_from_slice(&src.data[offset..offset + n]);
                offset += n;
            }
        }
    }
}

/// Number of meaningful bytes per row in plane `i`, excluding stride padding
fn plane_row_bytes(frame: &VideoFrame, i: usize) -> usize {
    let width = frame.width() as usize;
    match (frame.format(), i) {
        (Pixel::YUYV422 | Pixel::UYVY422, 0) => width * 2,
        (Pixel::RGB24 | Pixel::BGR24, 0) => width * 3,
        (Pixel::NV12, 0) => width,
        (Pixel::NV12, 1) => width.div_ceil(2) * 2,
        (Pixel::YUV420P, 0) => width,
        (Pixel::YUV420P, _) => width.div_ceil(2),
        _ => frame.stride(i),
    }
}

impl ColorConverter for SwsConverter {
    fn convert(&mut self, src: &RawFrame<'_>, dst: &mut CanonicalFrame) -> Result<()> {
        self.fill_src(src);

        // Split borrows: run() needs &src_frame and &mut dst_frame
        let Self {
            scaler,
            src_frame,
            dst_frame,
        } = self;
        scaler
            .run(src_frame, dst_frame)
            .map_err(|e| FramepressError::convert(format!("scaling failed: {e}")))?;

        copy_plane(
            dst_frame.data(0),
            dst_frame.stride(0),
            dst.luma_stride(),
            dst.height() as usize,
            dst.y_plane_mut(),
        );
        let chroma_stride = dst.chroma_stride();
        let chroma_height = dst.chroma_height();
        copy_plane(
            dst_frame.data(1),
            dst_frame.stride(1),
            chroma_stride,
            chroma_height,
            dst.u_plane_mut(),
        );
        copy_plane(
            dst_frame.data(2),
            dst_frame.stride(2),
            chroma_stride,
            chroma_height,
            dst.v_plane_mut(),
        );

        trace!("Converted {} bytes to I420", src.data.len());
        Ok(())
    }
}

/// Copy `rows` rows of `row_bytes` each from a strided libav plane into a
/// tightly packed destination plane
fn copy_plane(src: &[u8], src_stride: usize, row_bytes: usize, rows: usize, dst: &mut [u8]) {
    for row in 0..rows {
        let s = row * src_stride;
        let d = row * row_bytes;
        dst[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
    }
}

/// Initialize the libav runtime once per process
pub fn init_ffmpeg() -> Result<()> {
    ffmpeg::init().map_err(|e| FramepressError::convert(format!("libav init failed: {e}")))
}
