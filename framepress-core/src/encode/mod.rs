//! Software video encoders via FFmpeg
//!
//! Two encoder families are supported: x264 for H.264 and libvpx for
//! VP8/VP9. The variant is selected once at pipeline startup from the
//! configured codec.

mod h264;
mod vpx;

pub use h264::{H264Encoder, H264RateControl, X264Settings};
pub use vpx::{DEFAULT_BITRATE, RcEndUsage, VpxEncoder, VpxSettings};

use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec::encoder;
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::config::{Codec, PipelineConfig};
use crate::error::{FramepressError, Result};
use crate::types::{CanonicalFrame, CompressedUnit};

/// A stateful video encoder consuming canonical I420 frames
pub trait Encoder {
    /// Encode one frame, returning zero or more compressed units
    fn encode(&mut self, frame: &CanonicalFrame) -> Result<Vec<CompressedUnit>>;

    /// Signal end of stream and drain any buffered units
    fn finish(&mut self) -> Result<Vec<CompressedUnit>>;
}

/// Open the encoder matching the configured codec
pub fn open_encoder(config: &PipelineConfig, width: u32, height: u32) -> Result<Box<dyn Encoder>> {
    match config.codec {
        Codec::H264 => {
            let settings = X264Settings::derive(config, width, height)?;
            Ok(Box::new(H264Encoder::open(settings)?))
        }
        Codec::Vp8 | Codec::Vp9 => {
            let settings = VpxSettings::derive(config, width, height)?;
            Ok(Box::new(VpxEncoder::open(settings)?))
        }
    }
}

/// Check whether the libavcodec encoder for a codec is present
pub fn encoder_available(codec: Codec) -> bool {
    ffmpeg::init().ok();
    encoder::find_by_name(codec.ffmpeg_encoder()).is_some()
}

/// Copy the canonical planes into an I420 libav frame, honoring its
/// per-plane strides
pub(crate) fn fill_picture(src: &CanonicalFrame, dst: &mut VideoFrame) {
    copy_into_plane(src.y_plane(), src.luma_stride(), src.height() as usize, dst, 0);
    copy_into_plane(src.u_plane(), src.chroma_stride(), src.chroma_height(), dst, 1);
    copy_into_plane(src.v_plane(), src.chroma_stride(), src.chroma_height(), dst, 2);
}

fn copy_into_plane(src: &[u8], row_bytes: usize, rows: usize, dst: &mut VideoFrame, plane: usize) {
    let stride = dst.stride(plane);
    let data = dst.data_mut(plane);
    for row in 0..rows {
        let s = row * row_bytes;
        let d = row * stride;
        data[d..d + row_bytes].copy_from_slice(&src[s..s + row_bytes]);
    }
}

/// Drain all pending packets from an opened encoder into `out`
pub(crate) fn drain_packets(
    enc: &mut encoder::Video,
    packet: &mut ffmpeg::Packet,
    out: &mut Vec<CompressedUnit>,
) -> Result<()> {
    loop {
        match enc.receive_packet(packet) {
            Ok(()) => {
                out.push(CompressedUnit {
                    data: packet.data().map(|d| d.to_vec()).unwrap_or_default(),
                    dts: packet.dts().unwrap_or(0),
                    keyframe: packet.is_key(),
                });
            }
            Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::error::EAGAIN => break,
            Err(ffmpeg::Error::Eof) => break,
            Err(e) => {
                return Err(FramepressError::encoder(format!(
                    "failed to receive packet: {e}"
                )));
            }
        }
    }
    Ok(())
}
