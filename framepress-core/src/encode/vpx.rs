//! libvpx software encoder for VP8 and VP9
//!
//! Runs in realtime deadline mode, VBR by default with CBR opt-in.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec::{self, encoder};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{Dictionary, Rational};
use tracing::{info, trace};

use crate::config::{Codec, PipelineConfig, RateControl};
use crate::error::{FramepressError, Result};
use crate::types::{CanonicalFrame, CompressedUnit};

use super::{Encoder, drain_packets, fill_picture};

/// Default target bitrate in kbit/s when none is configured
pub const DEFAULT_BITRATE: u32 = 1000;

/// libvpx rate-control end usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RcEndUsage {
    #[default]
    Vbr,
    Cbr,
}

/// Fully resolved libvpx parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpxSettings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub codec: Codec,
    pub end_usage: RcEndUsage,
    /// Target bitrate in kbit/s
    pub target_bitrate: u32,
}

impl VpxSettings {
    /// Resolve pipeline configuration into libvpx parameters
    pub fn derive(config: &PipelineConfig, width: u32, height: u32) -> Result<Self> {
        let (end_usage, target_bitrate) = match config.rate_control {
            RateControl::Auto => (RcEndUsage::Vbr, DEFAULT_BITRATE),
            RateControl::Vbr { bitrate } => (RcEndUsage::Vbr, bitrate),
            RateControl::Cbr { bitrate } => (RcEndUsage::Cbr, bitrate),
            other => {
                return Err(FramepressError::config(format!(
                    "{other} rate control is not supported by {}",
                    config.codec
                )));
            }
        };

        Ok(Self {
            width,
            height,
            fps: config.fps,
            codec: config.codec,
            end_usage,
            target_bitrate,
        })
    }
}

/// libvpx-backed encoder
pub struct VpxEncoder {
    encoder: encoder::Video,
    frame: VideoFrame,
    packet: ffmpeg::Packet,
    frame_count: i64,
}

impl VpxEncoder {
    pub fn open(settings: VpxSettings) -> Result<Self> {
        ffmpeg::init()
            .map_err(|e| FramepressError::encoder(format!("FFmpeg init failed: {e}")))?;

        let name = settings.codec.ffmpeg_encoder();
        let codec = encoder::find_by_name(name)
            .ok_or_else(|| FramepressError::encoder(format!("{name} encoder not found")))?;

        let mut enc = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| FramepressError::encoder(format!("failed to create encoder context: {e}")))?;

        enc.set_width(settings.width);
        enc.set_height(settings.height);
        enc.set_format(Pixel::YUV420P);
        enc.set_time_base(Rational::new(1, settings.fps as i32));
        enc.set_frame_rate(Some(Rational::new(settings.fps as i32, 1)));
        enc.set_bit_rate(settings.target_bitrate as usize * 1000);

        let mut opts = Dictionary::new();
        opts.set("deadline", "realtime");
        if settings.end_usage == RcEndUsage::Cbr {
            // libvpx treats minrate == maxrate == bitrate as CBR
            let rate = format!("{}k", settings.target_bitrate);
            opts.set("minrate", &rate);
            opts.set("maxrate", &rate);
        }

        let encoder = enc
            .open_with(opts)
            .map_err(|e| FramepressError::encoder(format!("failed to open {name}: {e}")))?;

        info!(
            "{} encoder opened: {}x{} @ {}fps, {:?} {} kbit/s",
            name,
            settings.width,
            settings.height,
            settings.fps,
            settings.end_usage,
            settings.target_bitrate
        );

        Ok(Self {
            encoder,
            frame: VideoFrame::new(Pixel::YUV420P, settings.width, settings.height),
            packet: ffmpeg::Packet::empty(),
            frame_count: 0,
        })
    }
}

impl Encoder for VpxEncoder {
    fn encode(&mut self, frame: &CanonicalFrame) -> Result<Vec<CompressedUnit>> {
        fill_picture(frame, &mut self.frame);
        self.frame.set_pts(Some(self.frame_count));
        self.frame_count += 1;

        self.encoder
            .send_frame(&self.frame)
            .map_err(|e| FramepressError::encoder(format!("failed to send frame: {e}")))?;

        let mut units = Vec::new();
        drain_packets(&mut self.encoder, &mut self.packet, &mut units)?;
        trace!("libvpx produced {} units", units.len());
        Ok(units)
    }

    fn finish(&mut self) -> Result<Vec<CompressedUnit>> {
        self.encoder
            .send_eof()
            .map_err(|e| FramepressError::encoder(format!("failed to send EOF: {e}")))?;

        let mut units = Vec::new();
        drain_packets(&mut self.encoder, &mut self.packet, &mut units)?;
        Ok(units)
    }
}
