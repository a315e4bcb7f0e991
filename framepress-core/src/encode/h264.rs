//! x264 software encoder
//!
//! Tuned for live transcoding: ultrafast preset, zero-latency tune, a
//! single thread, no B-frames, and a keyframe exactly once per second.

use ffmpeg_next as ffmpeg;
use ffmpeg_next::codec::{self, encoder};
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{Dictionary, Rational};
use tracing::{info, trace};

use crate::config::{PipelineConfig, RateControl};
use crate::error::{FramepressError, Result};
use crate::types::{CanonicalFrame, CompressedUnit};

use super::{Encoder, drain_packets, fill_picture};

/// x264 rate control
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum H264RateControl {
    /// x264 defaults
    #[default]
    Default,
    /// Constant quantizer pinned across the whole stream
    ConstQp(u32),
    /// Constant rate factor with a matching ceiling
    RateFactor(f32),
}

/// Fully resolved x264 parameters
#[derive(Debug, Clone, PartialEq)]
pub struct X264Settings {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    /// Keyframe interval in frames, both floor and ceiling
    pub keyint: u32,
    pub bframes: u32,
    pub threads: u32,
    /// Emit SPS/PPS in front of every keyframe
    pub repeat_headers: bool,
    pub rate_control: H264RateControl,
}

impl X264Settings {
    /// Resolve pipeline configuration into x264 parameters
    pub fn derive(config: &PipelineConfig, width: u32, height: u32) -> Result<Self> {
        let rate_control = match config.rate_control {
            RateControl::Auto => H264RateControl::Default,
            RateControl::ConstQp(qp) => H264RateControl::ConstQp(qp),
            RateControl::RateFactor(rf) => H264RateControl::RateFactor(rf),
            other => {
                return Err(FramepressError::config(format!(
                    "{other} rate control is not supported by h264"
                )));
            }
        };

        Ok(Self {
            width,
            height,
            fps: config.fps,
            keyint: config.fps,
            bframes: 0,
            threads: 1,
            repeat_headers: true,
            rate_control,
        })
    }
}

/// x264-backed encoder
pub struct H264Encoder {
    encoder: encoder::Video,
    frame: VideoFrame,
    packet: ffmpeg::Packet,
    frame_count: i64,
}

impl H264Encoder {
    pub fn open(settings: X264Settings) -> Result<Self> {
        ffmpeg::init()
            .map_err(|e| FramepressError::encoder(format!("FFmpeg init failed: {e}")))?;

        let codec = encoder::find_by_name("libx264")
            .ok_or_else(|| FramepressError::encoder("libx264 encoder not found"))?;

        let mut enc = codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .map_err(|e| FramepressError::encoder(format!("failed to create encoder context: {e}")))?;

        enc.set_width(settings.width);
        enc.set_height(settings.height);
        enc.set_format(Pixel::YUV420P);
        enc.set_time_base(Rational::new(1, settings.fps as i32));
        enc.set_frame_rate(Some(Rational::new(settings.fps as i32, 1)));
        enc.set_gop(settings.keyint);
        enc.set_max_b_frames(settings.bframes as usize);

        let mut opts = Dictionary::new();
        opts.set("preset", "ultrafast");
        opts.set("tune", "zerolatency");
        opts.set("threads", &settings.threads.to_string());

        let mut x264_params = format!("keyint={}:min-keyint={}", settings.keyint, settings.keyint);
        if settings.repeat_headers {
            x264_params.push_str(":repeat-headers=1");
        }

        match settings.rate_control {
            H264RateControl::Default => {}
            H264RateControl::ConstQp(qp) => {
                // Pin min, max, and constant quantizer to the same value
                opts.set("qp", &qp.to_string());
                enc.set_qmin(qp as i32);
                enc.set_qmax(qp as i32);
            }
            H264RateControl::RateFactor(rf) => {
                opts.set("crf", &format!("{rf}"));
                opts.set("crf_max", &format!("{rf}"));
            }
        }
        opts.set("x264-params", &x264_params);

        let encoder = enc
            .open_with(opts)
            .map_err(|e| FramepressError::encoder(format!("failed to open libx264: {e}")))?;

        info!(
            "x264 encoder opened: {}x{} @ {}fps, keyint {}, {:?}",
            settings.width, settings.height, settings.fps, settings.keyint, settings.rate_control
        );

        Ok(Self {
            encoder,
            frame: VideoFrame::new(Pixel::YUV420P, settings.width, settings.height),
            packet: ffmpeg::Packet::empty(),
            frame_count: 0,
        })
    }
}

impl Encoder for H264Encoder {
    fn encode(&mut self, frame: &CanonicalFrame) -> Result<Vec<CompressedUnit>> {
        fill_picture(frame, &mut self.frame);
        self.frame.set_pts(Some(self.frame_count));
        self.frame_count += 1;

        self.encoder
            .send_frame(&self.frame)
            .map_err(|e| FramepressError::encoder(format!("failed to send frame: {e}")))?;

        let mut units = Vec::new();
        drain_packets(&mut self.encoder, &mut self.packet, &mut units)?;
        trace!("x264 produced {} units", units.len());
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
