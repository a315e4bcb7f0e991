//! Run command - start the transcoding pipeline

use anyhow::{Context, Result};
use clap::Args;
use framepress_core::config::{Codec, ConfigFile, PipelineConfig, RateControl};
use framepress_core::pipeline::PipelineRunner;
use framepress_core::types::{FourCc, StopToken};
use tracing::info;

/// Arguments for the run command
#[derive(Args)]
pub struct RunArgs {
    /// Capture device path
    source: Option<String>,

    /// Output device path
    sink: Option<String>,

    /// Frame rate (drives the keyframe interval)
    #[arg(short, long)]
    fps: Option<u32>,

    /// Capture device I/O strategy (mmap, rw)
    #[arg(long)]
    source_io: Option<String>,

    /// Output device I/O strategy (mmap, rw)
    #[arg(long)]
    sink_io: Option<String>,

    /// Output codec (h264, vp8, vp9)
    #[arg(short, long)]
    codec: Option<String>,

    /// Output codec by V4L2 fourcc (H264, VP80, VP90)
    #[arg(long, conflicts_with = "codec")]
    format: Option<String>,

    /// Constant quantizer (h264 only)
    #[arg(long, conflicts_with_all = ["crf", "bitrate"])]
    qp: Option<u32>,

    /// Constant rate factor (h264 only)
    #[arg(long, conflicts_with_all = ["qp", "bitrate"])]
    crf: Option<f32>,

    /// Target bitrate in kbit/s (vp8/vp9 only)
    #[arg(short, long, conflicts_with_all = ["qp", "crf"])]
    bitrate: Option<u32>,

    /// Use constant bitrate instead of variable (requires --bitrate)
    #[arg(long, requires = "bitrate")]
    cbr: bool,
}

impl RunArgs {
    /// Layer CLI flags over the resolved file settings. CLI wins.
    fn resolve(&self, file: &ConfigFile) -> Result<PipelineConfig> {
        let mut config = file.to_pipeline_config()?;

        if let Some(ref source) = self.source {
            config.source = source.clone();
        }
        if let Some(ref sink) = self.sink {
            config.sink = sink.clone();
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(ref io) = self.source_io {
            config.source_io = io.parse()?;
        }
        if let Some(ref io) = self.sink_io {
            config.sink_io = io.parse()?;
        }
        if let Some(codec) = self.codec_flag()? {
            config.codec = codec;
        }
        if let Some(rate_control) = self.rate_control_flag() {
            config.rate_control = rate_control;
        }

        config.validate()?;
        Ok(config)
    }

    fn codec_flag(&self) -> Result<Option<Codec>> {
        if let Some(ref fourcc) = self.format {
            let fcc: FourCc = fourcc.parse()?;
            return Codec::from_fourcc(fcc)
                .map(Some)
                .ok_or_else(|| anyhow::anyhow!("no codec for format '{fourcc}'"));
        }
        match self.codec {
            Some(ref name) => Ok(Some(name.parse()?)),
            None => Ok(None),
        }
    }

    fn rate_control_flag(&self) -> Option<RateControl> {
        if let Some(qp) = self.qp {
            return Some(RateControl::ConstQp(qp));
        }
        if let Some(crf) = self.crf {
            return Some(RateControl::RateFactor(crf));
        }
        self.bitrate.map(|bitrate| {
            if self.cbr {
                RateControl::Cbr { bitrate }
            } else {
                RateControl::Vbr { bitrate }
            }
        })
    }
}

/// Start the transcoding pipeline and run it until interrupted
pub fn run(args: RunArgs) -> Result<()> {
    println!("Framepress - Starting Transcode\n");

    let file = ConfigFile::load_or_default();
    let config = args.resolve(&file)?;

    println!("Configuration:");
    super::print_settings(&config);
    println!();

    let stop = StopToken::new();
    let handler_token = stop.clone();
    ctrlc::set_handler(move || {
        info!("Interrupt received");
        handler_token.stop();
    })
    .context("failed to install signal handler")?;

    let mut runner =
        PipelineRunner::open(config, stop).context("failed to start pipeline")?;

    println!("Transcoding... press Ctrl+C to stop.\n");

    runner.run().context("pipeline failed")?;

    let stats = runner.close();
    println!("\n{}", stats.snapshot);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_args() -> RunArgs {
        RunArgs {
            source: None,
            sink: None,
            fps: None,
            source_io: None,
            sink_io: None,
            codec: None,
            format: None,
            qp: None,
            crf: None,
            bitrate: None,
            cbr: false,
        }
    }

    #[test]
    fn defaults_come_from_the_config_file() {
        let mut file = ConfigFile::default();
        file.defaults.fps = 30;
        file.devices.sink = "/dev/video9".to_string();

        let config = bare_args().resolve(&file).unwrap();
        assert_eq!(config.fps, 30);
        assert_eq!(config.sink, "/dev/video9");
        assert_eq!(config.codec, Codec::H264);
        assert_eq!(config.rate_control, RateControl::Auto);
    }

    #[test]
    fn cli_flags_win_over_the_file() {
        let mut file = ConfigFile::default();
        file.defaults.fps = 30;

        let mut args = bare_args();
        args.fps = Some(60);
        args.source = Some("/dev/video4".to_string());

        let config = args.resolve(&file).unwrap();
        assert_eq!(config.fps, 60);
        assert_eq!(config.source, "/dev/video4");
    }

    #[test]
    fn qp_flag_selects_constant_quantizer() {
        let mut args = bare_args();
        args.qp = Some(26);

        let config = args.resolve(&ConfigFile::default()).unwrap();
        assert_eq!(config.rate_control, RateControl::ConstQp(26));
    }

    #[test]
    fn bitrate_flag_selects_vbr_and_cbr_upgrades_it() {
        let mut args = bare_args();
        args.codec = Some("vp8".to_string());
        args.bitrate = Some(1000);

        let config = args.resolve(&ConfigFile::default()).unwrap();
        assert_eq!(config.rate_control, RateControl::Vbr { bitrate: 1000 });

        args.cbr = true;
        let config = args.resolve(&ConfigFile::default()).unwrap();
        assert_eq!(config.rate_control, RateControl::Cbr { bitrate: 1000 });
    }

    #[test]
    fn format_flag_maps_fourcc_to_codec() {
        let mut args = bare_args();
        args.format = Some("VP90".to_string());
        args.bitrate = Some(1500);

        let config = args.resolve(&ConfigFile::default()).unwrap();
        assert_eq!(config.codec, Codec::Vp9);

        let mut args = bare_args();
        args.format = Some("MJPG".to_string());
        assert!(args.resolve(&ConfigFile::default()).is_err());
    }

    #[test]
    fn mismatched_codec_and_rate_control_fail_validation() {
        let mut args = bare_args();
        args.codec = Some("vp8".to_string());
        args.qp = Some(26);

        assert!(args.resolve(&ConfigFile::default()).is_err());
    }

    #[test]
    fn file_rate_control_modes_parse() {
        let mut file = ConfigFile::default();
        file.defaults.rate_control = "crf".to_string();
        file.defaults.rate_value = 23.0;

        let config = bare_args().resolve(&file).unwrap();
        assert_eq!(config.rate_control, RateControl::RateFactor(23.0));

        file.defaults.codec = "vp9".to_string();
        file.defaults.rate_control = "cbr".to_string();
        file.defaults.rate_value = 2000.0;

        let config = bare_args().resolve(&file).unwrap();
        assert_eq!(config.rate_control, RateControl::Cbr { bitrate: 2000 });
    }
}
