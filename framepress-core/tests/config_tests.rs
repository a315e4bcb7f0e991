//! Tests for pipeline configuration and the config file

use framepress_core::config::{
    Codec, ConfigFile, IoStrategy, PipelineConfig, RateControl, sample_config,
};

#[test]
fn default_config_matches_documented_defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.source, "/dev/video0");
    assert_eq!(config.sink, "/dev/video1");
    assert_eq!(config.fps, 25);
    assert_eq!(config.source_io, IoStrategy::Mmap);
    assert_eq!(config.sink_io, IoStrategy::Mmap);
    assert_eq!(config.codec, Codec::H264);
    assert_eq!(config.rate_control, RateControl::Auto);
    assert!(config.validate().is_ok());
}

#[test]
fn builder_methods_compose() {
    let config = PipelineConfig::new()
        .with_devices("/dev/video2", "/dev/video3")
        .with_fps(30)
        .with_codec(Codec::Vp9)
        .with_rate_control(RateControl::Vbr { bitrate: 2500 })
        .with_io(IoStrategy::ReadWrite, IoStrategy::Mmap);

    assert_eq!(config.source, "/dev/video2");
    assert_eq!(config.sink, "/dev/video3");
    assert_eq!(config.fps, 30);
    assert_eq!(config.codec, Codec::Vp9);
    assert_eq!(config.rate_control, RateControl::Vbr { bitrate: 2500 });
    assert_eq!(config.source_io, IoStrategy::ReadWrite);
    assert!(config.validate().is_ok());
}

#[test]
fn zero_fps_is_rejected() {
    let config = PipelineConfig::default().with_fps(0);
    assert!(config.validate().is_err());
}

#[test]
fn mismatched_rate_control_is_rejected() {
    let config = PipelineConfig::default()
        .with_codec(Codec::H264)
        .with_rate_control(RateControl::Cbr { bitrate: 1000 });
    assert!(config.validate().is_err());

    let config = PipelineConfig::default()
        .with_codec(Codec::Vp8)
        .with_rate_control(RateControl::ConstQp(26));
    assert!(config.validate().is_err());
}

#[test]
fn matched_rate_control_passes() {
    let config = PipelineConfig::default()
        .with_codec(Codec::H264)
        .with_rate_control(RateControl::RateFactor(23.0));
    assert!(config.validate().is_ok());

    let config = PipelineConfig::default()
        .with_codec(Codec::Vp9)
        .with_rate_control(RateControl::Cbr { bitrate: 1500 });
    assert!(config.validate().is_ok());
}

#[test]
fn io_strategy_parses() {
    assert_eq!("mmap".parse::<IoStrategy>().unwrap(), IoStrategy::Mmap);
    assert_eq!("rw".parse::<IoStrategy>().unwrap(), IoStrategy::ReadWrite);
    assert_eq!(
        "readwrite".parse::<IoStrategy>().unwrap(),
        IoStrategy::ReadWrite
    );
    assert!("dma".parse::<IoStrategy>().is_err());
}

#[test]
fn config_file_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let mut config = ConfigFile::default();
    config.defaults.fps = 30;
    config.defaults.codec = "vp9".to_string();
    config.devices.sink = "/dev/video5".to_string();

    config.save_to(path.clone()).unwrap();

    let loaded = ConfigFile::load_from(path).unwrap();
    assert_eq!(loaded.defaults.fps, 30);
    assert_eq!(loaded.defaults.codec, "vp9");
    assert_eq!(loaded.devices.sink, "/dev/video5");
    // Untouched fields keep their defaults
    assert_eq!(loaded.devices.source, "/dev/video0");
}

#[test]
fn missing_config_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let loaded = ConfigFile::load_from(dir.path().join("nope.toml")).unwrap();
    assert_eq!(loaded.defaults.fps, 25);
}

#[test]
fn sample_config_parses_cleanly() {
    let config: ConfigFile = toml::from_str(&sample_config()).unwrap();
    assert_eq!(config.defaults.rate_control, "auto");
    assert_eq!(config.io.sink, "mmap");
}
