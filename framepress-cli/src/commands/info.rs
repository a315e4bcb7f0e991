//! Info command - show available devices and encoders

use anyhow::Result;
use framepress_core::config::Codec;
use framepress_core::encode;
use v4l::Device;
use v4l::capability::Flags;
use v4l::video::Capture;

/// Show available V4L2 devices and encoder support
pub fn info() -> Result<()> {
    println!("Framepress - System Information\n");

    println!("V4L2 Devices:");
    let mut found = false;
    for index in 0..64 {
        let path = format!("/dev/video{index}");
        if !std::path::Path::new(&path).exists() {
            continue;
        }
        found = true;

        match Device::with_path(&path) {
            Ok(dev) => {
                let caps = match dev.query_caps() {
                    Ok(caps) => caps,
                    Err(e) => {
                        println!("  {path}: failed to query capabilities ({e})");
                        continue;
                    }
                };

                let mut roles = Vec::new();
                if caps.capabilities.contains(Flags::VIDEO_CAPTURE) {
                    roles.push("capture");
                }
                if caps.capabilities.contains(Flags::VIDEO_OUTPUT) {
                    roles.push("output");
                }
                let roles = if roles.is_empty() {
                    "none".to_string()
                } else {
                    roles.join("+")
                };

                print!("  {path}: {} [{}]", caps.card, roles);
                if let Ok(fmt) = Capture::format(&dev) {
                    let fourcc: String = fmt
                        .fourcc
                        .repr
                        .iter()
                        .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
                        .collect();
                    print!(" {}x{} {}", fmt.width, fmt.height, fourcc);
                }
                println!();
            }
            Err(e) => {
                println!("  {path}: failed to open ({e})");
            }
        }
    }
    if !found {
        println!("  No /dev/video* devices found.");
    }

    println!();
    println!("Encoder Support:");
    for codec in [Codec::H264, Codec::Vp8, Codec::Vp9] {
        let available = encode::encoder_available(codec);
        println!(
            "  {:6} ({}): {}",
            codec.to_string(),
            codec.ffmpeg_encoder(),
            if available { "available" } else { "not available" }
        );
    }

    Ok(())
}
