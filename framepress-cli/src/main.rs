//! Framepress CLI
//!
//! Real-time V4L2-to-V4L2 video transcoding.
//!
//! # Usage
//!
//! ```bash
//! # Transcode /dev/video0 to H.264 on /dev/video1
//! framepress run
//!
//! # Explicit devices, VP9 at a constant bitrate
//! framepress run /dev/video2 /dev/video3 --codec vp9 --bitrate 2000 --cbr
//!
//! # Show available devices and encoders
//! framepress info
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Framepress - real-time V4L2 video transcoding
#[derive(Parser)]
#[command(name = "framepress")]
#[command(version)]
#[command(about = "Real-time V4L2-to-V4L2 video transcoding", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcode a capture device onto an output device
    Run(commands::RunArgs),

    /// Show available V4L2 devices and encoders
    Info,

    /// Manage the configuration file
    Config(commands::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("framepress={}", level).parse().unwrap()),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run(args)?,
        Commands::Info => commands::info()?,
        Commands::Config(args) => commands::config(args)?,
    }

    Ok(())
}
