//! CLI command implementations

mod config;
mod info;
mod run;

pub use config::{ConfigArgs, config};
pub use info::info;
pub use run::{RunArgs, run};

use framepress_core::PipelineConfig;

/// Render resolved pipeline settings, one indented line per field.
pub(crate) fn print_settings(config: &PipelineConfig) {
    println!("  Source:       {} ({})", config.source, config.source_io);
    println!("  Sink:         {} ({})", config.sink, config.sink_io);
    println!("  Codec:        {}", config.codec);
    println!("  Framerate:    {} fps", config.fps);
    println!("  Rate control: {}", config.rate_control);
}
