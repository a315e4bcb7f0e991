//! Config command - inspect and seed the configuration file

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Args, Subcommand};
use framepress_core::config::{ConfigFile, sample_config};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the pipeline settings the config file resolves to
    Show,

    /// Show the path of the config file
    Path,

    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

/// Run config subcommand
pub fn config(args: ConfigArgs) -> Result<()> {
    let path = ConfigFile::default_path();
    match args.command {
        ConfigCommand::Show => show(path),
        ConfigCommand::Path => {
            println!("{}", path.display());
            Ok(())
        }
        ConfigCommand::Init { force } => init(path, force),
    }
}

/// Resolve the file into effective pipeline settings and print them.
///
/// A missing file is not an error (the built-in defaults apply), but a
/// file that fails to parse or validate is reported as one.
fn show(path: PathBuf) -> Result<()> {
    if path.exists() {
        println!("Settings resolved from {}:\n", path.display());
    } else {
        println!("No config file at {}, built-in defaults apply:\n", path.display());
    }

    let config = resolve_file(path)?;
    super::print_settings(&config);
    Ok(())
}

/// Seed the config file with the commented sample, then confirm that
/// what landed on disk resolves.
fn init(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    std::fs::write(&path, sample_config()).context("failed to write config file")?;
    resolve_file(path.clone())?;

    println!("Created {}", path.display());
    println!("Edit this file to change the framepress defaults.");
    Ok(())
}

fn resolve_file(path: PathBuf) -> Result<framepress_core::PipelineConfig> {
    let file = ConfigFile::load_from(path).context("config file is not loadable")?;
    let config = file
        .to_pipeline_config()
        .context("config file holds unknown settings")?;
    config
        .validate()
        .context("config file holds contradictory settings")?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use framepress_core::config::Codec;

    fn temp_config_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("config.toml")
    }

    #[test]
    fn init_writes_a_file_that_resolves_to_the_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_config_path(&dir);

        init(path.clone(), false).unwrap();

        let config = resolve_file(path).unwrap();
        assert_eq!(config.codec, Codec::H264);
        assert_eq!(config.fps, 25);
        assert_eq!(config.source, "/dev/video0");
    }

    #[test]
    fn init_refuses_to_clobber_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_config_path(&dir);
        std::fs::write(&path, "# my settings\n").unwrap();

        assert!(init(path.clone(), false).is_err());
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "# my settings\n"
        );

        init(path, true).unwrap();
    }

    #[test]
    fn a_contradictory_file_fails_to_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = temp_config_path(&dir);
        std::fs::write(
            &path,
            "[defaults]\ncodec = \"vp8\"\nrate_control = \"qp\"\nrate_value = 26.0\n",
        )
        .unwrap();

        assert!(resolve_file(path).is_err());
    }

    #[test]
    fn show_reports_settings_even_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        show(temp_config_path(&dir)).unwrap();
    }
}
