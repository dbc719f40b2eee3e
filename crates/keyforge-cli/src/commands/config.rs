//! `keyforge config` commands for managing the project configuration.

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use keyforge_core::config::{KEY_PASSWORD_VAR, STORE_PASSWORD_VAR};
use std::fs;
use std::path::Path;

use crate::config::{ResolvedConfig, serialize_to_huml};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create a config file with the current settings
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Show the resolved configuration
    Show,

    /// Show config file path
    Path,
}

pub fn handle_config_command(
    cmd: ConfigCommands,
    config: &ResolvedConfig,
    config_path: &Path,
    project_dir: &Path,
) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => init_config(config, config_path, project_dir, force),
        ConfigCommands::Show => {
            show_config(config, config_path);
            Ok(())
        }
        ConfigCommands::Path => {
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

/// Create a new config file.
fn init_config(
    config: &ResolvedConfig,
    config_path: &Path,
    project_dir: &Path,
    force: bool,
) -> Result<()> {
    if config_path.exists() && !force {
        bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let content = serialize_to_huml(config, project_dir);
    fs::write(config_path, &content)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;

    println!("Created {}", config_path.display());
    println!();
    println!("Signing passwords are read from {} and {}.", STORE_PASSWORD_VAR, KEY_PASSWORD_VAR);
    println!("Do not add them to this file.");

    Ok(())
}

fn show_config(config: &ResolvedConfig, config_path: &Path) {
    if config_path.exists() {
        println!("Config file: {}", config_path.display());
    } else {
        println!("No config file found at {} (using defaults)", config_path.display());
    }
    println!();
    println!("  Credential variable: {}", config.provisioner.credential_var);
    println!(
        "  Fallback keystore:   {}",
        config.provisioner.fallback_keystore.display()
    );
    println!("  Output file name:    {}", config.provisioner.output_file_name);
    println!("  Key alias:           {}", config.key_alias);
    println!("  Build directory:     {}", config.build_dir.display());
}
