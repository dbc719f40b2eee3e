use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use keyforge_core::signing::BuildScope;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod config;

use commands::{
    clean::handle_clean_command,
    config::{ConfigCommands, handle_config_command},
    encode::handle_encode_command,
    provision::{ProvisionArgs, handle_provision_command},
    verify::handle_verify_command,
};

#[derive(Parser)]
#[command(name = "keyforge")]
#[command(about = "Provision Android signing keystores for release builds", long_about = None)]
#[command(version)]
struct Cli {
    /// Project root containing the android/ directory
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Config file (defaults to <project-dir>/.keyforge.huml)
    #[arg(long, env = "KEYFORGE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Build output directory (overrides config)
    #[arg(long, env = "KEYFORGE_BUILD_DIR", global = true)]
    build_dir: Option<PathBuf>,

    /// Build id isolating this build's keystore from concurrent builds
    #[arg(long, env = "KEYFORGE_BUILD_ID", global = true)]
    build_id: Option<String>,

    /// Environment variable holding the base64 keystore (overrides config)
    #[arg(long, global = true)]
    credential_var: Option<String>,

    /// Key alias (overrides config)
    #[arg(long, env = "KEY_ALIAS", global = true)]
    key_alias: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode the keystore credential and resolve the signing identity
    Provision(ProvisionArgs),

    /// Check a keystore file (defaults to the local fallback keystore)
    Verify {
        /// Keystore file to check
        path: Option<PathBuf>,
    },

    /// Base64-encode a keystore for use as a CI secret
    Encode {
        /// Keystore file to encode
        file: PathBuf,

        /// Wrap lines at this many columns (76 for MIME)
        #[arg(long)]
        wrap: Option<usize>,

        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Remove decoded keystores from the build directory
    Clean,

    /// Manage project configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "keyforge=debug,keyforge_core=debug"
    } else {
        "keyforge=info,keyforge_core=info"
    };

    // Logs go to stderr so stdout stays usable in scripts
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (doesn't override existing env vars)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Encoding doesn't need project configuration
    if let Commands::Encode { file, wrap, output } = cli.command {
        return handle_encode_command(&file, wrap, output).await;
    }

    let project_dir = std::path::absolute(&cli.project_dir)
        .with_context(|| format!("Invalid project directory {}", cli.project_dir.display()))?;
    let config_path = config::config_path(&project_dir, cli.config.as_deref());
    let file_config = config::load_config(&config_path)?;

    let resolved = config::resolve_config(
        &project_dir,
        file_config,
        config::Overrides {
            credential_var: cli.credential_var,
            key_alias: cli.key_alias,
            build_dir: cli.build_dir,
        },
    )
    .context("Invalid configuration")?;

    let mut scope = BuildScope::new(&resolved.build_dir);
    if let Some(build_id) = cli.build_id.as_deref() {
        scope = scope.with_build_id(build_id)?;
    }

    tracing::debug!(
        build_dir = %scope.build_dir().display(),
        build_id = scope.build_id().unwrap_or("-"),
        "Resolved build scope"
    );

    match cli.command {
        Commands::Provision(args) => handle_provision_command(resolved, scope, args).await?,
        Commands::Verify { path } => handle_verify_command(&resolved, path).await?,
        Commands::Clean => handle_clean_command(&scope).await?,
        Commands::Config(cmd) => {
            handle_config_command(cmd, &resolved, &config_path, &project_dir)?
        }
        Commands::Encode { .. } => unreachable!(), // Handled above
    }

    Ok(())
}
