//! `keyforge clean`: remove decoded keystores from the build directory.

use anyhow::{Context, Result};
use keyforge_core::signing::{BuildScope, cleanup_signing_dir};

pub async fn handle_clean_command(scope: &BuildScope) -> Result<()> {
    let removed = cleanup_signing_dir(scope)
        .await
        .context("Failed to clean signing directory")?;

    if removed {
        println!("Removed {}", scope.output_dir().display());
    } else {
        println!("Nothing to clean in {}", scope.build_dir().display());
    }

    Ok(())
}
