//! `keyforge verify`: inspect a keystore file before signing.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use keyforge_core::signing::inspect_keystore;

use crate::config::ResolvedConfig;

pub async fn handle_verify_command(config: &ResolvedConfig, path: Option<PathBuf>) -> Result<()> {
    let path = path.unwrap_or_else(|| config.provisioner.fallback_keystore.clone());

    if !path.exists() {
        bail!("Keystore not found: {}", path.display());
    }

    let info = inspect_keystore(&path)
        .await
        .with_context(|| format!("Failed to inspect {}", path.display()))?;

    println!("Keystore:  {}", path.display());
    println!("Type:      {}", info.keystore_type);
    println!("Size:      {} bytes", info.size);
    println!("SHA-256:   {}", info.sha256);

    Ok(())
}
