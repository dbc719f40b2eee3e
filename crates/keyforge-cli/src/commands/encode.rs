//! `keyforge encode`: turn a keystore into a value for a CI secret.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use keyforge_core::signing::{detect_keystore_type, encode_keystore};
use zeroize::Zeroizing;

pub async fn handle_encode_command(
    file: &Path,
    wrap: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let data = Zeroizing::new(
        tokio::fs::read(file)
            .await
            .with_context(|| format!("Failed to read {}", file.display()))?,
    );

    if data.is_empty() {
        bail!("Keystore {} is empty", file.display());
    }

    tracing::debug!(
        "Encoding {} keystore ({} bytes)",
        detect_keystore_type(&data),
        data.len()
    );

    let encoded = Zeroizing::new(encode_keystore(&data, wrap));

    match output {
        Some(path) => {
            tokio::fs::write(&path, format!("{}\n", encoded.as_str()))
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote base64 keystore to {}", path.display());
        }
        None => println!("{}", encoded.as_str()),
    }

    Ok(())
}
