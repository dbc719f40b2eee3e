//! `keyforge provision`: resolve the signing keystore for this build.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use keyforge_core::KeyforgeError;
use keyforge_core::config::STORE_PASSWORD_VAR;
use keyforge_core::models::{KeystoreSource, SigningIdentity, SigningSecrets};
use keyforge_core::signing::{BuildScope, Provisioner, write_key_properties};
use secrecy::SecretString;

use crate::config::ResolvedConfig;

#[derive(Args)]
pub struct ProvisionArgs {
    /// Keystore password
    #[arg(long, env = "KEYSTORE_PASSWORD", hide_env_values = true)]
    pub store_password: Option<String>,

    /// Key password (defaults to the keystore password)
    #[arg(long, env = "KEY_PASSWORD", hide_env_values = true)]
    pub key_password: Option<String>,

    /// Write a key.properties file for Gradle to this path
    #[arg(long)]
    pub key_properties: Option<PathBuf>,

    /// Print the signing identity as JSON
    #[arg(long)]
    pub json: bool,

    /// Skip checking that the keystore file is usable
    #[arg(long)]
    pub no_verify: bool,
}

impl std::fmt::Debug for ProvisionArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |p: &Option<String>| p.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ProvisionArgs")
            .field("store_password", &redact(&self.store_password))
            .field("key_password", &redact(&self.key_password))
            .field("key_properties", &self.key_properties)
            .field("json", &self.json)
            .field("no_verify", &self.no_verify)
            .finish()
    }
}

pub async fn handle_provision_command(
    config: ResolvedConfig,
    scope: BuildScope,
    args: ProvisionArgs,
) -> Result<()> {
    let secrets = signing_secrets(&config, args.store_password, args.key_password)?;

    let mut provisioner = Provisioner::new(config.provisioner, scope, secrets);
    let identity = provisioner
        .provision_from_env()
        .await
        .context("Keystore provisioning failed")?;

    if !args.no_verify {
        identity
            .ensure_usable()
            .await
            .context("Signing keystore is not usable")?;
    }

    if let Some(path) = &args.key_properties {
        write_key_properties(path, identity)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Wrote signing configuration to {}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&identity.summary())?);
    } else {
        print_identity(identity);
    }

    Ok(())
}

fn signing_secrets(
    config: &ResolvedConfig,
    store_password: Option<String>,
    key_password: Option<String>,
) -> Result<SigningSecrets> {
    let store_password = store_password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| KeyforgeError::MissingSecret {
            var: STORE_PASSWORD_VAR.to_string(),
        })?;

    let secrets = SigningSecrets::new(
        SecretString::from(store_password),
        config.key_alias.clone(),
        key_password.map(SecretString::from),
    )?;

    Ok(secrets)
}

fn print_identity(identity: &SigningIdentity) {
    println!("Signing identity");
    println!("================");
    println!("  Keystore:  {}", identity.store_file.display());
    println!("  Key alias: {}", identity.key_alias());
    match &identity.source {
        KeystoreSource::Decoded {
            var,
            keystore_type,
            sha256,
            size,
        } => {
            println!("  Source:    {} (decoded)", var);
            println!("  Type:      {}", keystore_type);
            println!("  Size:      {} bytes", size);
            println!("  SHA-256:   {}", sha256);
        }
        KeystoreSource::LocalFallback => {
            println!("  Source:    local fallback keystore");
        }
    }
}
