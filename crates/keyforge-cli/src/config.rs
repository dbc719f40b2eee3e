//! CLI configuration loading and resolution.
//!
//! Supports a per-project `.keyforge.huml` file with priority order:
//! CLI flags > environment variables > config file > defaults.
//!
//! Signing passwords are never read from the config file.

use anyhow::{Context, Result, bail};
use keyforge_core::config::{
    DEFAULT_BUILD_DIR, DEFAULT_KEY_ALIAS, KEY_ALIAS_VAR, ProvisionerConfig,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name looked up in the project directory.
pub const CONFIG_FILE_NAME: &str = ".keyforge.huml";

/// Configuration loaded from a `.keyforge.huml` file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    /// Environment variable holding the base64 keystore.
    pub credential_var: Option<String>,
    /// Local development keystore, relative to the project directory.
    pub fallback_keystore: Option<String>,
    /// File name of the decoded keystore.
    pub output_file_name: Option<String>,
    /// Key alias inside the keystore.
    pub key_alias: Option<String>,
    /// Build directory, relative to the project directory.
    pub build_dir: Option<String>,
}

/// Values supplied on the command line or through their environment variables.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub credential_var: Option<String>,
    pub key_alias: Option<String>,
    pub build_dir: Option<PathBuf>,
}

/// Resolved configuration after applying priority rules.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub provisioner: ProvisionerConfig,
    pub key_alias: String,
    pub build_dir: PathBuf,
}

/// Returns the config file path for a project.
///
/// `KEYFORGE_CONFIG` or `--config` take precedence over the project default.
pub fn config_path(project_dir: &Path, explicit: Option<&Path>) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => project_dir.join(CONFIG_FILE_NAME),
    }
}

/// Load configuration from the config file.
///
/// Returns `Ok(None)` if the config file doesn't exist.
/// Returns an error if the file exists but is invalid.
pub fn load_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    parse_config(&content)
        .with_context(|| format!("Invalid HUML in {}", path.display()))
        .map(Some)
}

fn parse_config(content: &str) -> Result<FileConfig> {
    let config: FileConfig = huml_rs::serde::from_str(content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Reject values that are present but blank.
fn validate_config(config: &FileConfig) -> Result<()> {
    let fields = [
        ("credential_var", &config.credential_var),
        ("fallback_keystore", &config.fallback_keystore),
        ("output_file_name", &config.output_file_name),
        ("key_alias", &config.key_alias),
        ("build_dir", &config.build_dir),
    ];

    for (name, value) in fields {
        if let Some(value) = value {
            if value.trim().is_empty() {
                bail!("'{}' must not be empty", name);
            }
        }
    }

    Ok(())
}

/// Resolve configuration by applying priority rules.
///
/// Priority order (highest to lowest):
/// 1. CLI flags (`--credential-var`, `--key-alias`, `--build-dir`)
/// 2. Environment variables (`KEY_ALIAS`, `KEYFORGE_BUILD_DIR`)
/// 3. Config file
/// 4. Hardcoded defaults
///
/// Relative paths are resolved against `project_dir`, and every resolved
/// path is absolute.
pub fn resolve_config(
    project_dir: &Path,
    file_config: Option<FileConfig>,
    overrides: Overrides,
) -> Result<ResolvedConfig> {
    let project_dir = std::path::absolute(project_dir)
        .with_context(|| format!("Failed to resolve {}", project_dir.display()))?;
    let mut provisioner = ProvisionerConfig::default();
    let mut key_alias = DEFAULT_KEY_ALIAS.to_string();
    let mut build_dir = PathBuf::from(DEFAULT_BUILD_DIR);

    // Apply config file (lowest priority)
    if let Some(config) = file_config {
        if let Some(var) = config.credential_var {
            provisioner.credential_var = var;
        }
        if let Some(path) = config.fallback_keystore {
            provisioner.fallback_keystore = PathBuf::from(path);
        }
        if let Some(name) = config.output_file_name {
            provisioner.output_file_name = name;
        }
        if let Some(alias) = config.key_alias {
            key_alias = alias;
        }
        if let Some(dir) = config.build_dir {
            build_dir = PathBuf::from(dir);
        }
    }

    // Apply flags and their environment variables
    if let Some(var) = overrides.credential_var {
        provisioner.credential_var = var;
    }
    if let Some(alias) = overrides.key_alias {
        if alias.trim().is_empty() {
            bail!("{} must not be empty", KEY_ALIAS_VAR);
        }
        key_alias = alias;
    }
    if let Some(dir) = overrides.build_dir {
        build_dir = dir;
    }

    provisioner.fallback_keystore = project_dir.join(&provisioner.fallback_keystore);
    let build_dir = project_dir.join(build_dir);

    provisioner.validate()?;

    Ok(ResolvedConfig {
        provisioner,
        key_alias,
        build_dir,
    })
}

/// Serialize config to HUML format.
///
/// huml-rs may not support serialization, so we manually generate HUML.
pub fn serialize_to_huml(config: &ResolvedConfig, project_dir: &Path) -> String {
    let relative = |path: &Path| -> String {
        path.strip_prefix(project_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    };

    let mut output = String::new();
    output.push_str("%HUML v0.2.0\n");
    output.push_str(&format!(
        "credential_var: {}\n",
        quote(&config.provisioner.credential_var)
    ));
    output.push_str(&format!(
        "fallback_keystore: {}\n",
        quote(&relative(&config.provisioner.fallback_keystore))
    ));
    output.push_str(&format!(
        "output_file_name: {}\n",
        quote(&config.provisioner.output_file_name)
    ));
    output.push_str(&format!("key_alias: {}\n", quote(&config.key_alias)));
    output.push_str(&format!("build_dir: {}\n", quote(&relative(&config.build_dir))));
    output
}

/// Quotes a value as a HUML string.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
