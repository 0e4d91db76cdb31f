mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    expand_paths(&mut config);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./hlsvault.toml",
        "~/.config/hlsvault/config.toml",
        "/etc/hlsvault/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

fn expand_paths(config: &mut Config) {
    let raw = config.record.path.to_string_lossy().into_owned();
    let expanded = shellexpand::tilde(&raw);
    config.record.path = expanded.as_ref().into();
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    // Validate server config
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    // Validate record config
    if config.record.path.as_os_str().is_empty() {
        anyhow::bail!("Record path cannot be empty");
    }

    if config.record.clean_hour >= 24 {
        anyhow::bail!(
            "Clean hour must be between 0 and 23, got {}",
            config.record.clean_hour
        );
    }

    if let Some(ref filter) = config.record.filter {
        regex::Regex::new(filter)
            .with_context(|| format!("Invalid record filter: {:?}", filter))?;
    }

    Ok(())
}
