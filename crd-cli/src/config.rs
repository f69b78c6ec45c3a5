use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CrdConfig {
    pub service_url: Option<String>,
}

pub const DEFAULT_SERVICE_URL: &str = "http://localhost:8200";

/// Returns `~/.config/crd/`, creating it if it doesn't exist.
pub fn config_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = dirs::config_dir()
        .ok_or("could not determine config directory")?
        .join("crd");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
    }
    Ok(dir)
}

/// Returns `~/.config/crd/config.toml`.
pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
    Ok(config_dir()?.join("config.toml"))
}

/// Load config from `~/.config/crd/config.toml`. Returns default if missing.
pub fn load_config() -> Result<CrdConfig, Box<dyn std::error::Error>> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(CrdConfig::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    let config: CrdConfig = toml::from_str(&contents)
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))?;
    Ok(config)
}

/// Save config to `~/.config/crd/config.toml`.
pub fn save_config(config: &CrdConfig) -> Result<(), Box<dyn std::error::Error>> {
    let path = config_path()?;
    let contents = toml::to_string_pretty(config)
        .map_err(|e| format!("failed to serialize config: {e}"))?;
    std::fs::write(&path, contents)?;
    Ok(())
}

/// Resolve the service URL from CLI override, config, or the default.
pub fn resolve_url(cli_override: Option<&str>, config: &CrdConfig) -> String {
    cli_override
        .map(str::to_string)
        .or_else(|| config.service_url.clone())
        .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_round_trip() {
        let config = CrdConfig {
            service_url: Some("https://crd.example.com".into()),
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let restored: CrdConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            restored.service_url.as_deref(),
            Some("https://crd.example.com")
        );
    }

    #[test]
    fn test_config_deserialize_empty_toml() {
        let config: CrdConfig = toml::from_str("").unwrap();
        assert!(config.service_url.is_none());
    }

    #[test]
    fn test_resolve_url_prefers_override() {
        let config = CrdConfig {
            service_url: Some("https://configured.example.com".into()),
        };
        assert_eq!(
            resolve_url(Some("https://flag.example.com"), &config),
            "https://flag.example.com"
        );
    }

    #[test]
    fn test_resolve_url_falls_back_to_config_then_default() {
        let config = CrdConfig {
            service_url: Some("https://configured.example.com".into()),
        };
        assert_eq!(resolve_url(None, &config), "https://configured.example.com");
        assert_eq!(resolve_url(None, &CrdConfig::default()), DEFAULT_SERVICE_URL);
    }
}
