//! Configuration Loader
//!
//! Loads and merges configuration from files, a `.env` file and the environment.

use crate::config::settings::WacloudConfig;
use crate::error::{Result, WacloudError};
use std::path::{Path, PathBuf};

/// Configuration loader with support for multiple sources
pub struct ConfigLoader {
    config: WacloudConfig,
}

impl ConfigLoader {
    /// Load from default file locations, then `.env`, then environment variables
    pub fn new() -> Result<Self> {
        let mut loader = Self {
            config: WacloudConfig::default(),
        };

        loader.load_from_default_paths()?;

        // A missing .env file is fine
        let _ = dotenvy::dotenv();
        loader.apply_env_overrides(|name| std::env::var(name).ok());

        Ok(loader)
    }

    /// Load from a specific config file, then environment variables
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut loader = Self {
            config: WacloudConfig::default(),
        };

        loader.load_from_file(path)?;
        loader.apply_env_overrides(|name| std::env::var(name).ok());

        Ok(loader)
    }

    /// Load configuration from default paths
    fn load_from_default_paths(&mut self) -> Result<()> {
        for path in Self::get_config_paths() {
            if path.exists() {
                self.load_from_file(&path)?;
            }
        }

        Ok(())
    }

    /// Get list of config paths to check, lowest priority first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Some(home_dir) = dirs::home_dir() {
            paths.push(home_dir.join(".wacloud").join("config.json"));
        }

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("wacloud").join("config.json"));
        }

        paths.push(PathBuf::from("wacloud.json"));

        if let Ok(custom_path) = std::env::var("WACLOUD_CONFIG_PATH") {
            paths.push(PathBuf::from(custom_path));
        }

        paths
    }

    /// Load configuration from a specific file
    fn load_from_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            WacloudError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let value: serde_json::Value = serde_json::from_str(&content).map_err(|e| {
            WacloudError::Config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        self.merge_value(value).map_err(|e| {
            WacloudError::Config(format!("Invalid config in {}: {}", path.display(), e))
        })
    }

    /// Merge a partial JSON document over the current config (later sources win)
    fn merge_value(&mut self, overlay: serde_json::Value) -> std::result::Result<(), serde_json::Error> {
        let mut base = serde_json::to_value(&self.config)?;
        merge_json(&mut base, overlay);
        self.config = serde_json::from_value(base)?;
        Ok(())
    }

    /// Apply `WHATSAPP_*` overrides using the given variable lookup
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let client = &mut self.config.client;

        if let Some(token) = lookup("WHATSAPP_ACCESS_TOKEN") {
            client.access_token = token;
        }
        if let Some(id) = lookup("WHATSAPP_PHONE_NUMBER_ID") {
            client.phone_number_id = id;
        }
        if let Some(id) = lookup("WHATSAPP_BUSINESS_ACCOUNT_ID") {
            client.business_account_id = Some(id);
        }
        if let Some(version) = lookup("WHATSAPP_API_VERSION") {
            client.api_version = version;
        }

        let webhook = &mut self.config.webhook;
        if let Some(secret) = lookup("WHATSAPP_APP_SECRET") {
            webhook.app_secret = Some(secret);
        }
        if let Some(token) = lookup("WHATSAPP_VERIFY_TOKEN") {
            webhook.verify_token = Some(token);
        }
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &WacloudConfig {
        &self.config
    }

    /// Take ownership of the configuration
    pub fn into_config(self) -> WacloudConfig {
        self.config
    }
}

/// Recursively overlay `overlay` onto `base`; objects merge, everything else replaces
fn merge_json(base: &mut serde_json::Value, overlay: serde_json::Value) {
    match (base, overlay) {
        (serde_json::Value::Object(base), serde_json::Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn empty_loader() -> ConfigLoader {
        ConfigLoader {
            config: WacloudConfig::default(),
        }
    }

    #[test]
    fn test_load_from_custom_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{
                "client": {{
                    "access_token": "EAAG-file",
                    "phone_number_id": "1111",
                    "rate_limit": {{ "max_retries": 5 }}
                }},
                "webhook": {{ "verify_token": "hub-token" }}
            }}"#
        )
        .unwrap();

        let mut loader = empty_loader();
        loader.load_from_file(file.path()).unwrap();

        let config = loader.config();
        assert_eq!(config.client.access_token, "EAAG-file");
        assert_eq!(config.client.rate_limit.max_retries, 5);
        assert_eq!(config.client.rate_limit.max_requests_per_minute, 250);
        assert_eq!(config.webhook.verify_token.as_deref(), Some("hub-token"));
    }

    #[test]
    fn test_later_file_overrides_earlier() {
        let mut first = NamedTempFile::new().unwrap();
        writeln!(
            first,
            r#"{{ "client": {{ "access_token": "a", "phone_number_id": "1", "api_version": "v19.0" }} }}"#
        )
        .unwrap();
        let mut second = NamedTempFile::new().unwrap();
        writeln!(second, r#"{{ "client": {{ "access_token": "b" }} }}"#).unwrap();

        let mut loader = empty_loader();
        loader.load_from_file(first.path()).unwrap();
        loader.load_from_file(second.path()).unwrap();

        let client = &loader.config().client;
        assert_eq!(client.access_token, "b");
        assert_eq!(client.phone_number_id, "1");
        assert_eq!(client.api_version, "v19.0");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not json").unwrap();

        let mut loader = empty_loader();
        let err = loader.load_from_file(file.path()).unwrap_err();
        assert!(matches!(err, WacloudError::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("WHATSAPP_ACCESS_TOKEN", "env-token"),
            ("WHATSAPP_PHONE_NUMBER_ID", "2222"),
            ("WHATSAPP_BUSINESS_ACCOUNT_ID", "waba-1"),
            ("WHATSAPP_APP_SECRET", "shh"),
        ]
        .into_iter()
        .collect();

        let mut loader = empty_loader();
        loader.apply_env_overrides(|name| vars.get(name).map(|v| v.to_string()));

        let config = loader.into_config();
        assert_eq!(config.client.access_token, "env-token");
        assert_eq!(config.client.phone_number_id, "2222");
        assert_eq!(config.client.business_account_id.as_deref(), Some("waba-1"));
        assert_eq!(config.client.api_version, "v22.0");
        assert_eq!(config.webhook.app_secret.as_deref(), Some("shh"));
        assert!(config.webhook.verify_token.is_none());
    }
}
