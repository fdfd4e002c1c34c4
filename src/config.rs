use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::Handedness;

/// Default localization endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.multiset.com/vps/localize";

/// Connection settings for the localization service.
///
/// Map id and credentials come from the surrounding application, typically a
/// JSON file next to the deployment; they are never compiled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VpsConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    pub map_id: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub handedness: Handedness,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

impl VpsConfig {
    /// Deserializes a config from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_fills_defaults() {
        let config: VpsConfig = serde_json::from_str(
            r#"{"map_id":"MAP_CC3MMTRYKP67","client_id":"id","client_secret":"secret"}"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.handedness, Handedness::Right);
        assert_eq!(config.map_id, "MAP_CC3MMTRYKP67");
    }

    #[test]
    fn explicit_fields_override_defaults() {
        let config: VpsConfig = serde_json::from_str(
            r#"{
                "endpoint": "https://vps.example.com/localize",
                "map_id": "m",
                "client_id": "id",
                "client_secret": "secret",
                "handedness": "left"
            }"#,
        )
        .unwrap();
        assert_eq!(config.endpoint, "https://vps.example.com/localize");
        assert_eq!(config.handedness, Handedness::Left);
    }

    #[test]
    fn missing_credentials_fail_to_parse() {
        let result: Result<VpsConfig, _> = serde_json::from_str(r#"{"map_id":"m"}"#);
        assert!(result.is_err());
    }
}
