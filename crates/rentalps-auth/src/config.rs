//! [`ClientConfig`]-related definitions.

use std::path::PathBuf;
use std::time::Duration;

use config::{ConfigBuilder, ConfigError, builder::DefaultState};
use rentalps_protocol::endpoint;
use rentalps_schedule::RefreshConfig;
use rentalps_session::SessionConfig;
use serde::Deserialize;
use smart_default::SmartDefault;
use url::Url;

use crate::AuthClientError;

/// Prefix of the environment variables read by [`ClientConfig::load`].
pub const ENV_PREFIX: &str = "RENTALPS";

/// Client configuration.
#[derive(Clone, Debug, Deserialize, SmartDefault)]
#[serde(default)]
pub struct ClientConfig {
    /// Server origin. The API lives under `/api` below it.
    #[default("http://localhost:3000".to_owned())]
    pub api_url: String,

    /// Directory holding the persisted session. `None` keeps the session
    /// in memory only.
    pub session_dir: Option<PathBuf>,

    /// Key of the persisted session slot.
    #[default(SessionConfig::DEFAULT_STORAGE_KEY.to_owned())]
    pub storage_key: String,

    /// How long before expiry the proactive refresh fires.
    #[default(RefreshConfig::DEFAULT_BUFFER)]
    #[serde(with = "humantime_serde")]
    pub refresh_buffer: Duration,
}

impl ClientConfig {
    /// Creates a new [`ClientConfig`] by:
    /// - loading it from the provided `path` (if any);
    /// - merging it with the `RENTALPS_*` environment variables (if any);
    /// - using default values for missing fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::<DefaultState>::default();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }

    /// The API base: `<api_url>/api`.
    pub fn api_base(&self) -> Result<Url, AuthClientError> {
        api_base(&self.api_url)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            storage_key: self.storage_key.clone(),
            refresh: RefreshConfig::with_buffer(self.refresh_buffer),
        }
    }
}

/// Appends the API prefix to a server origin.
pub(crate) fn api_base(origin: &str) -> Result<Url, AuthClientError> {
    let url = format!("{}{}", origin.trim_end_matches('/'), endpoint::API_PREFIX);
    Url::parse(&url).map_err(|source| AuthClientError::InvalidApiUrl { url, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_points_at_local_server() {
        let config = ClientConfig::default();

        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.session_dir, None);
        assert_eq!(config.refresh_buffer, Duration::from_secs(5));
        assert_eq!(config.storage_key, "rentalps-auth-session");
    }

    #[test]
    fn test_api_base_appends_prefix() {
        let config = ClientConfig {
            api_url: "https://admin.rentalps.id/".into(),
            ..ClientConfig::default()
        };

        assert_eq!(config.api_base().unwrap().as_str(), "https://admin.rentalps.id/api");
    }

    #[test]
    fn test_api_base_rejects_garbage() {
        let config = ClientConfig {
            api_url: "not a url".into(),
            ..ClientConfig::default()
        };

        assert!(matches!(
            config.api_base(),
            Err(AuthClientError::InvalidApiUrl { .. })
        ));
    }

    #[test]
    fn test_load_reads_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            "api_url = \"http://10.0.0.2:3000\"\nrefresh_buffer = \"30s\"\nsession_dir = \"/var/lib/rentalps\"\n",
        )
        .unwrap();

        let config = ClientConfig::load(path.to_str()).unwrap();

        assert_eq!(config.api_url, "http://10.0.0.2:3000");
        assert_eq!(config.refresh_buffer, Duration::from_secs(30));
        assert_eq!(config.session_dir, Some(PathBuf::from("/var/lib/rentalps")));
        assert_eq!(config.storage_key, "rentalps-auth-session");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = ClientConfig::load(Some("/nonexistent/rentalps-client")).unwrap();

        assert_eq!(config.api_url, ClientConfig::default().api_url);
    }

    #[test]
    fn test_session_config_carries_buffer_and_key() {
        let config = ClientConfig {
            refresh_buffer: Duration::from_secs(10),
            storage_key: "custom".into(),
            ..ClientConfig::default()
        };

        let session = config.session_config();

        assert_eq!(session.refresh.buffer, Duration::from_secs(10));
        assert_eq!(session.storage_key, "custom");
    }
}
