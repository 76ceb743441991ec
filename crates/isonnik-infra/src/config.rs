//! Client configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.isonnik/` in production)
//! and deserializes it into [`ClientConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::Path;

use isonnik_types::config::ClientConfig;

/// Load client configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`ClientConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - If the file exists and parses successfully, returns the parsed config.
pub async fn load_client_config(data_dir: &Path) -> ClientConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ClientConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ClientConfig::default();
        }
    };

    match toml::from_str::<ClientConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ClientConfig::default()
        }
    }
}

/// Apply command-line overrides on top of the file.
pub fn apply_overrides(
    mut config: ClientConfig,
    api_url: Option<String>,
    profile: Option<String>,
) -> ClientConfig {
    if let Some(url) = api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }
    if let Some(profile) = profile {
        config.profile = profile;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use isonnik_types::config::StorageKind;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_client_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_client_config(tmp.path()).await;
        assert_eq!(config.api_base_url, "http://127.0.0.1:8080");
        assert_eq!(config.free_message_limit, 5);
        assert!(config.single_flight);
    }

    #[tokio::test]
    async fn load_client_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
api_base_url = "https://dreams.example"
storage = "sqlite"
limits_gate = true

[speech]
speak_command = ["espeak-ng", "-v", "{lang}"]
"#,
        )
        .await
        .unwrap();

        let config = load_client_config(tmp.path()).await;
        assert_eq!(config.api_base_url, "https://dreams.example");
        assert_eq!(config.storage, StorageKind::Sqlite);
        assert!(config.limits_gate);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.speech.speak_command.unwrap()[0], "espeak-ng");
    }

    #[tokio::test]
    async fn load_client_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "this is not { valid toml !!!")
            .await
            .unwrap();

        let config = load_client_config(tmp.path()).await;
        assert_eq!(config.profile, "default");
    }

    #[test]
    fn overrides_win_over_file() {
        let config = apply_overrides(
            ClientConfig::default(),
            Some("http://localhost:9000/".to_string()),
            Some("work".to_string()),
        );
        assert_eq!(config.api_base_url, "http://localhost:9000");
        assert_eq!(config.profile, "work");

        let untouched = apply_overrides(ClientConfig::default(), None, None);
        assert_eq!(untouched.profile, "default");
    }
}
