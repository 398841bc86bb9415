use std::{fs, fs::File, io::Write, path::Path};

use anyhow::{Context, Result};
use config::{Config, Environment};
use log::{info, trace};

use super::{Network, WalletConfig};

pub fn get_default_config() -> &'static str {
    include_str!("../../config/config.toml")
}

/// Loads the TOML file at `path`, creating it from the defaults first if
/// missing, then applies `TONSEND__*` environment variables and the CLI
/// network override.
pub fn load_configuration(path: &Path, cli_network: Option<Network>) -> Result<WalletConfig> {
    if !path.exists() {
        write_config_to(path, get_default_config()).context("Could not create default config")?;
        info!(path:% = path.display(); "Created new configuration file");
    }

    let filename = path.to_str().context("Invalid config file path")?;

    let mut builder = Config::builder()
        .add_source(config::File::with_name(filename).format(config::FileFormat::Toml))
        .add_source(
            Environment::with_prefix("TONSEND")
                .prefix_separator("__")
                .separator("__"),
        );

    if let Some(network) = cli_network {
        trace!("Set override: (network, {network})");
        builder = builder
            .set_override("network", network.to_string())
            .context("Could not override config property")?;
    }

    let config: WalletConfig = builder
        .build()
        .context("Could not build config")?
        .try_deserialize()
        .context("Invalid configuration")?;

    Ok(config)
}

pub fn write_config_to(path: &Path, source: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("Failed to create parent directories")?;
    };

    let mut file = File::create(path).context("Failed to create config file")?;
    file.write_all(source.as_bytes())
        .context("Failed to write config content")?;
    file.write_all(b"\n").context("Failed to write newline")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::transactions::CommentEncoding;

    #[test]
    fn test_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let config = load_configuration(&path, None).unwrap();

        assert!(path.exists());
        assert_eq!(config.network, Network::Mainnet);
        assert_eq!(config.base_url().unwrap().as_str(), "https://toncenter.com/api/v2/");
        assert_eq!(config.api_key(), None);
        assert_eq!(config.comment_encoding, CommentEncoding::LegacyBase64);
        assert_eq!(config.max_amount_retries, 3);
        assert_eq!(config.history_limit, 1);

        let retry = config.retry_settings();
        assert_eq!(retry.backoff, Duration::from_secs(60));
        assert_eq!(retry.max_backoff, Duration::from_secs(600));
        assert_eq!(retry.max_retries, 5);
        assert_eq!(config.confirmation_settings().attempts, 20);
    }

    #[test]
    fn test_file_values_and_cli_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        write_config_to(
            &path,
            "network = \"mainnet\"\napi_key = \"secret\"\ncomment_encoding = \"text\"\nmax_rate_limit_retries = 2\n",
        )
        .unwrap();

        let config = load_configuration(&path, Some(Network::Testnet)).unwrap();

        assert_eq!(config.network, Network::Testnet);
        assert_eq!(config.base_url().unwrap().host_str(), Some("testnet.toncenter.com"));
        assert_eq!(config.api_key().as_deref(), Some("secret"));
        assert_eq!(config.comment_encoding, CommentEncoding::Text);
        assert_eq!(config.max_rate_limit_retries, 2);
        // unset keys keep their defaults
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn test_explicit_base_url_wins() {
        let config = WalletConfig {
            base_url: Some("http://localhost:8081/api/v2/".to_string()),
            network: Network::Testnet,
            ..Default::default()
        };
        assert_eq!(config.base_url().unwrap().as_str(), "http://localhost:8081/api/v2/");
    }
}
