use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::RetrySettings;
use crate::transactions::{CommentEncoding, DEFAULT_MAX_AMOUNT_RETRIES};
use crate::wallet::ConfirmationSettings;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://toncenter.com/api/v2/",
            Network::Testnet => "https://testnet.toncenter.com/api/v2/",
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(format!("unknown network '{other}', expected 'mainnet' or 'testnet'")),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WalletConfig {
    pub network: Network,
    /// Overrides the network's public endpoint.
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub credentials_path: PathBuf,
    pub request_timeout_secs: u64,
    pub rate_limit_backoff_secs: u64,
    pub rate_limit_max_backoff_secs: u64,
    pub max_rate_limit_retries: u32,
    pub max_amount_retries: u32,
    pub comment_encoding: CommentEncoding,
    pub history_limit: u32,
    pub message_ttl_secs: u64,
    pub confirmation_poll_secs: u64,
    pub confirmation_attempts: u32,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network: Network::Mainnet,
            base_url: None,
            api_key: None,
            credentials_path: PathBuf::from(".env"),
            request_timeout_secs: 60,
            rate_limit_backoff_secs: 60,
            rate_limit_max_backoff_secs: 600,
            max_rate_limit_retries: 5,
            max_amount_retries: DEFAULT_MAX_AMOUNT_RETRIES,
            comment_encoding: CommentEncoding::LegacyBase64,
            history_limit: 1,
            message_ttl_secs: 60,
            confirmation_poll_secs: 3,
            confirmation_attempts: 20,
        }
    }
}

impl WalletConfig {
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        let raw = self
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| self.network.default_base_url());
        Url::parse(raw)
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key.clone().filter(|k| !k.is_empty())
    }

    pub fn retry_settings(&self) -> RetrySettings {
        RetrySettings {
            timeout: Duration::from_secs(self.request_timeout_secs),
            backoff: Duration::from_secs(self.rate_limit_backoff_secs),
            max_backoff: Duration::from_secs(self.rate_limit_max_backoff_secs),
            max_retries: self.max_rate_limit_retries,
        }
    }

    pub fn confirmation_settings(&self) -> ConfirmationSettings {
        ConfirmationSettings {
            message_ttl: Duration::from_secs(self.message_ttl_secs),
            poll_interval: Duration::from_secs(self.confirmation_poll_secs),
            attempts: self.confirmation_attempts,
        }
    }
}
