use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::submission::SubmissionError;
use crate::wallet::TxHash;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    #[default]
    Ton,
    Usdt,
}

impl AssetKind {
    /// Comment attached when the caller supplies none.
    pub fn default_comment(&self) -> &'static str {
        match self {
            AssetKind::Ton => "Sending TON",
            AssetKind::Usdt => "Sending USDT",
        }
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ton" => Ok(AssetKind::Ton),
            "usdt" => Ok(AssetKind::Usdt),
            other => Err(format!("unknown asset '{other}', expected 'ton' or 'usdt'")),
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Ton => write!(f, "TON"),
            AssetKind::Usdt => write!(f, "USDT"),
        }
    }
}

/// One transfer attempt. Immutable; a retry with a smaller amount is a new
/// request built with [`TransferRequest::with_amount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    destination: String,
    amount: u64,
    asset: AssetKind,
    comment: Option<String>,
}

impl TransferRequest {
    pub fn new(destination: impl Into<String>, amount: u64, asset: AssetKind, comment: Option<String>) -> Self {
        Self {
            destination: destination.into(),
            amount,
            asset,
            comment: comment.filter(|c| !c.is_empty()),
        }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Nanotons.
    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn asset(&self) -> AssetKind {
        self.asset
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// The comment to put on chain: the caller's, or the asset's default.
    pub fn effective_comment(&self) -> &str {
        self.comment().unwrap_or_else(|| self.asset.default_comment())
    }

    pub fn with_amount(&self, amount: u64) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }
}

/// Terminal result of [`TransferSubmitter::submit`](super::TransferSubmitter::submit).
#[derive(Debug)]
pub enum SubmissionOutcome {
    Sent(TxHash),
    Cancelled,
    InsufficientBalance { balance: u64, requested: u64 },
    Failed(SubmissionError),
}

impl SubmissionOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SubmissionOutcome::Sent(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_amount_leaves_original_untouched() {
        let request = TransferRequest::new("EQdest", 1_000_000_000, AssetKind::Ton, Some("hi".to_string()));
        let smaller = request.with_amount(400_000_000);

        assert_eq!(request.amount(), 1_000_000_000);
        assert_eq!(smaller.amount(), 400_000_000);
        assert_eq!(smaller.destination(), "EQdest");
        assert_eq!(smaller.comment(), Some("hi"));
    }

    #[test]
    fn test_default_comment_per_asset() {
        let ton = TransferRequest::new("EQdest", 1, AssetKind::Ton, None);
        let usdt = TransferRequest::new("EQdest", 1, AssetKind::Usdt, Some(String::new()));
        assert_eq!(ton.effective_comment(), "Sending TON");
        assert_eq!(usdt.effective_comment(), "Sending USDT");
    }

    #[test]
    fn test_asset_from_str() {
        assert_eq!("TON".parse::<AssetKind>(), Ok(AssetKind::Ton));
        assert_eq!("usdt".parse::<AssetKind>(), Ok(AssetKind::Usdt));
        assert!("btc".parse::<AssetKind>().is_err());
    }
}
