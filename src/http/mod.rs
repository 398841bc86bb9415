//! HTTP client module for toncenter-compatible API communication.
//!
//! This module provides the network layer of the transfer pipeline: fee
//! estimation, transaction history, balance and seqno queries, and BoC
//! broadcast.
//!
//! # Architecture
//!
//! - [`ToncenterClient`] - Typed endpoints over the `{ok, result, error}` envelope
//! - [`HttpError`] - Error types for HTTP operations
//! - [`RetrySettings`] - Timeout and rate-limit back-off configuration
//! - Wire types ([`EstimateFeeRequest`], [`SourceFees`], [`RawTransaction`], ...)
//!
//! # Rate Limiting
//!
//! A `429 Too Many Requests` answer is retried with capped exponential
//! back-off. No other status is retried: server errors, transport failures
//! and timeouts surface to the caller immediately.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use url::Url;
//! use tonsend::http::{RetrySettings, ToncenterClient};
//!
//! # async fn example() -> Result<(), anyhow::Error> {
//! let settings = RetrySettings {
//!     backoff: Duration::from_secs(1),
//!     ..Default::default()
//! };
//! let client = ToncenterClient::with_config(
//!     Url::parse("https://testnet.toncenter.com/api/v2/")?,
//!     None,
//!     settings,
//! )?;
//! let balance = client.get_address_balance("EQD...").await?;
//! println!("{balance} nanotons");
//! # Ok(())
//! # }
//! ```

mod error;
mod http_client;
mod toncenter_client;
mod types;

pub use error::HttpError;
pub use http_client::RetrySettings;
pub use toncenter_client::{ToncenterClient, TransactionQuery};
pub use types::{
    BlockId, EstimateFeeRequest, MasterchainInfo, MessageData, RawMessage, RawTransaction, SourceFees,
    ToncenterResponse, TransactionId, WalletInformation,
};
