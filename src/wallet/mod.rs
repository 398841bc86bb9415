//! The wallet/blockchain collaborator of the transfer pipeline.
//!
//! [`WalletClient`] is the seam the submission orchestrator talks to: chain
//! height, balance, address validation and broadcast. [`ToncenterWallet`] is
//! the production implementation; tests substitute their own.

mod signer;
mod toncenter_wallet;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::address::{AddressError, TonAddress};
use crate::cell::{Cell, CellError};
use crate::http::HttpError;

pub use signer::{DEFAULT_SUBWALLET_ID, MAX_MESSAGES, V4R2Signer, derive_address};
pub use toncenter_wallet::{ConfirmationSettings, ToncenterWallet};

/// Send mode: pay transfer fees separately from the message value.
pub const SEND_MODE_PAY_FEES_SEPARATELY: u8 = 1;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("Blockchain API error: {0}")]
    Http(#[from] HttpError),

    #[error("Failed to build message: {0}")]
    Cell(#[from] CellError),

    #[error("A transfer carries 1 to {max} messages, got {0}", max = MAX_MESSAGES)]
    InvalidMessageCount(usize),

    #[error("Transaction was not confirmed: seqno still {seqno} after {attempts} checks")]
    NotConfirmed { seqno: u32, attempts: u32 },
}

/// Hash of a broadcast external message, as returned by the network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TxHash(String);

impl TxHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One internal message to be carried by a wallet transfer.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub destination: TonAddress,
    /// Nanotons.
    pub amount: u64,
    pub bounce: bool,
    pub mode: u8,
    pub body: Arc<Cell>,
}

#[async_trait]
pub trait WalletClient: Send + Sync {
    /// Address of the wallet funds are sent from.
    fn source_address(&self) -> &TonAddress;

    /// Latest masterchain block seqno.
    async fn current_height(&self) -> Result<u64, WalletError>;

    /// Balance of `address` in nanotons.
    async fn current_balance(&self, address: &TonAddress) -> Result<u64, WalletError>;

    fn parse_address(&self, address: &str) -> Result<TonAddress, WalletError> {
        Ok(TonAddress::parse(address)?)
    }

    /// Signs `messages`, broadcasts them and waits until the wallet has
    /// processed them.
    async fn broadcast_and_await_hash(&self, messages: Vec<OutgoingMessage>) -> Result<TxHash, WalletError>;
}
