use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::Mutex;

use super::{OutgoingMessage, TxHash, V4R2Signer, WalletClient, WalletError};
use crate::address::TonAddress;
use crate::cell::serialize_boc_base64;
use crate::http::ToncenterClient;
use crate::log::mask_string;

const ACTIVE_STATE: &str = "active";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationSettings {
    /// How long a signed message stays valid.
    pub message_ttl: Duration,
    pub poll_interval: Duration,
    pub attempts: u32,
}

impl Default for ConfirmationSettings {
    fn default() -> Self {
        Self {
            message_ttl: Duration::from_secs(60),
            poll_interval: Duration::from_secs(3),
            attempts: 20,
        }
    }
}

/// A v4r2 wallet driven through toncenter.
///
/// Broadcasts are serialized: the seqno is read, signed into the message and
/// observed to advance while `send_lock` is held, so two transfers from the
/// same instance never reuse a seqno. Share one instance (behind an `Arc`)
/// per source address.
pub struct ToncenterWallet {
    client: Arc<ToncenterClient>,
    signer: V4R2Signer,
    settings: ConfirmationSettings,
    send_lock: Mutex<()>,
}

impl ToncenterWallet {
    pub fn new(client: Arc<ToncenterClient>, signer: V4R2Signer, settings: ConfirmationSettings) -> Self {
        Self {
            client,
            signer,
            settings,
            send_lock: Mutex::new(()),
        }
    }

    /// Seqno and whether the contract still has to be deployed.
    async fn wallet_state(&self) -> Result<(u32, bool), WalletError> {
        let info = self
            .client
            .get_wallet_information(&self.signer.address().to_user_friendly())
            .await?;
        Ok((info.seqno.unwrap_or(0), info.account_state != ACTIVE_STATE))
    }

    async fn current_seqno(&self) -> Result<u32, WalletError> {
        Ok(self.wallet_state().await?.0)
    }

    async fn await_seqno_after(&self, seqno: u32) -> Result<(), WalletError> {
        for attempt in 1..=self.settings.attempts {
            tokio::time::sleep(self.settings.poll_interval).await;
            match self.current_seqno().await {
                Ok(current) if current > seqno => {
                    debug!(attempt = attempt, seqno = current; "Wallet seqno advanced");
                    return Ok(());
                },
                Ok(_) => {},
                Err(e) => warn!(attempt = attempt, error:% = e; "Failed to poll wallet seqno"),
            }
        }

        Err(WalletError::NotConfirmed {
            seqno,
            attempts: self.settings.attempts,
        })
    }
}

#[async_trait]
impl WalletClient for ToncenterWallet {
    fn source_address(&self) -> &TonAddress {
        self.signer.address()
    }

    async fn current_height(&self) -> Result<u64, WalletError> {
        Ok(self.client.get_masterchain_info().await?.last.seqno)
    }

    async fn current_balance(&self, address: &TonAddress) -> Result<u64, WalletError> {
        Ok(self.client.get_address_balance(&address.to_user_friendly()).await?)
    }

    async fn broadcast_and_await_hash(&self, messages: Vec<OutgoingMessage>) -> Result<TxHash, WalletError> {
        let _guard = self.send_lock.lock().await;

        let (seqno, deploy) = self.wallet_state().await?;
        let valid_until = Utc::now()
            .timestamp()
            .saturating_add(self.settings.message_ttl.as_secs() as i64)
            .clamp(0, u32::MAX as i64) as u32;

        let external = self.signer.build_signed_transfer(seqno, valid_until, &messages, deploy)?;
        let boc = serialize_boc_base64(&external)?;

        info!(
            source = &*mask_string(&self.signer.address().to_user_friendly()),
            seqno = seqno,
            deploy = deploy,
            messages = messages.len();
            "Broadcasting transfer"
        );
        let hash = TxHash::new(self.client.send_boc_return_hash(&boc).await?);

        self.await_seqno_after(seqno).await?;
        info!(hash:% = hash, seqno = seqno; "Transfer confirmed");
        Ok(hash)
    }
}
