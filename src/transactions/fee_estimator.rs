use std::sync::Arc;

use log::{debug, info};
use thiserror::Error;

use crate::cell::{Cell, CellError, serialize_boc_base64};
use crate::http::{EstimateFeeRequest, HttpError, SourceFees, ToncenterClient};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeeError {
    #[error("Fee total overflows u64")]
    Overflow,

    #[error("Fee component {name} is negative: {value}")]
    NegativeComponent { name: &'static str, value: i64 },
}

#[derive(Debug, Error)]
pub enum FeeEstimationError {
    #[error("Fee estimation rejected by remote service: {0}")]
    RemoteRejected(String),

    #[error("Fee estimation response has no result")]
    MissingResult,

    #[error("Fee estimation request failed: {0}")]
    Http(HttpError),

    #[error(transparent)]
    Fee(#[from] FeeError),

    #[error("Failed to encode message body: {0}")]
    Encoding(#[from] CellError),
}

impl From<HttpError> for FeeEstimationError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::RemoteRejected(msg) => FeeEstimationError::RemoteRejected(msg),
            HttpError::MissingResult => FeeEstimationError::MissingResult,
            other => FeeEstimationError::Http(other),
        }
    }
}

/// The four source fee components of a simulated message, in nanotons.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub in_fwd_fee: u64,
    pub storage_fee: u64,
    pub gas_fee: u64,
    pub fwd_fee: u64,
}

impl FeeBreakdown {
    pub fn total(&self) -> Result<u64, FeeError> {
        [self.storage_fee, self.gas_fee, self.fwd_fee]
            .into_iter()
            .try_fold(self.in_fwd_fee, |acc, fee| acc.checked_add(fee))
            .ok_or(FeeError::Overflow)
    }
}

impl TryFrom<SourceFees> for FeeBreakdown {
    type Error = FeeError;

    fn try_from(fees: SourceFees) -> Result<Self, Self::Error> {
        fn component(name: &'static str, value: i64) -> Result<u64, FeeError> {
            u64::try_from(value).map_err(|_| FeeError::NegativeComponent { name, value })
        }

        Ok(Self {
            in_fwd_fee: component("in_fwd_fee", fees.in_fwd_fee)?,
            storage_fee: component("storage_fee", fees.storage_fee)?,
            gas_fee: component("gas_fee", fees.gas_fee)?,
            fwd_fee: component("fwd_fee", fees.fwd_fee)?,
        })
    }
}

pub struct FeeEstimator {
    client: Arc<ToncenterClient>,
}

impl FeeEstimator {
    pub fn new(client: Arc<ToncenterClient>) -> Self {
        Self { client }
    }

    /// Asks the remote service to simulate `body` (a base64 BoC) against
    /// `address`, skipping signature verification.
    pub async fn estimate(
        &self,
        address: &str,
        body: &str,
        init_code: Option<&str>,
        init_data: Option<&str>,
    ) -> Result<FeeBreakdown, FeeEstimationError> {
        let request = EstimateFeeRequest {
            address: address.to_string(),
            body: body.to_string(),
            ignore_chksig: true,
            init_code: init_code.map(str::to_string),
            init_data: init_data.map(str::to_string),
        };

        let source_fees = self.client.estimate_fee(&request).await?;
        debug!(
            in_fwd_fee = source_fees.in_fwd_fee,
            storage_fee = source_fees.storage_fee,
            gas_fee = source_fees.gas_fee,
            fwd_fee = source_fees.fwd_fee;
            "Received source fees"
        );

        let breakdown = FeeBreakdown::try_from(source_fees)?;
        info!(total_fee = breakdown.total()?; "Fee estimated");
        Ok(breakdown)
    }

    /// Estimates a body cell without state init.
    pub async fn estimate_cell(&self, address: &str, body: &Cell) -> Result<FeeBreakdown, FeeEstimationError> {
        let encoded = serialize_boc_base64(body)?;
        self.estimate(address, &encoded, None, None).await
    }
}
