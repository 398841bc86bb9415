use serde::{Deserialize, Serialize};

use super::error::HttpError;

/// The `{ok, result, error, code}` envelope every toncenter endpoint answers with.
#[derive(Debug, Serialize, Deserialize)]
pub struct ToncenterResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub error: Option<String>,
    pub code: Option<i32>,
}

impl<T> ToncenterResponse<T> {
    pub fn into_result(self) -> Result<T, HttpError> {
        if !self.ok {
            return Err(HttpError::RemoteRejected(
                self.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        self.result.ok_or(HttpError::MissingResult)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimateFeeRequest {
    pub address: String,
    pub body: String,
    pub ignore_chksig: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init_data: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateFeeResult {
    pub source_fees: SourceFees,
}

/// Fee components as reported on the wire. Signed so that a negative value can
/// be detected instead of silently wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFees {
    pub in_fwd_fee: i64,
    pub storage_fee: i64,
    pub gas_fee: i64,
    pub fwd_fee: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    #[serde(default)]
    pub utime: u64,
    #[serde(default)]
    pub transaction_id: Option<TransactionId>,
    #[serde(default)]
    pub fee: String,
    #[serde(default)]
    pub storage_fee: String,
    #[serde(default)]
    pub other_fee: String,
    #[serde(default)]
    pub in_msg: Option<RawMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransactionId {
    pub lt: String,
    pub hash: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub fwd_fee: String,
    #[serde(default)]
    pub msg_data: Option<MessageData>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageData {
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterchainInfo {
    pub last: BlockId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockId {
    pub workchain: i32,
    pub seqno: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletInformation {
    #[serde(default)]
    pub wallet: bool,
    #[serde(default)]
    pub account_state: String,
    #[serde(default)]
    pub seqno: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendBocResult {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendBocRequest {
    pub boc: String,
}
