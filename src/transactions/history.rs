use std::sync::Arc;

use log::debug;
use thiserror::Error;

use crate::http::{HttpError, RawTransaction, ToncenterClient, TransactionQuery};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Transaction history request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Invalid fee field {field}: {value:?}")]
    InvalidFee { field: &'static str, value: String },
}

/// Fees charged by a past transaction, in nanotons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFees {
    pub hash: Option<String>,
    pub fee: u64,
    pub storage_fee: u64,
    pub other_fee: u64,
    pub fwd_fee: u64,
    /// Base64 BoC of the inbound message body, if any.
    pub body: Option<String>,
}

impl TryFrom<&RawTransaction> for TransactionFees {
    type Error = HistoryError;

    fn try_from(tx: &RawTransaction) -> Result<Self, Self::Error> {
        let in_msg = tx.in_msg.as_ref();
        Ok(Self {
            hash: tx.transaction_id.as_ref().map(|id| id.hash.clone()),
            fee: parse_fee("fee", &tx.fee)?,
            storage_fee: parse_fee("storage_fee", &tx.storage_fee)?,
            other_fee: parse_fee("other_fee", &tx.other_fee)?,
            fwd_fee: parse_fee("fwd_fee", in_msg.map(|m| m.fwd_fee.as_str()).unwrap_or(""))?,
            body: message_body(tx),
        })
    }
}

/// Empty strings count as zero; toncenter omits fees on some message kinds.
fn parse_fee(field: &'static str, value: &str) -> Result<u64, HistoryError> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse().map_err(|_| HistoryError::InvalidFee {
        field,
        value: value.to_string(),
    })
}

fn message_body(tx: &RawTransaction) -> Option<String> {
    tx.in_msg
        .as_ref()
        .and_then(|m| m.msg_data.as_ref())
        .and_then(|d| d.body.clone())
        .filter(|b| !b.is_empty())
}

/// Transaction-history lookups used by the submission pipeline.
pub struct TransactionHistory {
    client: Arc<ToncenterClient>,
    limit: u32,
}

impl TransactionHistory {
    pub fn new(client: Arc<ToncenterClient>, limit: u32) -> Self {
        Self {
            client,
            limit: limit.max(1),
        }
    }

    /// Body of the most recent transaction of `address`, if it carried one.
    pub async fn pending_body(&self, address: &str) -> Result<Option<String>, HistoryError> {
        let transactions = self
            .client
            .get_transactions(&TransactionQuery::latest(address, self.limit))
            .await?;

        let body = transactions.first().and_then(message_body);
        debug!(found = body.is_some(); "Checked history for a pending body");
        Ok(body)
    }

    /// Fees of the most recent transaction of `address`, or of the one with
    /// `hash` when given.
    pub async fn last_transaction_fees(
        &self,
        address: &str,
        hash: Option<&str>,
    ) -> Result<Option<TransactionFees>, HistoryError> {
        let query = TransactionQuery {
            address,
            limit: self.limit,
            hash,
            to_lt: 0,
            archival: hash.is_some(),
        };

        let transactions = self.client.get_transactions(&query).await?;
        transactions.first().map(TransactionFees::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::http::RetrySettings;
    use serde_json::json;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn history_for(server: &MockServer) -> TransactionHistory {
        let settings = RetrySettings {
            timeout: Duration::from_secs(5),
            backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(50),
            max_retries: 1,
        };
        let client = ToncenterClient::with_config(Url::parse(&server.uri()).unwrap(), None, settings).unwrap();
        TransactionHistory::new(Arc::new(client), 1)
    }

    #[tokio::test]
    async fn test_pending_body_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getTransactions"))
            .and(query_param("limit", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{"in_msg": {"msg_data": {"@type": "msg.dataRaw", "body": "te6cckEBAQEAAgAAAEysuc0="}}}]
            })))
            .mount(&server)
            .await;

        let body = history_for(&server).pending_body("EQdest").await.unwrap();
        assert_eq!(body.as_deref(), Some("te6cckEBAQEAAgAAAEysuc0="));
    }

    #[tokio::test]
    async fn test_no_history_means_no_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": []})))
            .mount(&server)
            .await;

        assert_eq!(history_for(&server).pending_body("EQdest").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_last_transaction_fees() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getTransactions"))
            .and(query_param("hash", "abc"))
            .and(query_param("archival", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": [{
                    "transaction_id": {"lt": "1", "hash": "abc"},
                    "fee": "2450",
                    "storage_fee": "50",
                    "other_fee": "2400",
                    "in_msg": {"fwd_fee": "0", "msg_data": {"body": ""}}
                }]
            })))
            .mount(&server)
            .await;

        let fees = history_for(&server)
            .last_transaction_fees("EQsrc", Some("abc"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fees.fee, 2450);
        assert_eq!(fees.other_fee, 2400);
        assert_eq!(fees.hash.as_deref(), Some("abc"));
        assert_eq!(fees.body, None);
    }

    #[test]
    fn test_bad_fee_string() {
        let tx = RawTransaction {
            fee: "-1x".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            TransactionFees::try_from(&tx),
            Err(HistoryError::InvalidFee { field: "fee", .. })
        ));
    }
}
