//! Typed client for the toncenter v2 HTTP API.
//!
//! Every endpoint answers with the same `{ok, result, error, code}` envelope.
//! [`ToncenterClient`] unwraps it, turning `ok: false` into
//! [`HttpError::RemoteRejected`]. Rate limiting is handled one layer down by
//! the HTTP client, so a method only fails with [`HttpError::RateLimited`]
//! once the back-off budget is spent.
//!
//! # Example
//!
//! ```rust,no_run
//! use url::Url;
//! use tonsend::http::ToncenterClient;
//!
//! # async fn example() -> Result<(), anyhow::Error> {
//! let client = ToncenterClient::new(Url::parse("https://toncenter.com/api/v2/")?)?;
//! let info = client.get_masterchain_info().await?;
//! println!("Masterchain seqno: {}", info.last.seqno);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use log::debug;
use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use super::error::HttpError;
use super::http_client::{HttpClient, RetrySettings};
use super::types::{
    EstimateFeeRequest, EstimateFeeResult, MasterchainInfo, RawTransaction, SendBocRequest, SendBocResult,
    SourceFees, ToncenterResponse, WalletInformation,
};

/// Query parameters for `getTransactions`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionQuery<'a> {
    pub address: &'a str,
    pub limit: u32,
    pub hash: Option<&'a str>,
    pub to_lt: u64,
    pub archival: bool,
}

impl<'a> TransactionQuery<'a> {
    /// The newest `limit` transactions of `address`, non-archival.
    pub fn latest(address: &'a str, limit: u32) -> Self {
        Self {
            address,
            limit,
            hash: None,
            to_lt: 0,
            archival: false,
        }
    }
}

pub struct ToncenterClient {
    http_client: HttpClient,
}

impl ToncenterClient {
    pub fn new(base_url: Url) -> Result<Self, anyhow::Error> {
        let http_client = HttpClient::new(base_url)?;
        Ok(Self { http_client })
    }

    pub fn with_config(base_url: Url, api_key: Option<String>, settings: RetrySettings) -> Result<Self, anyhow::Error> {
        let http_client = HttpClient::with_config(base_url, api_key, settings)?;
        Ok(Self { http_client })
    }

    /// Round-trip time of the most recent request.
    pub async fn get_latency(&self) -> Option<Duration> {
        self.http_client.get_latency().await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T, HttpError> {
        let response: ToncenterResponse<T> = self
            .http_client
            .send_request(method, path, query, body)
            .await
            .map_err(unwrap_error_envelope)?;
        response.into_result()
    }

    /// Simulates the message against the account's current state.
    pub async fn estimate_fee(&self, request: &EstimateFeeRequest) -> Result<SourceFees, HttpError> {
        debug!("HTTP: Requesting fee estimate");
        let body = serde_json::to_value(request)?;
        let result: EstimateFeeResult = self.call(Method::POST, "estimateFee", &[], Some(body)).await?;
        Ok(result.source_fees)
    }

    pub async fn get_transactions(&self, query: &TransactionQuery<'_>) -> Result<Vec<RawTransaction>, HttpError> {
        let mut params = vec![
            ("address", query.address.to_string()),
            ("limit", query.limit.to_string()),
            ("to_lt", query.to_lt.to_string()),
            ("archival", query.archival.to_string()),
        ];
        if let Some(hash) = query.hash {
            params.push(("hash", hash.to_string()));
        }
        self.call(Method::GET, "getTransactions", &params, None).await
    }

    /// Balance in nanotons.
    pub async fn get_address_balance(&self, address: &str) -> Result<u64, HttpError> {
        let balance: String = self
            .call(Method::GET, "getAddressBalance", &[("address", address.to_string())], None)
            .await?;
        balance.parse().map_err(|_| HttpError::InvalidNumber {
            field: "balance",
            value: balance,
        })
    }

    pub async fn get_masterchain_info(&self) -> Result<MasterchainInfo, HttpError> {
        self.call(Method::GET, "getMasterchainInfo", &[], None).await
    }

    pub async fn get_wallet_information(&self, address: &str) -> Result<WalletInformation, HttpError> {
        self.call(
            Method::GET,
            "getWalletInformation",
            &[("address", address.to_string())],
            None,
        )
        .await
    }

    /// Broadcasts a base64 BoC and returns the hash of the external message.
    pub async fn send_boc_return_hash(&self, boc: &str) -> Result<String, HttpError> {
        let body = serde_json::to_value(SendBocRequest { boc: boc.to_string() })?;
        let result: SendBocResult = self.call(Method::POST, "sendBocReturnHash", &[], Some(body)).await?;
        Ok(result.hash)
    }
}

/// toncenter reports some rejections as a non-2xx status carrying the usual
/// `ok: false` envelope.
fn unwrap_error_envelope(err: HttpError) -> HttpError {
    match err {
        HttpError::ServerError { status, body } => {
            match serde_json::from_str::<ToncenterResponse<serde_json::Value>>(&body) {
                Ok(ToncenterResponse {
                    ok: false,
                    error: Some(error),
                    ..
                }) => HttpError::RemoteRejected(error),
                _ => HttpError::ServerError { status, body },
            }
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ToncenterClient {
        let settings = RetrySettings {
            timeout: Duration::from_secs(5),
            backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            max_retries: 2,
        };
        ToncenterClient::with_config(Url::parse(&server.uri()).unwrap(), None, settings).unwrap()
    }

    #[tokio::test]
    async fn test_estimate_fee_parses_source_fees() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/estimateFee"))
            .and(body_json(json!({"address": "EQabc", "body": "te6c", "ignoreChksig": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {
                    "@type": "query.fees",
                    "source_fees": {"@type": "fees", "in_fwd_fee": 100, "storage_fee": 50, "gas_fee": 2000, "fwd_fee": 300},
                    "destination_fees": []
                }
            })))
            .mount(&server)
            .await;

        let fees = client_for(&server)
            .estimate_fee(&EstimateFeeRequest {
                address: "EQabc".to_string(),
                body: "te6c".to_string(),
                ignore_chksig: true,
                init_code: None,
                init_data: None,
            })
            .await
            .unwrap();

        assert_eq!(fees.gas_fee, 2000);
        assert_eq!(fees.in_fwd_fee, 100);
    }

    #[tokio::test]
    async fn test_get_transactions_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getTransactions"))
            .and(query_param("address", "EQabc"))
            .and(query_param("limit", "1"))
            .and(query_param("to_lt", "0"))
            .and(query_param("archival", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": [{"fee": "5"}]})))
            .mount(&server)
            .await;

        let txs = client_for(&server)
            .get_transactions(&TransactionQuery::latest("EQabc", 1))
            .await
            .unwrap();
        assert_eq!(txs.len(), 1);
        assert_eq!(txs[0].fee, "5");
    }

    #[tokio::test]
    async fn test_balance_and_seqno() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getAddressBalance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": "500000000"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/getWalletInformation"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ok": true,
                "result": {"wallet": true, "account_state": "active", "seqno": 7}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.get_address_balance("EQabc").await.unwrap(), 500_000_000);
        assert_eq!(client.get_wallet_information("EQabc").await.unwrap().seqno, Some(7));
    }

    #[tokio::test]
    async fn test_garbage_balance_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getAddressBalance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": "lots"})))
            .mount(&server)
            .await;

        let err = client_for(&server).get_address_balance("EQabc").await.unwrap_err();
        assert!(matches!(err, HttpError::InvalidNumber { field: "balance", .. }));
    }

    #[tokio::test]
    async fn test_error_status_with_envelope_is_remote_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getMasterchainInfo"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"ok": false, "error": "timeout", "code": 500})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/getWalletInformation"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert!(matches!(
            client.get_masterchain_info().await,
            Err(HttpError::RemoteRejected(msg)) if msg == "timeout"
        ));
        assert!(matches!(
            client.get_wallet_information("EQabc").await,
            Err(HttpError::ServerError { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_boc_returns_hash_and_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sendBocReturnHash"))
            .and(body_json(json!({"boc": "good"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {"hash": "abc="}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/sendBocReturnHash"))
            .and(body_json(json!({"boc": "bad"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "cannot apply", "code": 500})))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(client.send_boc_return_hash("good").await.unwrap(), "abc=");
        assert!(matches!(
            client.send_boc_return_hash("bad").await,
            Err(HttpError::RemoteRejected(msg)) if msg == "cannot apply"
        ));
    }
}
