use std::sync::Arc;
use std::time::Duration;

use ed25519_dalek::SigningKey;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tonsend::address::TonAddress;
use tonsend::cell::deserialize_boc_base64;
use tonsend::http::{RetrySettings, ToncenterClient};
use tonsend::prompt::AutoOperator;
use tonsend::transactions::{
    AssetKind, CommentEncoding, FeeEstimator, MessageBuilder, SubmissionOutcome, TransactionHistory, TransferRequest,
    TransferSubmitter,
};
use tonsend::wallet::{ConfirmationSettings, ToncenterWallet, V4R2Signer};

const SOURCE: &str = "0:83dfd552e63729b472fcbcc8c45ebcc6691702558b68ec7527e1ba403a0f31a8";

fn destination() -> String {
    TonAddress::parse(&format!("0:{}", "5a".repeat(32)))
        .unwrap()
        .to_user_friendly()
}

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": result}))
}

async fn mount_chain(server: &MockServer, balance: &str) {
    Mock::given(method("GET"))
        .and(path("/getMasterchainInfo"))
        .respond_with(ok(json!({"last": {"workchain": -1, "seqno": 41000000}})))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/getAddressBalance"))
        .respond_with(ok(json!(balance)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/getTransactions"))
        .respond_with(ok(json!([])))
        .mount(server)
        .await;
}

async fn mount_wallet(server: &MockServer, expected_sends: u64) {
    Mock::given(method("GET"))
        .and(path("/getWalletInformation"))
        .respond_with(ok(json!({"wallet": true, "account_state": "active", "seqno": 7})))
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/getWalletInformation"))
        .respond_with(ok(json!({"wallet": true, "account_state": "active", "seqno": 8})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sendBocReturnHash"))
        .respond_with(ok(json!({"hash": "c2VudA=="})))
        .expect(expected_sends)
        .mount(server)
        .await;
}

fn submitter(server: &MockServer) -> TransferSubmitter {
    let settings = RetrySettings {
        timeout: Duration::from_secs(5),
        backoff: Duration::from_millis(20),
        max_backoff: Duration::from_millis(100),
        max_retries: 2,
    };
    let client = Arc::new(ToncenterClient::with_config(Url::parse(&server.uri()).unwrap(), None, settings).unwrap());
    let signer = V4R2Signer::new(SigningKey::from_bytes(&[5u8; 32]), TonAddress::parse(SOURCE).unwrap());
    let wallet = ToncenterWallet::new(
        client.clone(),
        signer,
        ConfirmationSettings {
            message_ttl: Duration::from_secs(60),
            poll_interval: Duration::from_millis(5),
            attempts: 3,
        },
    );

    TransferSubmitter::new(
        Arc::new(wallet),
        Arc::new(AutoOperator::new(true)),
        FeeEstimator::new(client.clone()),
        TransactionHistory::new(client, 1),
        MessageBuilder::new(CommentEncoding::LegacyBase64),
    )
}

#[tokio::test]
async fn test_transfer_is_signed_and_broadcast() {
    let server = MockServer::start().await;
    mount_chain(&server, "5000000000").await;
    mount_wallet(&server, 1).await;
    // one rate-limited answer before the estimate goes through
    Mock::given(method("POST"))
        .and(path("/estimateFee"))
        .respond_with(ResponseTemplate::new(429))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/estimateFee"))
        .respond_with(ok(json!({
            "source_fees": {"in_fwd_fee": 100, "storage_fee": 50, "gas_fee": 2000, "fwd_fee": 300}
        })))
        .mount(&server)
        .await;

    let outcome = submitter(&server)
        .submit(TransferRequest::new(destination(), 1_000_000_000, AssetKind::Ton, None))
        .await;

    match outcome {
        SubmissionOutcome::Sent(hash) => assert_eq!(hash.as_str(), "c2VudA=="),
        other => panic!("unexpected outcome: {other:?}"),
    }

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.iter().filter(|r| r.url.path() == "/estimateFee").count(), 2);

    let estimate: Value = requests
        .iter()
        .find(|r| r.url.path() == "/estimateFee")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    assert_eq!(estimate["address"], json!(destination()));
    assert_eq!(estimate["ignoreChksig"], json!(true));

    let sent: Value = requests
        .iter()
        .find(|r| r.url.path() == "/sendBocReturnHash")
        .map(|r| serde_json::from_slice(&r.body).unwrap())
        .unwrap();
    let external = deserialize_boc_base64(sent["boc"].as_str().unwrap()).unwrap();

    let signed = external.reference(0).unwrap();
    let mut slice = signed.parse();
    slice.load_bytes(64).unwrap();
    slice.load_u32().unwrap();
    slice.load_u32().unwrap();
    assert_eq!(slice.load_u32().unwrap(), 7);

    let internal = signed.reference(0).unwrap();
    let body = internal.reference(0).unwrap();
    let comment = MessageBuilder::new(CommentEncoding::LegacyBase64)
        .decode_comment_body(body)
        .unwrap();
    assert_eq!(comment, "Sending TON");
}

#[tokio::test]
async fn test_insufficient_balance_never_estimates_or_broadcasts() {
    let server = MockServer::start().await;
    mount_chain(&server, "500000000").await;
    mount_wallet(&server, 0).await;
    Mock::given(method("POST"))
        .and(path("/estimateFee"))
        .respond_with(ok(json!({"source_fees": {}})))
        .expect(0)
        .mount(&server)
        .await;

    let outcome = submitter(&server)
        .submit(TransferRequest::new(destination(), 1_000_000_000, AssetKind::Ton, None))
        .await;

    assert!(matches!(
        outcome,
        SubmissionOutcome::InsufficientBalance {
            balance: 500_000_000,
            requested: 1_000_000_000
        }
    ));
}

#[tokio::test]
async fn test_rejected_estimate_is_not_broadcast() {
    let server = MockServer::start().await;
    mount_chain(&server, "5000000000").await;
    mount_wallet(&server, 0).await;
    Mock::given(method("POST"))
        .and(path("/estimateFee"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "cannot simulate"})))
        .mount(&server)
        .await;

    let outcome = submitter(&server)
        .submit(TransferRequest::new(destination(), 1, AssetKind::Usdt, Some("invoice".to_string())))
        .await;

    match outcome {
        SubmissionOutcome::Failed(e) => assert!(e.to_string().contains("cannot simulate")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}
