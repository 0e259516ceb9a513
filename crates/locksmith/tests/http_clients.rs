use locksmith::http::LocksmithClient;
use locksmith::rpc::RpcLockReader;
use locksmith::subgraph::SubgraphClient;
use locksmith::{IndexerApi, LockReader, LocksmithApi, LocksmithError};
use serde_json::json;
use std::collections::HashMap;
use unlock_dash_core::models::{JobStatus, Purchaser, SupplierProfile};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LOCK: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
const HASH: &str = "0xfeed";

fn word(value: u128) -> String {
    format!("0x{value:064x}")
}

#[tokio::test]
async fn get_receipt_uses_checksummed_path_and_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/receipts/10/{LOCK}/{HASH}")))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "receipt": { "id": HASH, "payer": "0x01", "receiptNumber": 3 },
            "supplier": { "supplierName": "Acme" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LocksmithClient::new(&server.uri(), Some("secret".into()));
    let receipt = client
        .get_receipt(10, &LOCK.to_lowercase(), HASH)
        .await
        .unwrap();
    assert_eq!(receipt.receipt.unwrap().id, HASH);
    assert_eq!(receipt.supplier.unwrap().supplier_name.as_deref(), Some("Acme"));
}

#[tokio::test]
async fn missing_receipt_maps_to_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = LocksmithClient::new(&server.uri(), None);
    let err = client.get_receipt(10, LOCK, HASH).await.unwrap_err();
    assert!(matches!(err, LocksmithError::NotFound(_)), "{err}");
}

#[tokio::test]
async fn forbidden_write_maps_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v2/receipts-base/1/{LOCK}")))
        .respond_with(ResponseTemplate::new(403).set_body_string("not a manager"))
        .mount(&server)
        .await;

    let client = LocksmithClient::new(&server.uri(), Some("secret".into()));
    let err = client
        .save_receipts_base(1, LOCK, &SupplierProfile::default())
        .await
        .unwrap_err();
    assert!(matches!(err, LocksmithError::Unauthorized(ref body) if body == "not a manager"));
}

#[tokio::test]
async fn save_receipt_posts_purchaser_under_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v2/receipts/5/{LOCK}/{HASH}")))
        .and(body_partial_json(json!({
            "data": { "fullname": "Ada", "businessName": "Engines Ltd" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "purchaser": { "fullname": "Ada", "businessName": "Engines Ltd" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LocksmithClient::new(&server.uri(), None);
    let purchaser = Purchaser {
        fullname: Some("Ada".into()),
        business_name: Some("Engines Ltd".into()),
        ..Default::default()
    };
    let saved = client.save_receipt(5, LOCK, HASH, &purchaser).await.unwrap();
    assert_eq!(saved.purchaser, Some(purchaser));
}

#[tokio::test]
async fn save_receipts_base_posts_supplier_under_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v2/receipts-base/1/{LOCK}")))
        .and(body_partial_json(json!({
            "data": { "supplierName": "Acme", "vatBasisPointsRate": 1950 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "supplierName": "Acme",
            "vatBasisPointsRate": 1950
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = LocksmithClient::new(&server.uri(), None);
    let supplier = SupplierProfile {
        supplier_name: Some("Acme".into()),
        vat_basis_points_rate: Some(1950),
        ..Default::default()
    };
    let saved = client.save_receipts_base(1, LOCK, &supplier).await.unwrap();
    assert_eq!(saved.vat_basis_points_rate, Some(1950));
}

#[tokio::test]
async fn server_errors_keep_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let client = LocksmithClient::new(&server.uri(), None);
    let err = client.get_receipts_base(1, LOCK).await.unwrap_err();
    assert!(matches!(err, LocksmithError::Status { status: 502, ref body } if body == "bad gateway"));
}

#[tokio::test]
async fn receipts_status_returns_job_or_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/receipts/all/1/{LOCK}/status")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "job-9",
            "payload": { "status": "success", "key": "exports/9.zip", "result": ["a"] },
            "createdAt": "2024-05-01T10:00:00Z",
            "updatedAt": "2024-05-01T10:02:00Z"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/receipts/all/2/{LOCK}/status")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = LocksmithClient::new(&server.uri(), None);
    let job = client.get_receipts_status(1, LOCK).await.unwrap().unwrap();
    assert_eq!(job.payload.status, JobStatus::Success);
    assert!(client.get_receipts_status(2, LOCK).await.unwrap().is_none());
}

#[tokio::test]
async fn subgraph_resolves_key_transactions() {
    let server = MockServer::start().await;
    let id = format!("{}-7", LOCK.to_lowercase());
    Mock::given(method("POST"))
        .and(path("/polygon"))
        .and(body_partial_json(json!({ "variables": { "where": { "id": id, "tokenId": "7" } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "keys": [{ "id": id, "tokenId": "7", "transactionsHash": ["0x1", "0x2"] }] }
        })))
        .mount(&server)
        .await;

    let client = SubgraphClient::new(HashMap::from([(137, format!("{}/polygon", server.uri()))]));
    let hashes = client.key_transaction_hashes(137, LOCK, "7").await.unwrap();
    assert_eq!(hashes, vec!["0x1", "0x2"]);

    let err = client.key_transaction_hashes(1, LOCK, "7").await.unwrap_err();
    assert!(matches!(err, LocksmithError::UnknownNetwork(1)));
}

#[tokio::test]
async fn subgraph_errors_are_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{ "message": "indexing_error" }]
        })))
        .mount(&server)
        .await;

    let client = SubgraphClient::new(HashMap::from([(1, server.uri())]));
    let err = client.locks_by_manager(1, "0x01").await.unwrap_err();
    assert!(matches!(err, LocksmithError::Graphql(ref m) if m == "indexing_error"));
}

#[tokio::test]
async fn rpc_reader_decodes_lock_details() {
    let server = MockServer::start().await;
    let token = "0xfb6916095ca1df60bb79ce92ce3ea74c37c5d359";
    let calls = [
        ("expirationDuration()", word(2_592_000)),
        ("tokenAddress()", format!("0x{:0>64}", &token[2..])),
        ("keyPrice()", word(5_000_000)),
        ("publicLockVersion()", word(13)),
    ];
    for (signature, result) in calls {
        let selector = hex::encode(unlock_dash_core::address::function_selector(signature));
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "eth_call",
                "params": [{ "to": LOCK, "data": format!("0x{selector}") }, "latest"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": result
            })))
            .mount(&server)
            .await;
    }

    let reader = RpcLockReader::new(HashMap::from([(137, server.uri())]));
    let details = reader.lock_details(137, &LOCK.to_lowercase()).await.unwrap();
    assert_eq!(details.address, LOCK);
    assert_eq!(details.expiration_duration, Some(2_592_000));
    assert_eq!(details.currency_contract_address.as_deref(), Some(token));
    assert_eq!(details.key_price, 5_000_000);
    assert_eq!(details.public_lock_version, 13);
}

#[tokio::test]
async fn rpc_errors_are_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0", "id": 1, "error": { "code": -32000, "message": "execution reverted" }
        })))
        .mount(&server)
        .await;

    let reader = RpcLockReader::new(HashMap::from([(1, server.uri())]));
    let err = reader.is_lock_manager(1, LOCK, LOCK).await.unwrap_err();
    assert!(matches!(err, LocksmithError::Rpc { code: -32000, .. }));
}
