use chrono::Utc;
use locksmith::mock::{MockIndexer, MockLockReader, MockLocksmith};
use receipts::{ReceiptService, ReceiptsError, StopReason};
use std::sync::Arc;
use std::time::Duration;
use unlock_dash_core::models::{
    Job, JobPayload, JobStatus, Purchaser, ReceiptDetails, ReceiptResponse, SupplierProfile,
};

const LOCK: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
const MANAGER: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

struct Fixture {
    locksmith: Arc<MockLocksmith>,
    indexer: Arc<MockIndexer>,
    reader: Arc<MockLockReader>,
    service: ReceiptService,
}

fn fixture() -> Fixture {
    let locksmith = MockLocksmith::new();
    let indexer = MockIndexer::new();
    let reader = MockLockReader::new();
    let service = ReceiptService::new(locksmith.clone(), indexer.clone(), reader.clone());
    Fixture {
        locksmith,
        indexer,
        reader,
        service,
    }
}

fn receipt(hash: &str) -> ReceiptResponse {
    ReceiptResponse {
        receipt: Some(ReceiptDetails {
            id: hash.to_string(),
            payer: Some(MANAGER.to_string()),
            amount_transferred: Some("1000".into()),
            network: Some(10),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn job(status: JobStatus) -> Job {
    Job {
        id: "job-1".into(),
        payload: JobPayload {
            status,
            key: "receipts.zip".into(),
            result: vec![],
        },
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn get_receipt_for_unknown_hash_is_empty() {
    let f = fixture();
    let resp = f.service.get_receipt(10, LOCK, "0xmissing").await;
    assert!(resp.is_empty());
    assert_eq!(resp, ReceiptResponse::default());
}

#[tokio::test]
async fn get_receipt_with_lowercase_lock() {
    let f = fixture();
    f.locksmith.insert_receipt(10, LOCK, "0xaa", receipt("0xaa")).await;
    let resp = f.service.get_receipt(10, &LOCK.to_lowercase(), "0xaa").await;
    assert_eq!(resp.receipt.unwrap().id, "0xaa");
}

#[tokio::test]
async fn invalid_lock_address_yields_empty_receipt() {
    let f = fixture();
    assert!(f.service.get_receipt(10, "lock", "0xaa").await.is_empty());
    assert_eq!(f.locksmith.request_count(), 0);
}

#[tokio::test]
async fn receipts_for_key_drop_failures_and_keep_order() {
    let f = fixture();
    f.indexer
        .insert_key(
            10,
            LOCK,
            "3",
            vec!["0x03".into(), "0xgone".into(), "0x01".into(), "0x02".into()],
        )
        .await;
    for hash in ["0x01", "0x02", "0x03"] {
        f.locksmith.insert_receipt(10, LOCK, hash, receipt(hash)).await;
    }
    f.locksmith
        .insert_receipt(10, LOCK, "0x02", ReceiptResponse::default())
        .await;

    let receipts = f.service.get_receipts_for_key(10, LOCK, "3").await.unwrap();
    let ids: Vec<_> = receipts
        .iter()
        .map(|r| r.receipt.as_ref().unwrap().id.as_str())
        .collect();
    assert_eq!(ids, vec!["0x03", "0x01"]);
    assert_eq!(f.locksmith.request_count(), 4);
}

#[tokio::test]
async fn receipts_for_key_without_transactions() {
    let f = fixture();
    let receipts = f.service.get_receipts_for_key(10, LOCK, "99").await.unwrap();
    assert!(receipts.is_empty());
}

#[tokio::test]
async fn receipts_base_requires_manager() {
    let f = fixture();
    f.locksmith
        .insert_receipts_base(
            1,
            LOCK,
            SupplierProfile {
                supplier_name: Some("Acme".into()),
                vat_basis_points_rate: Some(1950),
                ..Default::default()
            },
        )
        .await;

    assert!(f.service.get_receipts_base(1, LOCK, false).await.unwrap().is_none());
    assert_eq!(f.locksmith.request_count(), 0);

    let supplier = f.service.get_receipts_base(1, LOCK, true).await.unwrap().unwrap();
    assert_eq!(supplier.supplier_name.as_deref(), Some("Acme"));
    assert_eq!(supplier.vat_rate_percentage, Some(19.5));
}

#[tokio::test]
async fn update_receipts_base_fails_fast_for_non_managers() {
    let f = fixture();
    let err = f
        .service
        .update_receipts_base(1, LOCK, false, &SupplierProfile::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ReceiptsError::NotAuthorized(_)));
    assert_eq!(f.locksmith.request_count(), 0);
}

#[tokio::test]
async fn update_receipts_base_round_trips_vat_percentage() {
    let f = fixture();
    let edited = SupplierProfile {
        supplier_name: Some("Acme".into()),
        vat_rate_percentage: Some(8.125),
        ..Default::default()
    };
    let saved = f
        .service
        .update_receipts_base(1, LOCK, true, &edited)
        .await
        .unwrap();
    assert_eq!(saved.vat_basis_points_rate, Some(813));
    assert_eq!(saved.vat_rate_percentage, Some(8.13));

    let read = f.service.get_receipts_base(1, LOCK, true).await.unwrap().unwrap();
    assert_eq!(read.vat_rate_percentage, Some(8.13));
}

#[tokio::test]
async fn update_receipt_saves_purchaser_or_returns_empty() {
    let f = fixture();
    f.locksmith.insert_receipt(10, LOCK, "0xaa", receipt("0xaa")).await;
    let purchaser = Purchaser {
        fullname: Some("Grace".into()),
        ..Default::default()
    };

    let saved = f.service.update_receipt(10, LOCK, "0xaa", &purchaser).await;
    assert_eq!(saved.purchaser, Some(purchaser.clone()));
    let fetched = f.service.get_receipt(10, LOCK, "0xaa").await;
    assert_eq!(fetched.purchaser, Some(purchaser.clone()));

    let missing = f.service.update_receipt(10, LOCK, "0xbb", &purchaser).await;
    assert!(missing.is_empty());
}

#[tokio::test]
async fn lock_manager_check_uses_reader() {
    let f = fixture();
    f.reader.insert_manager(1, LOCK, MANAGER).await;
    assert!(f.service.is_lock_manager(1, LOCK, MANAGER).await.unwrap());
    assert!(!f.service.is_lock_manager(1, LOCK, LOCK).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn status_polling_stops_after_five_minutes() {
    let f = fixture();
    f.locksmith.insert_job(1, LOCK, job(JobStatus::Pending)).await;

    let mut watch = f.service.watch_receipts_status(1, LOCK, true);
    let snapshot = watch.wait_until_stopped().await;
    assert_eq!(snapshot.stopped, Some(StopReason::TimedOut));

    let count = f.locksmith.request_count();
    assert!((100..=101).contains(&count), "{count} requests");

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(f.locksmith.request_count(), count);
}

#[tokio::test(start_paused = true)]
async fn hung_status_request_does_not_outlive_the_ceiling() {
    let f = fixture();
    f.locksmith.insert_job(1, LOCK, job(JobStatus::Pending)).await;
    f.locksmith.stall_status(true);

    let started = tokio::time::Instant::now();
    let mut watch = f.service.watch_receipts_status(1, LOCK, true);
    let snapshot = watch.wait_until_stopped().await;

    assert_eq!(snapshot.stopped, Some(StopReason::TimedOut));
    assert_eq!(snapshot.polls, 0);
    assert_eq!(f.locksmith.request_count(), 1);
    assert!(started.elapsed() <= Duration::from_secs(5 * 60 + 1));
}

#[tokio::test(start_paused = true)]
async fn status_polling_stops_on_terminal_status() {
    let f = fixture();
    f.locksmith.insert_job(1, LOCK, job(JobStatus::Pending)).await;

    let mut watch = f.service.watch_receipts_status(1, LOCK, true);
    tokio::time::sleep(Duration::from_secs(7)).await;
    assert_eq!(f.locksmith.request_count(), 3);

    f.locksmith.insert_job(1, LOCK, job(JobStatus::Success)).await;
    let snapshot = watch.wait_until_stopped().await;
    assert_eq!(snapshot.stopped, Some(StopReason::Completed));
    assert_eq!(snapshot.polls, 4);
    assert!(snapshot.job.unwrap().is_terminal());
}

#[tokio::test(start_paused = true)]
async fn status_without_condition_fetches_once() {
    let f = fixture();
    let mut watch = f.service.watch_receipts_status(1, LOCK, false);
    let snapshot = watch.wait_until_stopped().await;
    assert_eq!(snapshot.stopped, Some(StopReason::NotPolling));
    assert!(snapshot.job.is_none());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(f.locksmith.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_watch_stops_polling() {
    let f = fixture();
    f.locksmith.insert_job(1, LOCK, job(JobStatus::Pending)).await;

    let watch = f.service.watch_receipts_status(1, LOCK, true);
    tokio::time::sleep(Duration::from_secs(7)).await;
    drop(watch);
    let count = f.locksmith.request_count();

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(f.locksmith.request_count(), count);
}
