//! End-to-end bridge flows against nullable store collaborators.

use std::sync::Arc;

use iap_bridge::{
    BridgeConfig, BridgeMetrics, BridgeObserver, PurchaseCoordinator, RestoreCoordinator,
    RestoreOutcome, StoreBridge, TransactionEvent,
};
use iap_nullables::{
    transactions as tx, NullCatalog, NullPaymentQueue, NullReceiptSource, NullValidator,
};
use iap_store::{PlatformError, PlatformErrorCode, ReceiptSource, ReceiptValidator};
use iap_types::{ItemType, ProductId, Purchase, PurchaseError, PurchaseState};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

type PurchaseResult = Result<Option<Purchase>, PurchaseError>;

fn bridge_with(queue: &Arc<NullPaymentQueue>, receipts: NullReceiptSource) -> Arc<StoreBridge> {
    let bridge = StoreBridge::new(
        queue.clone(),
        Arc::new(NullCatalog::with_products(vec![
            NullCatalog::product("coffee.small", 1_990_000),
            NullCatalog::product("coffee.large", 2_990_000),
        ])),
        Arc::new(receipts),
        BridgeConfig::default(),
    );
    bridge.connect().unwrap();
    Arc::new(bridge)
}

fn connected(queue: &Arc<NullPaymentQueue>) -> Arc<StoreBridge> {
    bridge_with(queue, NullReceiptSource::with_receipt(b"receipt".to_vec()))
}

fn spawn_purchase(bridge: &Arc<StoreBridge>, product: &'static str) -> JoinHandle<PurchaseResult> {
    let bridge = bridge.clone();
    tokio::spawn(async move {
        bridge
            .purchase(product, ItemType::Consumable, None, None)
            .await
    })
}

fn spawn_restore(
    bridge: &Arc<StoreBridge>,
) -> JoinHandle<Result<Option<Vec<Purchase>>, PurchaseError>> {
    let bridge = bridge.clone();
    tokio::spawn(async move { bridge.get_purchases(ItemType::NonConsumable, None).await })
}

#[tokio::test]
async fn concurrent_purchases_resolve_independently() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);

    let small = spawn_purchase(&bridge, "coffee.small");
    let large = spawn_purchase(&bridge, "coffee.large");
    queue.wait_for_submissions(2).await;
    assert_eq!(bridge.pending_requests(), 2);

    queue.deliver(vec![
        tx::purchased("coffee.large", "t2"),
        tx::purchased("coffee.small", "t1"),
    ]);

    let small = small.await.unwrap().unwrap().unwrap();
    let large = large.await.unwrap().unwrap().unwrap();
    assert_eq!(small.id.as_str(), "t1");
    assert_eq!(small.product_id.as_str(), "coffee.small");
    assert_eq!(large.id.as_str(), "t2");
    assert_eq!(queue.finished().len(), 2);
    assert_eq!(bridge.pending_requests(), 0);
}

#[tokio::test]
async fn overlapping_purchase_of_same_product_is_rejected() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);

    let first = spawn_purchase(&bridge, "coffee.small");
    queue.wait_for_submissions(1).await;

    let second = bridge
        .purchase("coffee.small", ItemType::Consumable, None, None)
        .await;
    assert_eq!(
        second,
        Err(PurchaseError::RequestPending("coffee.small".into()))
    );
    assert_eq!(queue.submitted().len(), 1);

    queue.deliver(vec![tx::purchased("coffee.small", "t1")]);
    assert!(first.await.unwrap().unwrap().is_some());

    queue.respond_with("coffee.small", vec![tx::purchased("coffee.small", "t2")]);
    let third = bridge
        .purchase("coffee.small", ItemType::Consumable, None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(third.id.as_str(), "t2");
}

#[tokio::test]
async fn abandoned_purchase_does_not_block_the_next_one() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);

    let abandoned = spawn_purchase(&bridge, "coffee.small");
    queue.wait_for_submissions(1).await;
    abandoned.abort();
    assert!(abandoned.await.unwrap_err().is_cancelled());

    queue.respond_with("coffee.small", vec![tx::purchased("coffee.small", "t1")]);
    let purchase = bridge
        .purchase("coffee.small", ItemType::Consumable, None, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(purchase.id.as_str(), "t1");
}

#[tokio::test]
async fn deferred_payment_keeps_caller_waiting() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);

    let pending = spawn_purchase(&bridge, "coffee.small");
    queue.wait_for_submissions(1).await;
    queue.deliver(vec![tx::purchasing("coffee.small")]);
    queue.deliver(vec![tx::deferred("coffee.small")]);
    tokio::task::yield_now().await;
    assert!(!pending.is_finished());
    assert!(queue.finished().is_empty());

    queue.deliver(vec![tx::purchased("coffee.small", "t1")]);
    let purchase = pending.await.unwrap().unwrap().unwrap();
    assert_eq!(purchase.state, PurchaseState::Purchased);
    assert_eq!(queue.finished().len(), 1);
}

#[tokio::test]
async fn platform_errors_are_classified() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);

    let cases = [
        (PlatformErrorCode::PaymentInvalid, PurchaseError::PaymentInvalid),
        (PlatformErrorCode::PaymentNotAllowed, PurchaseError::PaymentNotAllowed),
        (
            PlatformErrorCode::StoreProductNotAvailable,
            PurchaseError::ItemUnavailable,
        ),
        (PlatformErrorCode::ClientInvalid, PurchaseError::BillingUnavailable),
    ];
    for (code, expected) in cases {
        queue.respond_with("coffee.large", vec![tx::failed("coffee.large", code)]);
        let result = bridge
            .purchase("coffee.large", ItemType::NonConsumable, None, None)
            .await;
        assert_eq!(result, Err(expected));
    }
    assert_eq!(queue.finished().len(), 4);
    assert_eq!(bridge.metrics().transactions_failed.get(), 4);
}

#[tokio::test]
async fn disconnect_fails_waiting_callers() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);

    let purchase = spawn_purchase(&bridge, "coffee.small");
    let restore = spawn_restore(&bridge);
    queue.wait_for_submissions(1).await;
    queue.wait_for_restore_requests(1).await;

    bridge.disconnect();
    assert_eq!(
        purchase.await.unwrap(),
        Err(PurchaseError::BillingUnavailable)
    );
    assert_eq!(restore.await.unwrap(), Err(PurchaseError::BillingUnavailable));
    assert_eq!(queue.observer_count(), 0);
}

#[tokio::test]
async fn requests_on_a_shut_down_observer_fail_instead_of_hanging() {
    let queue = Arc::new(NullPaymentQueue::new());
    let metrics = Arc::new(BridgeMetrics::new());
    let (updates, _) = broadcast::channel(8);
    let observer = Arc::new(BridgeObserver::new(
        queue.clone(),
        updates,
        metrics.clone(),
        false,
    ));
    let receipts: Arc<dyn ReceiptSource> = Arc::new(NullReceiptSource::empty());
    let purchases = PurchaseCoordinator::new(
        queue.clone(),
        observer.clone(),
        receipts.clone(),
        metrics.clone(),
    );
    let restores = RestoreCoordinator::new(queue.clone(), observer.clone(), receipts, metrics);

    // A disconnect that lands after the caller picked up the observer.
    observer.shutdown();

    assert_eq!(
        purchases
            .purchase(ProductId::new("coffee.small"), None, None)
            .await,
        Err(PurchaseError::BillingUnavailable)
    );
    assert_eq!(restores.restore(None).await, Err(PurchaseError::BillingUnavailable));
    assert!(queue.submitted().is_empty());
    assert_eq!(queue.restore_requests(), 0);
}

#[tokio::test]
async fn unsolicited_settlement_is_finished_and_broadcast() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);
    let mut updates = bridge.subscribe_updates();

    queue.deliver(vec![tx::purchased("coffee.large", "t7")]);

    match updates.recv().await.unwrap() {
        TransactionEvent::Settled(settlement) => {
            assert!(settlement.success);
            assert_eq!(settlement.product_id.as_str(), "coffee.large");
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(queue.finished().len(), 1);
    assert_eq!(bridge.metrics().settlements_unclaimed.get(), 1);
}

#[tokio::test]
async fn restore_accumulates_batches_until_completion() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);

    let restore = spawn_restore(&bridge);
    queue.wait_for_restore_requests(1).await;
    queue.deliver(vec![tx::restored("pro.unlock", "r1", "t1")]);
    queue.deliver(vec![
        tx::restored("coffee.small", "r2", "t2"),
        tx::purchasing("coffee.large"),
    ]);
    queue.complete_restore();

    let purchases = restore.await.unwrap().unwrap().unwrap();
    let ids: Vec<&str> = purchases.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2"]);
    assert_eq!(queue.finished().len(), 2);

    // The next restore starts from an empty buffer.
    let again = spawn_restore(&bridge);
    queue.wait_for_restore_requests(2).await;
    queue.complete_restore();
    assert_eq!(again.await.unwrap(), Ok(Some(vec![])));
}

#[tokio::test]
async fn restore_failure_resolves_without_partial_list() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);
    let mut updates = bridge.subscribe_updates();

    let restore = spawn_restore(&bridge);
    queue.wait_for_restore_requests(1).await;
    queue.deliver(vec![tx::restored("pro.unlock", "r1", "t1")]);
    queue.fail_restore(PlatformError::new(
        PlatformErrorCode::CloudServiceNetworkConnectionFailed,
        "network down",
    ));

    assert_eq!(
        restore.await.unwrap(),
        Err(PurchaseError::RestoreFailed("network down".into()))
    );
    assert!(matches!(
        updates.recv().await.unwrap(),
        TransactionEvent::RestoreFinished(RestoreOutcome::Failed(_))
    ));
    assert!(queue.finished().is_empty());
    assert_eq!(bridge.metrics().restores_failed.get(), 1);
}

#[tokio::test]
async fn concurrent_restore_is_rejected() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);

    let first = spawn_restore(&bridge);
    queue.wait_for_restore_requests(1).await;
    assert!(matches!(
        bridge.get_purchases(ItemType::NonConsumable, None).await,
        Err(PurchaseError::RequestPending(_))
    ));
    assert_eq!(queue.restore_requests(), 1);

    queue.complete_restore();
    assert_eq!(first.await.unwrap(), Ok(Some(vec![])));
}

#[tokio::test]
async fn purchase_validation_sends_receipt_and_identifiers() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);
    let validator = NullValidator::accepting();

    queue.respond_with(
        "coffee.small",
        vec![tx::purchased_with_payload("coffee.small", "t1", "order-1")],
    );
    let purchase = bridge
        .purchase(
            "coffee.small",
            ItemType::Consumable,
            Some("order-1".into()),
            Some(&validator),
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(purchase.developer_payload.as_deref(), Some("order-1"));
    assert_eq!(
        queue.submitted()[0].application_username.as_deref(),
        Some("order-1")
    );

    let requests = validator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].receipt_base64, "cmVjZWlwdA==");
    assert_eq!(requests[0].server_payload, "order-1");
    assert_eq!(requests[0].product_id, "coffee.small");
    assert_eq!(requests[0].transaction_id, "t1");
}

#[tokio::test]
async fn rejected_purchase_resolves_to_none() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);
    let validator = NullValidator::rejecting();

    queue.respond_with("coffee.small", vec![tx::purchased("coffee.small", "t1")]);
    let result = bridge
        .purchase("coffee.small", ItemType::Consumable, None, Some(&validator))
        .await;
    assert_eq!(result, Ok(None));
    assert_eq!(queue.finished().len(), 1);
    assert_eq!(bridge.metrics().validations_rejected.get(), 1);
}

#[tokio::test]
async fn missing_receipt_counts_as_rejection() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = bridge_with(&queue, NullReceiptSource::empty());
    let validator = NullValidator::accepting();

    queue.respond_with("coffee.small", vec![tx::purchased("coffee.small", "t1")]);
    let result = bridge
        .purchase("coffee.small", ItemType::Consumable, None, Some(&validator))
        .await;
    assert_eq!(result, Ok(None));
    assert!(validator.requests().is_empty());
}

#[tokio::test]
async fn restore_validation_covers_whole_set() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);
    let validator = Arc::new(NullValidator::rejecting());

    let restore = {
        let bridge = bridge.clone();
        let validator = validator.clone();
        tokio::spawn(async move {
            bridge
                .get_purchases(
                    ItemType::NonConsumable,
                    Some(validator.as_ref() as &dyn ReceiptValidator),
                )
                .await
        })
    };
    queue.wait_for_restore_requests(1).await;
    queue.deliver(vec![
        tx::restored("pro.unlock", "r1", "t1"),
        tx::restored("coffee.small", "r2", "t2"),
    ]);
    queue.complete_restore();

    assert_eq!(restore.await.unwrap(), Ok(None));
    let requests = validator.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].product_id.is_empty());
    assert!(requests[0].transaction_id.is_empty());
    assert!(requests[0].server_payload.is_empty());
}

#[tokio::test]
async fn fetch_products_returns_catalog_answer() {
    let queue = Arc::new(NullPaymentQueue::new());
    let bridge = connected(&queue);

    let products = bridge
        .fetch_products(ItemType::Consumable, ["coffee.large", "tea"])
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].price_micros, 2_990_000);

    assert_eq!(
        bridge
            .fetch_products(ItemType::Consumable, ["tea"])
            .await,
        Err(PurchaseError::InvalidProduct)
    );
}

#[test]
fn receipt_source_is_plain_bytes() {
    let receipts = NullReceiptSource::with_receipt(vec![1, 2, 3]);
    assert_eq!(receipts.receipt_data(), Some(vec![1, 2, 3]));
}
