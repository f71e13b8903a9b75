//! The bridge driving the in-process sandbox store.

use std::sync::Arc;
use std::time::Duration;

use iap_bridge::{BridgeConfig, StoreBridge, TransactionEvent};
use iap_nullables::NullValidator;
use iap_store::{Payment, PaymentQueue};
use iap_store_sandbox::{SandboxConfig, SandboxOutcome, SandboxStore};
use iap_types::{ItemType, ProductId, PurchaseError, PurchaseState};
use iap_utils::decode_receipt;

fn sandbox(config: SandboxConfig) -> (Arc<SandboxStore>, StoreBridge) {
    let store = Arc::new(
        SandboxStore::new(SandboxConfig {
            delivery_delay_ms: 0,
            ..config
        })
        .unwrap(),
    );
    let bridge = StoreBridge::new(
        store.clone(),
        store.clone(),
        store.clone(),
        BridgeConfig::default(),
    );
    bridge.connect().unwrap();
    (store, bridge)
}

#[tokio::test]
async fn purchase_then_restore() {
    let (store, bridge) = sandbox(SandboxConfig::demo());

    let purchase = bridge
        .purchase(
            "pro.unlock",
            ItemType::NonConsumable,
            Some("user-42".into()),
            None,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(purchase.state, PurchaseState::Purchased);
    assert_eq!(purchase.developer_payload.as_deref(), Some("user-42"));
    assert_eq!(store.unfinished_count(), 0);

    let restored = bridge
        .get_purchases(ItemType::NonConsumable, None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(restored.len(), 1);
    assert_eq!(restored[0].id, purchase.id);
    assert_eq!(store.unfinished_count(), 0);
}

#[tokio::test]
async fn restore_spanning_several_batches() {
    let mut config = SandboxConfig::demo();
    config.owned = vec![
        "pro.unlock".into(),
        "coffee.small".into(),
        "coffee.large".into(),
    ];
    let (_store, bridge) = sandbox(config);

    let restored = bridge
        .get_purchases(ItemType::NonConsumable, None)
        .await
        .unwrap()
        .unwrap();
    let products: Vec<&str> = restored.iter().map(|p| p.product_id.as_str()).collect();
    assert_eq!(products, vec!["pro.unlock", "coffee.small", "coffee.large"]);
}

#[tokio::test]
async fn cancelled_payment_is_user_cancelled() {
    let mut config = SandboxConfig::demo();
    config
        .outcomes
        .insert("coffee.small".into(), SandboxOutcome::Cancel);
    let (store, bridge) = sandbox(config);

    assert_eq!(
        bridge
            .purchase("coffee.small", ItemType::Consumable, None, None)
            .await,
        Err(PurchaseError::UserCancelled)
    );
    assert_eq!(store.unfinished_count(), 0);
    assert!(store.ledger().is_empty());
}

#[tokio::test]
async fn deferred_payment_settles_after_approval() {
    let mut config = SandboxConfig::demo();
    config
        .outcomes
        .insert("coffee.large".into(), SandboxOutcome::Defer);
    let (_store, bridge) = sandbox(config);

    let purchase = bridge
        .purchase("coffee.large", ItemType::Consumable, None, None)
        .await
        .unwrap();
    assert!(purchase.is_some());
}

#[tokio::test]
async fn failed_restore_is_restore_failed() {
    let config = SandboxConfig {
        restore_fails: true,
        owned: vec!["pro.unlock".into()],
        ..SandboxConfig::demo()
    };
    let (_store, bridge) = sandbox(config);

    assert!(matches!(
        bridge.get_purchases(ItemType::NonConsumable, None).await,
        Err(PurchaseError::RestoreFailed(_))
    ));
}

#[tokio::test]
async fn catalog_lookup_and_outage() {
    let (_store, bridge) = sandbox(SandboxConfig::demo());
    let products = bridge
        .fetch_products(ItemType::Consumable, ["coffee.small", "tea"])
        .await
        .unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].formatted_price, "USD 1.99");

    let (_store, down) = sandbox(SandboxConfig {
        catalog_unavailable: true,
        ..SandboxConfig::demo()
    });
    assert!(matches!(
        down.fetch_products(ItemType::Consumable, ["coffee.small"]).await,
        Err(PurchaseError::ProductRequestFailed(_))
    ));
}

#[tokio::test]
async fn validator_sees_sandbox_receipt() {
    let (_store, bridge) = sandbox(SandboxConfig::demo());
    let validator = NullValidator::accepting();

    let purchase = bridge
        .purchase("coffee.small", ItemType::Consumable, None, Some(&validator))
        .await
        .unwrap()
        .unwrap();

    let requests = validator.requests();
    let receipt = decode_receipt(&requests[0].receipt_base64).unwrap();
    let receipt = String::from_utf8(receipt).unwrap();
    assert!(receipt.contains(purchase.id.as_str()));
    assert_eq!(requests[0].transaction_id, purchase.id.as_str());
}

#[tokio::test]
async fn transactions_left_unfinished_settle_on_connect() {
    let store = Arc::new(
        SandboxStore::new(SandboxConfig {
            delivery_delay_ms: 0,
            ..SandboxConfig::demo()
        })
        .unwrap(),
    );
    // A payment made while nothing was listening.
    store.submit_payment(Payment::new(ProductId::new("coffee.small")));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.unfinished_count(), 1);

    let bridge = StoreBridge::new(
        store.clone(),
        store.clone(),
        store.clone(),
        BridgeConfig::default(),
    );
    let mut updates = bridge.subscribe_updates();
    bridge.connect().unwrap();

    assert!(matches!(
        updates.recv().await.unwrap(),
        TransactionEvent::Settled(s) if s.success
    ));
    assert_eq!(store.unfinished_count(), 0);
    assert_eq!(bridge.metrics().settlements_unclaimed.get(), 1);
}
