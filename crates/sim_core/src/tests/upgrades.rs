use super::*;
use crate::upgrades::{detect_upgrade_shortfall, record_delivery};

#[test]
fn test_detection_is_idempotent() {
    let content = test_content();
    let mut factory = make_factory(&content, "factory-a", [0.0; 3]);

    let first = detect_upgrade_shortfall(&mut factory, &content, &UpgradeKind::PRIORITY, 0.0);
    let second = detect_upgrade_shortfall(&mut factory, &content, &UpgradeKind::PRIORITY, 1.0);

    let request = first.expect("empty factory is short on everything");
    assert_eq!(request.upgrade, UpgradeKind::Docking);
    assert_eq!(request.status, UpgradeStatus::Pending);
    assert!((request.expires_at - 60.0).abs() < 1e-9);
    assert!(second.is_none());
    assert_eq!(factory.upgrade_requests.len(), 1);
}

#[test]
fn test_detection_follows_priority_and_level_cost() {
    let content = test_content();
    let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
    factory.resources.bars = 13.0;
    factory.upgrades.docking = 1;

    let request =
        detect_upgrade_shortfall(&mut factory, &content, &UpgradeKind::PRIORITY, 0.0).unwrap();

    // 13 * 1.35 rounded up.
    assert_eq!(request.upgrade, UpgradeKind::Docking);
    assert!((request.resource_needed.bars - 18.0).abs() < 1e-9);
}

#[test]
fn test_no_request_when_everything_is_affordable() {
    let content = test_content();
    let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
    factory.resources.bars = 20.0;

    assert!(detect_upgrade_shortfall(&mut factory, &content, &UpgradeKind::PRIORITY, 0.0).is_none());
    assert!(factory.upgrade_requests.is_empty());
}

#[test]
fn test_partial_then_full_delivery() {
    let content = test_content();
    let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
    detect_upgrade_shortfall(&mut factory, &content, &UpgradeKind::PRIORITY, 0.0);

    assert!(record_delivery(&mut factory, ResourceKind::Bars, 6.0).is_empty());
    assert_eq!(
        factory.upgrade_requests[0].status,
        UpgradeStatus::PartiallyFulfilled
    );
    // Resources the request does not need are ignored.
    assert!(record_delivery(&mut factory, ResourceKind::Metals, 50.0).is_empty());

    let fulfilled = record_delivery(&mut factory, ResourceKind::Bars, 20.0);
    assert_eq!(fulfilled, vec![UpgradeKind::Docking]);
    let request = &factory.upgrade_requests[0];
    assert_eq!(request.status, UpgradeStatus::Fulfilled);
    assert!((request.fulfilled_amount.bars - 13.0).abs() < 1e-9);
}

#[test]
fn test_expired_request_is_replaced_in_the_same_tick() {
    let content = test_content();
    let mut state = test_state(&content);
    step(&mut state, &content, 1.0);
    assert_eq!(state.factories[0].upgrade_requests.len(), 1);
    assert!(state.factories[0].upgrade_requests[0].created_at.abs() < f64::EPSILON);

    state.meta.game_time = 60.0;
    let events = step(&mut state, &content, 1.0);

    let kinds: Vec<&str> = events
        .iter()
        .filter(|e| match &e.event {
            Event::UpgradeRequestExpired { factory_id, .. }
            | Event::UpgradeRequested { factory_id, .. } => factory_id.0 == "factory-a",
            _ => false,
        })
        .map(|e| match e.event {
            Event::UpgradeRequestExpired { .. } => "expired",
            _ => "requested",
        })
        .collect();
    assert_eq!(kinds, vec!["expired", "requested"]);

    let requests = &state.factories[0].upgrade_requests;
    assert_eq!(requests.len(), 1);
    assert!((requests[0].created_at - 60.0).abs() < 1e-9);
    assert!((requests[0].expires_at - 120.0).abs() < 1e-9);
}

#[test]
fn test_purchase_command_applies_upgrade() {
    let content = test_content();
    let mut state = test_state(&content);
    state.factories[0].resources.bars = 13.0;

    let events = step_with(
        &mut state,
        &[envelope(
            1,
            0.0,
            Command::PurchaseUpgrade {
                factory_id: fid("factory-a"),
                upgrade: UpgradeKind::Docking,
                cost_variant: None,
            },
        )],
        &content,
        0.0,
    );

    assert!(matches!(
        events[0].event,
        Event::UpgradePurchased {
            upgrade: UpgradeKind::Docking,
            level: 1,
            ..
        }
    ));
    let factory = &state.factories[0];
    assert_eq!(factory.docking_capacity, 4);
    assert_eq!(factory.upgrades.docking, 1);
    assert!(factory.resources.bars.abs() < 1e-9);
}

#[test]
fn test_alternative_cost_variant_spends_metals() {
    let content = test_content();
    let mut state = test_state(&content);
    state.factories[0].resources.metals = 60.0;

    let level = purchase_upgrade(
        &mut state.factories[0],
        &content,
        UpgradeKind::Docking,
        Some("metals"),
    )
    .unwrap();

    assert_eq!(level, 1);
    assert!((state.factories[0].resources.metals - 10.0).abs() < 1e-9);
}

#[test]
fn test_reserved_bars_cannot_be_spent() {
    let content = test_content();
    let mut state = test_state(&content);
    let factory = &mut state.factories[0];
    factory.resources.bars = 30.0;
    factory.logistics.outbound_reservations.bars = 20.0;

    let result = purchase_upgrade(factory, &content, UpgradeKind::Refine, None);

    assert_eq!(result, Err(CommandError::InsufficientResources));
    assert!((factory.resources.bars - 30.0).abs() < 1e-9);
    assert_eq!(factory.refine_slots, 2);
}

#[test]
fn test_storage_and_refine_upgrades_change_capacity() {
    let content = test_content();
    let mut state = test_state(&content);
    let factory = &mut state.factories[0];
    factory.resources.bars = 100.0;

    purchase_upgrade(factory, &content, UpgradeKind::Refine, None).unwrap();
    purchase_upgrade(factory, &content, UpgradeKind::Storage, None).unwrap();

    assert_eq!(factory.refine_slots, 3);
    assert!((factory.storage_capacity - 450.0).abs() < 1e-9);
    assert!((factory.resources.bars - 74.0).abs() < 1e-9);
}
