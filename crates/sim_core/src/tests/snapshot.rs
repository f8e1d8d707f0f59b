use super::*;
use crate::parity::{compare_states, DEFAULT_TOLERANCE};
use crate::snapshot::{normalize, snapshot_from_state, NormalizedSnapshot, Snapshot};
use serde_json::{json, Value};

fn snapshot_json(state: &GameState) -> Value {
    serde_json::to_value(snapshot_from_state(state)).unwrap()
}

fn load(value: Value, content: &GameContent) -> NormalizedSnapshot {
    let snapshot: Snapshot = serde_json::from_value(value).unwrap();
    normalize(&snapshot, content)
}

fn warned(normalized: &NormalizedSnapshot, path: &str) -> bool {
    normalized.warnings.iter().any(|warning| warning.path == path)
}

#[test]
fn test_missing_ledger_key_reads_as_zero_silently() {
    let content = test_content();
    let mut state = test_state(&content);
    state.factories[0].resources.metals = 4.0;
    let mut value = snapshot_json(&state);
    value["factories"][0]["resources"]
        .as_object_mut()
        .unwrap()
        .remove("bars");

    let normalized = load(value, &content);

    assert!(normalized.warnings.is_empty(), "{:?}", normalized.warnings);
    let factory = &normalized.state.factories[0];
    assert!(factory.resources.bars.abs() < f64::EPSILON);
    assert!((factory.resources.metals - 4.0).abs() < f64::EPSILON);
}

#[test]
fn test_invalid_scalar_falls_back_with_warning() {
    let content = test_content();
    let mut value = snapshot_json(&test_state(&content));
    value["factories"][0]["energy"] = json!("full");
    value["factories"][1]["resources"]["ore"] = json!(-12.0);

    let normalized = load(value, &content);

    assert!(warned(&normalized, "factories[0].energy"));
    assert!(warned(&normalized, "factories[1].resources.ore"));
    assert!((normalized.state.factories[0].energy - 40.0).abs() < f64::EPSILON);
    assert!(normalized.state.factories[1].resources.ore.abs() < f64::EPSILON);
}

#[test]
fn test_duplicate_and_reserved_ids_are_renamed() {
    let content = test_content();
    let mut value = snapshot_json(&test_state(&content));
    value["factories"][1]["id"] = json!("factory-a");

    let normalized = load(value, &content);
    let ids: Vec<&str> = normalized
        .state
        .factories
        .iter()
        .map(|factory| factory.id.0.as_str())
        .collect();
    assert_eq!(ids, vec!["factory-a", "factory-a-2"]);
    assert!(warned(&normalized, "factories[1].id"));

    let mut value = snapshot_json(&test_state(&content));
    value["factories"][0]["id"] = json!("warehouse");
    let normalized = load(value, &content);
    assert_eq!(normalized.state.factories[0].id.0, "warehouse-1");
}

#[test]
fn test_factory_without_position_is_dropped() {
    let content = test_content();
    let mut value = snapshot_json(&test_state(&content));
    value["factories"][0]["position"] = json!([1.0, 2.0]);

    let normalized = load(value, &content);

    assert_eq!(normalized.state.factories.len(), 1);
    assert_eq!(normalized.state.factories[0].id.0, "factory-b");
    assert!(warned(&normalized, "factories[0].position"));
}

#[test]
fn test_refines_beyond_slots_are_truncated() {
    let content = test_content();
    let mut state = test_state(&content);
    transfer_ore_to_factory(&mut state.factories[0], 300.0);
    step(&mut state, &content, 1.0);
    assert_eq!(state.factories[0].active_refines.len(), 2);
    let mut value = snapshot_json(&state);
    value["factories"][0]["refineSlots"] = json!(1);
    value["factories"][0]["activeRefines"][0]["progress"] = json!(7.5);

    let normalized = load(value, &content);

    let factory = &normalized.state.factories[0];
    assert_eq!(factory.refine_slots, 1);
    assert_eq!(factory.active_refines.len(), 1);
    assert!((factory.active_refines[0].progress - 1.0).abs() < f64::EPSILON);
    assert_eq!(factory.next_process_seq, 2);
    assert!(warned(&normalized, "factories[0].activeRefines"));
}

#[test]
fn test_reservation_is_clamped_to_stock() {
    let content = test_content();
    let mut state = test_state(&content);
    state.factories[0].resources.metals = 10.0;
    let mut value = snapshot_json(&state);
    value["factories"][0]["logisticsState"]["outboundReservations"]["metals"] = json!(30.0);

    let normalized = load(value, &content);

    let reserved = normalized.state.factories[0]
        .logistics
        .outbound_reservations
        .metals;
    assert!((reserved - 10.0).abs() < f64::EPSILON);
    assert!(warned(
        &normalized,
        "factories[0].logisticsState.outboundReservations.metals"
    ));
}

#[test]
fn test_pending_transfers_rebuild_inbound_schedules() {
    let content = test_content();
    let mut value = snapshot_json(&test_state(&content));
    value["logisticsQueues"] = json!({
        "pendingTransfers": [
            {
                "id": "transfer-000007",
                "fromFactoryId": "warehouse",
                "toFactoryId": "factory-a",
                "resource": "ore",
                "amount": 20.0,
                "status": "scheduled",
                "eta": 5.0
            },
            {
                "id": "transfer-000003",
                "fromFactoryId": "factory-b",
                "toFactoryId": "factory-a",
                "resource": "bars",
                "amount": 4.0,
                "status": "completed",
                "eta": 1.0
            },
            {
                "id": "transfer-000004",
                "fromFactoryId": "factory-b",
                "toFactoryId": "factory-a",
                "resource": "credits",
                "amount": 4.0,
                "eta": 1.0
            }
        ]
    });

    let normalized = load(value, &content);

    let state = &normalized.state;
    assert_eq!(state.logistics.pending_transfers.len(), 1);
    assert_eq!(state.counters.next_transfer_id, 8);
    assert_eq!(state.counters.next_event_id, 1);
    let inbound = &state.factories[0].logistics.inbound_schedules;
    assert_eq!(inbound.len(), 1);
    assert_eq!(inbound[0].transfer_id.0, "transfer-000007");
    assert_eq!(inbound[0].from, Endpoint::Warehouse);
    assert!(warned(&normalized, "logisticsQueues.pendingTransfers[2]"));
}

#[test]
fn test_only_the_oldest_request_survives() {
    let content = test_content();
    let mut value = snapshot_json(&test_state(&content));
    value["factories"][0]["upgradeRequests"] = json!([
        { "upgrade": "refine", "resourceNeeded": { "bars": 13.0 }, "status": "pending",
          "createdAt": 20.0, "expiresAt": 80.0 },
        { "upgrade": "docking", "resourceNeeded": { "bars": 13.0 }, "status": "partially_fulfilled",
          "fulfilledAmount": { "bars": 2.0 }, "createdAt": 5.0, "expiresAt": 65.0 },
        { "upgrade": "storage", "status": "expired", "createdAt": 1.0, "expiresAt": 2.0 }
    ]);

    let normalized = load(value, &content);

    let requests = &normalized.state.factories[0].upgrade_requests;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].upgrade, UpgradeKind::Docking);
    assert_eq!(requests[0].status, UpgradeStatus::PartiallyFulfilled);
    assert!((requests[0].fulfilled_amount.bars - 2.0).abs() < f64::EPSILON);
}

#[test]
fn test_throughput_persists_and_older_saves_read_zero() {
    let content = test_content();
    let mut state = test_state(&content);
    state.factories[0].logistics.throughput = 84.5;

    let mut value = snapshot_json(&state);
    let normalized = load(value.clone(), &content);
    assert!((normalized.state.factories[0].logistics.throughput - 84.5).abs() < 1e-9);

    value["factories"][0]["logisticsState"]
        .as_object_mut()
        .unwrap()
        .remove("throughput");
    value["factories"][1]["logisticsState"]["throughput"] = json!(-4.0);
    let normalized = load(value, &content);
    assert!(normalized.state.factories[0].logistics.throughput.abs() < f64::EPSILON);
    assert!(!warned(&normalized, "factories[0].logisticsState.throughput"));
    assert!(normalized.state.factories[1].logistics.throughput.abs() < f64::EPSILON);
    assert!(warned(&normalized, "factories[1].logisticsState.throughput"));
}

#[test]
fn test_large_seed_round_trips_exactly() {
    let content = test_content();
    let mut state = test_state(&content);
    state.meta.seed = u64::MAX - 6;

    let text = serde_json::to_string(&snapshot_from_state(&state)).unwrap();
    let normalized = load(serde_json::from_str(&text).unwrap(), &content);

    assert_eq!(normalized.state.meta.seed, u64::MAX - 6);
    assert!(!warned(&normalized, "rngSeed"));
}

#[test]
fn test_legacy_seed_encodings_load() {
    let content = test_content();
    for (raw, expected) in [(json!(42.0), 42), (json!("9007199254740993"), 9_007_199_254_740_993)] {
        let mut value = snapshot_json(&test_state(&content));
        value["rngSeed"] = raw;
        let normalized = load(value, &content);
        assert_eq!(normalized.state.meta.seed, expected);
    }

    let mut value = snapshot_json(&test_state(&content));
    value["rngSeed"] = json!(-3);
    let normalized = load(value, &content);
    assert_eq!(normalized.state.meta.seed, 0);
    assert!(warned(&normalized, "rngSeed"));
}

#[test]
fn test_empty_snapshot_loads_with_defaults() {
    let content = test_content();

    let normalized = load(json!({}), &content);

    assert!(normalized.state.factories.is_empty());
    assert!(normalized.state.meta.game_time.abs() < f64::EPSILON);
    assert!(warned(&normalized, "gameTime"));
}

#[test]
fn test_busy_state_survives_a_json_round_trip() {
    let content = test_content();
    let mut state = test_state(&content);
    state.warehouse.resources.bars = 80.0;
    state.warehouse.modules.hauler_depot = 2;
    state.factories[0].haulers_assigned = 2;
    state.factories[0].hauler_upgrades.speed_boost = 1;
    state.factories[1].haulers_assigned = 1;
    state.factories[0].resources.metals = 150.0;
    transfer_ore_to_factory(&mut state.factories[0], 250.0);
    for _ in 0..9 {
        step(&mut state, &content, 1.0);
    }
    assert!(!state.logistics.pending_transfers.is_empty());

    let text = serde_json::to_string(&snapshot_from_state(&state)).unwrap();
    let snapshot: Snapshot = serde_json::from_str(&text).unwrap();
    let normalized = normalize(&snapshot, &content);

    assert!(normalized.warnings.is_empty(), "{:?}", normalized.warnings);
    let report = compare_states(&state, &normalized.state, DEFAULT_TOLERANCE);
    assert!(report.is_clean(), "{report}");
    assert_eq!(
        normalized.state.counters.next_transfer_id,
        state.counters.next_transfer_id
    );
    for (restored, original) in normalized.state.factories.iter().zip(&state.factories) {
        let restored_inbound = &restored.logistics.inbound_schedules;
        let original_inbound = &original.logistics.inbound_schedules;
        assert_eq!(restored_inbound.len(), original_inbound.len());
        for (r, o) in restored_inbound.iter().zip(original_inbound) {
            assert_eq!(r.transfer_id, o.transfer_id);
            assert!((r.eta - o.eta).abs() < 1e-9);
        }
        assert_eq!(restored.next_process_seq, original.next_process_seq);
    }
}
