use super::*;
use crate::logistics::schedule_transfers;

fn three_factory_network(content: &GameContent) -> GameState {
    let mut state = test_state(content);
    state.factories = vec![
        make_factory(content, "factory-a", [10.0, 0.0, 0.0]),
        make_factory(content, "factory-b", [-10.0, 0.0, 0.0]),
        make_factory(content, "factory-c", [0.0, 10.0, 0.0]),
    ];
    for factory in &mut state.factories {
        factory.haulers_assigned = 1;
    }
    state.factories[0].resources.ore = 200.0;
    state.factories[1].resources.ore = 200.0;
    for factory in &mut state.factories {
        factory.sync_storage();
    }
    state
}

fn run_pass(state: &mut GameState, content: &GameContent) -> Vec<EventEnvelope> {
    let mut events = Vec::new();
    schedule_transfers(
        state,
        content,
        &ResourceModifiers::NEUTRAL,
        &mut NullFxSink,
        &mut events,
    );
    events
}

fn transfer(id: &str, from: Endpoint, to: Endpoint, amount: f64, eta: f64) -> PendingTransfer {
    PendingTransfer {
        id: TransferId(id.to_string()),
        from,
        to,
        resource: ResourceKind::Metals,
        amount,
        eta,
        for_upgrade: None,
    }
}

#[test]
fn test_equal_suppliers_resolve_to_first_factory() {
    let content = test_content();
    let mut state = three_factory_network(&content);

    run_pass(&mut state, &content);

    let first = &state.logistics.pending_transfers[0];
    assert_eq!(first.from, Endpoint::Factory(fid("factory-a")));
    assert_eq!(first.to, Endpoint::Factory(fid("factory-c")));
    assert_eq!(first.resource, ResourceKind::Ore);
    assert!((first.amount - 50.0).abs() < 1e-9);
    assert!(
        !state.logistics.pending_transfers.iter().any(|t| {
            t.from == Endpoint::Factory(fid("factory-b"))
                && t.to == Endpoint::Factory(fid("factory-c"))
        }),
        "the need is fully covered by factory-a"
    );
    // factory-a also exports what is left over to the warehouse.
    assert!(state.factories[0].logistics.outbound_reservations.ore >= 50.0 - 1e-9);
    assert_eq!(state.factories[2].logistics.inbound_schedules.len(), 1);
}

#[test]
fn test_scheduling_pass_is_deterministic() {
    let content = test_content();
    let mut left = three_factory_network(&content);
    let mut right = three_factory_network(&content);

    run_pass(&mut left, &content);
    run_pass(&mut right, &content);

    assert_eq!(
        left.logistics.pending_transfers,
        right.logistics.pending_transfers
    );
    assert_eq!(left.factories, right.factories);
}

#[test]
fn test_no_haulers_means_no_transfers() {
    let content = test_content();
    let mut state = three_factory_network(&content);
    for factory in &mut state.factories {
        factory.haulers_assigned = 0;
    }
    state.warehouse.resources.ore = 500.0;

    let events = run_pass(&mut state, &content);

    assert!(events.is_empty());
    assert!(state.logistics.pending_transfers.is_empty());
}

#[test]
fn test_transfer_fx_matches_scheduled_events() {
    let content = test_content();
    let mut state = three_factory_network(&content);
    let mut fx = RecordingFxSink::default();
    let mut events = Vec::new();

    schedule_transfers(
        &mut state,
        &content,
        &ResourceModifiers::NEUTRAL,
        &mut fx,
        &mut events,
    );

    let scheduled = events
        .iter()
        .filter(|e| matches!(e.event, Event::TransferScheduled { .. }))
        .count();
    assert!(scheduled > 0);
    assert_eq!(fx.recorded.len(), scheduled);
    assert!(fx.recorded.iter().all(|effect| effect.duration >= 0.1));
}

#[test]
fn test_scheduling_waits_for_interval() {
    let content = test_content();
    let mut state = test_state(&content);
    for factory in &mut state.factories {
        factory.haulers_assigned = 1;
    }
    state.factories[0].resources.metals = 200.0;

    step(&mut state, &content, 1.0);
    assert!(state.logistics.pending_transfers.is_empty());
    assert!((state.logistics.scheduling_accumulator - 1.0).abs() < 1e-9);

    step(&mut state, &content, 1.0);
    assert!(!state.logistics.pending_transfers.is_empty());
    assert!(state.logistics.scheduling_accumulator.abs() < f64::EPSILON);
}

#[test]
fn test_metals_are_conserved_across_the_network() {
    let content = test_content();
    let mut state = test_state(&content);
    state.factories[0].haulers_assigned = 2;
    state.factories[1].haulers_assigned = 1;
    state.factories[0].resources.metals = 300.0;

    let mut arrivals = 0;
    for _ in 0..120 {
        let events = step(&mut state, &content, 0.5);
        arrivals += events
            .iter()
            .filter(|e| matches!(e.event, Event::TransferCompleted { .. }))
            .count();
        assert_invariants(&state);
        assert!((total(&state, ResourceKind::Metals) - 300.0).abs() < 1e-6);
    }
    assert!(arrivals > 0, "some metals should have moved");
    assert!(state.factories[1].resources.metals > 0.0);
    assert!(state.warehouse.resources.metals > 0.0);
}

#[test]
fn test_missing_destination_discards_and_debits_source() {
    let content = test_content();
    let mut state = test_state(&content);
    state.factories[0].resources.metals = 100.0;
    state.factories[0].logistics.outbound_reservations.metals = 30.0;
    state.logistics.pending_transfers.push(transfer(
        "transfer-000001",
        Endpoint::Factory(fid("factory-a")),
        Endpoint::Factory(fid("factory-gone")),
        30.0,
        1.0,
    ));

    step(&mut state, &content, 1.0);
    let events = step(&mut state, &content, 1.0);

    assert!(events.iter().any(|e| matches!(
        &e.event,
        Event::TransferDiscarded { transfer_id, .. } if transfer_id.0 == "transfer-000001"
    )));
    assert!(state.logistics.pending_transfers.is_empty());
    assert!((state.factories[0].resources.metals - 70.0).abs() < 1e-9);
    assert!(state.factories[0].logistics.outbound_reservations.metals.abs() < 1e-9);
    assert!(state.factories[0].logistics.throughput.abs() < 1e-9);
}

#[test]
fn test_completed_haul_credits_both_factories_throughput() {
    let content = test_content();
    let mut state = test_state(&content);
    state.factories[0].resources.metals = 100.0;
    state.factories[0].logistics.outbound_reservations.metals = 30.0;
    state.factories[1].logistics.throughput = 5.0;
    state.logistics.pending_transfers.push(transfer(
        "transfer-000001",
        Endpoint::Factory(fid("factory-a")),
        Endpoint::Factory(fid("factory-b")),
        30.0,
        0.0,
    ));

    step(&mut state, &content, 1.0);

    assert!((state.factories[0].logistics.throughput - 30.0).abs() < 1e-9);
    assert!((state.factories[1].logistics.throughput - 35.0).abs() < 1e-9);
    let metrics = crate::metrics::compute_metrics(&state);
    assert!((metrics.throughput_total - 65.0).abs() < 1e-9);
    assert!((metrics.max_factory_throughput - 35.0).abs() < 1e-9);
}

#[test]
fn test_warehouse_delivery_clamps_to_capacity() {
    let content = test_content();
    let mut state = test_state(&content);
    // 400 base * 8 multiplier.
    state.warehouse.resources.metals = 3190.0;
    state.factories[0].resources.metals = 100.0;
    state.factories[0].logistics.outbound_reservations.metals = 30.0;
    state.logistics.pending_transfers.push(transfer(
        "transfer-000001",
        Endpoint::Factory(fid("factory-a")),
        Endpoint::Warehouse,
        30.0,
        0.0,
    ));

    let events = step(&mut state, &content, 1.0);

    let delivered = events.iter().find_map(|e| match &e.event {
        Event::TransferCompleted { delivered, .. } => Some(*delivered),
        _ => None,
    });
    assert!((delivered.unwrap() - 10.0).abs() < 1e-9);
    assert!((state.warehouse.resources.metals - 3200.0).abs() < 1e-9);
    assert!((state.factories[0].resources.metals - 70.0).abs() < 1e-9);
    // Only what the warehouse accepted counts.
    assert!((state.factories[0].logistics.throughput - 10.0).abs() < 1e-9);
}

#[test]
fn test_upgrade_request_served_from_warehouse() {
    let content = test_content();
    let mut state = test_state(&content);
    state.factories[0].haulers_assigned = 1;
    state.warehouse.resources.bars = 100.0;

    let mut fulfilled_at = None;
    for _ in 0..14 {
        let events = step(&mut state, &content, 1.0);
        for envelope in &events {
            if let Event::UpgradeRequestFulfilled { factory_id, upgrade } = &envelope.event {
                if factory_id.0 == "factory-a" {
                    assert_eq!(*upgrade, UpgradeKind::Docking);
                    fulfilled_at.get_or_insert(envelope.game_time);
                }
            }
        }
        if state.meta.game_time < 12.5 {
            let upgrade_transfer = state
                .logistics
                .pending_transfers
                .iter()
                .find(|t| t.for_upgrade.is_some() && t.to == Endpoint::Factory(fid("factory-a")));
            if let Some(transfer) = upgrade_transfer {
                // Scheduled at t=1; 1 + 10 / 1 + 1 seconds of travel.
                assert!((transfer.eta - 13.0).abs() < 1e-9);
                assert!((transfer.amount - 13.0).abs() < 1e-9);
            }
        }
        assert_invariants(&state);
    }

    let fulfilled_at = fulfilled_at.expect("docking request should be fulfilled");
    assert!(fulfilled_at >= 13.0);
    let request = &state.factories[0].upgrade_requests[0];
    assert_eq!(request.status, UpgradeStatus::Fulfilled);
    assert!((request.fulfilled_amount.bars - 13.0).abs() < 1e-9);
    // Buffer top-up plus the request delivery.
    assert!((state.factories[0].resources.bars - 18.0).abs() < 1e-9);
}
