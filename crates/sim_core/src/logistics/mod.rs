//! Network-wide logistics: surplus/need matching, warehouse passes,
//! reservations, and timed arrivals.

mod arrivals;
pub mod math;
pub mod matcher;
pub mod reservations;
mod warehouse;

use tracing::debug;

use crate::fx::{self, TransferFx, TransferFxSink};
use crate::modifiers::ResourceModifiers;
use crate::{
    Constants, Endpoint, EventEnvelope, GameContent, GameState, HaulerConfig, InboundSchedule,
    PendingTransfer, Position, ResourceKind, TransferId, UpgradeKind,
};

pub use arrivals::process_arrivals;
pub use math::{
    buffer_target, distance, hauler_cost, min_reserve, resolve_hauler_config, travel_time,
    warehouse_capacity, WAREHOUSE_POSITION,
};
pub use matcher::{match_surplus_to_need, TransferCandidate};
pub use reservations::{release_reservation, reserve_outbound, validate_transfer};

/// Runs arrivals every tick and a scheduling pass whenever the accumulated
/// time reaches the scheduling interval.
pub fn advance_logistics(
    state: &mut GameState,
    content: &GameContent,
    modifiers: &ResourceModifiers,
    fx: &mut dyn TransferFxSink,
    dt: f64,
    events: &mut Vec<EventEnvelope>,
) {
    let capacity = warehouse_capacity(&state.warehouse.modules, &content.constants, modifiers);
    process_arrivals(state, capacity, events);

    state.logistics.scheduling_accumulator += dt;
    if state.logistics.scheduling_accumulator >= content.constants.scheduling_interval_secs {
        state.logistics.scheduling_accumulator = 0.0;
        schedule_transfers(state, content, modifiers, fx, events);
    }
}

/// One scheduling pass over every transportable resource.
///
/// Per resource: factory ↔ factory matching, then (only when some factory
/// has haulers) export to warehouse space, import of warehouse stock into
/// under-buffer factories, and upgrade-request deliveries oldest first.
pub fn schedule_transfers(
    state: &mut GameState,
    content: &GameContent,
    modifiers: &ResourceModifiers,
    fx: &mut dyn TransferFxSink,
    events: &mut Vec<EventEnvelope>,
) {
    if state.factories.is_empty() {
        return;
    }
    let constants = &content.constants;
    let configs: Vec<HaulerConfig> = state
        .factories
        .iter()
        .map(|factory| resolve_hauler_config(factory, &state.warehouse.modules, constants))
        .collect();
    let capacity = warehouse_capacity(&state.warehouse.modules, constants, modifiers);
    let network_has_haulers = state.factories.iter().any(|f| f.haulers_assigned > 0);
    debug!(
        factories = state.factories.len(),
        pending = state.logistics.pending_transfers.len(),
        game_time = state.meta.game_time,
        "scheduling pass"
    );

    let mut pass = SchedulePass {
        constants,
        configs: &configs,
        fx,
        events,
    };
    for resource in ResourceKind::TRANSPORTABLE {
        schedule_factory_transfers(state, &mut pass, resource);
        if !network_has_haulers {
            continue;
        }
        let (inbound, outbound) = warehouse_in_flight(&state.logistics.pending_transfers, resource);
        let stock = state.warehouse.resources.get(resource);
        let space = (capacity - stock - inbound).max(0.0);
        let mut available = (stock - outbound).max(0.0);
        if space > 0.0 {
            warehouse::export_to_warehouse(state, &mut pass, resource, space);
        }
        if available > 0.0 {
            available = warehouse::import_from_warehouse(state, &mut pass, resource, available);
        }
        if available > 0.0 {
            warehouse::deliver_upgrade_requests(state, &mut pass, resource, available);
        }
    }
}

/// Warehouse-bound and warehouse-sourced amounts still in flight.
fn warehouse_in_flight(pending: &[PendingTransfer], resource: ResourceKind) -> (f64, f64) {
    pending
        .iter()
        .filter(|transfer| transfer.resource == resource)
        .fold((0.0, 0.0), |(inbound, outbound), transfer| {
            (
                inbound + if transfer.to.is_warehouse() { transfer.amount } else { 0.0 },
                outbound + if transfer.from.is_warehouse() { transfer.amount } else { 0.0 },
            )
        })
}

fn schedule_factory_transfers(
    state: &mut GameState,
    pass: &mut SchedulePass<'_, '_>,
    resource: ResourceKind,
) {
    let candidates = match_surplus_to_need(&state.factories, pass.configs, resource, pass.constants);
    let reserve = min_reserve(pass.constants);
    for candidate in candidates {
        if !reserve_outbound(
            &mut state.factories[candidate.from],
            resource,
            candidate.amount,
            reserve,
        ) {
            debug!(
                %resource,
                from = %state.factories[candidate.from].id,
                to = %state.factories[candidate.to].id,
                amount = candidate.amount,
                "reservation failed; candidate dropped"
            );
            continue;
        }
        let route = Route {
            from: state.factories[candidate.from].endpoint(),
            from_position: state.factories[candidate.from].position,
            to: state.factories[candidate.to].endpoint(),
            to_position: state.factories[candidate.to].position,
            config_index: candidate.from,
        };
        pass.queue(state, route, resource, candidate.amount, None);
    }
}

/// Endpoints and positions of one transfer, plus whose hauler runs it.
pub(crate) struct Route {
    pub from: Endpoint,
    pub from_position: Position,
    pub to: Endpoint,
    pub to_position: Position,
    pub config_index: usize,
}

pub(crate) struct SchedulePass<'a, 'e> {
    pub constants: &'a Constants,
    pub configs: &'a [HaulerConfig],
    pub fx: &'e mut dyn TransferFxSink,
    pub events: &'e mut Vec<EventEnvelope>,
}

impl SchedulePass<'_, '_> {
    /// Appends a pending transfer, records the destination's inbound schedule,
    /// and publishes the effect. Any source reservation is booked by the caller.
    pub fn queue(
        &mut self,
        state: &mut GameState,
        route: Route,
        resource: ResourceKind,
        amount: f64,
        for_upgrade: Option<UpgradeKind>,
    ) {
        let now = state.meta.game_time;
        let config = &self.configs[route.config_index];
        let eta = now + travel_time(&route.from_position, &route.to_position, config);
        let id = TransferId(format!("transfer-{:06}", state.counters.next_transfer_id));
        state.counters.next_transfer_id += 1;

        if let Some(dest) = route.to.factory().and_then(|id| state.factory_index(id)) {
            state.factories[dest]
                .logistics
                .inbound_schedules
                .push(InboundSchedule {
                    transfer_id: id.clone(),
                    from: route.from.clone(),
                    resource,
                    amount,
                    eta,
                });
        }

        debug!(
            transfer = %id,
            %resource,
            from = %route.from,
            to = %route.to,
            amount,
            eta,
            "transfer scheduled"
        );
        fx::publish(
            self.fx,
            TransferFx {
                transfer_id: id.clone(),
                amount,
                from: route.from.clone(),
                to: route.to.clone(),
                duration: (eta - now).max(0.1),
            },
        );
        self.events.push(crate::emit(
            &mut state.counters,
            now,
            crate::Event::TransferScheduled {
                transfer_id: id.clone(),
                from: route.from.clone(),
                to: route.to.clone(),
                resource,
                amount,
                eta,
            },
        ));
        state.logistics.pending_transfers.push(PendingTransfer {
            id,
            from: route.from,
            to: route.to,
            resource,
            amount,
            eta,
            for_upgrade,
        });
    }
}
