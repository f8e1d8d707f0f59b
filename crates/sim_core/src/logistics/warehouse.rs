//! Factory ↔ warehouse passes. Each consumes the running warehouse space or
//! availability for one resource and returns what is left.

use tracing::debug;

use super::math::{buffer_target, min_reserve, WAREHOUSE_POSITION};
use super::matcher::{inbound_scheduled, EXHAUSTED_EPSILON};
use super::reservations::reserve_outbound;
use super::{Route, SchedulePass};
use crate::{Endpoint, GameState, ResourceKind, UpgradeStatus};

/// Ships factory surplus into free warehouse space, in hauler-sized chunks.
/// Only factories with haulers export.
pub(super) fn export_to_warehouse(
    state: &mut GameState,
    pass: &mut SchedulePass<'_, '_>,
    resource: ResourceKind,
    space: f64,
) -> f64 {
    let mut remaining_space = space;
    let reserve = min_reserve(pass.constants);
    for index in 0..state.factories.len() {
        if remaining_space <= EXHAUSTED_EPSILON {
            break;
        }
        let factory = &state.factories[index];
        if factory.haulers_assigned == 0 || !pass.configs[index].allows(resource) {
            continue;
        }
        let target = buffer_target(factory, resource, pass.constants);
        let mut available = factory.unreserved(resource) - target - reserve;
        while available > EXHAUSTED_EPSILON && remaining_space > EXHAUSTED_EPSILON {
            let amount = available
                .min(pass.configs[index].capacity)
                .min(remaining_space);
            if !reserve_outbound(&mut state.factories[index], resource, amount, reserve) {
                debug!(
                    factory = %state.factories[index].id,
                    %resource,
                    amount,
                    "export reservation failed"
                );
                break;
            }
            let route = Route {
                from: state.factories[index].endpoint(),
                from_position: state.factories[index].position,
                to: Endpoint::Warehouse,
                to_position: WAREHOUSE_POSITION,
                config_index: index,
            };
            pass.queue(state, route, resource, amount, None);
            remaining_space = (remaining_space - amount).max(0.0);
            available -= amount;
        }
    }
    remaining_space
}

/// Tops up every under-buffer factory from warehouse stock.
pub(super) fn import_from_warehouse(
    state: &mut GameState,
    pass: &mut SchedulePass<'_, '_>,
    resource: ResourceKind,
    available: f64,
) -> f64 {
    let mut remaining = available;
    for index in 0..state.factories.len() {
        if remaining <= EXHAUSTED_EPSILON {
            break;
        }
        let factory = &state.factories[index];
        if !pass.configs[index].allows(resource) {
            continue;
        }
        let target = buffer_target(factory, resource, pass.constants);
        let mut need =
            target - factory.resources.get(resource) - inbound_scheduled(factory, resource);
        while need > EXHAUSTED_EPSILON && remaining > EXHAUSTED_EPSILON {
            let amount = need.min(pass.configs[index].capacity).min(remaining);
            let route = Route {
                from: Endpoint::Warehouse,
                from_position: WAREHOUSE_POSITION,
                to: state.factories[index].endpoint(),
                to_position: state.factories[index].position,
                config_index: index,
            };
            pass.queue(state, route, resource, amount, None);
            remaining = (remaining - amount).max(0.0);
            need -= amount;
        }
    }
    remaining
}

/// Serves open upgrade requests from warehouse stock, oldest `created_at`
/// first. Amounts already in flight for a request are not sent twice.
pub(super) fn deliver_upgrade_requests(
    state: &mut GameState,
    pass: &mut SchedulePass<'_, '_>,
    resource: ResourceKind,
    available: f64,
) -> f64 {
    let mut open: Vec<(usize, usize, f64)> = Vec::new();
    for (factory_index, factory) in state.factories.iter().enumerate() {
        for (request_index, request) in factory.upgrade_requests.iter().enumerate() {
            if matches!(
                request.status,
                UpgradeStatus::Pending | UpgradeStatus::PartiallyFulfilled
            ) {
                open.push((factory_index, request_index, request.created_at));
            }
        }
    }
    open.sort_by(|a, b| a.2.total_cmp(&b.2));

    let mut remaining = available;
    for (factory_index, request_index, _) in open {
        if remaining <= EXHAUSTED_EPSILON {
            break;
        }
        let factory = &state.factories[factory_index];
        let request = &factory.upgrade_requests[request_index];
        let upgrade = request.upgrade;
        let destination = factory.endpoint();
        let in_flight: f64 = state
            .logistics
            .pending_transfers
            .iter()
            .filter(|t| {
                t.resource == resource && t.for_upgrade == Some(upgrade) && t.to == destination
            })
            .map(|t| t.amount)
            .sum();
        let still_needed = request.remaining(resource) - in_flight;
        if still_needed <= EXHAUSTED_EPSILON {
            continue;
        }
        let amount = still_needed
            .min(pass.configs[factory_index].capacity)
            .min(remaining);
        let route = Route {
            from: Endpoint::Warehouse,
            from_position: WAREHOUSE_POSITION,
            to: destination,
            to_position: factory.position,
            config_index: factory_index,
        };
        pass.queue(state, route, resource, amount, Some(upgrade));
        remaining = (remaining - amount).max(0.0);
    }
    remaining
}
