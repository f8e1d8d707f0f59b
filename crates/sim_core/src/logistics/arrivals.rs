//! Finalizes transfers whose eta has passed.

use tracing::debug;

use super::reservations::release_reservation;
use crate::upgrades::record_delivery;
use crate::{Endpoint, Event, EventEnvelope, GameState, PendingTransfer, ResourceKind};

/// Executes every due transfer in queue order and removes it.
///
/// The source is debited and its reservation released; the destination is
/// credited with what actually left the source. Warehouse deliveries clamp
/// to `warehouse_capacity` and the excess is discarded. When an endpoint
/// factory no longer exists the transfer is dropped: a surviving source
/// still loses the goods, a surviving destination receives nothing.
pub fn process_arrivals(
    state: &mut GameState,
    warehouse_capacity: f64,
    events: &mut Vec<EventEnvelope>,
) {
    let now = state.meta.game_time;
    let (due, pending): (Vec<PendingTransfer>, Vec<PendingTransfer>) =
        std::mem::take(&mut state.logistics.pending_transfers)
            .into_iter()
            .partition(|transfer| now >= transfer.eta);
    state.logistics.pending_transfers = pending;

    for transfer in due {
        let delivered = execute(state, &transfer, warehouse_capacity, events);
        let event = match delivered {
            Some(delivered) => {
                credit_throughput(state, &transfer, delivered);
                debug!(
                    transfer = %transfer.id,
                    resource = %transfer.resource,
                    from = %transfer.from,
                    to = %transfer.to,
                    delivered,
                    "transfer completed"
                );
                Event::TransferCompleted {
                    transfer_id: transfer.id,
                    from: transfer.from,
                    to: transfer.to,
                    resource: transfer.resource,
                    delivered,
                }
            }
            None => {
                debug!(transfer = %transfer.id, "transfer discarded: endpoint missing");
                Event::TransferDiscarded {
                    transfer_id: transfer.id,
                    resource: transfer.resource,
                    amount: transfer.amount,
                }
            }
        };
        events.push(crate::emit(&mut state.counters, now, event));
    }
}

/// Adds a completed transfer to both endpoint factories' throughput.
fn credit_throughput(state: &mut GameState, transfer: &PendingTransfer, delivered: f64) {
    for endpoint in [&transfer.from, &transfer.to] {
        if let Endpoint::Factory(id) = endpoint {
            if let Some(factory) = state.factory_mut(id) {
                factory.logistics.throughput += delivered;
            }
        }
    }
}

/// Returns the amount credited, or `None` when the transfer was discarded.
fn execute(
    state: &mut GameState,
    transfer: &PendingTransfer,
    warehouse_capacity: f64,
    events: &mut Vec<EventEnvelope>,
) -> Option<f64> {
    let resource = transfer.resource;
    let source = match &transfer.from {
        Endpoint::Warehouse => None,
        Endpoint::Factory(id) => Some(state.factory_index(id)),
    };
    let dest = match &transfer.to {
        Endpoint::Warehouse => None,
        Endpoint::Factory(id) => Some(state.factory_index(id)),
    };

    // Debit the source first; `None` here means the source factory is gone.
    let shipped = match source {
        None => {
            let stock = state.warehouse.resources.get(resource);
            let shipped = transfer.amount.min(stock).max(0.0);
            if matches!(dest, Some(Some(_))) {
                state.warehouse.resources.deduct(resource, shipped);
            }
            Some(shipped)
        }
        Some(Some(index)) => {
            let factory = &mut state.factories[index];
            release_reservation(factory, resource, transfer.amount);
            let shipped = transfer.amount.min(factory.resources.get(resource)).max(0.0);
            factory.resources.deduct(resource, shipped);
            if resource == ResourceKind::Ore {
                factory.sync_storage();
            }
            Some(shipped)
        }
        Some(None) => None,
    };

    match dest {
        None if source.is_some() => {
            let shipped = shipped?;
            let stock = state.warehouse.resources.get(resource);
            let updated = (stock + shipped).min(warehouse_capacity.max(stock));
            state.warehouse.resources.set(resource, updated);
            Some(updated - stock)
        }
        // Warehouse to warehouse has no meaning.
        None => None,
        Some(Some(index)) => {
            let factory = &mut state.factories[index];
            factory
                .logistics
                .inbound_schedules
                .retain(|schedule| schedule.transfer_id != transfer.id);
            let shipped = shipped?;
            factory.resources.add(resource, shipped);
            if resource == ResourceKind::Ore {
                factory.sync_storage();
            }
            let factory_id = factory.id.clone();
            for upgrade in record_delivery(factory, resource, shipped) {
                events.push(crate::emit(
                    &mut state.counters,
                    state.meta.game_time,
                    Event::UpgradeRequestFulfilled {
                        factory_id: factory_id.clone(),
                        upgrade,
                    },
                ));
            }
            Some(shipped)
        }
        Some(None) => None,
    }
}
