//! Greedy factory ↔ factory surplus/need pairing.

use tracing::trace;

use super::math::{buffer_target, min_reserve};
use crate::{Constants, FactoryState, HaulerConfig, ResourceKind};

/// Remaining need or surplus at or below this is treated as exhausted.
pub(crate) const EXHAUSTED_EPSILON: f64 = 1e-3;

/// A proposed factory → factory move, by index into the factory list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransferCandidate {
    pub from: usize,
    pub to: usize,
    pub amount: f64,
}

struct Entry {
    index: usize,
    amount: f64,
}

pub fn inbound_scheduled(factory: &FactoryState, resource: ResourceKind) -> f64 {
    factory
        .logistics
        .inbound_schedules
        .iter()
        .filter(|schedule| schedule.resource == resource)
        .map(|schedule| schedule.amount)
        .sum()
}

/// Pairs the largest need with the largest surplus until either side runs out.
///
/// Only factories with assigned haulers take part. Levels are projected:
/// need counts scheduled inbound deliveries, surplus excludes stock already
/// reserved. Both sorts are stable, so ties keep factory order.
pub fn match_surplus_to_need(
    factories: &[FactoryState],
    configs: &[HaulerConfig],
    resource: ResourceKind,
    constants: &Constants,
) -> Vec<TransferCandidate> {
    let mut candidates = Vec::new();
    if factories.len() < 2 {
        return candidates;
    }
    let reserve = min_reserve(constants);

    let mut needs = Vec::new();
    let mut surpluses = Vec::new();
    for (index, factory) in factories.iter().enumerate() {
        if factory.haulers_assigned == 0 {
            continue;
        }
        let target = buffer_target(factory, resource, constants);
        let current = factory.resources.get(resource);
        let need = target - (current + inbound_scheduled(factory, resource));
        if need > EXHAUSTED_EPSILON {
            needs.push(Entry { index, amount: need });
        }
        let surplus = factory.unreserved(resource) - target - reserve;
        if surplus > EXHAUSTED_EPSILON {
            surpluses.push(Entry {
                index,
                amount: surplus,
            });
        }
    }
    if needs.is_empty() || surpluses.is_empty() {
        return candidates;
    }
    needs.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    surpluses.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    for need in &mut needs {
        if !configs[need.index].allows(resource) {
            continue;
        }
        for surplus in &mut surpluses {
            if need.amount <= EXHAUSTED_EPSILON {
                break;
            }
            if surplus.amount <= EXHAUSTED_EPSILON || surplus.index == need.index {
                continue;
            }
            let config = &configs[surplus.index];
            if !config.allows(resource) {
                continue;
            }
            let amount = need.amount.min(surplus.amount).min(config.capacity);
            if amount < constants.min_transfer_amount {
                continue;
            }
            trace!(
                %resource,
                from = %factories[surplus.index].id,
                to = %factories[need.index].id,
                amount,
                "proposed factory transfer"
            );
            candidates.push(TransferCandidate {
                from: surplus.index,
                to: need.index,
                amount,
            });
            need.amount -= amount;
            surplus.amount -= amount;
        }
    }
    candidates
}
