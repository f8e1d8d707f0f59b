//! Factory upgrade costs and effects, and the time-boxed resource requests
//! raised when a factory cannot afford its next upgrade.

use tracing::debug;

use crate::{
    EventEnvelope, FactoryState, GameContent, GameState, ResourceKind, ResourceLedger, UpgradeDef,
    UpgradeKind, UpgradeRequest, UpgradeStatus,
};

/// `ceil(base * growth^level)` per resource. `variant` selects an
/// alternative cost table; an unknown variant yields `None`.
pub fn upgrade_cost(def: &UpgradeDef, level: u32, variant: Option<&str>) -> Option<ResourceLedger> {
    let base = match variant {
        None => &def.base_cost,
        Some(id) => {
            &def
                .alternative_costs
                .iter()
                .find(|alternative| alternative.id == id)?
                .base_cost
        }
    };
    Some(scaled_cost(base, def.growth, level))
}

pub(crate) fn scaled_cost(base: &ResourceLedger, growth: f64, level: u32) -> ResourceLedger {
    let factor = growth.powf(f64::from(level));
    let mut cost = ResourceLedger::default();
    for (kind, amount) in base.positive() {
        cost.set(kind, (amount * factor).ceil());
    }
    cost
}

/// Whether the factory's unreserved stock covers every positive entry of `cost`.
pub fn can_afford(factory: &FactoryState, cost: &ResourceLedger) -> bool {
    cost.positive()
        .all(|(kind, amount)| factory.unreserved(kind) >= amount)
}

/// Debits `cost`, keeping `current_storage` in sync.
pub(crate) fn pay(factory: &mut FactoryState, cost: &ResourceLedger) {
    for (kind, amount) in cost.positive() {
        factory.resources.deduct(kind, amount);
    }
    factory.sync_storage();
}

/// Applies one level of `def` to the factory.
pub fn apply_upgrade(factory: &mut FactoryState, def: &UpgradeDef) {
    match def.kind {
        UpgradeKind::Docking => {
            factory.docking_capacity += slot_increment(def.effect);
            factory.upgrades.docking += 1;
        }
        UpgradeKind::Refine => {
            factory.refine_slots += slot_increment(def.effect);
            factory.upgrades.refine += 1;
        }
        UpgradeKind::Storage => {
            factory.storage_capacity += def.effect;
            factory.upgrades.storage += 1;
        }
        UpgradeKind::Energy => {
            factory.energy_capacity += def.effect;
            factory.upgrades.energy += 1;
            factory.energy = factory.energy.min(factory.energy_capacity);
        }
        UpgradeKind::Solar => {
            // Solar levels also raise regen; see `energy::solar_regen_per_sec`.
            factory.energy_capacity += def.effect;
            factory.upgrades.solar += 1;
        }
    }
    // A purchase settles any request for the same upgrade.
    factory
        .upgrade_requests
        .retain(|request| request.upgrade != def.kind);
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn slot_increment(effect: f64) -> u32 {
    effect.max(1.0).floor() as u32
}

/// Records a request for the first upgrade (in `priority` order) the factory
/// cannot cover locally, and returns it.
///
/// Any non-expired request blocks detection entirely, so a second call with
/// no intervening change returns `None`.
pub fn detect_upgrade_shortfall(
    factory: &mut FactoryState,
    content: &GameContent,
    priority: &[UpgradeKind],
    now: f64,
) -> Option<UpgradeRequest> {
    if factory.upgrade_requests.iter().any(UpgradeRequest::is_active) {
        return None;
    }
    for &kind in priority {
        let Some(def) = content.upgrade(kind) else {
            continue;
        };
        let Some(cost) = upgrade_cost(def, factory.upgrade_level(kind), None) else {
            continue;
        };
        if cost.is_zero() {
            continue;
        }
        let short = cost
            .positive()
            .any(|(resource, needed)| factory.resources.get(resource) < needed);
        if short {
            let request = UpgradeRequest {
                upgrade: kind,
                resource_needed: cost,
                fulfilled_amount: ResourceLedger::default(),
                status: UpgradeStatus::Pending,
                created_at: now,
                expires_at: now + content.constants.upgrade_request_ttl_secs,
            };
            factory.upgrade_requests.push(request.clone());
            return Some(request);
        }
    }
    None
}

/// Credits an arrival against the factory's open requests. Returns the
/// upgrades whose requests became fully covered.
pub fn record_delivery(
    factory: &mut FactoryState,
    resource: ResourceKind,
    amount: f64,
) -> Vec<UpgradeKind> {
    let mut fulfilled = Vec::new();
    if amount <= 0.0 {
        return fulfilled;
    }
    for request in &mut factory.upgrade_requests {
        if matches!(
            request.status,
            UpgradeStatus::Expired | UpgradeStatus::Fulfilled
        ) {
            continue;
        }
        let credit = amount.min(request.remaining(resource));
        if credit <= 0.0 {
            continue;
        }
        request.fulfilled_amount.add(resource, credit);
        let complete = request
            .resource_needed
            .positive()
            .all(|(kind, needed)| request.fulfilled_amount.get(kind) >= needed);
        if complete {
            request.status = UpgradeStatus::Fulfilled;
            fulfilled.push(request.upgrade);
        } else if request.status == UpgradeStatus::Pending {
            request.status = UpgradeStatus::PartiallyFulfilled;
        }
    }
    fulfilled
}

/// Marks requests past `expires_at` as expired and drops them. Delivered
/// resources stay in the factory ledger.
pub fn expire_requests(factory: &mut FactoryState, now: f64) -> Vec<UpgradeKind> {
    let mut expired = Vec::new();
    for request in &mut factory.upgrade_requests {
        if request.status != UpgradeStatus::Expired && now >= request.expires_at {
            request.status = UpgradeStatus::Expired;
        }
        if request.status == UpgradeStatus::Expired {
            expired.push(request.upgrade);
        }
    }
    factory.upgrade_requests.retain(UpgradeRequest::is_active);
    expired
}

/// Expiry sweep, then shortfall detection, for every factory.
pub fn advance_upgrade_requests(
    state: &mut GameState,
    content: &GameContent,
    events: &mut Vec<EventEnvelope>,
) {
    let now = state.meta.game_time;
    for index in 0..state.factories.len() {
        let factory = &mut state.factories[index];
        let expired = expire_requests(factory, now);
        let requested = detect_upgrade_shortfall(factory, content, &UpgradeKind::PRIORITY, now);
        let factory_id = factory.id.clone();

        for upgrade in expired {
            debug!(factory = %factory_id, upgrade = upgrade.as_str(), "upgrade request expired");
            events.push(crate::emit(
                &mut state.counters,
                now,
                crate::Event::UpgradeRequestExpired {
                    factory_id: factory_id.clone(),
                    upgrade,
                },
            ));
        }
        if let Some(request) = requested {
            debug!(factory = %factory_id, upgrade = request.upgrade.as_str(), "upgrade requested");
            events.push(crate::emit(
                &mut state.counters,
                now,
                crate::Event::UpgradeRequested {
                    factory_id,
                    upgrade: request.upgrade,
                },
            ));
        }
    }
}
