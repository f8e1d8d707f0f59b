//! Buffer targets, reserves, travel times, and hauler pricing.

use crate::modifiers::ResourceModifiers;
use crate::{Constants, FactoryState, HaulerConfig, ModuleLevels, Position, ResourceKind};

/// The warehouse sits at the world origin.
pub const WAREHOUSE_POSITION: Position = [0.0, 0.0, 0.0];

/// Desired inventory of `resource` at `factory`.
pub fn buffer_target(factory: &FactoryState, resource: ResourceKind, constants: &Constants) -> f64 {
    match resource {
        ResourceKind::Ore => {
            constants.buffer_seconds
                * constants.ore_consumption_per_slot_per_sec
                * f64::from(factory.refine_slots.max(1))
        }
        ResourceKind::Bars => constants.bars_buffer_target,
        ResourceKind::Metals
        | ResourceKind::Crystals
        | ResourceKind::Organics
        | ResourceKind::Ice => constants.secondary_buffer_target,
        ResourceKind::Credits => 0.0,
    }
}

/// Floor below which outbound transfers are refused.
pub fn min_reserve(constants: &Constants) -> f64 {
    constants.min_reserve()
}

pub fn distance(a: &Position, b: &Position) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// `pickup + distance / max(0.1, speed) + dropoff`.
pub fn travel_time(from: &Position, to: &Position, config: &HaulerConfig) -> f64 {
    config.pickup_overhead + distance(from, to) / config.speed.max(0.1) + config.dropoff_overhead
}

/// Bars needed to buy the hauler after `owned` haulers.
pub fn hauler_cost(owned: u32, constants: &Constants) -> f64 {
    (constants.hauler_base_cost_bars * constants.hauler_cost_growth.powf(f64::from(owned))).ceil()
}

pub fn warehouse_capacity(
    modules: &ModuleLevels,
    constants: &Constants,
    modifiers: &ResourceModifiers,
) -> f64 {
    (constants.warehouse_base_capacity
        + f64::from(modules.storage) * constants.warehouse_capacity_per_storage_level)
        * modifiers.storage_capacity
        * constants.warehouse_capacity_multiplier
}

/// The factory's hauler configuration after warehouse modules and
/// per-factory hauler upgrades.
pub fn resolve_hauler_config(
    factory: &FactoryState,
    modules: &ModuleLevels,
    constants: &Constants,
) -> HaulerConfig {
    let base = &factory.hauler_config;
    let upgrades = &factory.hauler_upgrades;

    let depot = f64::from(modules.hauler_depot);
    let hub_multiplier = (1.0
        - constants.logistics_hub_overhead_reduction_per_level * f64::from(modules.logistics_hub))
    .max(constants.logistics_hub_overhead_floor);
    let efficiency = (1.0
        - constants.hauler_efficiency_per_level * f64::from(upgrades.efficiency_boost))
    .max(constants.hauler_efficiency_floor);

    let capacity = base.capacity
        + depot * constants.hauler_depot_capacity_per_level
        + f64::from(upgrades.capacity_boost) * constants.hauler_capacity_boost_per_level;
    let speed = base.speed * (1.0 + constants.hauler_depot_speed_per_level * depot)
        + f64::from(upgrades.speed_boost) * constants.hauler_speed_boost_per_level;

    HaulerConfig {
        capacity: capacity.max(1.0),
        speed: speed.max(0.05),
        pickup_overhead: (base.pickup_overhead * hub_multiplier * efficiency).max(0.0),
        dropoff_overhead: (base.dropoff_overhead * hub_multiplier * efficiency).max(0.0),
        resource_filters: base.resource_filters.clone(),
        mode: base.mode,
        priority: base.priority,
    }
}
