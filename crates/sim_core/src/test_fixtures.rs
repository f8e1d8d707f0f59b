//! Shared test fixtures for sim_core and downstream crates.
//!
//! `base_content()` mirrors the shipped balance tables so test expectations
//! read like the game. `minimal_content()` is the bare minimum for
//! content-validation tests.

use crate::{
    Constants, CostVariant, Counters, FactoryId, FactoryState, GameContent, GameState,
    HaulerUpgradeDef, HaulerUpgradeKind, LogisticsQueues, MetaState, Position, ResourceLedger,
    UpgradeDef, UpgradeKind, WarehouseState,
};

fn bars(amount: f64) -> ResourceLedger {
    ResourceLedger {
        bars: amount,
        ..ResourceLedger::default()
    }
}

pub fn base_constants() -> Constants {
    Constants {
        refine_time_secs: 10.0,
        min_refine_batch: 10.0,

        low_energy_threshold: 0.2,
        min_refine_throttle: 0.1,
        hauler_maintenance_per_sec: 0.5,
        solar_base_regen_per_sec: 1.25,
        solar_regen_per_level: 0.5,
        solar_array_regen_per_level: 0.25,
        solar_array_energy_per_level: 3.0,

        buffer_seconds: 30.0,
        ore_consumption_per_slot_per_sec: 50.0 / 60.0,
        bars_buffer_target: 5.0,
        secondary_buffer_target: 20.0,
        min_reserve_seconds: 5.0,
        min_reserve_rate_per_sec: 5.0,
        min_transfer_amount: 1.0,
        scheduling_interval_secs: 2.0,
        warehouse_base_capacity: 400.0,
        warehouse_capacity_per_storage_level: 100.0,
        warehouse_capacity_multiplier: 8.0,
        hauler_depot_capacity_per_level: 10.0,
        hauler_depot_speed_per_level: 0.05,
        logistics_hub_overhead_reduction_per_level: 0.1,
        logistics_hub_overhead_floor: 0.25,
        hauler_capacity_boost_per_level: 5.0,
        hauler_speed_boost_per_level: 0.1,
        hauler_efficiency_per_level: 0.05,
        hauler_efficiency_floor: 0.2,
        hauler_base_cost_bars: 10.0,
        hauler_cost_growth: 1.15,

        upgrade_request_ttl_secs: 60.0,

        factory_docking_capacity: 3,
        factory_refine_slots: 2,
        factory_idle_energy_per_sec: 1.0,
        factory_energy_per_refine: 2.0,
        factory_storage_capacity: 300.0,
        factory_energy_capacity: 80.0,
        factory_initial_energy: 40.0,
        default_hauler_capacity: 50.0,
        default_hauler_speed: 1.0,
        default_hauler_pickup_overhead: 1.0,
        default_hauler_dropoff_overhead: 1.0,
        default_hauler_priority: 5,
    }
}

fn upgrade(kind: UpgradeKind, label: &str, effect: f64) -> UpgradeDef {
    UpgradeDef {
        kind,
        label: label.to_string(),
        base_cost: bars(13.0),
        growth: 1.35,
        effect,
        alternative_costs: vec![],
    }
}

fn hauler_upgrade(kind: HaulerUpgradeKind, label: &str, base: f64) -> HaulerUpgradeDef {
    HaulerUpgradeDef {
        kind,
        label: label.to_string(),
        max_level: 5,
        base_cost: bars(base),
        growth: 1.5,
    }
}

/// Full balance table: five factory upgrades (docking with a metals
/// alternative) and three hauler upgrades.
pub fn base_content() -> GameContent {
    let mut docking = upgrade(UpgradeKind::Docking, "Docking Expansion", 1.0);
    docking.alternative_costs.push(CostVariant {
        id: "metals".to_string(),
        base_cost: ResourceLedger {
            metals: 50.0,
            ..ResourceLedger::default()
        },
    });
    GameContent {
        content_version: "test".to_string(),
        upgrades: vec![
            docking,
            upgrade(UpgradeKind::Refine, "Refine Slots", 1.0),
            upgrade(UpgradeKind::Storage, "Storage Racks", 150.0),
            upgrade(UpgradeKind::Energy, "Capacitor Bank", 30.0),
            upgrade(UpgradeKind::Solar, "Solar Array", 10.0),
        ],
        hauler_upgrades: vec![
            hauler_upgrade(HaulerUpgradeKind::CapacityBoost, "Cargo Racks", 20.0),
            hauler_upgrade(HaulerUpgradeKind::SpeedBoost, "Thrusters", 25.0),
            hauler_upgrade(HaulerUpgradeKind::EfficiencyBoost, "Dock Crews", 30.0),
        ],
        constants: base_constants(),
    }
}

/// No upgrades at all; constants as in [`base_content`].
pub fn minimal_content() -> GameContent {
    GameContent {
        content_version: "minimal".to_string(),
        upgrades: vec![],
        hauler_upgrades: vec![],
        constants: base_constants(),
    }
}

pub fn make_factory(content: &GameContent, id: &str, position: Position) -> FactoryState {
    content
        .constants
        .new_factory(FactoryId(id.to_string()), position)
}

/// Two idle factories, `factory-a` at (10, 0, 0) and `factory-b` at
/// (0, 0, 20), an empty warehouse, and no haulers.
pub fn base_state(content: &GameContent) -> GameState {
    GameState {
        meta: MetaState {
            game_time: 0.0,
            seed: 42,
            schema_version: crate::snapshot::SCHEMA_VERSION,
            content_version: content.content_version.clone(),
            prestige_cores: 0,
        },
        warehouse: WarehouseState::default(),
        factories: vec![
            make_factory(content, "factory-a", [10.0, 0.0, 0.0]),
            make_factory(content, "factory-b", [0.0, 0.0, 20.0]),
        ],
        logistics: LogisticsQueues::default(),
        counters: Counters {
            next_event_id: 1,
            next_transfer_id: 1,
            next_command_id: 1,
        },
    }
}
