//! Content loading, world generation, and snapshot files shared by sim_cli
//! and the control crates.

use anyhow::{Context, Result};
use rand::Rng;
use serde::Deserialize;
use sim_core::snapshot::{normalize, snapshot_from_state, NormalizedSnapshot, Snapshot};
use sim_core::{
    Constants, Counters, FactoryId, GameContent, GameState, HaulerUpgradeDef, LogisticsQueues,
    MetaState, Position, UpgradeDef, UpgradeKind, WarehouseState,
};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Closest a new factory may sit to any existing anchor.
pub const FACTORY_MIN_DISTANCE: f64 = 10.0;
/// Farthest a new factory may sit from its nearest anchor.
pub const FACTORY_MAX_DISTANCE: f64 = 50.0;
pub const FACTORY_PLACEMENT_ATTEMPTS: usize = 100;

#[derive(Deserialize)]
struct UpgradesFile {
    content_version: String,
    upgrades: Vec<UpgradeDef>,
    hauler_upgrades: Vec<HaulerUpgradeDef>,
}

/// Validates loaded content, panicking on any authoring error.
///
/// Catches mistakes like: a missing or duplicated upgrade kind, a cost table
/// that is free or shrinks with level, or constants that would stall the
/// refinery or the scheduler.
pub fn validate_content(content: &GameContent) {
    // Every upgrade kind appears exactly once.
    for kind in UpgradeKind::PRIORITY {
        let count = content.upgrades.iter().filter(|def| def.kind == kind).count();
        assert!(
            count == 1,
            "upgrade '{}' must be defined exactly once, found {count}",
            kind.as_str(),
        );
    }

    for def in &content.upgrades {
        let name = def.kind.as_str();
        assert!(def.growth >= 1.0, "upgrade '{name}' growth {} is below 1", def.growth);
        assert!(def.effect > 0.0, "upgrade '{name}' effect must be positive");
        assert!(!def.base_cost.is_zero(), "upgrade '{name}' has an empty base cost");
        for (resource, amount) in def.base_cost.iter() {
            assert!(amount >= 0.0, "upgrade '{name}' has negative {resource} cost");
        }
        let mut variant_ids = HashSet::new();
        for variant in &def.alternative_costs {
            assert!(!variant.id.is_empty(), "upgrade '{name}' has a cost variant with empty id");
            assert!(
                variant_ids.insert(variant.id.as_str()),
                "upgrade '{name}' cost variant '{}' is duplicated",
                variant.id,
            );
            assert!(
                !variant.base_cost.is_zero(),
                "upgrade '{name}' cost variant '{}' is empty",
                variant.id,
            );
        }
    }

    let mut hauler_kinds = HashSet::new();
    for def in &content.hauler_upgrades {
        assert!(
            hauler_kinds.insert(def.kind),
            "hauler upgrade {:?} is defined twice",
            def.kind,
        );
        assert!(def.max_level > 0, "hauler upgrade {:?} has max_level 0", def.kind);
        assert!(def.growth >= 1.0, "hauler upgrade {:?} growth is below 1", def.kind);
        assert!(!def.base_cost.is_zero(), "hauler upgrade {:?} is free", def.kind);
    }

    validate_constants(&content.constants);
}

fn validate_constants(c: &Constants) {
    let positive = [
        ("refine_time_secs", c.refine_time_secs),
        ("min_refine_batch", c.min_refine_batch),
        ("scheduling_interval_secs", c.scheduling_interval_secs),
        ("upgrade_request_ttl_secs", c.upgrade_request_ttl_secs),
        ("warehouse_base_capacity", c.warehouse_base_capacity),
        ("warehouse_capacity_multiplier", c.warehouse_capacity_multiplier),
        ("factory_storage_capacity", c.factory_storage_capacity),
        ("factory_energy_capacity", c.factory_energy_capacity),
        ("default_hauler_capacity", c.default_hauler_capacity),
        ("default_hauler_speed", c.default_hauler_speed),
        ("hauler_base_cost_bars", c.hauler_base_cost_bars),
    ];
    for (name, value) in positive {
        assert!(value > 0.0, "constant '{name}' must be positive, got {value}");
    }

    let fractions = [
        ("low_energy_threshold", c.low_energy_threshold),
        ("min_refine_throttle", c.min_refine_throttle),
        ("logistics_hub_overhead_floor", c.logistics_hub_overhead_floor),
        ("hauler_efficiency_floor", c.hauler_efficiency_floor),
    ];
    for (name, value) in fractions {
        assert!(
            value > 0.0 && value <= 1.0,
            "constant '{name}' must be in (0, 1], got {value}",
        );
    }

    assert!(c.factory_refine_slots >= 1, "factory_refine_slots must be at least 1");
    assert!(c.factory_docking_capacity >= 1, "factory_docking_capacity must be at least 1");
    assert!(c.default_hauler_priority <= 10, "default_hauler_priority must be 0..=10");
    assert!(c.hauler_cost_growth >= 1.0, "hauler_cost_growth is below 1");
    assert!(
        c.factory_initial_energy >= 0.0 && c.factory_initial_energy <= c.factory_energy_capacity,
        "factory_initial_energy must be within 0..=factory_energy_capacity",
    );
}

pub fn load_content(content_dir: &str) -> Result<GameContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = serde_json::from_str(
        &std::fs::read_to_string(dir.join("constants.json")).context("reading constants.json")?,
    )
    .context("parsing constants.json")?;
    let upgrades_file: UpgradesFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("upgrades.json")).context("reading upgrades.json")?,
    )
    .context("parsing upgrades.json")?;
    let content = GameContent {
        content_version: upgrades_file.content_version,
        upgrades: upgrades_file.upgrades,
        hauler_upgrades: upgrades_file.hauler_upgrades,
        constants,
    };
    validate_content(&content);
    Ok(content)
}

// ---------------------------------------------------------------------------
// World generation
// ---------------------------------------------------------------------------

/// Picks a position near the centroid of `anchors`: at least
/// [`FACTORY_MIN_DISTANCE`] from every anchor and within
/// [`FACTORY_MAX_DISTANCE`] of the nearest (and, with several anchors, the
/// second nearest). Falls back to a six-spoke ring after
/// [`FACTORY_PLACEMENT_ATTEMPTS`] misses.
pub fn compute_factory_placement(anchors: &[Position], rng: &mut impl Rng) -> Position {
    if anchors.is_empty() {
        return [0.0; 3];
    }
    let count = anchors.len() as f64;
    let mut centroid = [0.0; 3];
    for anchor in anchors {
        for axis in 0..3 {
            centroid[axis] += anchor[axis] / count;
        }
    }

    for _ in 0..FACTORY_PLACEMENT_ATTEMPTS {
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let radius = rng.gen_range(FACTORY_MIN_DISTANCE..FACTORY_MAX_DISTANCE);
        let candidate = [
            centroid[0] + angle.cos() * radius,
            centroid[1],
            centroid[2] + angle.sin() * radius,
        ];
        let mut distances: Vec<f64> = anchors
            .iter()
            .map(|anchor| sim_core::logistics::distance(&candidate, anchor))
            .collect();
        distances.sort_by(f64::total_cmp);
        let nearest = distances[0];
        let second = distances.get(1).copied().unwrap_or(nearest);
        if nearest < FACTORY_MIN_DISTANCE || nearest > FACTORY_MAX_DISTANCE {
            continue;
        }
        if anchors.len() > 1 && second > FACTORY_MAX_DISTANCE {
            continue;
        }
        return candidate;
    }

    let index = anchors.len();
    let ring = (index / 6) as f64;
    let angle = (index % 6) as f64 * std::f64::consts::FRAC_PI_3;
    let radius = FACTORY_MAX_DISTANCE.min(ring.mul_add(20.0, FACTORY_MIN_DISTANCE));
    [
        centroid[0] + angle.cos() * radius,
        centroid[1],
        centroid[2] + angle.sin() * radius,
    ]
}

/// A fresh network of `factory_count` factories around the warehouse.
///
/// The warehouse at the origin is the first placement anchor, so every
/// factory keeps its distance from it too. The first factory starts with
/// 50 ore, 10 bars, and one hauler.
pub fn build_initial_state(
    content: &GameContent,
    seed: u64,
    factory_count: usize,
    rng: &mut impl Rng,
) -> GameState {
    let c = &content.constants;
    let mut anchors: Vec<Position> = vec![sim_core::logistics::WAREHOUSE_POSITION];
    let mut factories = Vec::with_capacity(factory_count);
    for index in 0..factory_count {
        let position = compute_factory_placement(&anchors, rng);
        anchors.push(position);
        let mut factory = c.new_factory(FactoryId(format!("factory-{}", index + 1)), position);
        if index == 0 {
            sim_core::transfer_ore_to_factory(&mut factory, 50.0);
            factory.resources.bars = 10.0;
            factory.haulers_assigned = 1;
        }
        factories.push(factory);
    }

    GameState {
        meta: MetaState {
            game_time: 0.0,
            seed,
            schema_version: sim_core::snapshot::SCHEMA_VERSION,
            content_version: content.content_version.clone(),
            prestige_cores: 0,
        },
        warehouse: WarehouseState::default(),
        factories,
        logistics: LogisticsQueues::default(),
        counters: Counters {
            next_event_id: 1,
            next_transfer_id: 1,
            next_command_id: 1,
        },
    }
}

// ---------------------------------------------------------------------------
// Snapshot files
// ---------------------------------------------------------------------------

/// Reads a snapshot file and normalizes it against `content`. Every
/// normalization warning is logged.
pub fn load_state(path: &Path, content: &GameContent) -> Result<NormalizedSnapshot> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot file: {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&json)
        .with_context(|| format!("parsing snapshot file: {}", path.display()))?;
    let normalized = normalize(&snapshot, content);
    for warning in &normalized.warnings {
        warn!(file = %path.display(), path = %warning.path, "{}", warning.message);
    }
    info!(
        file = %path.display(),
        factories = normalized.state.factories.len(),
        warnings = normalized.warnings.len(),
        "snapshot loaded"
    );
    Ok(normalized)
}

pub fn save_state(path: &Path, state: &GameState) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating snapshot file: {}", path.display()))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), &snapshot_from_state(state))
        .with_context(|| format!("writing snapshot file: {}", path.display()))?;
    Ok(())
}
