//! Engine-neutral snapshot contract.
//!
//! The camelCase JSON shape shared by every engine implementation. Every
//! field is optional on input so older snapshots stay loadable; [`normalize`]
//! fills defaults, applies the load-time clamps, and reports each coercion
//! as a [`SnapshotWarning`].

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

use crate::{
    Constants, Counters, DispatchMode, DroneId, Endpoint, FactoryId, FactoryLogistics,
    FactoryState, FactoryUpgrades, GameContent, GameState, HaulerConfig, HaulerUpgrades,
    InboundSchedule, LogisticsQueues, MetaState, ModuleLevels, PendingTransfer, ProcessId,
    RefineProcess, ResourceKind, ResourceLedger, TransferId, UpgradeKind, UpgradeRequest,
    UpgradeStatus, WarehouseState, WAREHOUSE_ID,
};

pub const SCHEMA_VERSION: u32 = 1;

/// A number that never fails to deserialize. Non-numeric input becomes NaN
/// and is reported during normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Num(pub f64);

impl Serialize for Num {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

impl<'de> Deserialize<'de> for Num {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Other(serde::de::IgnoredAny),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(value) => Num(value),
            Raw::Other(_) => Num(f64::NAN),
        })
    }
}

/// RNG seed written as an exact integer. Older saves stored it as a float
/// (exact only below 2^53) or a decimal string; both still load. `None`
/// marks an unreadable value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Seed(pub Option<u64>);

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Some(seed) => serializer.serialize_u64(seed),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Seed {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Float(f64),
            Text(String),
            Other(serde::de::IgnoredAny),
        }
        Ok(Seed(match Raw::deserialize(deserializer)? {
            Raw::Int(seed) => Some(seed),
            Raw::Float(seed) if seed.is_finite() && seed >= 0.0 => Some(seed as u64),
            Raw::Text(text) => text.trim().parse().ok(),
            Raw::Float(_) | Raw::Other(_) => None,
        }))
    }
}

/// Resource or level map keyed by snake_case / camelCase names.
pub type NumMap = BTreeMap<String, Num>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Snapshot {
    pub game_time: Option<Num>,
    pub rng_seed: Option<Seed>,
    pub prestige_cores: Option<Num>,
    pub scheduling_accumulator: Option<Num>,
    pub resources: Option<NumMap>,
    pub modules: Option<NumMap>,
    pub factories: Vec<FactorySnapshot>,
    pub logistics_queues: Option<LogisticsQueuesSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactorySnapshot {
    pub id: Option<String>,
    pub position: Option<Vec<Num>>,
    pub docking_capacity: Option<Num>,
    pub refine_slots: Option<Num>,
    pub idle_energy_per_sec: Option<Num>,
    pub energy_per_refine: Option<Num>,
    pub storage_capacity: Option<Num>,
    pub current_storage: Option<Num>,
    pub queued_drones: Option<Vec<String>>,
    pub active_refines: Option<Vec<RefineSnapshot>>,
    pub energy: Option<Num>,
    pub energy_capacity: Option<Num>,
    pub resources: Option<NumMap>,
    pub upgrades: Option<NumMap>,
    pub upgrade_requests: Option<Vec<UpgradeRequestSnapshot>>,
    pub haulers_assigned: Option<Num>,
    pub hauler_config: Option<HaulerConfigSnapshot>,
    pub hauler_upgrades: Option<NumMap>,
    pub logistics_state: Option<FactoryLogisticsSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_process_seq: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RefineSnapshot {
    pub id: Option<String>,
    pub ore_type: Option<String>,
    pub amount: Option<Num>,
    pub progress: Option<Num>,
    pub time_total: Option<Num>,
    pub energy_required: Option<Num>,
    pub speed_multiplier: Option<Num>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpgradeRequestSnapshot {
    pub upgrade: Option<String>,
    pub resource_needed: Option<NumMap>,
    pub fulfilled_amount: Option<NumMap>,
    pub status: Option<String>,
    pub created_at: Option<Num>,
    pub expires_at: Option<Num>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HaulerConfigSnapshot {
    pub capacity: Option<Num>,
    pub speed: Option<Num>,
    pub pickup_overhead: Option<Num>,
    pub dropoff_overhead: Option<Num>,
    pub resource_filters: Option<Vec<String>>,
    pub mode: Option<String>,
    pub priority: Option<Num>,
}

/// Inbound schedules are not part of the contract; they are rebuilt from
/// `logisticsQueues.pendingTransfers` on load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FactoryLogisticsSnapshot {
    pub outbound_reservations: Option<NumMap>,
    pub throughput: Option<Num>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogisticsQueuesSnapshot {
    pub pending_transfers: Vec<PendingTransferSnapshot>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PendingTransferSnapshot {
    pub id: Option<String>,
    pub from_factory_id: Option<String>,
    pub to_factory_id: Option<String>,
    pub resource: Option<String>,
    pub amount: Option<Num>,
    pub status: Option<String>,
    pub eta: Option<Num>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub for_upgrade: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotWarning {
    /// Dotted path of the offending field, e.g. `factories[0].energy`.
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SnapshotWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedSnapshot {
    pub state: GameState,
    pub warnings: Vec<SnapshotWarning>,
}

// ---------------------------------------------------------------------------
// State -> snapshot
// ---------------------------------------------------------------------------

fn ledger_map(ledger: &ResourceLedger) -> NumMap {
    ledger
        .iter()
        .map(|(kind, amount)| (kind.as_str().to_string(), Num(amount)))
        .collect()
}

fn num(value: f64) -> Option<Num> {
    Some(Num(value))
}

fn level(value: u32) -> Num {
    Num(f64::from(value))
}

const MODULE_KEYS: [&str; 8] = [
    "droneBay",
    "refinery",
    "storage",
    "solar",
    "scanner",
    "haulerDepot",
    "logisticsHub",
    "routingProtocol",
];

fn module_slot<'a>(modules: &'a mut ModuleLevels, key: &str) -> Option<&'a mut u32> {
    Some(match key {
        "droneBay" => &mut modules.drone_bay,
        "refinery" => &mut modules.refinery,
        "storage" => &mut modules.storage,
        "solar" => &mut modules.solar,
        "scanner" => &mut modules.scanner,
        "haulerDepot" => &mut modules.hauler_depot,
        "logisticsHub" => &mut modules.logistics_hub,
        "routingProtocol" => &mut modules.routing_protocol,
        _ => return None,
    })
}

fn upgrade_slot<'a>(upgrades: &'a mut FactoryUpgrades, key: &str) -> Option<&'a mut u32> {
    Some(match key {
        "docking" => &mut upgrades.docking,
        "refine" => &mut upgrades.refine,
        "storage" => &mut upgrades.storage,
        "energy" => &mut upgrades.energy,
        "solar" => &mut upgrades.solar,
        _ => return None,
    })
}

fn hauler_upgrade_slot<'a>(upgrades: &'a mut HaulerUpgrades, key: &str) -> Option<&'a mut u32> {
    Some(match key {
        "capacityBoost" => &mut upgrades.capacity_boost,
        "speedBoost" => &mut upgrades.speed_boost,
        "efficiencyBoost" => &mut upgrades.efficiency_boost,
        _ => return None,
    })
}

fn dispatch_mode_str(mode: DispatchMode) -> &'static str {
    match mode {
        DispatchMode::Auto => "auto",
        DispatchMode::Manual => "manual",
        DispatchMode::DemandFirst => "demand-first",
        DispatchMode::SupplyFirst => "supply-first",
    }
}

fn parse_dispatch_mode(raw: &str) -> Option<DispatchMode> {
    [
        DispatchMode::Auto,
        DispatchMode::Manual,
        DispatchMode::DemandFirst,
        DispatchMode::SupplyFirst,
    ]
    .into_iter()
    .find(|mode| dispatch_mode_str(*mode) == raw)
}

fn status_str(status: UpgradeStatus) -> &'static str {
    match status {
        UpgradeStatus::Pending => "pending",
        UpgradeStatus::PartiallyFulfilled => "partially_fulfilled",
        UpgradeStatus::Fulfilled => "fulfilled",
        UpgradeStatus::Expired => "expired",
    }
}

fn parse_status(raw: &str) -> Option<UpgradeStatus> {
    [
        UpgradeStatus::Pending,
        UpgradeStatus::PartiallyFulfilled,
        UpgradeStatus::Fulfilled,
        UpgradeStatus::Expired,
    ]
    .into_iter()
    .find(|status| status_str(*status) == raw)
}

fn parse_upgrade(raw: &str) -> Option<UpgradeKind> {
    UpgradeKind::PRIORITY
        .into_iter()
        .find(|kind| kind.as_str() == raw)
}

pub fn snapshot_from_state(state: &GameState) -> Snapshot {
    let modules = state.warehouse.modules;
    let module_levels = [
        modules.drone_bay,
        modules.refinery,
        modules.storage,
        modules.solar,
        modules.scanner,
        modules.hauler_depot,
        modules.logistics_hub,
        modules.routing_protocol,
    ];
    Snapshot {
        game_time: num(state.meta.game_time),
        rng_seed: Some(Seed(Some(state.meta.seed))),
        prestige_cores: Some(level(state.meta.prestige_cores)),
        scheduling_accumulator: num(state.logistics.scheduling_accumulator),
        resources: Some(ledger_map(&state.warehouse.resources)),
        modules: Some(
            MODULE_KEYS
                .iter()
                .zip(module_levels)
                .map(|(key, value)| ((*key).to_string(), level(value)))
                .collect(),
        ),
        factories: state.factories.iter().map(factory_snapshot).collect(),
        logistics_queues: Some(LogisticsQueuesSnapshot {
            pending_transfers: state
                .logistics
                .pending_transfers
                .iter()
                .map(|transfer| PendingTransferSnapshot {
                    id: Some(transfer.id.0.clone()),
                    from_factory_id: Some(transfer.from.to_string()),
                    to_factory_id: Some(transfer.to.to_string()),
                    resource: Some(transfer.resource.as_str().to_string()),
                    amount: num(transfer.amount),
                    status: Some("scheduled".to_string()),
                    eta: num(transfer.eta),
                    for_upgrade: transfer.for_upgrade.map(|kind| kind.as_str().to_string()),
                })
                .collect(),
        }),
    }
}

fn factory_snapshot(factory: &FactoryState) -> FactorySnapshot {
    let upgrades = factory.upgrades;
    let hauler_upgrades = factory.hauler_upgrades;
    let config = &factory.hauler_config;
    FactorySnapshot {
        id: Some(factory.id.0.clone()),
        position: Some(factory.position.iter().map(|axis| Num(*axis)).collect()),
        docking_capacity: Some(level(factory.docking_capacity)),
        refine_slots: Some(level(factory.refine_slots)),
        idle_energy_per_sec: num(factory.idle_energy_per_sec),
        energy_per_refine: num(factory.energy_per_refine),
        storage_capacity: num(factory.storage_capacity),
        current_storage: num(factory.current_storage),
        queued_drones: Some(factory.queued_drones.iter().map(|id| id.0.clone()).collect()),
        active_refines: Some(
            factory
                .active_refines
                .iter()
                .map(|process| RefineSnapshot {
                    id: Some(process.id.0.clone()),
                    ore_type: Some(process.ore_type.as_str().to_string()),
                    amount: num(process.amount),
                    progress: num(process.progress),
                    time_total: num(process.time_total),
                    energy_required: num(process.energy_required),
                    speed_multiplier: num(process.speed_multiplier),
                })
                .collect(),
        ),
        energy: num(factory.energy),
        energy_capacity: num(factory.energy_capacity),
        resources: Some(ledger_map(&factory.resources)),
        upgrades: Some(
            [
                ("docking", upgrades.docking),
                ("refine", upgrades.refine),
                ("storage", upgrades.storage),
                ("energy", upgrades.energy),
                ("solar", upgrades.solar),
            ]
            .into_iter()
            .map(|(key, value)| (key.to_string(), level(value)))
            .collect(),
        ),
        upgrade_requests: Some(
            factory
                .upgrade_requests
                .iter()
                .map(|request| UpgradeRequestSnapshot {
                    upgrade: Some(request.upgrade.as_str().to_string()),
                    resource_needed: Some(ledger_map(&request.resource_needed)),
                    fulfilled_amount: Some(ledger_map(&request.fulfilled_amount)),
                    status: Some(status_str(request.status).to_string()),
                    created_at: num(request.created_at),
                    expires_at: num(request.expires_at),
                })
                .collect(),
        ),
        haulers_assigned: Some(level(factory.haulers_assigned)),
        hauler_config: Some(HaulerConfigSnapshot {
            capacity: num(config.capacity),
            speed: num(config.speed),
            pickup_overhead: num(config.pickup_overhead),
            dropoff_overhead: num(config.dropoff_overhead),
            resource_filters: Some(
                config
                    .resource_filters
                    .iter()
                    .map(|kind| kind.as_str().to_string())
                    .collect(),
            ),
            mode: Some(dispatch_mode_str(config.mode).to_string()),
            priority: num(f64::from(config.priority)),
        }),
        hauler_upgrades: Some(
            [
                ("capacityBoost", hauler_upgrades.capacity_boost),
                ("speedBoost", hauler_upgrades.speed_boost),
                ("efficiencyBoost", hauler_upgrades.efficiency_boost),
            ]
            .into_iter()
            .map(|(key, value)| (key.to_string(), level(value)))
            .collect(),
        ),
        logistics_state: Some(FactoryLogisticsSnapshot {
            outbound_reservations: Some(ledger_map(&factory.logistics.outbound_reservations)),
            throughput: num(factory.logistics.throughput),
        }),
        next_process_seq: Some(factory.next_process_seq),
    }
}

// ---------------------------------------------------------------------------
// Snapshot -> state
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Normalizer {
    warnings: Vec<SnapshotWarning>,
}

impl Normalizer {
    fn warn(&mut self, path: &str, message: impl Into<String>) {
        self.warnings.push(SnapshotWarning {
            path: path.to_string(),
            message: message.into(),
        });
    }

    /// Finite value or `default`; missing and invalid values both warn.
    fn number(&mut self, path: &str, value: Option<Num>, default: f64) -> f64 {
        match value {
            Some(Num(value)) if value.is_finite() => value,
            Some(_) => {
                self.warn(path, format!("not a finite number; using {default}"));
                default
            }
            None => {
                self.warn(path, format!("missing; using {default}"));
                default
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn count(&mut self, path: &str, value: Option<Num>, default: u32, min: u32) -> u32 {
        let raw = self.number(path, value, f64::from(default)).floor();
        raw.clamp(f64::from(min), f64::from(u32::MAX)) as u32
    }

    /// Missing keys read as zero without a warning; negative, invalid, and
    /// unknown entries warn.
    fn ledger(&mut self, path: &str, value: Option<&NumMap>) -> ResourceLedger {
        let mut ledger = ResourceLedger::default();
        let Some(map) = value else {
            return ledger;
        };
        for (key, Num(amount)) in map {
            let entry = format!("{path}.{key}");
            let Some(kind) = ResourceKind::parse(key) else {
                self.warn(&entry, "unknown resource ignored");
                continue;
            };
            if !amount.is_finite() {
                self.warn(&entry, "not a finite number; using 0");
            } else if *amount < 0.0 {
                self.warn(&entry, "negative amount clamped to 0");
            } else {
                ledger.set(kind, *amount);
            }
        }
        ledger
    }

    fn levels<T>(
        &mut self,
        path: &str,
        value: Option<&NumMap>,
        target: &mut T,
        slot: for<'a> fn(&'a mut T, &str) -> Option<&'a mut u32>,
    ) {
        let Some(map) = value else {
            return;
        };
        for (key, raw) in map {
            let entry = format!("{path}.{key}");
            let parsed = self.count(&entry, Some(*raw), 0, 0);
            match slot(target, key) {
                Some(level) => *level = parsed,
                None => self.warn(&entry, "unknown level ignored"),
            }
        }
    }
}

/// Builds a [`GameState`] from a snapshot, filling defaults from `content`.
///
/// Load-time clamps: at least one docking bay and refine slot, capacities of
/// at least 1, hauler capacity at least 1 and speed at least 0.1, priority
/// in `0..=10`, refine progress and speed multiplier in `[0, 1]`, refines
/// beyond the slot count dropped, reservations capped at the reserved
/// resource. Factories without a position are dropped; ids that are empty,
/// duplicated, or equal to the warehouse sentinel are renamed.
pub fn normalize(snapshot: &Snapshot, content: &GameContent) -> NormalizedSnapshot {
    let constants = &content.constants;
    let mut n = Normalizer::default();

    let mut modules = ModuleLevels::default();
    n.levels("modules", snapshot.modules.as_ref(), &mut modules, module_slot);

    let mut factories: Vec<FactoryState> = Vec::with_capacity(snapshot.factories.len());
    for (index, raw) in snapshot.factories.iter().enumerate() {
        let path = format!("factories[{index}]");
        let Some(position) = parse_position(raw.position.as_deref()) else {
            n.warn(&format!("{path}.position"), "missing or invalid; factory dropped");
            continue;
        };
        let id = unique_factory_id(&mut n, &path, raw.id.as_deref(), &factories);
        factories.push(normalize_factory(&mut n, &path, raw, id, position, constants));
    }

    let pending = normalize_pending(&mut n, snapshot, &factories);
    for transfer in &pending {
        let Some(dest) = transfer.to.factory() else {
            continue;
        };
        if let Some(factory) = factories.iter_mut().find(|factory| &factory.id == dest) {
            factory.logistics.inbound_schedules.push(InboundSchedule {
                transfer_id: transfer.id.clone(),
                from: transfer.from.clone(),
                resource: transfer.resource,
                amount: transfer.amount,
                eta: transfer.eta,
            });
        }
    }

    let next_transfer_id = pending
        .iter()
        .filter_map(|transfer| id_suffix(&transfer.id.0, "transfer-"))
        .max()
        .map_or(1, |max| max + 1);

    let seed = match snapshot.rng_seed {
        Some(Seed(Some(seed))) => seed,
        Some(Seed(None)) => {
            n.warn("rngSeed", "not a non-negative integer; using 0");
            0
        }
        None => {
            n.warn("rngSeed", "missing; using 0");
            0
        }
    };
    let state = GameState {
        meta: MetaState {
            game_time: n.number("gameTime", snapshot.game_time, 0.0).max(0.0),
            seed,
            schema_version: SCHEMA_VERSION,
            content_version: content.content_version.clone(),
            prestige_cores: n.count("prestigeCores", snapshot.prestige_cores, 0, 0),
        },
        warehouse: WarehouseState {
            resources: n.ledger("resources", snapshot.resources.as_ref()),
            modules,
        },
        factories,
        logistics: LogisticsQueues {
            pending_transfers: pending,
            scheduling_accumulator: n
                .number(
                    "schedulingAccumulator",
                    snapshot.scheduling_accumulator,
                    0.0,
                )
                .max(0.0),
        },
        counters: Counters {
            next_event_id: 1,
            next_transfer_id,
            next_command_id: 1,
        },
    };
    NormalizedSnapshot {
        state,
        warnings: n.warnings,
    }
}

fn parse_position(raw: Option<&[Num]>) -> Option<[f64; 3]> {
    match raw? {
        [x, y, z] if [x, y, z].iter().all(|axis| axis.0.is_finite()) => Some([x.0, y.0, z.0]),
        _ => None,
    }
}

fn unique_factory_id(
    n: &mut Normalizer,
    path: &str,
    raw: Option<&str>,
    existing: &[FactoryState],
) -> FactoryId {
    let taken = |candidate: &str| {
        candidate == WAREHOUSE_ID || existing.iter().any(|factory| factory.id.0 == candidate)
    };
    let base = match raw {
        Some(id) if !id.is_empty() => {
            if !taken(id) {
                return FactoryId(id.to_string());
            }
            id
        }
        _ => "factory",
    };
    let mut suffix = existing.len() + 1;
    let mut candidate = format!("{base}-{suffix}");
    while taken(&candidate) {
        suffix += 1;
        candidate = format!("{base}-{suffix}");
    }
    n.warn(
        &format!("{path}.id"),
        format!("missing, duplicate, or reserved id; renamed to {candidate}"),
    );
    FactoryId(candidate)
}

fn id_suffix(id: &str, prefix: &str) -> Option<u64> {
    id.strip_prefix(prefix)?.parse().ok()
}

#[allow(clippy::too_many_lines)]
fn normalize_factory(
    n: &mut Normalizer,
    path: &str,
    raw: &FactorySnapshot,
    id: FactoryId,
    position: [f64; 3],
    constants: &Constants,
) -> FactoryState {
    let field = |name: &str| format!("{path}.{name}");
    let mut factory = constants.new_factory(id, position);

    factory.docking_capacity = n.count(
        &field("dockingCapacity"),
        raw.docking_capacity,
        constants.factory_docking_capacity,
        1,
    );
    factory.refine_slots = n.count(
        &field("refineSlots"),
        raw.refine_slots,
        constants.factory_refine_slots,
        1,
    );
    factory.idle_energy_per_sec = n
        .number(
            &field("idleEnergyPerSec"),
            raw.idle_energy_per_sec,
            constants.factory_idle_energy_per_sec,
        )
        .max(0.0);
    factory.energy_per_refine = n
        .number(
            &field("energyPerRefine"),
            raw.energy_per_refine,
            constants.factory_energy_per_refine,
        )
        .max(0.0);
    factory.storage_capacity = n
        .number(
            &field("storageCapacity"),
            raw.storage_capacity,
            constants.factory_storage_capacity,
        )
        .max(1.0);
    factory.energy_capacity = n
        .number(
            &field("energyCapacity"),
            raw.energy_capacity,
            constants.factory_energy_capacity,
        )
        .max(1.0);
    factory.energy = n
        .number(&field("energy"), raw.energy, constants.factory_initial_energy)
        .max(0.0);
    factory.queued_drones = raw
        .queued_drones
        .iter()
        .flatten()
        .map(|drone| DroneId(drone.clone()))
        .collect();
    factory.resources = n.ledger(&field("resources"), raw.resources.as_ref());
    // `currentStorage` mirrors ore; the ledger wins on disagreement.
    factory.sync_storage();

    n.levels(
        &field("upgrades"),
        raw.upgrades.as_ref(),
        &mut factory.upgrades,
        upgrade_slot,
    );
    n.levels(
        &field("haulerUpgrades"),
        raw.hauler_upgrades.as_ref(),
        &mut factory.hauler_upgrades,
        hauler_upgrade_slot,
    );
    factory.haulers_assigned = n.count(&field("haulersAssigned"), raw.haulers_assigned, 0, 0);
    match &raw.hauler_config {
        Some(config) => {
            factory.hauler_config =
                normalize_hauler_config(n, &field("haulerConfig"), config, constants);
        }
        None => n.warn(&field("haulerConfig"), "missing; using defaults"),
    }

    normalize_refines(n, path, raw, &mut factory);
    normalize_requests(n, path, raw, &mut factory);
    normalize_reservations(n, path, raw, &mut factory);

    factory
}

/// Keeps at most `refine_slots` refines and derives the process counter
/// from the surviving ids.
fn normalize_refines(
    n: &mut Normalizer,
    path: &str,
    raw: &FactorySnapshot,
    factory: &mut FactoryState,
) {
    let field = |name: &str| format!("{path}.{name}");
    let mut refines = Vec::new();
    for (index, process) in raw.active_refines.iter().flatten().enumerate() {
        let refine_path = field(&format!("activeRefines[{index}]"));
        if let Some(process) = normalize_refine(n, &refine_path, process, factory) {
            refines.push(process);
        }
    }
    if refines.len() > factory.refine_slots as usize {
        n.warn(
            &field("activeRefines"),
            format!("{} refines exceed {} slots; extras dropped", refines.len(), factory.refine_slots),
        );
        refines.truncate(factory.refine_slots as usize);
    }
    let derived_seq = refines
        .iter()
        .filter_map(|process| id_suffix(&process.id.0, &format!("{}-p", factory.id)))
        .max()
        .unwrap_or(0);
    factory.next_process_seq = raw.next_process_seq.unwrap_or(0).max(derived_seq);
    factory.active_refines = refines;
}

fn normalize_requests(
    n: &mut Normalizer,
    path: &str,
    raw: &FactorySnapshot,
    factory: &mut FactoryState,
) {
    let field = |name: &str| format!("{path}.{name}");
    for (index, request) in raw.upgrade_requests.iter().flatten().enumerate() {
        let request_path = field(&format!("upgradeRequests[{index}]"));
        if let Some(request) = normalize_request(n, &request_path, request) {
            factory.upgrade_requests.push(request);
        }
    }
    if factory.upgrade_requests.len() > 1 {
        n.warn(
            &field("upgradeRequests"),
            "more than one active request; keeping the oldest",
        );
        factory
            .upgrade_requests
            .sort_by(|a, b| a.created_at.total_cmp(&b.created_at));
        factory.upgrade_requests.truncate(1);
    }
}

/// Reservations never exceed the stock they hold back.
fn normalize_reservations(
    n: &mut Normalizer,
    path: &str,
    raw: &FactorySnapshot,
    factory: &mut FactoryState,
) {
    let field = |name: &str| format!("{path}.{name}");
    let reservations = raw
        .logistics_state
        .as_ref()
        .and_then(|state| state.outbound_reservations.as_ref());
    let reserved = n.ledger(&field("logisticsState.outboundReservations"), reservations);
    factory.logistics = FactoryLogistics::default();
    // Saves from before the counter existed read as zero.
    match raw.logistics_state.as_ref().and_then(|state| state.throughput) {
        Some(Num(amount)) if amount.is_finite() && amount >= 0.0 => {
            factory.logistics.throughput = amount;
        }
        Some(_) => n.warn(
            &field("logisticsState.throughput"),
            "not a non-negative number; using 0",
        ),
        None => {}
    }
    for (kind, amount) in reserved.positive() {
        let held = factory.resources.get(kind);
        if amount > held {
            n.warn(
                &field(&format!("logisticsState.outboundReservations.{kind}")),
                format!("reservation {amount} exceeds stock {held}; clamped"),
            );
        }
        factory
            .logistics
            .outbound_reservations
            .set(kind, amount.min(held));
    }
}

fn normalize_hauler_config(
    n: &mut Normalizer,
    path: &str,
    raw: &HaulerConfigSnapshot,
    constants: &Constants,
) -> HaulerConfig {
    let field = |name: &str| format!("{path}.{name}");
    let mut filters: SmallVec<[ResourceKind; 4]> = SmallVec::new();
    for name in raw.resource_filters.iter().flatten() {
        match ResourceKind::parse(name) {
            Some(kind) if !filters.contains(&kind) => filters.push(kind),
            Some(_) => {}
            None => n.warn(&field("resourceFilters"), format!("unknown resource {name} ignored")),
        }
    }
    let mode = match raw.mode.as_deref() {
        Some(mode) => parse_dispatch_mode(mode).unwrap_or_else(|| {
            n.warn(&field("mode"), format!("unknown mode {mode}; using auto"));
            DispatchMode::Auto
        }),
        None => DispatchMode::Auto,
    };
    let priority = n.count(
        &field("priority"),
        raw.priority,
        u32::from(constants.default_hauler_priority),
        0,
    );
    HaulerConfig {
        capacity: n
            .number(&field("capacity"), raw.capacity, constants.default_hauler_capacity)
            .floor()
            .max(1.0),
        speed: n
            .number(&field("speed"), raw.speed, constants.default_hauler_speed)
            .max(0.1),
        pickup_overhead: n
            .number(
                &field("pickupOverhead"),
                raw.pickup_overhead,
                constants.default_hauler_pickup_overhead,
            )
            .max(0.0),
        dropoff_overhead: n
            .number(
                &field("dropoffOverhead"),
                raw.dropoff_overhead,
                constants.default_hauler_dropoff_overhead,
            )
            .max(0.0),
        resource_filters: filters,
        mode,
        priority: u8::try_from(priority.min(10)).unwrap_or(10),
    }
}

fn normalize_refine(
    n: &mut Normalizer,
    path: &str,
    raw: &RefineSnapshot,
    factory: &FactoryState,
) -> Option<RefineProcess> {
    let Some(id) = raw.id.as_deref().filter(|id| !id.is_empty()) else {
        n.warn(path, "refine without id dropped");
        return None;
    };
    let ore_type = raw
        .ore_type
        .as_deref()
        .and_then(ResourceKind::parse)
        .unwrap_or(ResourceKind::Ore);
    let amount = n.number(&format!("{path}.amount"), raw.amount, 0.0).max(0.0);
    if amount <= 0.0 {
        n.warn(path, "refine with no ore dropped");
        return None;
    }
    Some(RefineProcess {
        id: ProcessId(id.to_string()),
        ore_type,
        amount,
        progress: n
            .number(&format!("{path}.progress"), raw.progress, 0.0)
            .clamp(0.0, 1.0),
        time_total: n
            .number(&format!("{path}.timeTotal"), raw.time_total, 10.0)
            .max(0.01),
        energy_required: n
            .number(
                &format!("{path}.energyRequired"),
                raw.energy_required,
                factory.energy_per_refine,
            )
            .max(0.0),
        speed_multiplier: n
            .number(&format!("{path}.speedMultiplier"), raw.speed_multiplier, 1.0)
            .clamp(0.0, 1.0),
    })
}

fn normalize_request(
    n: &mut Normalizer,
    path: &str,
    raw: &UpgradeRequestSnapshot,
) -> Option<UpgradeRequest> {
    let Some(upgrade) = raw.upgrade.as_deref().and_then(parse_upgrade) else {
        n.warn(path, "unknown upgrade; request dropped");
        return None;
    };
    let status = match raw.status.as_deref() {
        Some(status) => parse_status(status).unwrap_or_else(|| {
            n.warn(&format!("{path}.status"), format!("unknown status {status}; using pending"));
            UpgradeStatus::Pending
        }),
        None => UpgradeStatus::Pending,
    };
    if status == UpgradeStatus::Expired {
        return None;
    }
    let created_at = n.number(&format!("{path}.createdAt"), raw.created_at, 0.0);
    Some(UpgradeRequest {
        upgrade,
        resource_needed: n.ledger(&format!("{path}.resourceNeeded"), raw.resource_needed.as_ref()),
        fulfilled_amount: n.ledger(
            &format!("{path}.fulfilledAmount"),
            raw.fulfilled_amount.as_ref(),
        ),
        status,
        created_at,
        expires_at: n.number(&format!("{path}.expiresAt"), raw.expires_at, created_at),
    })
}

fn normalize_pending(
    n: &mut Normalizer,
    snapshot: &Snapshot,
    factories: &[FactoryState],
) -> Vec<PendingTransfer> {
    let Some(queues) = &snapshot.logistics_queues else {
        return Vec::new();
    };
    let known = |endpoint: &Endpoint| match endpoint {
        Endpoint::Warehouse => true,
        Endpoint::Factory(id) => factories.iter().any(|factory| &factory.id == id),
    };
    let mut pending = Vec::with_capacity(queues.pending_transfers.len());
    let mut next_generated = 1;
    for (index, raw) in queues.pending_transfers.iter().enumerate() {
        let path = format!("logisticsQueues.pendingTransfers[{index}]");
        let Some(resource) = raw
            .resource
            .as_deref()
            .and_then(ResourceKind::parse)
            .filter(|kind| *kind != ResourceKind::Credits)
        else {
            n.warn(&path, "unknown or non-transportable resource; transfer dropped");
            continue;
        };
        let (Some(from), Some(to)) = (&raw.from_factory_id, &raw.to_factory_id) else {
            n.warn(&path, "missing endpoint; transfer dropped");
            continue;
        };
        let from = Endpoint::from(from.clone());
        let to = Endpoint::from(to.clone());
        if !known(&from) || !known(&to) {
            // Kept: arrival discards it and releases any surviving reservation.
            n.warn(&path, "endpoint refers to an unknown factory");
        }
        if raw.status.as_deref() == Some("completed") {
            continue;
        }
        let amount = n.number(&format!("{path}.amount"), raw.amount, 0.0);
        if amount <= 0.0 {
            n.warn(&path, "non-positive amount; transfer dropped");
            continue;
        }
        let id = match raw.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => TransferId(id.to_string()),
            None => {
                n.warn(&format!("{path}.id"), "missing; generated");
                let id = TransferId(format!("transfer-restored-{next_generated}"));
                next_generated += 1;
                id
            }
        };
        pending.push(PendingTransfer {
            id,
            from,
            to,
            resource,
            amount,
            eta: n.number(&format!("{path}.eta"), raw.eta, 0.0).max(0.0),
            for_upgrade: raw.for_upgrade.as_deref().and_then(parse_upgrade),
        });
    }
    pending
}
