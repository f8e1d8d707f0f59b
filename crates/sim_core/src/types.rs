//! Type definitions for `sim_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// Type aliases
// ---------------------------------------------------------------------------

/// World-space position. Only used for distance and travel-time math.
pub type Position = [f64; 3];

/// Reserved endpoint id addressing the global warehouse.
pub const WAREHOUSE_ID: &str = "warehouse";

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(FactoryId);
string_id!(DroneId);
string_id!(ProcessId);
string_id!(TransferId);
string_id!(CommandId);
string_id!(EventId);

// ---------------------------------------------------------------------------
// Resources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Ore,
    Bars,
    Metals,
    Crystals,
    Organics,
    Ice,
    Credits,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Ore,
        ResourceKind::Bars,
        ResourceKind::Metals,
        ResourceKind::Crystals,
        ResourceKind::Organics,
        ResourceKind::Ice,
        ResourceKind::Credits,
    ];

    /// Resources the logistics network moves, in scheduling order.
    pub const TRANSPORTABLE: [ResourceKind; 6] = [
        ResourceKind::Ore,
        ResourceKind::Bars,
        ResourceKind::Metals,
        ResourceKind::Crystals,
        ResourceKind::Organics,
        ResourceKind::Ice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Ore => "ore",
            ResourceKind::Bars => "bars",
            ResourceKind::Metals => "metals",
            ResourceKind::Crystals => "crystals",
            ResourceKind::Organics => "organics",
            ResourceKind::Ice => "ice",
            ResourceKind::Credits => "credits",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        ResourceKind::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-negative amount per resource kind. Also used for reservations and costs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLedger {
    pub ore: f64,
    pub bars: f64,
    pub metals: f64,
    pub crystals: f64,
    pub organics: f64,
    pub ice: f64,
    pub credits: f64,
}

impl ResourceLedger {
    pub fn get(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Ore => self.ore,
            ResourceKind::Bars => self.bars,
            ResourceKind::Metals => self.metals,
            ResourceKind::Crystals => self.crystals,
            ResourceKind::Organics => self.organics,
            ResourceKind::Ice => self.ice,
            ResourceKind::Credits => self.credits,
        }
    }

    pub fn get_mut(&mut self, kind: ResourceKind) -> &mut f64 {
        match kind {
            ResourceKind::Ore => &mut self.ore,
            ResourceKind::Bars => &mut self.bars,
            ResourceKind::Metals => &mut self.metals,
            ResourceKind::Crystals => &mut self.crystals,
            ResourceKind::Organics => &mut self.organics,
            ResourceKind::Ice => &mut self.ice,
            ResourceKind::Credits => &mut self.credits,
        }
    }

    pub fn set(&mut self, kind: ResourceKind, amount: f64) {
        *self.get_mut(kind) = amount;
    }

    pub fn add(&mut self, kind: ResourceKind, amount: f64) {
        *self.get_mut(kind) += amount;
    }

    /// Subtracts `amount`, flooring the result at zero.
    pub fn deduct(&mut self, kind: ResourceKind, amount: f64) {
        let slot = self.get_mut(kind);
        *slot = (*slot - amount).max(0.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        ResourceKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }

    /// Kinds with a strictly positive amount, in canonical order.
    pub fn positive(&self) -> impl Iterator<Item = (ResourceKind, f64)> + '_ {
        self.iter().filter(|(_, amount)| *amount > 0.0)
    }

    pub fn is_zero(&self) -> bool {
        self.positive().next().is_none()
    }
}

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Normal,
    Debug,
}

/// One end of a transfer: the warehouse or a factory.
///
/// Serialized as a bare string; [`WAREHOUSE_ID`] names the warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Endpoint {
    Warehouse,
    Factory(FactoryId),
}

impl Endpoint {
    pub fn factory(&self) -> Option<&FactoryId> {
        match self {
            Endpoint::Warehouse => None,
            Endpoint::Factory(id) => Some(id),
        }
    }

    pub fn is_warehouse(&self) -> bool {
        matches!(self, Endpoint::Warehouse)
    }
}

impl From<String> for Endpoint {
    fn from(raw: String) -> Self {
        if raw == WAREHOUSE_ID {
            Endpoint::Warehouse
        } else {
            Endpoint::Factory(FactoryId(raw))
        }
    }
}

impl From<Endpoint> for String {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Warehouse => WAREHOUSE_ID.to_string(),
            Endpoint::Factory(id) => id.0,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::Warehouse => f.write_str(WAREHOUSE_ID),
            Endpoint::Factory(id) => f.write_str(&id.0),
        }
    }
}

/// Factory upgrades, listed in shortfall-detection priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeKind {
    Docking,
    Refine,
    Storage,
    Energy,
    Solar,
}

impl UpgradeKind {
    pub const PRIORITY: [UpgradeKind; 5] = [
        UpgradeKind::Docking,
        UpgradeKind::Refine,
        UpgradeKind::Storage,
        UpgradeKind::Energy,
        UpgradeKind::Solar,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UpgradeKind::Docking => "docking",
            UpgradeKind::Refine => "refine",
            UpgradeKind::Storage => "storage",
            UpgradeKind::Energy => "energy",
            UpgradeKind::Solar => "solar",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HaulerUpgradeKind {
    CapacityBoost,
    SpeedBoost,
    EfficiencyBoost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpgradeStatus {
    Pending,
    PartiallyFulfilled,
    Fulfilled,
    Expired,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    #[default]
    Auto,
    Manual,
    DemandFirst,
    SupplyFirst,
}

// ---------------------------------------------------------------------------
// State types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub meta: MetaState,
    pub warehouse: WarehouseState,
    /// Creation order is the iteration order of every simulation pass.
    pub factories: Vec<FactoryState>,
    pub logistics: LogisticsQueues,
    pub counters: Counters,
}

impl GameState {
    pub fn factory(&self, id: &FactoryId) -> Option<&FactoryState> {
        self.factories.iter().find(|factory| &factory.id == id)
    }

    pub fn factory_mut(&mut self, id: &FactoryId) -> Option<&mut FactoryState> {
        self.factories.iter_mut().find(|factory| &factory.id == id)
    }

    pub fn factory_index(&self, id: &FactoryId) -> Option<usize> {
        self.factories.iter().position(|factory| &factory.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    /// Game time in seconds.
    pub game_time: f64,
    pub seed: u64,
    pub schema_version: u32,
    pub content_version: String,
    pub prestige_cores: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Counters {
    pub next_event_id: u64,
    pub next_transfer_id: u64,
    pub next_command_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarehouseState {
    pub resources: ResourceLedger,
    pub modules: ModuleLevels,
}

/// Warehouse module levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLevels {
    pub drone_bay: u32,
    pub refinery: u32,
    pub storage: u32,
    pub solar: u32,
    pub scanner: u32,
    pub hauler_depot: u32,
    pub logistics_hub: u32,
    pub routing_protocol: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogisticsQueues {
    pub pending_transfers: Vec<PendingTransfer>,
    /// Game time accumulated since the last scheduling pass.
    pub scheduling_accumulator: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryState {
    pub id: FactoryId,
    pub position: Position,
    pub docking_capacity: u32,
    /// FIFO; the first `docking_capacity` entries are docked.
    pub queued_drones: Vec<DroneId>,
    pub refine_slots: u32,
    pub idle_energy_per_sec: f64,
    pub energy_per_refine: f64,
    pub storage_capacity: f64,
    /// Mirrors `resources.ore`.
    pub current_storage: f64,
    pub active_refines: Vec<RefineProcess>,
    pub energy: f64,
    pub energy_capacity: f64,
    pub resources: ResourceLedger,
    pub upgrades: FactoryUpgrades,
    pub upgrade_requests: Vec<UpgradeRequest>,
    pub haulers_assigned: u32,
    pub hauler_config: HaulerConfig,
    pub hauler_upgrades: HaulerUpgrades,
    pub logistics: FactoryLogistics,
    pub next_process_seq: u64,
}

impl FactoryState {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::Factory(self.id.clone())
    }

    pub fn has_free_slot(&self) -> bool {
        self.active_refines.len() < self.refine_slots as usize
    }

    /// Resource amount not promised to an outbound transfer.
    pub fn unreserved(&self, kind: ResourceKind) -> f64 {
        (self.resources.get(kind) - self.logistics.outbound_reservations.get(kind)).max(0.0)
    }

    pub fn sync_storage(&mut self) {
        self.current_storage = self.resources.ore;
    }

    pub fn upgrade_level(&self, kind: UpgradeKind) -> u32 {
        match kind {
            UpgradeKind::Docking => self.upgrades.docking,
            UpgradeKind::Refine => self.upgrades.refine,
            UpgradeKind::Storage => self.upgrades.storage,
            UpgradeKind::Energy => self.upgrades.energy,
            UpgradeKind::Solar => self.upgrades.solar,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineProcess {
    pub id: ProcessId,
    pub ore_type: ResourceKind,
    /// Output reserved when the batch started.
    pub amount: f64,
    /// In `[0, 1]`.
    pub progress: f64,
    pub time_total: f64,
    pub energy_required: f64,
    /// In `[0, 1]`; zero means paused.
    pub speed_multiplier: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryUpgrades {
    pub docking: u32,
    pub refine: u32,
    pub storage: u32,
    pub energy: u32,
    pub solar: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HaulerUpgrades {
    pub capacity_boost: u32,
    pub speed_boost: u32,
    pub efficiency_boost: u32,
}

impl HaulerUpgrades {
    pub fn level(&self, kind: HaulerUpgradeKind) -> u32 {
        match kind {
            HaulerUpgradeKind::CapacityBoost => self.capacity_boost,
            HaulerUpgradeKind::SpeedBoost => self.speed_boost,
            HaulerUpgradeKind::EfficiencyBoost => self.efficiency_boost,
        }
    }

    pub fn level_mut(&mut self, kind: HaulerUpgradeKind) -> &mut u32 {
        match kind {
            HaulerUpgradeKind::CapacityBoost => &mut self.capacity_boost,
            HaulerUpgradeKind::SpeedBoost => &mut self.speed_boost,
            HaulerUpgradeKind::EfficiencyBoost => &mut self.efficiency_boost,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaulerConfig {
    pub capacity: f64,
    pub speed: f64,
    pub pickup_overhead: f64,
    pub dropoff_overhead: f64,
    /// Allow-list; empty allows every resource.
    pub resource_filters: SmallVec<[ResourceKind; 4]>,
    pub mode: DispatchMode,
    /// 0..=10.
    pub priority: u8,
}

impl HaulerConfig {
    pub fn allows(&self, kind: ResourceKind) -> bool {
        self.resource_filters.is_empty() || self.resource_filters.contains(&kind)
    }
}

/// Per-factory reservation bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactoryLogistics {
    pub outbound_reservations: ResourceLedger,
    pub inbound_schedules: Vec<InboundSchedule>,
    /// Total amount hauled in or out over the factory's lifetime.
    #[serde(default)]
    pub throughput: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundSchedule {
    pub transfer_id: TransferId,
    pub from: Endpoint,
    pub resource: ResourceKind,
    pub amount: f64,
    pub eta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransfer {
    pub id: TransferId,
    pub from: Endpoint,
    pub to: Endpoint,
    pub resource: ResourceKind,
    pub amount: f64,
    /// Absolute game time of arrival.
    pub eta: f64,
    /// Set when the transfer was scheduled against an upgrade request.
    pub for_upgrade: Option<UpgradeKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpgradeRequest {
    pub upgrade: UpgradeKind,
    /// Exact cost snapshot at creation.
    pub resource_needed: ResourceLedger,
    pub fulfilled_amount: ResourceLedger,
    pub status: UpgradeStatus,
    pub created_at: f64,
    pub expires_at: f64,
}

impl UpgradeRequest {
    pub fn is_active(&self) -> bool {
        self.status != UpgradeStatus::Expired
    }

    pub fn remaining(&self, kind: ResourceKind) -> f64 {
        (self.resource_needed.get(kind) - self.fulfilled_amount.get(kind)).max(0.0)
    }
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameContent {
    pub content_version: String,
    /// Factory upgrades; every `UpgradeKind` appears exactly once.
    pub upgrades: Vec<UpgradeDef>,
    pub hauler_upgrades: Vec<HaulerUpgradeDef>,
    pub constants: Constants,
}

impl GameContent {
    pub fn upgrade(&self, kind: UpgradeKind) -> Option<&UpgradeDef> {
        self.upgrades.iter().find(|def| def.kind == kind)
    }

    pub fn hauler_upgrade(&self, kind: HaulerUpgradeKind) -> Option<&HaulerUpgradeDef> {
        self.hauler_upgrades.iter().find(|def| def.kind == kind)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub kind: UpgradeKind,
    pub label: String,
    pub base_cost: ResourceLedger,
    pub growth: f64,
    /// Capacity added per level; slot-count upgrades round it down.
    pub effect: f64,
    #[serde(default)]
    pub alternative_costs: Vec<CostVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostVariant {
    pub id: String,
    pub base_cost: ResourceLedger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HaulerUpgradeDef {
    pub kind: HaulerUpgradeKind,
    pub label: String,
    pub max_level: u32,
    pub base_cost: ResourceLedger,
    pub growth: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    // Refinery
    pub refine_time_secs: f64,
    pub min_refine_batch: f64,

    // Energy
    pub low_energy_threshold: f64,
    pub min_refine_throttle: f64,
    pub hauler_maintenance_per_sec: f64,
    pub solar_base_regen_per_sec: f64,
    pub solar_regen_per_level: f64,
    pub solar_array_regen_per_level: f64,
    pub solar_array_energy_per_level: f64,

    // Logistics
    pub buffer_seconds: f64,
    pub ore_consumption_per_slot_per_sec: f64,
    pub bars_buffer_target: f64,
    pub secondary_buffer_target: f64,
    pub min_reserve_seconds: f64,
    pub min_reserve_rate_per_sec: f64,
    pub min_transfer_amount: f64,
    pub scheduling_interval_secs: f64,
    pub warehouse_base_capacity: f64,
    pub warehouse_capacity_per_storage_level: f64,
    pub warehouse_capacity_multiplier: f64,
    pub hauler_depot_capacity_per_level: f64,
    pub hauler_depot_speed_per_level: f64,
    pub logistics_hub_overhead_reduction_per_level: f64,
    pub logistics_hub_overhead_floor: f64,
    pub hauler_capacity_boost_per_level: f64,
    pub hauler_speed_boost_per_level: f64,
    pub hauler_efficiency_per_level: f64,
    pub hauler_efficiency_floor: f64,
    pub hauler_base_cost_bars: f64,
    pub hauler_cost_growth: f64,

    // Upgrade requests
    pub upgrade_request_ttl_secs: f64,

    // Factory defaults
    pub factory_docking_capacity: u32,
    pub factory_refine_slots: u32,
    pub factory_idle_energy_per_sec: f64,
    pub factory_energy_per_refine: f64,
    pub factory_storage_capacity: f64,
    pub factory_energy_capacity: f64,
    pub factory_initial_energy: f64,
    pub default_hauler_capacity: f64,
    pub default_hauler_speed: f64,
    pub default_hauler_pickup_overhead: f64,
    pub default_hauler_dropoff_overhead: f64,
    pub default_hauler_priority: u8,
}

impl Constants {
    pub fn min_reserve(&self) -> f64 {
        self.min_reserve_seconds * self.min_reserve_rate_per_sec
    }

    pub fn default_hauler_config(&self) -> HaulerConfig {
        HaulerConfig {
            capacity: self.default_hauler_capacity,
            speed: self.default_hauler_speed,
            pickup_overhead: self.default_hauler_pickup_overhead,
            dropoff_overhead: self.default_hauler_dropoff_overhead,
            resource_filters: SmallVec::new(),
            mode: DispatchMode::Auto,
            priority: self.default_hauler_priority,
        }
    }

    /// A fresh factory with default configuration and empty ledgers.
    pub fn new_factory(&self, id: FactoryId, position: Position) -> FactoryState {
        FactoryState {
            id,
            position,
            docking_capacity: self.factory_docking_capacity,
            queued_drones: Vec::new(),
            refine_slots: self.factory_refine_slots,
            idle_energy_per_sec: self.factory_idle_energy_per_sec,
            energy_per_refine: self.factory_energy_per_refine,
            storage_capacity: self.factory_storage_capacity,
            current_storage: 0.0,
            active_refines: Vec::new(),
            energy: self.factory_initial_energy,
            energy_capacity: self.factory_energy_capacity,
            resources: ResourceLedger::default(),
            upgrades: FactoryUpgrades::default(),
            upgrade_requests: Vec::new(),
            haulers_assigned: 0,
            hauler_config: self.default_hauler_config(),
            hauler_upgrades: HaulerUpgrades::default(),
            logistics: FactoryLogistics::default(),
            next_process_seq: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub id: CommandId,
    pub issued_at: f64,
    pub command: Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    PurchaseUpgrade {
        factory_id: FactoryId,
        upgrade: UpgradeKind,
        /// Selects an `alternative_costs` entry; `None` pays the base cost.
        cost_variant: Option<String>,
    },
    /// Positive deltas buy haulers; negative deltas release them.
    AssignHaulers { factory_id: FactoryId, delta: i32 },
    UpdateHaulerConfig {
        factory_id: FactoryId,
        patch: HaulerConfigPatch,
    },
    PurchaseHaulerUpgrade {
        factory_id: FactoryId,
        upgrade: HaulerUpgradeKind,
    },
}

/// Partial hauler configuration; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HaulerConfigPatch {
    pub capacity: Option<f64>,
    pub speed: Option<f64>,
    pub pickup_overhead: Option<f64>,
    pub dropoff_overhead: Option<f64>,
    pub resource_filters: Option<Vec<ResourceKind>>,
    pub mode: Option<DispatchMode>,
    pub priority: Option<u8>,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub id: EventId,
    pub game_time: f64,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    RefineStarted {
        factory_id: FactoryId,
        process_id: ProcessId,
        amount: f64,
    },
    RefineCompleted {
        factory_id: FactoryId,
        process_id: ProcessId,
        bars: f64,
    },
    RefineThrottled {
        factory_id: FactoryId,
        energy_fraction: f64,
        paused: usize,
    },
    TransferScheduled {
        transfer_id: TransferId,
        from: Endpoint,
        to: Endpoint,
        resource: ResourceKind,
        amount: f64,
        eta: f64,
    },
    TransferCompleted {
        transfer_id: TransferId,
        from: Endpoint,
        to: Endpoint,
        resource: ResourceKind,
        delivered: f64,
    },
    TransferDiscarded {
        transfer_id: TransferId,
        resource: ResourceKind,
        amount: f64,
    },
    UpgradeRequested {
        factory_id: FactoryId,
        upgrade: UpgradeKind,
    },
    UpgradeRequestFulfilled {
        factory_id: FactoryId,
        upgrade: UpgradeKind,
    },
    UpgradeRequestExpired {
        factory_id: FactoryId,
        upgrade: UpgradeKind,
    },
    UpgradePurchased {
        factory_id: FactoryId,
        upgrade: UpgradeKind,
        level: u32,
    },
    HaulerUpgradePurchased {
        factory_id: FactoryId,
        upgrade: HaulerUpgradeKind,
        level: u32,
    },
    HaulersAssigned {
        factory_id: FactoryId,
        haulers: u32,
    },
    HaulerConfigUpdated {
        factory_id: FactoryId,
    },
}
