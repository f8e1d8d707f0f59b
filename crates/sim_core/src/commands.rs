use tracing::debug;

use crate::logistics::hauler_cost;
use crate::upgrades::{apply_upgrade, can_afford, pay, scaled_cost, upgrade_cost};
use crate::{
    Command, CommandEnvelope, Constants, Event, EventEnvelope, FactoryId, FactoryState,
    GameContent, GameState, HaulerConfigPatch, HaulerUpgradeKind, ResourceKind, UpgradeKind,
};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("unknown factory: {0}")]
    UnknownFactory(FactoryId),
    #[error("no content definition for upgrade {0}")]
    UnknownUpgrade(String),
    #[error("unknown cost variant '{variant}' for upgrade {upgrade}")]
    UnknownCostVariant { upgrade: String, variant: String },
    #[error("insufficient resources")]
    InsufficientResources,
    #[error("hauler upgrade {0:?} is already at max level")]
    MaxLevel(HaulerUpgradeKind),
    #[error("invalid hauler config: {0}")]
    InvalidHaulerConfig(&'static str),
}

/// Applies queued commands in order. Failed commands change nothing and are
/// only logged.
pub(crate) fn apply_commands(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    events: &mut Vec<EventEnvelope>,
) {
    for envelope in commands {
        if let Err(err) = apply_command(state, &envelope.command, content, events) {
            debug!(command = %envelope.id, %err, "command rejected");
        }
    }
}

pub fn apply_command(
    state: &mut GameState,
    command: &Command,
    content: &GameContent,
    events: &mut Vec<EventEnvelope>,
) -> Result<(), CommandError> {
    let now = state.meta.game_time;
    let event = match command {
        Command::PurchaseUpgrade {
            factory_id,
            upgrade,
            cost_variant,
        } => {
            let factory = factory_mut(state, factory_id)?;
            let level = purchase_upgrade(factory, content, *upgrade, cost_variant.as_deref())?;
            Event::UpgradePurchased {
                factory_id: factory_id.clone(),
                upgrade: *upgrade,
                level,
            }
        }
        Command::AssignHaulers { factory_id, delta } => {
            let factory = factory_mut(state, factory_id)?;
            let haulers = assign_haulers(factory, *delta, &content.constants)?;
            Event::HaulersAssigned {
                factory_id: factory_id.clone(),
                haulers,
            }
        }
        Command::UpdateHaulerConfig { factory_id, patch } => {
            let factory = factory_mut(state, factory_id)?;
            update_hauler_config(factory, patch)?;
            Event::HaulerConfigUpdated {
                factory_id: factory_id.clone(),
            }
        }
        Command::PurchaseHaulerUpgrade {
            factory_id,
            upgrade,
        } => {
            let factory = factory_mut(state, factory_id)?;
            let level = purchase_hauler_upgrade(factory, content, *upgrade)?;
            Event::HaulerUpgradePurchased {
                factory_id: factory_id.clone(),
                upgrade: *upgrade,
                level,
            }
        }
    };
    events.push(crate::emit(&mut state.counters, now, event));
    Ok(())
}

fn factory_mut<'a>(
    state: &'a mut GameState,
    id: &FactoryId,
) -> Result<&'a mut FactoryState, CommandError> {
    state
        .factory_mut(id)
        .ok_or_else(|| CommandError::UnknownFactory(id.clone()))
}

/// Buys the next level of `upgrade` from the factory's unreserved stock.
/// Returns the new level.
pub fn purchase_upgrade(
    factory: &mut FactoryState,
    content: &GameContent,
    upgrade: UpgradeKind,
    cost_variant: Option<&str>,
) -> Result<u32, CommandError> {
    let def = content
        .upgrade(upgrade)
        .ok_or_else(|| CommandError::UnknownUpgrade(upgrade.as_str().to_string()))?;
    let cost = upgrade_cost(def, factory.upgrade_level(upgrade), cost_variant).ok_or_else(|| {
        CommandError::UnknownCostVariant {
            upgrade: upgrade.as_str().to_string(),
            variant: cost_variant.unwrap_or_default().to_string(),
        }
    })?;
    if !can_afford(factory, &cost) {
        return Err(CommandError::InsufficientResources);
    }
    pay(factory, &cost);
    apply_upgrade(factory, def);
    Ok(factory.upgrade_level(upgrade))
}

/// Positive `delta` buys haulers one by one at the escalating price, all or
/// nothing. Negative `delta` releases haulers without refund. Returns the
/// new hauler count.
pub fn assign_haulers(
    factory: &mut FactoryState,
    delta: i32,
    constants: &Constants,
) -> Result<u32, CommandError> {
    let count = delta.unsigned_abs();
    if delta < 0 {
        factory.haulers_assigned = factory.haulers_assigned.saturating_sub(count);
        return Ok(factory.haulers_assigned);
    }
    let total: f64 = (0..count)
        .map(|k| hauler_cost(factory.haulers_assigned + k, constants))
        .sum();
    if factory.unreserved(ResourceKind::Bars) < total {
        return Err(CommandError::InsufficientResources);
    }
    factory.resources.deduct(ResourceKind::Bars, total);
    factory.haulers_assigned += count;
    Ok(factory.haulers_assigned)
}

/// Merges `patch` into the factory's base hauler configuration.
pub fn update_hauler_config(
    factory: &mut FactoryState,
    patch: &HaulerConfigPatch,
) -> Result<(), CommandError> {
    let numeric = [
        patch.capacity,
        patch.speed,
        patch.pickup_overhead,
        patch.dropoff_overhead,
    ];
    if numeric.iter().flatten().any(|value| !value.is_finite()) {
        return Err(CommandError::InvalidHaulerConfig("values must be finite"));
    }
    let config = &mut factory.hauler_config;
    if let Some(capacity) = patch.capacity {
        config.capacity = capacity.floor().max(1.0);
    }
    if let Some(speed) = patch.speed {
        config.speed = speed.max(0.1);
    }
    if let Some(pickup) = patch.pickup_overhead {
        config.pickup_overhead = pickup.max(0.0);
    }
    if let Some(dropoff) = patch.dropoff_overhead {
        config.dropoff_overhead = dropoff.max(0.0);
    }
    if let Some(filters) = &patch.resource_filters {
        config.resource_filters.clear();
        for &kind in filters {
            if !config.resource_filters.contains(&kind) {
                config.resource_filters.push(kind);
            }
        }
    }
    if let Some(mode) = patch.mode {
        config.mode = mode;
    }
    if let Some(priority) = patch.priority {
        config.priority = priority.min(10);
    }
    Ok(())
}

pub fn purchase_hauler_upgrade(
    factory: &mut FactoryState,
    content: &GameContent,
    upgrade: HaulerUpgradeKind,
) -> Result<u32, CommandError> {
    let def = content
        .hauler_upgrade(upgrade)
        .ok_or_else(|| CommandError::UnknownUpgrade(format!("{upgrade:?}")))?;
    let level = factory.hauler_upgrades.level(upgrade);
    if level >= def.max_level {
        return Err(CommandError::MaxLevel(upgrade));
    }
    let cost = scaled_cost(&def.base_cost, def.growth, level);
    if !can_afford(factory, &cost) {
        return Err(CommandError::InsufficientResources);
    }
    pay(factory, &cost);
    *factory.hauler_upgrades.level_mut(upgrade) += 1;
    Ok(level + 1)
}
