use sim_core::logistics::hauler_cost;
use sim_core::upgrades::{can_afford, upgrade_cost};
use sim_core::{
    Command, CommandEnvelope, CommandId, FactoryState, GameContent, GameState, ResourceKind,
    SimEngine, UpgradeKind,
};
use tracing::debug;

pub trait CommandSource {
    fn generate_commands(
        &mut self,
        state: &GameState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope>;
}

/// Spends each factory's bars automatically, at most one purchase per
/// factory per call:
/// 1. Buy a first hauler so the factory joins the logistics network.
/// 2. Buy the first affordable factory upgrade in priority order.
/// 3. Buy more haulers, up to `max_haulers`.
pub struct AutopilotController {
    pub max_haulers: u32,
    /// Bars left untouched after any purchase.
    pub bars_reserve: f64,
}

impl Default for AutopilotController {
    fn default() -> Self {
        Self {
            max_haulers: 3,
            bars_reserve: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn make_cmd(now: f64, next_id: &mut u64, command: Command) -> CommandEnvelope {
    let cmd_id = CommandId(format!("cmd_{:06}", *next_id));
    *next_id += 1;
    CommandEnvelope {
        id: cmd_id,
        issued_at: now,
        command,
    }
}

impl AutopilotController {
    fn spendable_bars(&self, factory: &FactoryState) -> f64 {
        factory.unreserved(ResourceKind::Bars) - self.bars_reserve
    }

    fn wants_hauler(&self, factory: &FactoryState, content: &GameContent, at_most: u32) -> bool {
        factory.haulers_assigned < at_most
            && self.spendable_bars(factory)
                >= hauler_cost(factory.haulers_assigned, &content.constants)
    }

    /// First upgrade in priority order the factory can pay for now.
    fn affordable_upgrade(&self, factory: &FactoryState, content: &GameContent) -> Option<UpgradeKind> {
        UpgradeKind::PRIORITY.into_iter().find(|&kind| {
            let Some(def) = content.upgrade(kind) else {
                return false;
            };
            let Some(cost) = upgrade_cost(def, factory.upgrade_level(kind), None) else {
                return false;
            };
            can_afford(factory, &cost) && self.spendable_bars(factory) >= cost.bars
        })
    }

    fn choose(&self, factory: &FactoryState, content: &GameContent) -> Option<Command> {
        if self.wants_hauler(factory, content, 1) {
            return Some(Command::AssignHaulers {
                factory_id: factory.id.clone(),
                delta: 1,
            });
        }
        if let Some(upgrade) = self.affordable_upgrade(factory, content) {
            return Some(Command::PurchaseUpgrade {
                factory_id: factory.id.clone(),
                upgrade,
                cost_variant: None,
            });
        }
        if self.wants_hauler(factory, content, self.max_haulers) {
            return Some(Command::AssignHaulers {
                factory_id: factory.id.clone(),
                delta: 1,
            });
        }
        None
    }
}

impl CommandSource for AutopilotController {
    fn generate_commands(
        &mut self,
        state: &GameState,
        content: &GameContent,
        next_command_id: &mut u64,
    ) -> Vec<CommandEnvelope> {
        let now = state.meta.game_time;
        let mut commands = Vec::new();
        for factory in &state.factories {
            if let Some(command) = self.choose(factory, content) {
                debug!(factory = %factory.id, ?command, "autopilot purchase");
                commands.push(make_cmd(now, next_command_id, command));
            }
        }
        commands
    }
}

// ---------------------------------------------------------------------------
// Ore supply
// ---------------------------------------------------------------------------

/// Stands in for the drone fleet: hands a fixed ore rate to the factories,
/// split evenly in factory order. Ore a full factory cannot store is lost.
#[derive(Debug, Clone)]
pub struct SteadyOreSupply {
    pub ore_per_sec: f64,
    /// Total ore actually stored so far.
    pub delivered: f64,
}

impl SteadyOreSupply {
    pub fn new(ore_per_sec: f64) -> Self {
        Self {
            ore_per_sec,
            delivered: 0.0,
        }
    }

    /// Delivers `ore_per_sec * dt` through the engine's ore hand-off and
    /// returns the amount stored.
    pub fn deliver(&mut self, engine: &mut dyn SimEngine, dt: f64) -> f64 {
        let amount = self.ore_per_sec * dt;
        if dt <= 0.0 || amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }
        let ids: Vec<_> = engine
            .state()
            .factories
            .iter()
            .map(|factory| factory.id.clone())
            .collect();
        if ids.is_empty() {
            return 0.0;
        }
        let share = amount / ids.len() as f64;
        let stored: f64 = ids.iter().map(|id| engine.transfer_ore(id, share)).sum();
        self.delivered += stored;
        stored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::test_fixtures::{base_content, base_state};
    use sim_core::NativeEngine;

    fn next_commands(state: &GameState, content: &GameContent) -> Vec<CommandEnvelope> {
        let mut next_id = 1;
        AutopilotController::default().generate_commands(state, content, &mut next_id)
    }

    #[test]
    fn test_autopilot_buys_first_hauler() {
        let content = base_content();
        let mut state = base_state(&content);
        state.factories[0].resources.bars = 12.0;

        let commands = next_commands(&state, &content);

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].id.0, "cmd_000001");
        assert!(matches!(
            &commands[0].command,
            Command::AssignHaulers { factory_id, delta: 1 } if factory_id.0 == "factory-a"
        ));
    }

    #[test]
    fn test_autopilot_prefers_upgrade_once_hauler_owned() {
        let content = base_content();
        let mut state = base_state(&content);
        state.factories[0].haulers_assigned = 1;
        state.factories[0].resources.bars = 20.0;

        let commands = next_commands(&state, &content);

        assert!(matches!(
            &commands[0].command,
            Command::PurchaseUpgrade { upgrade: UpgradeKind::Docking, cost_variant: None, .. }
        ));
    }

    #[test]
    fn test_autopilot_idle_when_broke() {
        let content = base_content();
        let state = base_state(&content);
        assert!(next_commands(&state, &content).is_empty());
    }

    #[test]
    fn test_autopilot_ignores_reserved_bars() {
        let content = base_content();
        let mut state = base_state(&content);
        state.factories[0].resources.bars = 30.0;
        state.factories[0].logistics.outbound_reservations.bars = 25.0;
        assert!(next_commands(&state, &content).is_empty());
    }

    #[test]
    fn test_autopilot_respects_hauler_cap() {
        let content = base_content();
        let mut state = base_state(&content);
        // Every upgrade already purchased far enough to be unaffordable.
        state.factories[0].upgrades.docking = 20;
        state.factories[0].upgrades.refine = 20;
        state.factories[0].upgrades.storage = 20;
        state.factories[0].upgrades.energy = 20;
        state.factories[0].upgrades.solar = 20;
        state.factories[0].resources.bars = 200.0;
        state.factories[0].haulers_assigned = 3;

        assert!(next_commands(&state, &content).is_empty());
    }

    #[test]
    fn test_command_ids_continue_from_counter() {
        let content = base_content();
        let mut state = base_state(&content);
        state.factories[0].resources.bars = 12.0;
        state.factories[1].resources.bars = 12.0;
        let mut next_id = 41;

        let commands =
            AutopilotController::default().generate_commands(&state, &content, &mut next_id);

        let ids: Vec<&str> = commands.iter().map(|c| c.id.0.as_str()).collect();
        assert_eq!(ids, vec!["cmd_000041", "cmd_000042"]);
        assert_eq!(next_id, 43);
    }

    #[test]
    fn test_ore_supply_splits_evenly() {
        let content = base_content();
        let mut engine = NativeEngine::new(base_state(&content), content);
        let mut supply = SteadyOreSupply::new(10.0);

        let stored = supply.deliver(&mut engine, 2.0);

        assert!((stored - 20.0).abs() < 1e-9);
        for factory in &engine.state().factories {
            assert!((factory.resources.ore - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_ore_supply_stops_at_storage_capacity() {
        let content = base_content();
        let mut engine = NativeEngine::new(base_state(&content), content);
        let mut supply = SteadyOreSupply::new(1000.0);

        supply.deliver(&mut engine, 1.0);
        let capacity = engine.state().factories[0].storage_capacity;

        assert!((engine.state().factories[0].resources.ore - capacity).abs() < 1e-9);
        assert!((supply.delivered - 2.0 * capacity).abs() < 1e-9);
        assert!(supply.deliver(&mut engine, 0.0).abs() < f64::EPSILON);
    }
}
