use tracing::trace;

use crate::commands::{apply_command, apply_commands, CommandError};
use crate::energy::{
    apply_upkeep, drain_for_refine, effective_energy_capacity, energy_fraction,
    enforce_min_one_refining, regenerate, solar_regen_per_sec,
};
use crate::fx::{NullFxSink, TransferFxSink};
use crate::logistics::advance_logistics;
use crate::modifiers::{ModifierProvider, NeutralModifiers, ResourceModifiers};
use crate::refinery::{batch_size, start_refine_process, tick_refine_process, transfer_ore_to_factory};
use crate::snapshot::{snapshot_from_state, Snapshot};
use crate::upgrades::advance_upgrade_requests;
use crate::{
    Command, CommandEnvelope, Event, EventEnvelope, EventLevel, FactoryId, GameContent, GameState,
    ProcessId, ResourceKind,
};

/// Upstream collaborators consulted during a tick.
pub struct TickHooks<'a> {
    pub modifiers: &'a dyn ModifierProvider,
    pub fx: &'a mut dyn TransferFxSink,
}

/// Advance the simulation by `dt` seconds.
///
/// Order of operations:
/// 1. Apply commands queued since the last tick.
/// 2. Per factory: solar regen, idle and hauler drains, start batches,
///    low-energy throttling, refine drain and progress.
/// 3. Logistics: due arrivals, then a scheduling pass if the interval elapsed.
/// 4. Upgrade requests: expiry sweep, then shortfall detection.
/// 5. Advance game time.
///
/// Systems observe the game time at the start of the tick. A non-positive
/// `dt` applies the commands and nothing else.
pub fn tick(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    hooks: &mut TickHooks<'_>,
    dt: f64,
    event_level: EventLevel,
) -> Vec<EventEnvelope> {
    let mut events = Vec::new();

    apply_commands(state, commands, content, &mut events);
    if dt.is_nan() || dt <= 0.0 {
        return events;
    }

    let modifiers = hooks.modifiers.modifiers(state);
    advance_factories(state, content, &modifiers, dt, event_level, &mut events);
    advance_logistics(state, content, &modifiers, hooks.fx, dt, &mut events);
    advance_upgrade_requests(state, content, &mut events);

    state.meta.game_time += dt;
    events
}

fn advance_factories(
    state: &mut GameState,
    content: &GameContent,
    modifiers: &ResourceModifiers,
    dt: f64,
    event_level: EventLevel,
    events: &mut Vec<EventEnvelope>,
) {
    let constants = &content.constants;
    let modules = state.warehouse.modules;
    let now = state.meta.game_time;
    let time_total = constants.refine_time_secs / modifiers.production_speed.max(0.01);

    for index in 0..state.factories.len() {
        let mut produced = Vec::new();
        let factory = &mut state.factories[index];
        let capacity = effective_energy_capacity(factory, &modules, constants, modifiers);

        let regen = solar_regen_per_sec(factory, &modules, constants, modifiers);
        regenerate(factory, regen, capacity, dt);
        apply_upkeep(factory, dt, constants, modifiers.energy_drain);

        // Fill free slots evenly from ore not promised to haulers.
        let storage = factory.storage_capacity * modifiers.storage_capacity;
        while factory.has_free_slot() && factory.energy > 0.0 {
            let available = factory.unreserved(ResourceKind::Ore);
            if available <= 0.0 {
                break;
            }
            let amount = batch_size(
                available,
                storage,
                factory.refine_slots,
                constants.min_refine_batch,
            );
            let id = ProcessId(format!("{}-p{}", factory.id, factory.next_process_seq + 1));
            let Some(process) =
                start_refine_process(factory, ResourceKind::Ore, amount, id, time_total)
            else {
                break;
            };
            let (process_id, amount) = (process.id.clone(), process.amount);
            produced.push(Event::RefineStarted {
                factory_id: factory.id.clone(),
                process_id,
                amount,
            });
            factory.next_process_seq += 1;
        }

        if enforce_min_one_refining(factory, factory.energy, capacity, constants) {
            let fraction = energy_fraction(factory.energy, capacity);
            if event_level == EventLevel::Debug && fraction < constants.low_energy_threshold {
                produced.push(Event::RefineThrottled {
                    factory_id: factory.id.clone(),
                    energy_fraction: fraction,
                    paused: factory.active_refines.len() - 1,
                });
            }
        }

        // Last to first so completed processes can be removed in place.
        for slot in (0..factory.active_refines.len()).rev() {
            let process = &factory.active_refines[slot];
            let (process_id, multiplier) = (process.id.clone(), process.speed_multiplier);
            drain_for_refine(factory, multiplier, dt, modifiers.energy_drain);
            let output = tick_refine_process(factory, &process_id, dt);
            if output > 0.0 {
                let bars = output * modifiers.refinery_yield;
                factory.resources.bars += bars;
                trace!(factory = %factory.id, process = %process_id, bars, "refine completed");
                produced.push(Event::RefineCompleted {
                    factory_id: factory.id.clone(),
                    process_id,
                    bars,
                });
            }
        }

        factory.sync_storage();
        factory.energy = factory.energy.clamp(0.0, capacity.max(0.0));

        for event in produced {
            events.push(crate::emit(&mut state.counters, now, event));
        }
    }
}

/// The surface a driver, command source, or parity harness needs from an
/// engine. Handed around explicitly; there is no ambient registry.
pub trait SimEngine {
    /// Applies a command between ticks.
    fn apply_command(&mut self, command: &Command) -> Result<(), CommandError>;

    fn step(&mut self, dt: f64) -> Vec<EventEnvelope>;

    /// Ore hand-off from the mining side. Returns the amount stored.
    fn transfer_ore(&mut self, factory_id: &FactoryId, amount: f64) -> f64;

    fn state(&self) -> &GameState;

    fn snapshot(&self) -> Snapshot {
        snapshot_from_state(self.state())
    }
}

/// The in-process engine: owns state, content, and its collaborators.
pub struct NativeEngine<M = NeutralModifiers, F = NullFxSink> {
    pub state: GameState,
    pub content: GameContent,
    pub modifiers: M,
    pub fx: F,
    pub event_level: EventLevel,
}

impl NativeEngine {
    pub fn new(state: GameState, content: GameContent) -> Self {
        Self::with_hooks(state, content, NeutralModifiers, NullFxSink)
    }
}

impl<M: ModifierProvider, F: TransferFxSink> NativeEngine<M, F> {
    pub fn with_hooks(state: GameState, content: GameContent, modifiers: M, fx: F) -> Self {
        Self {
            state,
            content,
            modifiers,
            fx,
            event_level: EventLevel::Normal,
        }
    }
}

impl<M: ModifierProvider, F: TransferFxSink> SimEngine for NativeEngine<M, F> {
    fn apply_command(&mut self, command: &Command) -> Result<(), CommandError> {
        let mut events = Vec::new();
        apply_command(&mut self.state, command, &self.content, &mut events)
    }

    fn step(&mut self, dt: f64) -> Vec<EventEnvelope> {
        let mut hooks = TickHooks {
            modifiers: &self.modifiers,
            fx: &mut self.fx,
        };
        tick(
            &mut self.state,
            &[],
            &self.content,
            &mut hooks,
            dt,
            self.event_level,
        )
    }

    fn transfer_ore(&mut self, factory_id: &FactoryId, amount: f64) -> f64 {
        self.state
            .factory_mut(factory_id)
            .map_or(0.0, |factory| transfer_ore_to_factory(factory, amount))
    }

    fn state(&self) -> &GameState {
        &self.state
    }
}
