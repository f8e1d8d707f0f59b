use super::*;
use crate::fx::{NullFxSink, RecordingFxSink};
use crate::modifiers::{ModifierProvider, NeutralModifiers, ResourceModifiers};
use crate::test_fixtures::{base_content, base_state, make_factory};

mod logistics;
mod snapshot;
mod upgrades;

// --- Shared test helpers ------------------------------------------------

fn test_content() -> GameContent {
    base_content()
}

fn test_state(content: &GameContent) -> GameState {
    base_state(content)
}

fn fid(id: &str) -> FactoryId {
    FactoryId(id.to_string())
}

/// One tick with neutral modifiers and no FX.
fn step(state: &mut GameState, content: &GameContent, dt: f64) -> Vec<EventEnvelope> {
    step_with(state, &[], content, dt)
}

fn step_with(
    state: &mut GameState,
    commands: &[CommandEnvelope],
    content: &GameContent,
    dt: f64,
) -> Vec<EventEnvelope> {
    let mut fx = NullFxSink;
    let mut hooks = TickHooks {
        modifiers: &NeutralModifiers,
        fx: &mut fx,
    };
    tick(state, commands, content, &mut hooks, dt, EventLevel::Normal)
}

fn envelope(n: u64, issued_at: f64, command: Command) -> CommandEnvelope {
    CommandEnvelope {
        id: CommandId(format!("cmd_{n:06}")),
        issued_at,
        command,
    }
}

/// Non-negative ledgers, refines within slots, reservations covered by stock.
fn assert_invariants(state: &GameState) {
    for (kind, amount) in state.warehouse.resources.iter() {
        assert!(amount >= 0.0, "warehouse {kind} went negative: {amount}");
    }
    for factory in &state.factories {
        for (kind, amount) in factory.resources.iter() {
            assert!(amount >= 0.0, "{} {kind} went negative: {amount}", factory.id);
            let reserved = factory.logistics.outbound_reservations.get(kind);
            assert!(
                reserved <= amount + 1e-9,
                "{} reserves {reserved} {kind} but holds {amount}",
                factory.id
            );
        }
        assert!(
            factory.active_refines.len() <= factory.refine_slots as usize,
            "{} runs more refines than slots",
            factory.id
        );
        assert!(factory.energy >= 0.0, "{} energy went negative", factory.id);
        assert!(
            (factory.current_storage - factory.resources.ore).abs() < 1e-9,
            "{} current_storage out of sync",
            factory.id
        );
    }
}

fn total(state: &GameState, kind: ResourceKind) -> f64 {
    state.warehouse.resources.get(kind)
        + state
            .factories
            .iter()
            .map(|factory| factory.resources.get(kind))
            .sum::<f64>()
}
