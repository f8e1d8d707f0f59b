//! `sim_core`: deterministic factory-economy tick.
//!
//! No IO, no randomness. Every pass iterates factories in creation order and
//! resources in `ResourceKind::TRANSPORTABLE` order.

mod commands;
pub mod docking;
pub mod energy;
mod engine;
pub mod fx;
pub mod logistics;
pub mod metrics;
pub mod modifiers;
pub mod parity;
pub mod refinery;
pub mod snapshot;
mod types;
pub mod upgrades;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use commands::{
    apply_command, assign_haulers, purchase_hauler_upgrade, purchase_upgrade,
    update_hauler_config, CommandError,
};
pub use engine::{tick, NativeEngine, SimEngine, TickHooks};
pub use metrics::{compute_metrics, MetricsSnapshot};
pub use refinery::{start_refine_process, tick_refine_process, transfer_ore_to_factory};
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, game_time: f64, event: Event) -> EventEnvelope {
    let id = EventId(format!("evt_{:06}", counters.next_event_id));
    counters.next_event_id += 1;
    EventEnvelope {
        id,
        game_time,
        event,
    }
}

#[cfg(test)]
mod tests;
