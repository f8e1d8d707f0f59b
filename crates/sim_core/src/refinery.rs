//! Per-factory ore → bars state machine.

use crate::{FactoryState, ProcessId, RefineProcess, ResourceKind};

/// Stores as much of `amount` ore as fits. Returns the amount stored.
pub fn transfer_ore_to_factory(factory: &mut FactoryState, amount: f64) -> f64 {
    if amount.is_nan() || amount <= 0.0 {
        return 0.0;
    }
    let space = (factory.storage_capacity - factory.resources.ore).max(0.0);
    let stored = amount.min(space);
    factory.resources.ore += stored;
    factory.sync_storage();
    stored
}

/// Starts a batch, debiting its ore up front.
///
/// Returns `None` without touching the factory when every slot is busy,
/// there is no ore, or `amount` is not positive.
pub fn start_refine_process(
    factory: &mut FactoryState,
    ore_type: ResourceKind,
    amount: f64,
    id: ProcessId,
    time_total: f64,
) -> Option<&RefineProcess> {
    if !factory.has_free_slot() || factory.resources.ore <= 0.0 || amount.is_nan() || amount <= 0.0
    {
        return None;
    }
    let batch = amount.min(factory.resources.ore);
    factory.resources.ore -= batch;
    factory.sync_storage();
    factory.active_refines.push(RefineProcess {
        id,
        ore_type,
        amount: batch,
        progress: 0.0,
        time_total,
        energy_required: factory.energy_per_refine,
        speed_multiplier: 1.0,
    });
    factory.active_refines.last()
}

/// Advances one process. Returns its reserved output on completion, else 0.
///
/// A completed process is removed from `active_refines`; the caller applies
/// any yield modifier before crediting bars.
pub fn tick_refine_process(factory: &mut FactoryState, process_id: &ProcessId, dt: f64) -> f64 {
    let Some(index) = factory
        .active_refines
        .iter()
        .position(|process| &process.id == process_id)
    else {
        return 0.0;
    };
    let process = &mut factory.active_refines[index];
    if process.time_total > 0.0 {
        process.progress += dt * process.speed_multiplier / process.time_total;
    } else {
        process.progress = 1.0;
    }
    process.progress = process.progress.clamp(0.0, 1.0);
    if process.progress < 1.0 {
        return 0.0;
    }
    factory.active_refines.remove(index).amount
}

/// Batch size for the next refine: even share of storage across slots,
/// at least `min_batch`, capped at the ore on hand.
pub fn batch_size(
    available_ore: f64,
    effective_storage_capacity: f64,
    refine_slots: u32,
    min_batch: f64,
) -> f64 {
    let per_slot = effective_storage_capacity / f64::from(refine_slots.max(1));
    available_ore.min(min_batch.max(per_slot))
}
