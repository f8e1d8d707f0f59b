//! Per-factory energy balance: solar regen, idle and hauler drains, and
//! low-energy refine throttling.

use crate::modifiers::ResourceModifiers;
use crate::{Constants, FactoryState, ModuleLevels};

pub fn hauler_maintenance_cost(haulers: u32, constants: &Constants) -> f64 {
    f64::from(haulers) * constants.hauler_maintenance_per_sec
}

/// Local capacity plus warehouse solar-array bonus, scaled by the energy
/// storage modifier.
pub fn effective_energy_capacity(
    factory: &FactoryState,
    modules: &ModuleLevels,
    constants: &Constants,
    modifiers: &ResourceModifiers,
) -> f64 {
    let base = factory.energy_capacity
        + f64::from(modules.solar) * constants.solar_array_energy_per_level;
    base * modifiers.energy_storage
}

pub fn solar_regen_per_sec(
    factory: &FactoryState,
    modules: &ModuleLevels,
    constants: &Constants,
    modifiers: &ResourceModifiers,
) -> f64 {
    let rate = constants.solar_base_regen_per_sec
        + f64::from(factory.upgrades.solar) * constants.solar_regen_per_level
        + f64::from(modules.solar) * constants.solar_array_regen_per_level;
    rate * modifiers.energy_generation
}

pub fn regenerate(factory: &mut FactoryState, regen_per_sec: f64, capacity: f64, dt: f64) {
    if regen_per_sec <= 0.0 {
        return;
    }
    factory.energy = (factory.energy + regen_per_sec * dt).min(capacity.max(0.0));
}

/// Idle and hauler maintenance drains. Energy floors at zero; there is no borrowing.
pub fn apply_upkeep(factory: &mut FactoryState, dt: f64, constants: &Constants, drain: f64) {
    let idle = factory.idle_energy_per_sec * dt * drain;
    if idle > 0.0 {
        factory.energy = (factory.energy - idle).max(0.0);
    }
    let haulers = hauler_maintenance_cost(factory.haulers_assigned, constants) * dt * drain;
    if haulers > 0.0 {
        factory.energy = (factory.energy - haulers).max(0.0);
    }
}

/// Guarantees forward progress under scarcity.
///
/// Below the low-energy threshold the first active refine runs at
/// `max(min_throttle, 2 * fraction)` and every other refine is paused.
/// Otherwise every refine runs at full speed. Returns `false` only when
/// there is nothing refining.
pub fn enforce_min_one_refining(
    factory: &mut FactoryState,
    energy_available: f64,
    energy_capacity: f64,
    constants: &Constants,
) -> bool {
    if factory.active_refines.is_empty() {
        return false;
    }
    let fraction = energy_fraction(energy_available, energy_capacity);
    if fraction < constants.low_energy_threshold {
        let throttle = constants.min_refine_throttle.max(fraction * 2.0);
        for (index, process) in factory.active_refines.iter_mut().enumerate() {
            process.speed_multiplier = if index == 0 { throttle.min(1.0) } else { 0.0 };
        }
    } else {
        for process in &mut factory.active_refines {
            process.speed_multiplier = 1.0;
        }
    }
    true
}

pub fn energy_fraction(energy_available: f64, energy_capacity: f64) -> f64 {
    if energy_capacity > 0.0 {
        (energy_available / energy_capacity).max(0.0)
    } else {
        0.0
    }
}

/// Drains the energy one refine needs for `dt` at its current multiplier.
/// Returns the energy actually consumed.
pub fn drain_for_refine(factory: &mut FactoryState, speed_multiplier: f64, dt: f64, drain: f64) -> f64 {
    let wanted = factory.energy_per_refine * dt * speed_multiplier * drain;
    let consumed = wanted.min(factory.energy).max(0.0);
    factory.energy = (factory.energy - consumed).max(0.0);
    consumed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, make_factory};

    #[test]
    fn maintenance_scales_with_haulers() {
        let content = base_content();
        assert!(hauler_maintenance_cost(0, &content.constants).abs() < 1e-12);
        assert!((hauler_maintenance_cost(4, &content.constants) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn upkeep_never_goes_negative() {
        let content = base_content();
        let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
        factory.energy = 1.5;
        factory.haulers_assigned = 3;
        apply_upkeep(&mut factory, 10.0, &content.constants, 1.0);
        assert!(factory.energy.abs() < 1e-12);
    }

    #[test]
    fn regen_caps_at_capacity() {
        let content = base_content();
        let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
        factory.energy = 79.0;
        let rate = solar_regen_per_sec(
            &factory,
            &ModuleLevels::default(),
            &content.constants,
            &ResourceModifiers::NEUTRAL,
        );
        assert!((rate - 1.25).abs() < 1e-12);
        regenerate(&mut factory, rate, 80.0, 10.0);
        assert!((factory.energy - 80.0).abs() < 1e-12);
    }

    #[test]
    fn zero_capacity_counts_as_empty() {
        assert!(energy_fraction(10.0, 0.0).abs() < 1e-12);
    }

    #[test]
    fn enforce_without_refines_returns_false() {
        let content = base_content();
        let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
        assert!(!enforce_min_one_refining(
            &mut factory,
            0.0,
            80.0,
            &content.constants
        ));
    }

    #[test]
    fn refine_drain_is_limited_by_stored_energy() {
        let content = base_content();
        let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
        factory.energy = 1.0;
        let consumed = drain_for_refine(&mut factory, 1.0, 1.0, 1.0);
        assert!((consumed - 1.0).abs() < 1e-12);
        assert!(factory.energy.abs() < 1e-12);
    }
}
