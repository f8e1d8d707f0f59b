//! Multiplicative bonuses supplied by meta-progression.
//!
//! The engine asks a [`ModifierProvider`] once per tick and applies the
//! result to storage, yield, refine speed, energy generation, storage and
//! drain.

use crate::{GameState, ResourceLedger};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceModifiers {
    pub storage_capacity: f64,
    pub refinery_yield: f64,
    pub production_speed: f64,
    pub energy_generation: f64,
    pub energy_storage: f64,
    /// In `[0.5, 1]`; lower drains less.
    pub energy_drain: f64,
}

impl ResourceModifiers {
    pub const NEUTRAL: ResourceModifiers = ResourceModifiers {
        storage_capacity: 1.0,
        refinery_yield: 1.0,
        production_speed: 1.0,
        energy_generation: 1.0,
        energy_storage: 1.0,
        energy_drain: 1.0,
    };
}

impl Default for ResourceModifiers {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

pub trait ModifierProvider {
    fn modifiers(&self, state: &GameState) -> ResourceModifiers;
}

/// No bonuses.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralModifiers;

impl ModifierProvider for NeutralModifiers {
    fn modifiers(&self, _state: &GameState) -> ResourceModifiers {
        ResourceModifiers::NEUTRAL
    }
}

/// Saturating bonus curve for one stockpiled resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BonusCurve {
    pub cap: f64,
    pub scale: f64,
}

impl BonusCurve {
    /// Prestige cores raise the cap and shorten the ramp.
    pub fn with_prestige(self, cores: u32) -> BonusCurve {
        let cores = f64::from(cores);
        BonusCurve {
            cap: self.cap * 1.005_f64.powf(cores),
            scale: self.scale * 0.99_f64.powf(cores),
        }
    }

    /// `cap * (1 - e^(-amount/scale))`, plus a slow linear tail past five scales.
    pub fn bonus(self, amount: f64) -> f64 {
        let amount = amount.clamp(0.0, 1e6);
        let scale = if self.scale > 0.0 { self.scale } else { 1.0 };
        let primary = self.cap * (1.0 - (-amount / scale).exp());
        let overflow = (amount - scale * 5.0).max(0.0);
        let total = primary + overflow / (scale * 10.0) * self.cap;
        if total.is_finite() && total > 0.0 {
            total
        } else {
            0.0
        }
    }
}

/// Bonuses derived from warehouse stock of secondary resources.
///
/// Metals widen storage, crystals raise refinery yield, organics speed up
/// refining and generation, ice enlarges energy storage and cuts drain.
#[derive(Debug, Clone, Copy)]
pub struct WarehouseBonusModifiers {
    pub metals: BonusCurve,
    pub crystals: BonusCurve,
    pub organics: BonusCurve,
    pub ice: BonusCurve,
}

impl Default for WarehouseBonusModifiers {
    fn default() -> Self {
        Self {
            metals: BonusCurve { cap: 0.3, scale: 1000.0 },
            crystals: BonusCurve { cap: 0.25, scale: 5000.0 },
            organics: BonusCurve { cap: 0.4, scale: 8000.0 },
            ice: BonusCurve { cap: 0.35, scale: 6000.0 },
        }
    }
}

const ORGANICS_SPEED_FACTOR: f64 = 1.2;
const ORGANICS_GENERATION_FACTOR: f64 = 0.6;
const ICE_DRAIN_FACTOR: f64 = 0.5;

impl WarehouseBonusModifiers {
    pub fn from_resources(&self, resources: &ResourceLedger, cores: u32) -> ResourceModifiers {
        let metals = self.metals.with_prestige(cores).bonus(resources.metals);
        let crystals = self.crystals.with_prestige(cores).bonus(resources.crystals);
        let organics = self.organics.with_prestige(cores).bonus(resources.organics);
        let ice = self.ice.with_prestige(cores).bonus(resources.ice);
        ResourceModifiers {
            storage_capacity: (1.0 + metals).max(1.0),
            refinery_yield: (1.0 + crystals).max(1.0),
            production_speed: (1.0 + ORGANICS_SPEED_FACTOR * organics).max(1.0),
            energy_generation: (1.0 + ORGANICS_GENERATION_FACTOR * organics).max(1.0),
            energy_storage: (1.0 + ice).max(1.0),
            energy_drain: (1.0 - ICE_DRAIN_FACTOR * ice).clamp(0.5, 1.0),
        }
    }
}

impl ModifierProvider for WarehouseBonusModifiers {
    fn modifiers(&self, state: &GameState) -> ResourceModifiers {
        self.from_resources(&state.warehouse.resources, state.meta.prestige_cores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_warehouse_is_neutral() {
        let modifiers = WarehouseBonusModifiers::default()
            .from_resources(&ResourceLedger::default(), 0);
        assert_eq!(modifiers, ResourceModifiers::NEUTRAL);
    }

    #[test]
    fn bonus_saturates_near_cap() {
        let curve = BonusCurve { cap: 0.3, scale: 1000.0 };
        let at_scale = curve.bonus(1000.0);
        assert!((at_scale - 0.3 * (1.0 - (-1.0_f64).exp())).abs() < 1e-9);
        let far = curve.bonus(5000.0);
        assert!(far < 0.3 && far > 0.29);
    }

    #[test]
    fn ice_reduces_drain_within_bounds() {
        let resources = ResourceLedger {
            ice: 1e6,
            ..ResourceLedger::default()
        };
        let modifiers = WarehouseBonusModifiers::default().from_resources(&resources, 0);
        assert!(modifiers.energy_drain >= 0.5);
        assert!(modifiers.energy_drain < 1.0);
        assert!(modifiers.energy_storage > 1.0);
    }

    #[test]
    fn prestige_raises_cap() {
        let base = BonusCurve { cap: 0.3, scale: 1000.0 };
        let boosted = base.with_prestige(10);
        assert!(boosted.cap > base.cap);
        assert!(boosted.scale < base.scale);
    }
}
