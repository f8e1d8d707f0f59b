//! FIFO docking queue. The first `docking_capacity` drones are docked; the
//! rest wait.

use crate::{DroneId, FactoryState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockResult {
    Docking,
    Queued,
    /// The drone was already in the queue; its place is unchanged.
    Exists,
}

pub fn attempt_dock(factory: &mut FactoryState, drone: &DroneId) -> DockResult {
    if factory.queued_drones.contains(drone) {
        return DockResult::Exists;
    }
    factory.queued_drones.push(drone.clone());
    if factory.queued_drones.len() <= factory.docking_capacity as usize {
        DockResult::Docking
    } else {
        DockResult::Queued
    }
}

/// Removes the drone wherever it sits; later drones move up.
pub fn undock(factory: &mut FactoryState, drone: &DroneId) -> bool {
    let before = factory.queued_drones.len();
    factory.queued_drones.retain(|queued| queued != drone);
    factory.queued_drones.len() != before
}

pub fn is_docked(factory: &FactoryState, drone: &DroneId) -> bool {
    factory
        .queued_drones
        .iter()
        .take(factory.docking_capacity as usize)
        .any(|queued| queued == drone)
}

pub fn docked_count(factory: &FactoryState) -> usize {
    factory
        .queued_drones
        .len()
        .min(factory.docking_capacity as usize)
}

pub fn available_docking_slots(factory: &FactoryState) -> usize {
    (factory.docking_capacity as usize).saturating_sub(factory.queued_drones.len())
}
