//! Outbound reservation discipline.
//!
//! A reservation is booked before a transfer is queued and released exactly
//! once when it arrives or is discarded.

use tracing::trace;

use crate::{FactoryState, ResourceKind};

/// Whether `factory` can promise `amount` more of `resource` without dipping
/// below `min_reserve` or double-booking stock already reserved.
pub fn validate_transfer(
    factory: &FactoryState,
    resource: ResourceKind,
    amount: f64,
    min_reserve: f64,
) -> bool {
    if amount.is_nan() || amount <= 0.0 {
        return false;
    }
    let current = factory.resources.get(resource);
    let reserved = factory.logistics.outbound_reservations.get(resource);
    let available = (current - reserved).max(0.0);
    if available < amount {
        trace!(factory = %factory.id, %resource, available, amount, "validate transfer: insufficient");
        return false;
    }
    if current - amount - reserved < min_reserve {
        trace!(factory = %factory.id, %resource, current, amount, reserved, min_reserve, "validate transfer: below reserve");
        return false;
    }
    true
}

/// Books the reservation if [`validate_transfer`] passes.
pub fn reserve_outbound(
    factory: &mut FactoryState,
    resource: ResourceKind,
    amount: f64,
    min_reserve: f64,
) -> bool {
    if !validate_transfer(factory, resource, amount, min_reserve) {
        return false;
    }
    factory.logistics.outbound_reservations.add(resource, amount);
    trace!(
        factory = %factory.id,
        %resource,
        reserved = factory.logistics.outbound_reservations.get(resource),
        "reserve outbound"
    );
    true
}

/// Floors at zero.
pub fn release_reservation(factory: &mut FactoryState, resource: ResourceKind, amount: f64) {
    factory.logistics.outbound_reservations.deduct(resource, amount);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, make_factory};

    #[test]
    fn reservation_blocks_double_booking() {
        let content = base_content();
        let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
        factory.resources.bars = 100.0;

        assert!(reserve_outbound(&mut factory, ResourceKind::Bars, 50.0, 25.0));
        // 100 - 50 reserved leaves 50; another 50 would breach the reserve.
        assert!(!reserve_outbound(&mut factory, ResourceKind::Bars, 50.0, 25.0));
        assert!(reserve_outbound(&mut factory, ResourceKind::Bars, 25.0, 25.0));
        assert!((factory.logistics.outbound_reservations.bars - 75.0).abs() < 1e-9);
    }

    #[test]
    fn failed_reservation_leaves_state_untouched() {
        let content = base_content();
        let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
        factory.resources.metals = 10.0;
        let before = factory.clone();
        assert!(!reserve_outbound(&mut factory, ResourceKind::Metals, 20.0, 0.0));
        assert!(!reserve_outbound(&mut factory, ResourceKind::Metals, 0.0, 0.0));
        assert_eq!(factory, before);
    }

    #[test]
    fn release_floors_at_zero() {
        let content = base_content();
        let mut factory = make_factory(&content, "factory-a", [0.0; 3]);
        factory.logistics.outbound_reservations.ore = 5.0;
        release_reservation(&mut factory, ResourceKind::Ore, 8.0);
        assert!(factory.logistics.outbound_reservations.ore.abs() < 1e-12);
    }
}
