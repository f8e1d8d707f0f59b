//! Cross-engine parity: compare two states field by field and run two
//! engines in lockstep until they diverge.

use std::cmp::Ordering;

use crate::snapshot::{normalize, Snapshot};
use crate::{FactoryState, GameContent, GameState, PendingTransfer, ResourceLedger, SimEngine};

/// Per-frame tolerance on resource amounts.
pub const DEFAULT_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct Divergence {
    pub path: String,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParityReport {
    pub divergences: Vec<Divergence>,
}

impl ParityReport {
    pub fn is_clean(&self) -> bool {
        self.divergences.is_empty()
    }

    fn push(&mut self, path: String, left: impl ToString, right: impl ToString) {
        self.divergences.push(Divergence {
            path,
            left: left.to_string(),
            right: right.to_string(),
        });
    }

    fn number(&mut self, path: impl FnOnce() -> String, left: f64, right: f64, tolerance: f64) {
        if !within(left, right, tolerance) {
            self.push(path(), left, right);
        }
    }

    fn exact<T: PartialEq + std::fmt::Debug>(&mut self, path: impl FnOnce() -> String, left: T, right: T) {
        if left != right {
            self.push(path(), format!("{left:?}"), format!("{right:?}"));
        }
    }
}

impl std::fmt::Display for ParityReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_clean() {
            return f.write_str("no divergence");
        }
        for (index, divergence) in self.divergences.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{}: {} != {}",
                divergence.path, divergence.left, divergence.right
            )?;
        }
        Ok(())
    }
}

/// Absolute tolerance for small magnitudes, relative above 1.
fn within(left: f64, right: f64, tolerance: f64) -> bool {
    if left.is_nan() || right.is_nan() {
        return left.is_nan() && right.is_nan();
    }
    let scale = left.abs().max(right.abs()).max(1.0);
    (left - right).abs() <= tolerance * scale
}

/// Normalizes both snapshots with `content` and compares the results.
pub fn compare_snapshots(
    left: &Snapshot,
    right: &Snapshot,
    content: &GameContent,
    tolerance: f64,
) -> ParityReport {
    let left = normalize(left, content).state;
    let right = normalize(right, content).state;
    compare_states(&left, &right, tolerance)
}

/// Lists every observable difference: warehouse stock and modules, each
/// factory's ledger, energy, refines and reservations, and the pending
/// transfer multiset. Module and upgrade levels must match exactly.
pub fn compare_states(left: &GameState, right: &GameState, tolerance: f64) -> ParityReport {
    let mut report = ParityReport::default();
    report.number(
        || "gameTime".to_string(),
        left.meta.game_time,
        right.meta.game_time,
        tolerance,
    );
    compare_ledgers(
        &mut report,
        "resources",
        &left.warehouse.resources,
        &right.warehouse.resources,
        tolerance,
    );
    report.exact(
        || "modules".to_string(),
        left.warehouse.modules,
        right.warehouse.modules,
    );

    report.exact(
        || "factories.len".to_string(),
        left.factories.len(),
        right.factories.len(),
    );
    for (l, r) in left.factories.iter().zip(&right.factories) {
        compare_factories(&mut report, l, r, tolerance);
    }

    compare_pending(
        &mut report,
        &left.logistics.pending_transfers,
        &right.logistics.pending_transfers,
        tolerance,
    );
    report
}

fn compare_ledgers(
    report: &mut ParityReport,
    path: &str,
    left: &ResourceLedger,
    right: &ResourceLedger,
    tolerance: f64,
) {
    for ((kind, l), (_, r)) in left.iter().zip(right.iter()) {
        report.number(|| format!("{path}.{kind}"), l, r, tolerance);
    }
}

fn compare_factories(
    report: &mut ParityReport,
    left: &FactoryState,
    right: &FactoryState,
    tolerance: f64,
) {
    let path = format!("factories[{}]", left.id);
    report.exact(|| format!("{path}.id"), &left.id, &right.id);
    compare_ledgers(
        report,
        &format!("{path}.resources"),
        &left.resources,
        &right.resources,
        tolerance,
    );
    compare_ledgers(
        report,
        &format!("{path}.outboundReservations"),
        &left.logistics.outbound_reservations,
        &right.logistics.outbound_reservations,
        tolerance,
    );
    report.number(|| format!("{path}.energy"), left.energy, right.energy, tolerance);
    report.number(
        || format!("{path}.throughput"),
        left.logistics.throughput,
        right.logistics.throughput,
        tolerance,
    );
    report.exact(|| format!("{path}.upgrades"), left.upgrades, right.upgrades);
    report.exact(
        || format!("{path}.haulersAssigned"),
        left.haulers_assigned,
        right.haulers_assigned,
    );
    report.exact(
        || format!("{path}.activeRefines.len"),
        left.active_refines.len(),
        right.active_refines.len(),
    );
    for (index, (l, r)) in left.active_refines.iter().zip(&right.active_refines).enumerate() {
        report.number(
            || format!("{path}.activeRefines[{index}].amount"),
            l.amount,
            r.amount,
            tolerance,
        );
        report.number(
            || format!("{path}.activeRefines[{index}].progress"),
            l.progress,
            r.progress,
            tolerance,
        );
        report.number(
            || format!("{path}.activeRefines[{index}].speedMultiplier"),
            l.speed_multiplier,
            r.speed_multiplier,
            tolerance,
        );
    }
}

/// Order-insensitive: transfer ids are engine-local, so transfers are
/// matched after sorting by route, resource and eta.
fn compare_pending(
    report: &mut ParityReport,
    left: &[PendingTransfer],
    right: &[PendingTransfer],
    tolerance: f64,
) {
    report.exact(
        || "pendingTransfers.len".to_string(),
        left.len(),
        right.len(),
    );
    let mut left: Vec<&PendingTransfer> = left.iter().collect();
    let mut right: Vec<&PendingTransfer> = right.iter().collect();
    left.sort_by(|a, b| transfer_order(a, b));
    right.sort_by(|a, b| transfer_order(a, b));
    for (index, (l, r)) in left.iter().zip(&right).enumerate() {
        let path = format!("pendingTransfers[{index}]");
        report.exact(
            || format!("{path}.route"),
            (&l.from, &l.to, l.resource),
            (&r.from, &r.to, r.resource),
        );
        report.number(|| format!("{path}.amount"), l.amount, r.amount, tolerance);
        report.number(|| format!("{path}.eta"), l.eta, r.eta, tolerance);
    }
}

fn transfer_order(a: &PendingTransfer, b: &PendingTransfer) -> Ordering {
    a.from
        .to_string()
        .cmp(&b.from.to_string())
        .then_with(|| a.to.to_string().cmp(&b.to.to_string()))
        .then_with(|| a.resource.cmp(&b.resource))
        .then_with(|| a.eta.total_cmp(&b.eta))
}

#[derive(Debug, Clone)]
pub struct LockstepDivergence {
    /// 1-based step after which the engines disagreed.
    pub step: u64,
    pub report: ParityReport,
}

/// Steps both engines `steps` times with the same `dt`, comparing after
/// every step. Returns the first divergence, if any.
pub fn run_lockstep(
    left: &mut dyn SimEngine,
    right: &mut dyn SimEngine,
    dt: f64,
    steps: u64,
    tolerance: f64,
) -> Option<LockstepDivergence> {
    let initial = compare_states(left.state(), right.state(), tolerance);
    if !initial.is_clean() {
        return Some(LockstepDivergence {
            step: 0,
            report: initial,
        });
    }
    for step in 1..=steps {
        left.step(dt);
        right.step(dt);
        let report = compare_states(left.state(), right.state(), tolerance);
        if !report.is_clean() {
            tracing::debug!(step, divergences = report.divergences.len(), "engines diverged");
            return Some(LockstepDivergence { step, report });
        }
    }
    None
}
