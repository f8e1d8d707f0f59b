//! Snapshot metrics computed from `GameState`.
//!
//! `compute_metrics(&GameState) -> MetricsSnapshot` samples the current state
//! for time-series analysis. No state mutation; the CSV helpers only write to
//! the sink they are handed.

use crate::{energy::energy_fraction, GameState, ResourceKind, ResourceLedger};
use serde::Serialize;
use std::io::Write;

/// Current schema version; bump when fields are added/removed/reordered.
const METRICS_VERSION: u32 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub game_time: f64,
    pub metrics_version: u32,

    // Network-wide totals (factories + warehouse)
    pub total_ore: f64,
    pub total_bars: f64,
    pub total_metals: f64,
    pub total_crystals: f64,
    pub total_organics: f64,
    pub total_ice: f64,

    // Warehouse
    pub warehouse_ore: f64,
    pub warehouse_bars: f64,

    // Refining
    pub factory_count: u32,
    pub refine_active_count: u32,
    pub refine_paused_count: u32,
    pub refine_idle_slots: u32,
    pub factory_storage_used_pct: f64,

    // Logistics
    pub haulers_total: u32,
    pub pending_transfers: u32,
    pub in_flight_amount: f64,
    pub reserved_amount: f64,
    /// Sum of per-factory throughput; factory-to-factory hauls count twice.
    pub throughput_total: f64,
    pub max_factory_throughput: f64,

    // Upgrades
    pub open_upgrade_requests: u32,

    // Energy
    pub avg_energy_fraction: f64,
    pub min_energy_fraction: f64,
}

#[allow(clippy::cast_possible_truncation)]
fn count(n: usize) -> u32 {
    n as u32
}

pub fn compute_metrics(state: &GameState) -> MetricsSnapshot {
    let mut totals = state.warehouse.resources;
    let mut refine_active_count = 0;
    let mut refine_paused_count = 0;
    let mut refine_idle_slots = 0;
    let mut haulers_total = 0;
    let mut open_upgrade_requests = 0;
    let mut reserved_amount = 0.0;
    let mut throughput_total = 0.0;
    let mut max_factory_throughput: f64 = 0.0;
    let mut stored_ore = 0.0;
    let mut storage_capacity = 0.0;
    let mut energy_sum = 0.0;
    let mut min_energy_fraction = f64::INFINITY;

    for factory in &state.factories {
        add_ledger(&mut totals, &factory.resources);
        let paused = factory
            .active_refines
            .iter()
            .filter(|process| process.speed_multiplier <= 0.0)
            .count();
        refine_paused_count += count(paused);
        refine_active_count += count(factory.active_refines.len() - paused);
        refine_idle_slots += factory
            .refine_slots
            .saturating_sub(count(factory.active_refines.len()));
        haulers_total += factory.haulers_assigned;
        open_upgrade_requests += count(factory.upgrade_requests.len());
        reserved_amount += factory
            .logistics
            .outbound_reservations
            .iter()
            .map(|(_, amount)| amount)
            .sum::<f64>();
        throughput_total += factory.logistics.throughput;
        max_factory_throughput = max_factory_throughput.max(factory.logistics.throughput);
        stored_ore += factory.resources.ore;
        storage_capacity += factory.storage_capacity;

        let fraction = energy_fraction(factory.energy, factory.energy_capacity);
        energy_sum += fraction;
        min_energy_fraction = min_energy_fraction.min(fraction);
    }

    let factory_count = count(state.factories.len());
    let (avg_energy_fraction, min_energy_fraction) = if factory_count == 0 {
        (0.0, 0.0)
    } else {
        (energy_sum / f64::from(factory_count), min_energy_fraction)
    };
    let factory_storage_used_pct = if storage_capacity > 0.0 {
        stored_ore / storage_capacity
    } else {
        0.0
    };

    MetricsSnapshot {
        game_time: state.meta.game_time,
        metrics_version: METRICS_VERSION,
        total_ore: totals.ore,
        total_bars: totals.bars,
        total_metals: totals.metals,
        total_crystals: totals.crystals,
        total_organics: totals.organics,
        total_ice: totals.ice,
        warehouse_ore: state.warehouse.resources.ore,
        warehouse_bars: state.warehouse.resources.bars,
        factory_count,
        refine_active_count,
        refine_paused_count,
        refine_idle_slots,
        factory_storage_used_pct,
        haulers_total,
        pending_transfers: count(state.logistics.pending_transfers.len()),
        in_flight_amount: state
            .logistics
            .pending_transfers
            .iter()
            .map(|transfer| transfer.amount)
            .sum(),
        reserved_amount,
        throughput_total,
        max_factory_throughput,
        open_upgrade_requests,
        avg_energy_fraction,
        min_energy_fraction,
    }
}

fn add_ledger(total: &mut ResourceLedger, other: &ResourceLedger) {
    for kind in ResourceKind::ALL {
        total.add(kind, other.get(kind));
    }
}

// ---------------------------------------------------------------------------
// CSV output
// ---------------------------------------------------------------------------

/// Write the CSV header row.
pub fn write_metrics_header(writer: &mut impl std::io::Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "game_time,metrics_version,\
         total_ore,total_bars,total_metals,total_crystals,total_organics,total_ice,\
         warehouse_ore,warehouse_bars,\
         factory_count,refine_active_count,refine_paused_count,refine_idle_slots,factory_storage_used_pct,\
         haulers_total,pending_transfers,in_flight_amount,reserved_amount,\
         throughput_total,max_factory_throughput,\
         open_upgrade_requests,\
         avg_energy_fraction,min_energy_fraction"
    )
}

/// Append a single metrics snapshot as a CSV row.
pub fn append_metrics_row(
    writer: &mut impl std::io::Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
        snapshot.game_time,
        snapshot.metrics_version,
        snapshot.total_ore,
        snapshot.total_bars,
        snapshot.total_metals,
        snapshot.total_crystals,
        snapshot.total_organics,
        snapshot.total_ice,
        snapshot.warehouse_ore,
        snapshot.warehouse_bars,
        snapshot.factory_count,
        snapshot.refine_active_count,
        snapshot.refine_paused_count,
        snapshot.refine_idle_slots,
        snapshot.factory_storage_used_pct,
        snapshot.haulers_total,
        snapshot.pending_transfers,
        snapshot.in_flight_amount,
        snapshot.reserved_amount,
        snapshot.throughput_total,
        snapshot.max_factory_throughput,
        snapshot.open_upgrade_requests,
        snapshot.avg_energy_fraction,
        snapshot.min_energy_fraction,
    )
}

/// Maximum data rows per CSV file before rotating to a new file.
const MAX_ROWS_PER_FILE: usize = 50_000;

/// Rotating metrics CSV writer. Automatically splits into numbered files
/// (`metrics_000.csv`, `metrics_001.csv`, ...) after [`MAX_ROWS_PER_FILE`] rows each.
pub struct MetricsFileWriter {
    run_dir: std::path::PathBuf,
    file_index: u32,
    rows_in_current_file: usize,
    writer: std::io::BufWriter<std::fs::File>,
}

impl MetricsFileWriter {
    /// Create a new writer, opening the first CSV file with a header row.
    pub fn new(run_dir: std::path::PathBuf) -> std::io::Result<Self> {
        let writer = open_csv_file(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            file_index: 0,
            rows_in_current_file: 0,
            writer,
        })
    }

    /// Append one snapshot row, rotating to a new file if the current one is full.
    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows_in_current_file >= MAX_ROWS_PER_FILE {
            self.writer.flush()?;
            self.file_index += 1;
            self.writer = open_csv_file(&self.run_dir, self.file_index)?;
            self.rows_in_current_file = 0;
        }
        append_metrics_row(&mut self.writer, snapshot)?;
        self.rows_in_current_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn open_csv_file(
    run_dir: &std::path::Path,
    index: u32,
) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    let path = run_dir.join(format!("metrics_{index:03}.csv"));
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_metrics_header(&mut writer)?;
    Ok(writer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{base_content, base_state};
    use crate::{Endpoint, PendingTransfer, ProcessId, RefineProcess, TransferId};

    #[test]
    fn empty_network_reports_zeros() {
        let content = base_content();
        let mut state = base_state(&content);
        state.factories.clear();
        state.warehouse.resources = ResourceLedger::default();
        let snapshot = compute_metrics(&state);

        assert_eq!(snapshot.metrics_version, METRICS_VERSION);
        assert_eq!(snapshot.factory_count, 0);
        assert!(snapshot.total_ore.abs() < 1e-12);
        assert!(snapshot.avg_energy_fraction.abs() < 1e-12);
        assert!(snapshot.min_energy_fraction.abs() < 1e-12);
        assert!(snapshot.factory_storage_used_pct.abs() < 1e-12);
    }

    #[test]
    fn totals_include_warehouse_and_factories() {
        let content = base_content();
        let mut state = base_state(&content);
        state.warehouse.resources.bars = 7.0;
        state.factories[0].resources.bars = 3.0;
        let snapshot = compute_metrics(&state);
        assert!((snapshot.total_bars - 10.0).abs() < 1e-9);
        assert!((snapshot.warehouse_bars - 7.0).abs() < 1e-9);
    }

    #[test]
    fn paused_refines_are_counted_separately() {
        let content = base_content();
        let mut state = base_state(&content);
        let factory = &mut state.factories[0];
        for (n, multiplier) in [(1, 0.3), (2, 0.0)] {
            factory.active_refines.push(RefineProcess {
                id: ProcessId(format!("factory-a-p{n}")),
                ore_type: ResourceKind::Ore,
                amount: 10.0,
                progress: 0.0,
                time_total: 10.0,
                energy_required: 2.0,
                speed_multiplier: multiplier,
            });
        }
        let snapshot = compute_metrics(&state);
        assert_eq!(snapshot.refine_active_count, 1);
        assert_eq!(snapshot.refine_paused_count, 1);
    }

    #[test]
    fn in_flight_sums_pending_amounts() {
        let content = base_content();
        let mut state = base_state(&content);
        for (n, amount) in [(1, 12.0), (2, 8.5)] {
            state.logistics.pending_transfers.push(PendingTransfer {
                id: TransferId(format!("transfer-{n:06}")),
                from: Endpoint::Warehouse,
                to: state.factories[0].endpoint(),
                resource: ResourceKind::Ore,
                amount,
                eta: 5.0,
                for_upgrade: None,
            });
        }
        let snapshot = compute_metrics(&state);
        assert_eq!(snapshot.pending_transfers, 2);
        assert!((snapshot.in_flight_amount - 20.5).abs() < 1e-9);
    }

    #[test]
    fn throughput_reports_total_and_busiest_factory() {
        let content = base_content();
        let mut state = base_state(&content);
        state.factories[0].logistics.throughput = 30.0;
        state.factories[1].logistics.throughput = 12.5;
        let snapshot = compute_metrics(&state);
        assert!((snapshot.throughput_total - 42.5).abs() < 1e-9);
        assert!((snapshot.max_factory_throughput - 30.0).abs() < 1e-9);
    }

    #[test]
    fn csv_row_matches_header_width() {
        let content = base_content();
        let snapshot = compute_metrics(&base_state(&content));
        let mut header = Vec::new();
        write_metrics_header(&mut header).unwrap();
        let mut row = Vec::new();
        append_metrics_row(&mut row, &snapshot).unwrap();

        let header = String::from_utf8(header).unwrap();
        let row = String::from_utf8(row).unwrap();
        assert_eq!(header.split(',').count(), row.split(',').count());
    }
}
