//! Derived dashboard views. Pure functions over the material store and the
//! ledger; nothing here mutates or caches.

use chrono::{DateTime, Utc};

use crate::catalog::{percentage, Material, BIN_COUNT};
use crate::ledger::{ActionKind, HistoryEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialStats {
    pub total_materials: usize,
    /// Materials with at least one unit in any bin.
    pub available_materials: usize,
    pub empty_materials: usize,
    pub total_stock: u64,
    pub total_capacity: u64,
    /// Rounded percentage; 0 when capacity is 0.
    pub utilization: u32,
}

pub fn material_stats(materials: &[Material]) -> MaterialStats {
    let total_materials = materials.len();
    let available_materials = materials.iter().filter(|m| m.is_available()).count();
    let total_stock: u64 = materials.iter().map(|m| m.total_stock()).sum();
    let total_capacity: u64 = materials.iter().map(|m| m.total_capacity()).sum();
    let utilization = percentage(total_stock, total_capacity);
    MaterialStats {
        total_materials,
        available_materials,
        empty_materials: total_materials - available_materials,
        total_stock,
        total_capacity,
        utilization,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinStats {
    pub bin: u8,
    pub stock: u64,
    pub capacity: u64,
    pub utilization: u32,
    /// Materials with nonzero stock in this bin.
    pub active_materials: usize,
}

pub fn bin_stats(materials: &[Material]) -> Vec<BinStats> {
    (1..=BIN_COUNT as u8)
        .map(|bin| {
            let slot = bin as usize - 1;
            let stock: u64 = materials.iter().map(|m| m.bins[slot] as u64).sum();
            let capacity: u64 = materials.iter().map(|m| m.qty_per_bin as u64).sum();
            let utilization = percentage(stock, capacity);
            BinStats {
                bin,
                stock,
                capacity,
                utilization,
                active_materials: materials.iter().filter(|m| m.bins[slot] > 0).count(),
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryStats {
    pub total_taken: u64,
    pub total_filled: u64,
    pub today_taken: u64,
    pub today_filled: u64,
    pub today_entries: usize,
    /// `today_filled - today_taken`, signed.
    pub net_change: i64,
}

/// `now` decides which calendar day counts as "today" (Utc date).
pub fn history_stats(entries: &[HistoryEntry], now: DateTime<Utc>) -> HistoryStats {
    let sum_by = |kind: ActionKind, pred: &dyn Fn(&HistoryEntry) -> bool| -> u64 {
        entries
            .iter()
            .filter(|e| e.action.kind() == kind && pred(e))
            .map(|e| e.quantity as u64)
            .sum()
    };
    let today = now.date_naive();
    let is_today = |e: &HistoryEntry| e.timestamp.date_naive() == today;
    let any = |_: &HistoryEntry| true;

    let today_taken = sum_by(ActionKind::Take, &is_today);
    let today_filled = sum_by(ActionKind::Fill, &is_today);
    HistoryStats {
        total_taken: sum_by(ActionKind::Take, &any),
        total_filled: sum_by(ActionKind::Fill, &any),
        today_taken,
        today_filled,
        today_entries: entries.iter().filter(|e| is_today(e)).count(),
        net_change: today_filled as i64 - today_taken as i64,
    }
}

/// Materials holding strictly less than 20% of their total capacity.
pub fn critical_materials(materials: &[Material]) -> Vec<&Material> {
    materials
        .iter()
        .filter(|m| (m.total_stock() as f64) < m.total_capacity() as f64 * 0.2)
        .collect()
}

/// Materials ranked by ledger entry count, descending, top 5. Materials with
/// no activity are excluded.
pub fn most_active<'a>(
    materials: &'a [Material],
    entries: &[HistoryEntry],
) -> Vec<(&'a Material, usize)> {
    let mut ranked: Vec<(&Material, usize)> = materials
        .iter()
        .map(|m| (m, entries.iter().filter(|e| e.material_id == m.id).count()))
        .filter(|(_, count)| *count > 0)
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(5);
    ranked
}
