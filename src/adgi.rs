//! ADGI consolidation: take entries grouped per material, with a combined
//! status that is Done only when every underlying entry is Done.

use chrono::{DateTime, Utc};

use crate::ledger::{AdgiStatus, HistoryEntry, SortOrder};

#[derive(Debug, Clone, PartialEq)]
pub struct AdgiGroup {
    pub material_id: String,
    pub material_description: String,
    pub total_quantity: u64,
    /// Distinct bins touched, ascending.
    pub bins: Vec<u8>,
    pub first_at: DateTime<Utc>,
    pub last_at: DateTime<Utc>,
    pub status: AdgiStatus,
    pub entry_ids: Vec<String>,
    pub user: String,
}

/// Groups take entries by material, in order of first appearance.
pub fn consolidate(entries: &[HistoryEntry]) -> Vec<AdgiGroup> {
    let mut groups: Vec<AdgiGroup> = Vec::new();
    for entry in entries {
        let adgi = match entry.adgi() {
            Some(a) => a,
            None => continue,
        };
        match groups.iter_mut().find(|g| g.material_id == entry.material_id) {
            Some(group) => {
                group.total_quantity += entry.quantity as u64;
                if !group.bins.contains(&entry.bin) {
                    group.bins.push(entry.bin);
                    group.bins.sort_unstable();
                }
                if entry.timestamp < group.first_at {
                    group.first_at = entry.timestamp;
                }
                if entry.timestamp > group.last_at {
                    group.last_at = entry.timestamp;
                }
                if adgi.status == AdgiStatus::Pending {
                    group.status = AdgiStatus::Pending;
                }
                group.entry_ids.push(entry.id.clone());
            }
            None => groups.push(AdgiGroup {
                material_id: entry.material_id.clone(),
                material_description: entry.material_description.clone(),
                total_quantity: entry.quantity as u64,
                bins: vec![entry.bin],
                first_at: entry.timestamp,
                last_at: entry.timestamp,
                status: adgi.status,
                entry_ids: vec![entry.id.clone()],
                user: entry.user.clone(),
            }),
        }
    }
    groups
}

#[derive(Debug, Clone, Default)]
pub struct GroupFilter {
    /// Case-insensitive substring match on material id, description, or user.
    pub query: String,
    pub status: Option<AdgiStatus>,
    pub sort: SortOrder,
}

pub fn filter_groups(groups: Vec<AdgiGroup>, filter: &GroupFilter) -> Vec<AdgiGroup> {
    let query = filter.query.to_lowercase();
    let mut out: Vec<AdgiGroup> = groups
        .into_iter()
        .filter(|g| {
            let matches_query = query.is_empty()
                || g.material_id.to_lowercase().contains(&query)
                || g.material_description.to_lowercase().contains(&query)
                || g.user.to_lowercase().contains(&query);
            let matches_status = filter.status.map_or(true, |s| g.status == s);
            matches_query && matches_status
        })
        .collect();
    match filter.sort {
        SortOrder::Newest => out.sort_by(|a, b| b.last_at.cmp(&a.last_at)),
        SortOrder::Oldest => out.sort_by(|a, b| a.first_at.cmp(&b.first_at)),
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdgiStats {
    pub total_takes: usize,
    pub pending: usize,
    pub done: usize,
    pub today_takes: usize,
}

pub fn adgi_stats(entries: &[HistoryEntry], now: DateTime<Utc>) -> AdgiStats {
    let today = now.date_naive();
    let takes: Vec<&HistoryEntry> = entries.iter().filter(|e| e.is_take()).collect();
    AdgiStats {
        total_takes: takes.len(),
        pending: takes
            .iter()
            .filter(|e| e.adgi().map(|a| a.status) == Some(AdgiStatus::Pending))
            .count(),
        done: takes
            .iter()
            .filter(|e| e.adgi().map(|a| a.status) == Some(AdgiStatus::Done))
            .count(),
        today_takes: takes.iter().filter(|e| e.timestamp.date_naive() == today).count(),
    }
}
