use chrono::Utc;
use thiserror::Error;

use crate::catalog::{Material, BIN_COUNT};
use crate::ledger::{
    new_entry_id, Action, ActionKind, AdgiState, AdgiStatus, HistoryEntry, Ledger,
};

#[derive(Clone)]
pub struct Config {
    pub sqlite_path: String,
    pub workbook_path: String,
    pub auto_sync: bool,
    pub operator: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            sqlite_path: std::env::var("SQLITE_PATH")
                .unwrap_or_else(|_| "./binstock.sqlite".to_string()),
            workbook_path: std::env::var("WORKBOOK_PATH")
                .unwrap_or_else(|_| "./binstock_workbook.json".to_string()),
            auto_sync: std::env::var("AUTO_SYNC")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(true),
            operator: std::env::var("OPERATOR").unwrap_or_else(|_| "operator".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("material {0} not found")]
    MaterialNotFound(String),
    #[error("bin {0} is outside 1-{BIN_COUNT}")]
    InvalidBin(u8),
    #[error("quantity must be a positive integer")]
    InvalidQuantity,
    #[error("insufficient stock: only {available} available in bin")]
    InsufficientStock { available: u32 },
    #[error("bin capacity exceeded: {current} in bin, capacity {capacity}")]
    CapacityExceeded { current: u32, capacity: u32 },
    #[error("workbook import failed: {0}")]
    ImportParse(String),
}

/// Owns the material store and the history ledger. Every mutation goes
/// through here; rejected operations leave both untouched.
pub struct Inventory {
    materials: Vec<Material>,
    ledger: Ledger,
}

impl Inventory {
    pub fn new(materials: Vec<Material>) -> Self {
        Self { materials, ledger: Ledger::new() }
    }

    pub fn from_parts(materials: Vec<Material>, ledger: Ledger) -> Self {
        Self { materials, ledger }
    }

    pub fn materials(&self) -> &[Material] {
        &self.materials
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn material(&self, id: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == id)
    }

    /// Shared prechecks: returns the material index and the current quantity
    /// in the requested bin.
    fn validate(&self, material_id: &str, bin: u8, quantity: u32) -> Result<(usize, u32), OpError> {
        let idx = self
            .materials
            .iter()
            .position(|m| m.id == material_id)
            .ok_or_else(|| OpError::MaterialNotFound(material_id.to_string()))?;
        if !(1..=BIN_COUNT as u8).contains(&bin) {
            return Err(OpError::InvalidBin(bin));
        }
        if quantity == 0 {
            return Err(OpError::InvalidQuantity);
        }
        let current = self.materials[idx].bins[bin as usize - 1];
        Ok((idx, current))
    }

    /// Withdraw `quantity` from a bin. On success the mutation and the ledger
    /// append happen together; the new take entry starts ADGI-pending.
    pub fn take(
        &mut self,
        material_id: &str,
        bin: u8,
        quantity: u32,
        user: &str,
    ) -> Result<HistoryEntry, OpError> {
        let (idx, current) = self.validate(material_id, bin, quantity)?;
        if quantity > current {
            return Err(OpError::InsufficientStock { available: current });
        }
        let material = &mut self.materials[idx];
        // Validation makes underflow unreachable; keep the saturating floor
        // anyway so the bin can never leave [0, qty_per_bin].
        material.bins[bin as usize - 1] = current.saturating_sub(quantity);

        let now = Utc::now();
        let entry = HistoryEntry {
            id: new_entry_id(ActionKind::Take, now),
            material_id: material.id.clone(),
            material_description: material.description.clone(),
            action: Action::Take { adgi: AdgiState::pending(now) },
            bin,
            quantity,
            timestamp: now,
            user: user.to_string(),
        };
        self.ledger.append(entry.clone());
        Ok(entry)
    }

    /// Replenish `quantity` into a bin, bounded by per-bin capacity.
    pub fn fill(
        &mut self,
        material_id: &str,
        bin: u8,
        quantity: u32,
        user: &str,
    ) -> Result<HistoryEntry, OpError> {
        let (idx, current) = self.validate(material_id, bin, quantity)?;
        let capacity = self.materials[idx].qty_per_bin;
        // Headroom check: `current + quantity` can overflow u32.
        if quantity > capacity.saturating_sub(current) {
            return Err(OpError::CapacityExceeded { current, capacity });
        }
        let material = &mut self.materials[idx];
        material.bins[bin as usize - 1] = current + quantity;

        let now = Utc::now();
        let entry = HistoryEntry {
            id: new_entry_id(ActionKind::Fill, now),
            material_id: material.id.clone(),
            material_description: material.description.clone(),
            action: Action::Fill,
            bin,
            quantity,
            timestamp: now,
            user: user.to_string(),
        };
        self.ledger.append(entry.clone());
        Ok(entry)
    }

    /// Bulk ADGI update: stamps the status on every take entry of the
    /// material. Idempotent; returns how many entries were touched.
    pub fn set_adgi_status(&mut self, material_id: &str, status: AdgiStatus, user: &str) -> usize {
        let now = Utc::now();
        let mut touched = 0;
        for entry in self.ledger.entries_mut() {
            if entry.material_id != material_id {
                continue;
            }
            if let Action::Take { adgi } = &mut entry.action {
                adgi.status = status;
                adgi.updated_at = now;
                adgi.updated_by = user.to_string();
                touched += 1;
            }
        }
        touched
    }

    /// Wholesale replacement of the material store (import path). The ledger
    /// is left untouched.
    pub fn replace_materials(&mut self, materials: Vec<Material>) {
        self.materials = materials;
    }
}
