//! Two-sheet workbook artifact: a materials sheet and a history sheet, each a
//! list of string-keyed rows, serialized as JSON. The core never looks inside
//! the artifact; it only exports snapshots and imports material rows back.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::catalog::{Material, BIN_COUNT};
use crate::inventory::OpError;
use crate::ledger::HistoryEntry;

use super::ExportAdapter;

pub const MATERIALS_SHEET: &str = "Material Stock";
pub const HISTORY_SHEET: &str = "History";
pub const TEMPLATE_SHEET: &str = "Material Template";

const BIN_COLUMNS: [&str; BIN_COUNT] = ["BIN 1", "BIN 2", "BIN 3", "BIN 4"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Fuzzy lookup for the materials sheet: any sheet whose name contains
    /// "material", "stock", or "template", case-insensitive.
    pub fn find_materials_sheet(&self) -> Option<&Sheet> {
        self.sheets.iter().find(|s| {
            let name = s.name.to_lowercase();
            name.contains("material") || name.contains("stock") || name.contains("template")
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data).with_context(|| format!("write workbook {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("read workbook {}", path.display()))?;
        let wb = serde_json::from_str(&data)
            .with_context(|| format!("parse workbook {}", path.display()))?;
        Ok(wb)
    }
}

fn material_row(material: &Material, at: DateTime<Utc>) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("ID".to_string(), json!(material.id));
    row.insert("Description".to_string(), json!(material.description));
    row.insert("Capacity Per Bin".to_string(), json!(material.qty_per_bin));
    for (col, qty) in BIN_COLUMNS.iter().zip(material.bins.iter()) {
        row.insert((*col).to_string(), json!(qty));
    }
    row.insert("Total".to_string(), json!(material.total_stock()));
    row.insert(
        "Status".to_string(),
        json!(if material.is_available() { "Available" } else { "Empty" }),
    );
    row.insert("Last Update".to_string(), json!(at.to_rfc3339()));
    row
}

fn history_row(entry: &HistoryEntry) -> Map<String, Value> {
    let mut row = Map::new();
    row.insert("Time".to_string(), json!(entry.timestamp.to_rfc3339()));
    row.insert("Material ID".to_string(), json!(entry.material_id));
    row.insert("Description".to_string(), json!(entry.material_description));
    row.insert(
        "Action".to_string(),
        json!(entry.action.kind().as_str().to_uppercase()),
    );
    row.insert("Bin".to_string(), json!(entry.bin));
    row.insert("Quantity".to_string(), json!(entry.quantity));
    row.insert("User".to_string(), json!(entry.user));
    row.insert("Entry ID".to_string(), json!(entry.id));
    row
}

/// Full snapshot: current material stock plus the entire ledger.
pub fn export_snapshot(
    materials: &[Material],
    history: &[HistoryEntry],
    at: DateTime<Utc>,
) -> Workbook {
    Workbook {
        sheets: vec![
            Sheet {
                name: MATERIALS_SHEET.to_string(),
                rows: materials.iter().map(|m| material_row(m, at)).collect(),
            },
            Sheet {
                name: HISTORY_SHEET.to_string(),
                rows: history.iter().map(history_row).collect(),
            },
        ],
    }
}

/// Blank template for offline data entry: the material rows with zeroed bins.
pub fn export_template(materials: &[Material], at: DateTime<Utc>) -> Workbook {
    let blanks: Vec<Material> = materials
        .iter()
        .map(|m| Material::new(&m.id, &m.description, m.qty_per_bin, [0; BIN_COUNT]))
        .collect();
    Workbook {
        sheets: vec![Sheet {
            name: TEMPLATE_SHEET.to_string(),
            rows: blanks.iter().map(|m| material_row(m, at)).collect(),
        }],
    }
}

fn row_str(row: &Map<String, Value>, key: &str) -> String {
    row.get(key).and_then(Value::as_str).unwrap_or("").trim().to_string()
}

fn row_u32(row: &Map<String, Value>, key: &str) -> u32 {
    match row.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as u32,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Reads materials back out of a workbook. Rows without a non-empty `ID` are
/// dropped; numeric columns default to 0.
pub fn import_materials(workbook: &Workbook) -> Result<Vec<Material>, OpError> {
    let sheet = workbook
        .find_materials_sheet()
        .ok_or_else(|| OpError::ImportParse("no materials sheet found".to_string()))?;

    let materials: Vec<Material> = sheet
        .rows
        .iter()
        .filter_map(|row| {
            let id = row_str(row, "ID");
            if id.is_empty() {
                return None;
            }
            let mut bins = [0u32; BIN_COUNT];
            for (slot, col) in BIN_COLUMNS.iter().enumerate() {
                bins[slot] = row_u32(row, col);
            }
            Some(Material {
                id,
                description: row_str(row, "Description"),
                qty_per_bin: row_u32(row, "Capacity Per Bin"),
                bins,
            })
        })
        .collect();

    if materials.is_empty() {
        return Err(OpError::ImportParse("no valid material rows".to_string()));
    }
    Ok(materials)
}

/// Export adapter writing the snapshot workbook to a fixed path.
pub struct WorkbookAdapter {
    path: PathBuf,
}

impl WorkbookAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ExportAdapter for WorkbookAdapter {
    fn export_snapshot(
        &mut self,
        materials: &[Material],
        history: &[HistoryEntry],
    ) -> Result<(), String> {
        let workbook = export_snapshot(materials, history, Utc::now());
        workbook.save(&self.path).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Action, AdgiState, HistoryEntry};
    use chrono::TimeZone;

    fn sample_materials() -> Vec<Material> {
        vec![
            Material::new("M-1", "part a", 10, [10, 0, 0, 0]),
            Material::new("M-2", "part b", 5, [0, 0, 0, 0]),
        ]
    }

    fn sample_history() -> Vec<HistoryEntry> {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        vec![HistoryEntry {
            id: "take-1".to_string(),
            material_id: "M-1".to_string(),
            material_description: "part a".to_string(),
            action: Action::Take { adgi: AdgiState::pending(ts) },
            bin: 1,
            quantity: 2,
            timestamp: ts,
            user: "ops".to_string(),
        }]
    }

    #[test]
    fn test_export_snapshot_schema() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let wb = export_snapshot(&sample_materials(), &sample_history(), at);
        assert_eq!(wb.sheets.len(), 2);

        let mats = wb.sheet(MATERIALS_SHEET).unwrap();
        assert_eq!(mats.rows.len(), 2);
        let row = &mats.rows[0];
        assert_eq!(row.get("ID").unwrap(), "M-1");
        assert_eq!(row.get("Capacity Per Bin").unwrap(), 10);
        assert_eq!(row.get("BIN 1").unwrap(), 10);
        assert_eq!(row.get("Total").unwrap(), 10);
        assert_eq!(row.get("Status").unwrap(), "Available");
        assert_eq!(mats.rows[1].get("Status").unwrap(), "Empty");

        let hist = wb.sheet(HISTORY_SHEET).unwrap();
        assert_eq!(hist.rows.len(), 1);
        assert_eq!(hist.rows[0].get("Action").unwrap(), "TAKE");
        assert_eq!(hist.rows[0].get("Quantity").unwrap(), 2);
        assert_eq!(hist.rows[0].get("User").unwrap(), "ops");
    }

    #[test]
    fn test_import_round_trip() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let wb = export_snapshot(&sample_materials(), &[], at);
        let imported = import_materials(&wb).unwrap();
        assert_eq!(imported, sample_materials());
    }

    #[test]
    fn test_import_fuzzy_sheet_name() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        for name in ["Live STOCK", "materials v2", "My Template"] {
            let mut wb = export_snapshot(&sample_materials(), &[], at);
            wb.sheets[0].name = name.to_string();
            wb.sheets.truncate(1);
            assert!(import_materials(&wb).is_ok(), "sheet name {} not recognized", name);
        }
    }

    #[test]
    fn test_import_drops_rows_without_id() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let mut wb = export_snapshot(&sample_materials(), &[], at);
        wb.sheets[0].rows[0].insert("ID".to_string(), json!(""));
        let imported = import_materials(&wb).unwrap();
        assert_eq!(imported.len(), 1);
        assert_eq!(imported[0].id, "M-2");
    }

    #[test]
    fn test_import_numeric_defaults() {
        let mut row = Map::new();
        row.insert("ID".to_string(), json!("M-9"));
        row.insert("BIN 2".to_string(), json!("7"));
        let wb = Workbook {
            sheets: vec![Sheet { name: "stock".to_string(), rows: vec![row] }],
        };
        let imported = import_materials(&wb).unwrap();
        assert_eq!(imported[0].qty_per_bin, 0);
        assert_eq!(imported[0].bins, [0, 7, 0, 0]);
        assert_eq!(imported[0].description, "");
    }

    #[test]
    fn test_import_errors() {
        let wb = Workbook {
            sheets: vec![Sheet { name: "Payments".to_string(), rows: vec![] }],
        };
        assert!(matches!(import_materials(&wb), Err(OpError::ImportParse(_))));

        let empty = Workbook {
            sheets: vec![Sheet { name: "stock".to_string(), rows: vec![] }],
        };
        assert!(matches!(import_materials(&empty), Err(OpError::ImportParse(_))));
    }

    #[test]
    fn test_template_zeroes_bins() {
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let wb = export_template(&sample_materials(), at);
        let sheet = wb.find_materials_sheet().unwrap();
        for row in &sheet.rows {
            for col in BIN_COLUMNS {
                assert_eq!(row.get(col).unwrap(), 0);
            }
        }
    }

    #[test]
    fn test_workbook_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wb.json");
        let at = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let wb = export_snapshot(&sample_materials(), &sample_history(), at);
        wb.save(&path).unwrap();
        let loaded = Workbook::load(&path).unwrap();
        assert_eq!(loaded.sheets.len(), 2);
        assert_eq!(import_materials(&loaded).unwrap(), sample_materials());
    }

    #[test]
    fn test_adapter_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sync.json");
        let mut adapter = WorkbookAdapter::new(path.clone());
        adapter
            .export_snapshot(&sample_materials(), &sample_history())
            .unwrap();
        assert!(path.exists());
    }
}
