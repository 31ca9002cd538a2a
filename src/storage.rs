use anyhow::Result;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::catalog::{Material, BIN_COUNT};
use crate::ledger::{Action, ActionKind, AdgiState, AdgiStatus, HistoryEntry, Ledger};

pub struct StateStore {
    conn: Connection,
}

impl StateStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS materials (
                id TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                qty_per_bin INTEGER NOT NULL,
                bin1 INTEGER NOT NULL,
                bin2 INTEGER NOT NULL,
                bin3 INTEGER NOT NULL,
                bin4 INTEGER NOT NULL
            );
            CREATE TABLE IF NOT EXISTS history (
                seq INTEGER PRIMARY KEY,
                id TEXT NOT NULL,
                material_id TEXT NOT NULL,
                material_description TEXT NOT NULL,
                action TEXT NOT NULL,
                bin INTEGER NOT NULL,
                quantity INTEGER NOT NULL,
                ts TEXT NOT NULL,
                user TEXT NOT NULL,
                adgi_status TEXT,
                adgi_updated_at TEXT,
                adgi_updated_by TEXT
            );
            COMMIT;",
        )?;
        Ok(())
    }

    /// Wholesale replace: the in-memory state is the source of truth, the
    /// store only survives restarts.
    pub fn save(&mut self, materials: &[Material], ledger: &Ledger) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM materials", [])?;
        for m in materials {
            tx.execute(
                "INSERT INTO materials (id, description, qty_per_bin, bin1, bin2, bin3, bin4)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    m.id,
                    m.description,
                    m.qty_per_bin,
                    m.bins[0],
                    m.bins[1],
                    m.bins[2],
                    m.bins[3]
                ],
            )?;
        }
        tx.execute("DELETE FROM history", [])?;
        for (seq, e) in ledger.entries().iter().enumerate() {
            let adgi = e.adgi();
            tx.execute(
                "INSERT INTO history (seq, id, material_id, material_description, action,
                                      bin, quantity, ts, user,
                                      adgi_status, adgi_updated_at, adgi_updated_by)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    seq as i64,
                    e.id,
                    e.material_id,
                    e.material_description,
                    e.action.kind().as_str(),
                    e.bin,
                    e.quantity,
                    e.timestamp.to_rfc3339(),
                    e.user,
                    adgi.map(|a| a.status.as_str()),
                    adgi.map(|a| a.updated_at.to_rfc3339()),
                    adgi.map(|a| a.updated_by.as_str()),
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load(&self) -> Result<(Vec<Material>, Ledger)> {
        let mut stmt = self.conn.prepare(
            "SELECT id, description, qty_per_bin, bin1, bin2, bin3, bin4
             FROM materials ORDER BY rowid",
        )?;
        let materials = stmt
            .query_map([], |row| {
                let mut bins = [0u32; BIN_COUNT];
                for (i, slot) in bins.iter_mut().enumerate() {
                    *slot = row.get(3 + i)?;
                }
                Ok(Material {
                    id: row.get(0)?,
                    description: row.get(1)?,
                    qty_per_bin: row.get(2)?,
                    bins,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = self.conn.prepare(
            "SELECT id, material_id, material_description, action, bin, quantity, ts, user,
                    adgi_status, adgi_updated_at, adgi_updated_by
             FROM history ORDER BY seq",
        )?;
        let mut ledger = Ledger::default();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u8>(4)?,
                row.get::<_, u32>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
                row.get::<_, Option<String>>(8)?,
                row.get::<_, Option<String>>(9)?,
                row.get::<_, Option<String>>(10)?,
            ))
        })?;
        for row in rows {
            let (id, material_id, description, action, bin, quantity, ts, user, st, at, by) = row?;
            let timestamp = parse_ts(&ts)?;
            let action = match ActionKind::parse(&action) {
                Some(ActionKind::Take) => Action::Take {
                    adgi: AdgiState {
                        status: st
                            .as_deref()
                            .and_then(AdgiStatus::parse)
                            .unwrap_or(AdgiStatus::Pending),
                        updated_at: match at {
                            Some(ref s) => parse_ts(s)?,
                            None => timestamp,
                        },
                        updated_by: by.unwrap_or_else(|| "System".to_string()),
                    },
                },
                Some(ActionKind::Fill) => Action::Fill,
                None => {
                    return Err(anyhow::anyhow!("history {}: unknown action {}", id, action))
                }
            };
            ledger.append(HistoryEntry {
                id,
                material_id,
                material_description: description,
                action,
                bin,
                quantity,
                timestamp,
                user,
            });
        }
        Ok((materials, ledger))
    }

    pub fn is_empty(&self) -> Result<bool> {
        let row: Option<i64> = self
            .conn
            .query_row("SELECT 1 FROM materials LIMIT 1", [], |r| r.get(0))
            .optional()?;
        Ok(row.is_none())
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .map_err(|e| anyhow::anyhow!("bad timestamp {}: {}", s, e))?
        .with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Inventory;

    fn temp_store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.sqlite");
        let mut store = StateStore::new(path.to_str().unwrap()).unwrap();
        store.init().unwrap();
        (dir, store)
    }

    #[test]
    fn test_fresh_store_is_empty() {
        let (_dir, store) = temp_store();
        assert!(store.is_empty().unwrap());
        let (materials, ledger) = store.load().unwrap();
        assert!(materials.is_empty());
        assert!(ledger.entries().is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_dir, mut store) = temp_store();
        let mut inv = Inventory::new(vec![
            Material::new("M-1", "part a", 10, [10, 5, 0, 0]),
            Material::new("M-2", "part b", 20, [0, 0, 0, 0]),
        ]);
        inv.take("M-1", 1, 3, "ops").unwrap();
        inv.fill("M-2", 2, 7, "ops").unwrap();
        inv.set_adgi_status("M-1", AdgiStatus::Done, "lead");

        store.save(inv.materials(), inv.ledger()).unwrap();
        assert!(!store.is_empty().unwrap());

        let (materials, ledger) = store.load().unwrap();
        assert_eq!(materials, inv.materials());
        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.entries()[0].id, inv.ledger().entries()[0].id);
        assert_eq!(
            ledger.entries()[0].adgi().unwrap().status,
            AdgiStatus::Done
        );
        assert_eq!(ledger.entries()[0].adgi().unwrap().updated_by, "lead");
        assert!(ledger.entries()[1].adgi().is_none());
    }

    #[test]
    fn test_save_is_wholesale_replace() {
        let (_dir, mut store) = temp_store();
        let mut inv = Inventory::new(vec![Material::new("M-1", "part", 10, [10, 0, 0, 0])]);
        store.save(inv.materials(), inv.ledger()).unwrap();
        inv.take("M-1", 1, 2, "ops").unwrap();
        store.save(inv.materials(), inv.ledger()).unwrap();

        let (materials, ledger) = store.load().unwrap();
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].bins, [8, 0, 0, 0]);
        assert_eq!(ledger.entries().len(), 1);
    }
}
