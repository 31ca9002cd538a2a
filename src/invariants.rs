use crate::catalog::Material;
use crate::ledger::HistoryEntry;

#[derive(Debug, Clone)]
pub struct InvariantViolation {
    pub msg: String,
}

/// Every bin must hold between 0 and qty_per_bin units.
pub fn assert_material_invariants(material: &Material) -> Result<(), InvariantViolation> {
    if material.qty_per_bin == 0 {
        return Err(InvariantViolation {
            msg: format!("{}: qty_per_bin is zero", material.id),
        });
    }
    for (i, qty) in material.bins.iter().enumerate() {
        if *qty > material.qty_per_bin {
            return Err(InvariantViolation {
                msg: format!(
                    "{}: bin {} holds {} over capacity {}",
                    material.id,
                    i + 1,
                    qty,
                    material.qty_per_bin
                ),
            });
        }
    }
    Ok(())
}

pub fn assert_store_invariants(materials: &[Material]) -> Result<(), InvariantViolation> {
    let mut seen = std::collections::HashSet::new();
    for m in materials {
        if !seen.insert(m.id.as_str()) {
            return Err(InvariantViolation { msg: format!("duplicate material id {}", m.id) });
        }
        assert_material_invariants(m)?;
    }
    Ok(())
}

/// The ledger only ever grows, one entry per committed operation.
pub fn assert_ledger_growth(len_before: usize, len_after: usize) -> Result<(), InvariantViolation> {
    if len_after != len_before + 1 {
        return Err(InvariantViolation {
            msg: format!("ledger grew from {} to {}, expected +1", len_before, len_after),
        });
    }
    Ok(())
}

/// Ledger entries must reference valid bins and positive quantities.
pub fn assert_entry_invariants(entry: &HistoryEntry) -> Result<(), InvariantViolation> {
    if !(1..=4).contains(&entry.bin) {
        return Err(InvariantViolation {
            msg: format!("entry {}: bin {} out of range", entry.id, entry.bin),
        });
    }
    if entry.quantity == 0 {
        return Err(InvariantViolation { msg: format!("entry {}: zero quantity", entry.id) });
    }
    Ok(())
}
