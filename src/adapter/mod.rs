pub mod workbook;

use crate::catalog::Material;
use crate::ledger::HistoryEntry;

/// Downstream sink for committed state. Bookkeeping never waits on this:
/// a failed export is reported, never rolled back.
pub trait ExportAdapter {
    fn export_snapshot(
        &mut self,
        materials: &[Material],
        history: &[HistoryEntry],
    ) -> Result<(), String>;
}

// Stub implementation to make integration explicit.
pub struct NullAdapter;

impl ExportAdapter for NullAdapter {
    fn export_snapshot(
        &mut self,
        _materials: &[Material],
        _history: &[HistoryEntry],
    ) -> Result<(), String> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_adapter_accepts_any_snapshot() {
        let mut adapter: Box<dyn ExportAdapter> = Box::new(NullAdapter);
        assert!(adapter.export_snapshot(&[], &[]).is_ok());
        let materials = [Material::new("M-1", "part", 10, [10, 0, 0, 0])];
        assert!(adapter.export_snapshot(&materials, &[]).is_ok());
    }
}
