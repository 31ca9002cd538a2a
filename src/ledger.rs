use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Downstream goods-issue confirmation. Only take entries carry one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdgiStatus {
    Pending,
    Done,
}

impl AdgiStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdgiStatus::Pending => "pending",
            AdgiStatus::Done => "done",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(AdgiStatus::Pending),
            "done" => Some(AdgiStatus::Done),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdgiState {
    pub status: AdgiStatus,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl AdgiState {
    /// Initial state stamped when a take entry is created.
    pub fn pending(at: DateTime<Utc>) -> Self {
        Self {
            status: AdgiStatus::Pending,
            updated_at: at,
            updated_by: "System".to_string(),
        }
    }
}

/// Fill entries carry no ADGI state by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Action {
    Take { adgi: AdgiState },
    Fill,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Take { .. } => ActionKind::Take,
            Action::Fill => ActionKind::Fill,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Take,
    Fill,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Take => "take",
            ActionKind::Fill => "fill",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "take" => Some(ActionKind::Take),
            "fill" => Some(ActionKind::Fill),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub material_id: String,
    /// Description snapshot taken when the entry was recorded.
    pub material_description: String,
    pub action: Action,
    pub bin: u8,
    pub quantity: u32,
    pub timestamp: DateTime<Utc>,
    pub user: String,
}

impl HistoryEntry {
    pub fn adgi(&self) -> Option<&AdgiState> {
        match &self.action {
            Action::Take { adgi } => Some(adgi),
            Action::Fill => None,
        }
    }

    pub fn is_take(&self) -> bool {
        matches!(self.action, Action::Take { .. })
    }
}

pub fn new_entry_id(kind: ActionKind, at: DateTime<Utc>) -> String {
    let suffix: u32 = rand::random::<u32>() & 0xff_ffff;
    format!("{}-{}-{:06x}", kind.as_str(), at.timestamp_millis(), suffix)
}

/// Append-only transaction ledger. Entries are stored in the order they were
/// recorded; views re-sort as needed. Nothing is ever removed.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<HistoryEntry>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self { entries }
    }

    pub fn append(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn iter_newest_first(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter().rev()
    }

    /// Only the ADGI fields of take entries may be touched through this;
    /// entries are otherwise immutable once appended.
    pub(crate) fn entries_mut(&mut self) -> &mut [HistoryEntry] {
        &mut self.entries
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "newest" => Some(SortOrder::Newest),
            "oldest" => Some(SortOrder::Oldest),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    /// Case-insensitive substring match on material id, description, or user.
    pub query: String,
    pub action: Option<ActionKind>,
    pub sort: SortOrder,
}

pub fn filter_history<'a>(
    entries: &'a [HistoryEntry],
    filter: &HistoryFilter,
) -> Vec<&'a HistoryEntry> {
    let query = filter.query.to_lowercase();
    let mut out: Vec<&HistoryEntry> = entries
        .iter()
        .filter(|e| {
            let matches_query = query.is_empty()
                || e.material_id.to_lowercase().contains(&query)
                || e.material_description.to_lowercase().contains(&query)
                || e.user.to_lowercase().contains(&query);
            let matches_action = filter.action.map_or(true, |a| e.action.kind() == a);
            matches_query && matches_action
        })
        .collect();
    match filter.sort {
        SortOrder::Newest => out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp)),
        SortOrder::Oldest => out.sort_by(|a, b| a.timestamp.cmp(&b.timestamp)),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(id: &str, material: &str, kind: ActionKind, ts_secs: i64, user: &str) -> HistoryEntry {
        let ts = Utc.timestamp_opt(ts_secs, 0).unwrap();
        let action = match kind {
            ActionKind::Take => Action::Take { adgi: AdgiState::pending(ts) },
            ActionKind::Fill => Action::Fill,
        };
        HistoryEntry {
            id: id.to_string(),
            material_id: material.to_string(),
            material_description: format!("desc {}", material),
            action,
            bin: 1,
            quantity: 5,
            timestamp: ts,
            user: user.to_string(),
        }
    }

    #[test]
    fn test_fill_entries_have_no_adgi() {
        let e = entry("e1", "M-1", ActionKind::Fill, 100, "ops");
        assert!(e.adgi().is_none());
        let t = entry("e2", "M-1", ActionKind::Take, 100, "ops");
        assert_eq!(t.adgi().unwrap().status, AdgiStatus::Pending);
        assert_eq!(t.adgi().unwrap().updated_by, "System");
    }

    #[test]
    fn test_ledger_append_preserves_order() {
        let mut ledger = Ledger::new();
        ledger.append(entry("e1", "M-1", ActionKind::Take, 100, "ops"));
        ledger.append(entry("e2", "M-2", ActionKind::Fill, 200, "ops"));
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.entries()[0].id, "e1");
        let newest: Vec<_> = ledger.iter_newest_first().map(|e| e.id.as_str()).collect();
        assert_eq!(newest, vec!["e2", "e1"]);
    }

    #[test]
    fn test_filter_history_query_is_case_insensitive() {
        let entries = vec![
            entry("e1", "X/A013604BA", ActionKind::Take, 100, "alice"),
            entry("e2", "2005436", ActionKind::Fill, 200, "bob"),
        ];
        let filter = HistoryFilter { query: "x/a013".to_string(), ..Default::default() };
        let hits = filter_history(&entries, &filter);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "e1");

        // user field matches too
        let filter = HistoryFilter { query: "BOB".to_string(), ..Default::default() };
        assert_eq!(filter_history(&entries, &filter).len(), 1);
    }

    #[test]
    fn test_filter_history_by_action_and_sort() {
        let entries = vec![
            entry("e1", "M-1", ActionKind::Take, 300, "ops"),
            entry("e2", "M-1", ActionKind::Fill, 100, "ops"),
            entry("e3", "M-1", ActionKind::Take, 200, "ops"),
        ];
        let filter = HistoryFilter {
            action: Some(ActionKind::Take),
            sort: SortOrder::Oldest,
            ..Default::default()
        };
        let hits = filter_history(&entries, &filter);
        let ids: Vec<_> = hits.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e3", "e1"]);

        let filter = HistoryFilter { sort: SortOrder::Newest, ..Default::default() };
        let ids: Vec<_> = filter_history(&entries, &filter)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, vec!["e1", "e3", "e2"]);
    }

    #[test]
    fn test_entry_id_shape() {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let id = new_entry_id(ActionKind::Take, ts);
        assert!(id.starts_with("take-1700000000000-"));
        let id2 = new_entry_id(ActionKind::Fill, ts);
        assert!(id2.starts_with("fill-"));
    }
}
