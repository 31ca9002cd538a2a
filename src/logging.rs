//! Structured JSONL logging. Every event goes to stdout and to a run-scoped
//! events.jsonl so a session can be replayed after the fact.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Debug = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl Level {
    pub fn from_env() -> Self {
        match std::env::var("LOG_LEVEL").as_deref() {
            Ok("debug") => Level::Debug,
            Ok("info") => Level::Info,
            Ok("warn") => Level::Warn,
            Ok("error") => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Inventory, // Take/fill bookkeeping
    Ledger,    // History entries
    Adgi,      // Goods-issue confirmations
    Sync,      // Workbook export/import
    Storage,   // Sqlite persistence
    System,    // Startup, shutdown
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Inventory => "inventory",
            Domain::Ledger => "ledger",
            Domain::Adgi => "adgi",
            Domain::Sync => "sync",
            Domain::Storage => "storage",
            Domain::System => "system",
        }
    }

    pub fn is_enabled(&self) -> bool {
        // LOG_DOMAINS: comma-separated list or "all"
        match std::env::var("LOG_DOMAINS").as_deref() {
            Ok("all") | Err(_) => true,
            Ok(domains) => domains.split(',').any(|d| d.trim() == self.as_str()),
        }
    }
}

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    events: Mutex<BufWriter<File>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", Utc::now().timestamp_millis(), process::id()));
        let base = std::env::var("LOG_DIR").unwrap_or_else(|_| "out/runs".to_string());
        let mut run_dir = PathBuf::from(base);
        run_dir.push(&run_id);
        if let Err(err) = create_dir_all(&run_dir) {
            eprintln!("[log] failed to create run dir: {}", err);
        }
        let _ = std::fs::write(
            run_dir.join("manifest.json"),
            json!({
                "run_id": run_id,
                "ts": ts_now(),
                "pid": process::id(),
                "log_dir": run_dir.to_string_lossy(),
            })
            .to_string(),
        );
        let events = File::create(run_dir.join("events.jsonl")).unwrap_or_else(|err| {
            eprintln!("[log] failed to create events log: {}", err);
            File::create("/tmp/binstock-events.jsonl").expect("events fallback")
        });
        RunContext { run_id, events: Mutex::new(BufWriter::new(events)) }
    })
}

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, mut fields: Map<String, Value>) {
    let min_level = Level::from_env();
    if level < min_level || !domain.is_enabled() {
        return;
    }

    let ctx = ensure_run_context();
    let msg = fields.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(ctx.run_id.clone()));
    entry.insert("seq".to_string(), json!(next_seq()));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("domain".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    entry.insert("data".to_string(), Value::Object(fields));

    let line = Value::Object(entry).to_string();
    if let Ok(mut w) = ctx.events.lock() {
        let _ = writeln!(w, "{}", line);
        let _ = w.flush();
    }
    println!("{}", line);
}

// =============================================================================
// Domain-specific helpers
// =============================================================================

pub fn log_operation(
    kind: &str,
    entry_id: &str,
    material_id: &str,
    bin: u8,
    quantity: u32,
    user: &str,
) {
    log(
        Level::Info,
        Domain::Inventory,
        kind,
        obj(&[
            ("entry_id", v_str(entry_id)),
            ("material_id", v_str(material_id)),
            ("bin", json!(bin)),
            ("quantity", json!(quantity)),
            ("user", v_str(user)),
        ]),
    );
}

pub fn log_rejected(kind: &str, material_id: &str, bin: u8, quantity: u32, reason: &str) {
    log(
        Level::Warn,
        Domain::Inventory,
        "rejected",
        obj(&[
            ("op", v_str(kind)),
            ("material_id", v_str(material_id)),
            ("bin", json!(bin)),
            ("quantity", json!(quantity)),
            ("reason", v_str(reason)),
        ]),
    );
}

pub fn log_adgi_update(material_id: &str, status: &str, touched: usize, user: &str) {
    log(
        Level::Info,
        Domain::Adgi,
        "status_update",
        obj(&[
            ("material_id", v_str(material_id)),
            ("status", v_str(status)),
            ("touched", json!(touched)),
            ("user", v_str(user)),
        ]),
    );
}

pub fn log_sync_result(path: &str, ok: bool, detail: &str) {
    log(
        if ok { Level::Info } else { Level::Error },
        Domain::Sync,
        "workbook_sync",
        obj(&[
            ("path", v_str(path)),
            ("ok", json!(ok)),
            ("detail", v_str(detail)),
        ]),
    );
}

// =============================================================================
// Utility functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warn);
        assert!(Level::Warn < Level::Error);
    }

    #[test]
    fn test_obj_helper() {
        let m = obj(&[("key", v_str("value")), ("num", json!(42))]);
        assert_eq!(m.get("key").unwrap(), "value");
        assert_eq!(m.get("num").unwrap(), 42);
    }

    #[test]
    fn test_seq_increments() {
        let s1 = next_seq();
        let s2 = next_seq();
        assert!(s2 > s1);
    }
}
