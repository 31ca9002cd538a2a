use anyhow::{anyhow, Context, Result};
use chrono::Utc;

use binstock::adapter::workbook::{self, WorkbookAdapter};
use binstock::adapter::ExportAdapter;
use binstock::adgi::{self, GroupFilter};
use binstock::catalog::{filter_materials, seed_catalog};
use binstock::inventory::{Config, Inventory};
use binstock::invariants;
use binstock::ledger::{filter_history, ActionKind, AdgiStatus, HistoryFilter, SortOrder};
use binstock::logging::{self, log, obj, v_str, Domain, Level};
use binstock::stats;
use binstock::storage::StateStore;

fn usage() -> String {
    [
        "usage: binstock <command>",
        "  seed                          reset materials to the stock catalog",
        "  list [query]                  show materials, optionally filtered",
        "  take <id> <bin> <qty>         withdraw from a bin",
        "  fill <id> <bin> <qty>         replenish a bin",
        "  adgi list [query] [status]    show consolidated goods-issue groups",
        "  adgi set <id> <status>        stamp pending|done on a material's takes",
        "  history [query] [take|fill] [newest|oldest]",
        "  stats                         dashboard totals",
        "  bins                          per-bin totals",
        "  export [--template]           write the workbook file",
        "  import <path>                 replace materials from a workbook file",
        "  verify                        check store and ledger invariants",
    ]
    .join("\n")
}

fn load_inventory(cfg: &Config) -> Result<(StateStore, Inventory)> {
    let mut store = StateStore::new(&cfg.sqlite_path)?;
    store.init()?;
    let inv = if store.is_empty()? {
        log(
            Level::Info,
            Domain::Storage,
            "first_run",
            obj(&[("msg", v_str("empty store, loading stock catalog"))]),
        );
        let inv = Inventory::new(seed_catalog());
        store.save(inv.materials(), inv.ledger())?;
        inv
    } else {
        let (materials, ledger) = store.load()?;
        Inventory::from_parts(materials, ledger)
    };
    Ok((store, inv))
}

fn persist(store: &mut StateStore, inv: &Inventory) -> Result<()> {
    invariants::assert_store_invariants(inv.materials())
        .map_err(|v| anyhow!("invariant violated: {}", v.msg))?;
    store.save(inv.materials(), inv.ledger())?;
    Ok(())
}

/// Workbook sync never blocks or fails the committed operation; a broken
/// export is reported and the next mutation retries it.
async fn auto_sync(cfg: &Config, inv: &Inventory) {
    if !cfg.auto_sync {
        log(
            Level::Debug,
            Domain::Sync,
            "sync_skipped",
            obj(&[("msg", v_str("auto-sync disabled"))]),
        );
        return;
    }
    let mut adapter: Box<dyn ExportAdapter + Send> =
        Box::new(WorkbookAdapter::new(cfg.workbook_path.clone()));
    let target = cfg.workbook_path.clone();
    let materials = inv.materials().to_vec();
    let history = inv.ledger().entries().to_vec();
    let result =
        tokio::task::spawn_blocking(move || adapter.export_snapshot(&materials, &history)).await;
    match result {
        Ok(Ok(())) => logging::log_sync_result(&target, true, "snapshot written"),
        Ok(Err(err)) => logging::log_sync_result(&target, false, &err),
        Err(err) => logging::log_sync_result(&target, false, &err.to_string()),
    }
}

fn parse_bin(s: &str) -> Result<u8> {
    s.parse().with_context(|| format!("bad bin number: {}", s))
}

fn parse_qty(s: &str) -> Result<u32> {
    s.parse().with_context(|| format!("bad quantity: {}", s))
}

fn print_materials(materials: &[&binstock::catalog::Material]) {
    for m in materials {
        println!(
            "{:<18} {:<32} cap/bin {:>5}  bins {:?}  total {:>5}  {:>3}%  {}",
            m.id,
            m.description,
            m.qty_per_bin,
            m.bins,
            m.total_stock(),
            m.utilization(),
            if m.is_available() { "available" } else { "empty" },
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = Config::from_env();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let argv: Vec<&str> = args.iter().map(String::as_str).collect();

    log(
        Level::Debug,
        Domain::System,
        "start",
        obj(&[("args", v_str(&argv.join(" ")))]),
    );

    match argv.as_slice() {
        ["seed"] => {
            let mut store = StateStore::new(&cfg.sqlite_path)?;
            store.init()?;
            let inv = Inventory::new(seed_catalog());
            persist(&mut store, &inv)?;
            println!("seeded {} materials", inv.materials().len());
            auto_sync(&cfg, &inv).await;
        }
        ["list"] | ["list", _] => {
            let query = argv.get(1).copied().unwrap_or("");
            let (_store, inv) = load_inventory(&cfg)?;
            let hits = filter_materials(inv.materials(), query);
            print_materials(&hits);
            println!("{} of {} materials", hits.len(), inv.materials().len());
        }
        ["take", id, bin, qty] | ["fill", id, bin, qty] => {
            let op = argv[0];
            let bin = parse_bin(bin)?;
            let qty = parse_qty(qty)?;
            let (mut store, mut inv) = load_inventory(&cfg)?;
            let result = match op {
                "take" => inv.take(id, bin, qty, &cfg.operator),
                _ => inv.fill(id, bin, qty, &cfg.operator),
            };
            match result {
                Ok(entry) => {
                    logging::log_operation(
                        op,
                        &entry.id,
                        &entry.material_id,
                        entry.bin,
                        entry.quantity,
                        &entry.user,
                    );
                    persist(&mut store, &inv)?;
                    let m = inv
                        .material(id)
                        .ok_or_else(|| anyhow!("material {} vanished after {}", id, op))?;
                    println!("{} {} x{} bin {}: bins now {:?}", op, id, qty, bin, m.bins);
                    auto_sync(&cfg, &inv).await;
                }
                Err(err) => {
                    logging::log_rejected(op, id, bin, qty, &err.to_string());
                    return Err(err.into());
                }
            }
        }
        ["adgi", "list"] | ["adgi", "list", _] | ["adgi", "list", _, _] => {
            let (_store, inv) = load_inventory(&cfg)?;
            let filter = GroupFilter {
                query: argv.get(2).copied().unwrap_or("").to_string(),
                status: argv.get(3).copied().and_then(AdgiStatus::parse),
                sort: SortOrder::default(),
            };
            let groups = adgi::filter_groups(adgi::consolidate(inv.ledger().entries()), &filter);
            for g in &groups {
                println!(
                    "{:<18} {:<32} qty {:>6}  bins {:?}  {}  entries {}",
                    g.material_id,
                    g.material_description,
                    g.total_quantity,
                    g.bins,
                    g.status.as_str(),
                    g.entry_ids.len(),
                );
            }
            let s = adgi::adgi_stats(inv.ledger().entries(), Utc::now());
            println!(
                "{} groups / {} takes: {} pending, {} done, {} today",
                groups.len(),
                s.total_takes,
                s.pending,
                s.done,
                s.today_takes
            );
        }
        ["adgi", "set", id, status] => {
            let status = AdgiStatus::parse(status)
                .ok_or_else(|| anyhow!("status must be pending or done, got {}", status))?;
            let (mut store, mut inv) = load_inventory(&cfg)?;
            let touched = inv.set_adgi_status(id, status, &cfg.operator);
            logging::log_adgi_update(id, status.as_str(), touched, &cfg.operator);
            persist(&mut store, &inv)?;
            println!("{}: {} take entries set to {}", id, touched, status.as_str());
            auto_sync(&cfg, &inv).await;
        }
        ["history", rest @ ..] if rest.len() <= 3 => {
            let (_store, inv) = load_inventory(&cfg)?;
            let mut filter = HistoryFilter::default();
            for arg in rest {
                if let Some(kind) = ActionKind::parse(arg) {
                    filter.action = Some(kind);
                } else if let Some(sort) = SortOrder::parse(arg) {
                    filter.sort = sort;
                } else {
                    filter.query = (*arg).to_string();
                }
            }
            let hits = filter_history(inv.ledger().entries(), &filter);
            for e in &hits {
                println!(
                    "{}  {:<5} {:<18} bin {} x{:<5} by {:<12} {}",
                    e.timestamp.to_rfc3339(),
                    e.action.kind().as_str(),
                    e.material_id,
                    e.bin,
                    e.quantity,
                    e.user,
                    e.adgi().map(|a| a.status.as_str()).unwrap_or("-"),
                );
            }
            println!("{} of {} entries", hits.len(), inv.ledger().len());
        }
        ["stats"] => {
            let (_store, inv) = load_inventory(&cfg)?;
            let now = Utc::now();
            let m = stats::material_stats(inv.materials());
            println!(
                "materials: {} total, {} available, {} empty",
                m.total_materials, m.available_materials, m.empty_materials
            );
            println!(
                "stock: {} / {} capacity ({}% utilization)",
                m.total_stock, m.total_capacity, m.utilization
            );
            let h = stats::history_stats(inv.ledger().entries(), now);
            println!(
                "movement: {} taken / {} filled all-time; today {} taken, {} filled ({} entries, net {:+})",
                h.total_taken, h.total_filled, h.today_taken, h.today_filled, h.today_entries, h.net_change
            );
            let critical = stats::critical_materials(inv.materials());
            if !critical.is_empty() {
                println!("critical (under 20% capacity):");
                print_materials(&critical);
            }
            let active = stats::most_active(inv.materials(), inv.ledger().entries());
            for (m, count) in active {
                println!("active: {:<18} {} entries", m.id, count);
            }
        }
        ["bins"] => {
            let (_store, inv) = load_inventory(&cfg)?;
            for b in stats::bin_stats(inv.materials()) {
                println!(
                    "bin {}: {} / {} ({}%), {} materials stocked",
                    b.bin, b.stock, b.capacity, b.utilization, b.active_materials
                );
            }
        }
        ["export"] | ["export", "--template"] => {
            let (_store, inv) = load_inventory(&cfg)?;
            let now = Utc::now();
            let book = if argv.len() == 2 {
                workbook::export_template(inv.materials(), now)
            } else {
                workbook::export_snapshot(inv.materials(), inv.ledger().entries(), now)
            };
            book.save(std::path::Path::new(&cfg.workbook_path))?;
            logging::log_sync_result(&cfg.workbook_path, true, "manual export");
            println!("wrote {}", cfg.workbook_path);
        }
        ["import", path] => {
            let (mut store, mut inv) = load_inventory(&cfg)?;
            let book = workbook::Workbook::load(std::path::Path::new(path))?;
            let materials = workbook::import_materials(&book)?;
            let count = materials.len();
            inv.replace_materials(materials);
            persist(&mut store, &inv)?;
            log(
                Level::Info,
                Domain::Sync,
                "workbook_import",
                obj(&[
                    ("path", v_str(path)),
                    ("materials", serde_json::json!(count)),
                ]),
            );
            println!("imported {} materials from {}", count, path);
            auto_sync(&cfg, &inv).await;
        }
        ["verify"] => {
            let (_store, inv) = load_inventory(&cfg)?;
            invariants::assert_store_invariants(inv.materials())
                .map_err(|v| anyhow!("store: {}", v.msg))?;
            for entry in inv.ledger().entries() {
                invariants::assert_entry_invariants(entry)
                    .map_err(|v| anyhow!("ledger: {}", v.msg))?;
            }
            println!(
                "ok: {} materials, {} ledger entries",
                inv.materials().len(),
                inv.ledger().len()
            );
        }
        _ => {
            eprintln!("{}", usage());
            std::process::exit(2);
        }
    }
    Ok(())
}
