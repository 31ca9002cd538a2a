pub mod adapter;
pub mod adgi;
pub mod catalog;
pub mod inventory;
pub mod invariants;
pub mod ledger;
pub mod logging;
pub mod stats;
pub mod storage;
