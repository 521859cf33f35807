pub mod db;

pub use db::{FindingRecord, ScanDb, StoredFinding, SubdomainRecord};
