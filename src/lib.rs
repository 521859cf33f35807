pub mod analyze;
pub mod config;
pub mod discover;
pub mod enrich;
pub mod http_client;
pub mod normalize;
pub mod output;
pub mod pipeline;
pub mod store;

// re-export the primary entry points
pub use crate::analyze::risk_classifier::{classify, RiskAssessment, RiskRuleset, Severity};
pub use crate::config::ScanConfig;
pub use crate::pipeline::{Finding, Scanner};
pub use crate::store::db::ScanDb;
