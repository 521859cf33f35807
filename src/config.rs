use std::path::PathBuf;

use serde::Deserialize;

use crate::analyze::risk_classifier::RiskRuleset;

/// Tunables for one scan run. Everything has a sane default so callers can
/// override just the knobs they care about.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Concurrent enrichment workers.
    pub concurrency: usize,
    /// Per-attempt timeout for HTTP metadata fetches.
    pub http_timeout_secs: u64,
    /// Timeout for the CT log query; crt.sh can be slow.
    pub ct_timeout_secs: u64,
    /// DNS resolution timeout.
    pub dns_timeout_secs: u64,
    /// Cap on subdomains processed per scan, None = unlimited.
    pub max_subdomains: Option<usize>,
    /// When true, a name must end with ".{root}" to count as in scope;
    /// when false, a plain suffix match is enough (so notexample.com
    /// matches root example.com).
    pub dot_boundary: bool,
    /// SQLite database path for change tracking.
    pub db_path: PathBuf,
    /// Keyword table and thresholds for risk classification.
    pub ruleset: RiskRuleset,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            http_timeout_secs: 5,
            ct_timeout_secs: 30,
            dns_timeout_secs: 5,
            max_subdomains: None,
            dot_boundary: false,
            db_path: PathBuf::from("ct_hunter.db"),
            ruleset: RiskRuleset::default(),
        }
    }
}
