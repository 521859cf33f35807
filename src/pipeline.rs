use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::analyze::risk_classifier::{classify, Severity};
use crate::config::ScanConfig;
use crate::discover::{CrtShClient, NameSource};
use crate::enrich::{Enricher, Enrichment, NetworkEnricher};
use crate::normalize::normalize_subdomains;
use crate::store::db::{FindingRecord, ScanDb};

/// The result of evaluating one subdomain during one scan, as returned to
/// the caller (CLI, UI, CSV export).
#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub root_domain: String,
    pub subdomain: String,
    pub ip: Option<String>,
    pub asn: Option<u32>,
    pub asn_description: Option<String>,
    pub status_code: Option<u16>,
    pub title: Option<String>,
    pub risk_tags: Vec<String>,
    pub risk_score: i32,
    pub severity: Severity,
    pub is_new: bool,
}

/// Orchestrates one scan: discover, normalize, enrich and classify each
/// subdomain with bounded concurrency, persist findings, return them.
pub struct Scanner {
    cfg: ScanConfig,
    db: ScanDb,
    source: Arc<dyn NameSource>,
    enricher: Arc<dyn Enricher>,
}

impl Scanner {
    pub fn new(cfg: ScanConfig, db: ScanDb) -> Self {
        let source = Arc::new(CrtShClient::new(cfg.ct_timeout_secs));
        let enricher = Arc::new(NetworkEnricher::new(&cfg));
        Self::with_parts(cfg, db, source, enricher)
    }

    /// Inject the name source and enricher; the seam used by tests.
    pub fn with_parts(
        cfg: ScanConfig,
        db: ScanDb,
        source: Arc<dyn NameSource>,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        Self { cfg, db, source, enricher }
    }

    pub async fn run_scan(&self, root_domain: &str) -> Result<Vec<Finding>> {
        self.run_scan_with_cancel(root_domain, CancellationToken::new())
            .await
    }

    /// Full pipeline with a caller-supplied cancellation signal. When the
    /// token fires, no new enrichment work is launched; findings already
    /// collected are persisted once and returned.
    pub async fn run_scan_with_cancel(
        &self,
        root_domain: &str,
        cancel: CancellationToken,
    ) -> Result<Vec<Finding>> {
        let root = validate_root_domain(root_domain)?;
        let scan_id = self.db.create_scan(&root)?;

        // Source failure degrades to an empty scan, never a fatal error.
        let raw = match self.source.fetch_names(&root).await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(root = %root, error = %e, "name source unavailable, scan proceeds empty");
                Vec::new()
            }
        };

        let mut subs = normalize_subdomains(&raw, &root, self.cfg.dot_boundary);
        if let Some(limit) = self.cfg.max_subdomains {
            if subs.len() > limit {
                tracing::info!(limit, total = subs.len(), "capping subdomains for this scan");
                subs.truncate(limit);
            }
        }
        tracing::info!(root = %root, raw = raw.len(), normalized = subs.len(), "discovery complete");

        let semaphore = Arc::new(Semaphore::new(self.cfg.concurrency.max(1)));
        let mut tasks = FuturesUnordered::new();
        for sub in subs {
            // Waiting on a permit is the natural pause point, so the token
            // is checked after acquisition: once it fires, no further
            // enrichment work is launched.
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("enrichment semaphore closed")?;
            if cancel.is_cancelled() {
                tracing::info!(root = %root, "scan cancelled, stopping new enrichment work");
                break;
            }
            let enricher = self.enricher.clone();
            tasks.push(tokio::spawn(async move {
                let enrichment = enricher.enrich(&sub).await;
                drop(permit);
                (sub, enrichment)
            }));
        }

        // Collection doubles as the serialized writer: classification and
        // persistence happen here, one result at a time. Store errors are
        // the only fatal path.
        let mut findings = Vec::new();
        while let Some(joined) = tasks.next().await {
            let (sub, enrichment) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "enrichment task failed, skipping subdomain");
                    continue;
                }
            };
            let finding = self.persist_finding(scan_id, &root, sub, enrichment)?;
            findings.push(finding);
        }

        // Enrichment completes out of order; report in stable name order.
        findings.sort_by(|a, b| a.subdomain.cmp(&b.subdomain));
        Ok(findings)
    }

    fn persist_finding(
        &self,
        scan_id: i64,
        root: &str,
        subdomain: String,
        enrichment: Enrichment,
    ) -> Result<Finding> {
        let risk = classify(&self.cfg.ruleset, &subdomain, &enrichment.http);
        let (subdomain_id, is_new) = self.db.upsert_subdomain(root, &subdomain)?;

        let title = if enrichment.http.title.is_empty() {
            None
        } else {
            Some(enrichment.http.title.clone())
        };
        let record = FindingRecord {
            ip: enrichment.ip.map(|ip| ip.to_string()),
            asn: enrichment.asn.as_ref().map(|a| a.asn),
            asn_description: enrichment.asn.as_ref().map(|a| a.description.clone()),
            status_code: enrichment.http.status_code,
            title,
            risk_tags: risk.tags,
            risk_score: risk.score,
            severity: risk.severity,
            is_new,
        };
        self.db.insert_finding(scan_id, subdomain_id, &record)?;

        Ok(Finding {
            root_domain: root.to_string(),
            subdomain,
            ip: record.ip,
            asn: record.asn,
            asn_description: record.asn_description,
            status_code: record.status_code,
            title: record.title,
            risk_tags: record.risk_tags,
            risk_score: record.risk_score,
            severity: record.severity,
            is_new: record.is_new,
        })
    }
}

/// Reject malformed root domains before any network activity.
pub fn validate_root_domain(input: &str) -> Result<String> {
    let domain = input.trim().to_lowercase();
    if domain.is_empty() {
        bail!("root domain is empty");
    }
    let malformed = domain.contains("://")
        || domain.contains('/')
        || domain.contains(char::is_whitespace)
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.');
    if malformed {
        bail!("invalid root domain: {input}");
    }
    Ok(domain)
}
