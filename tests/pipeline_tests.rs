use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use ct_hunter::discover::NameSource;
use ct_hunter::enrich::http_meta::HttpMetadata;
use ct_hunter::enrich::{AsnInfo, Enricher, Enrichment};
use ct_hunter::{ScanConfig, ScanDb, Scanner, Severity};

struct StubSource {
    names: Vec<String>,
}

#[async_trait::async_trait]
impl NameSource for StubSource {
    async fn fetch_names(&self, _root_domain: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.names.clone())
    }
}

struct FailingSource;

#[async_trait::async_trait]
impl NameSource for FailingSource {
    async fn fetch_names(&self, _root_domain: &str) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("certificate log service unreachable")
    }
}

/// Answers every subdomain with a fixed address and a live HTTP response.
struct StubEnricher;

#[async_trait::async_trait]
impl Enricher for StubEnricher {
    async fn enrich(&self, subdomain: &str) -> Enrichment {
        Enrichment {
            ip: Some(Ipv4Addr::new(93, 184, 216, 34)),
            asn: Some(AsnInfo {
                asn: 15133,
                description: "EDGECAST".to_string(),
            }),
            http: HttpMetadata {
                url: format!("https://{subdomain}"),
                status_code: Some(200),
                title: String::new(),
                body_snippet: String::new(),
                ..Default::default()
            },
        }
    }
}

/// Simulates total enrichment failure: nothing resolved, nothing fetched.
struct DeadEnricher;

#[async_trait::async_trait]
impl Enricher for DeadEnricher {
    async fn enrich(&self, subdomain: &str) -> Enrichment {
        Enrichment {
            ip: None,
            asn: None,
            http: HttpMetadata::unreachable(format!("https://{subdomain}")),
        }
    }
}

fn scanner_with(names: &[&str], db: ScanDb, cfg: ScanConfig) -> Scanner {
    let source = Arc::new(StubSource {
        names: names.iter().map(|s| s.to_string()).collect(),
    });
    Scanner::with_parts(cfg, db, source, Arc::new(StubEnricher))
}

#[tokio::test]
async fn end_to_end_scan_normalizes_enriches_and_tracks_novelty() {
    let db = ScanDb::open_in_memory().unwrap();
    let scanner = scanner_with(
        &["*.dev.example.com", "admin.example.com", "example.com", "other.org"],
        db.clone(),
        ScanConfig::default(),
    );

    let findings = scanner.run_scan("example.com").await.unwrap();

    let names: Vec<&str> = findings.iter().map(|f| f.subdomain.as_str()).collect();
    assert_eq!(names, vec!["admin.example.com", "dev.example.com"]);
    assert!(findings.iter().all(|f| f.is_new));
    assert!(findings.iter().all(|f| f.ip.as_deref() == Some("93.184.216.34")));
    assert!(findings.iter().all(|f| f.asn == Some(15133)));

    // admin(30) + liveness(5); dev(10) + liveness(5)
    let admin = &findings[0];
    assert_eq!(admin.risk_tags, vec!["admin"]);
    assert_eq!(admin.risk_score, 35);
    assert_eq!(admin.severity, Severity::High);
    let dev = &findings[1];
    assert_eq!(dev.risk_tags, vec!["dev"]);
    assert_eq!(dev.risk_score, 15);
    assert_eq!(dev.severity, Severity::Medium);

    // Immediate second scan: same set, nothing is new anymore.
    let second = scanner.run_scan("example.com").await.unwrap();
    let names: Vec<&str> = second.iter().map(|f| f.subdomain.as_str()).collect();
    assert_eq!(names, vec!["admin.example.com", "dev.example.com"]);
    assert!(second.iter().all(|f| !f.is_new));

    // Both scans persisted their findings.
    assert_eq!(db.findings_for_scan(1).unwrap().len(), 2);
    assert_eq!(db.findings_for_scan(2).unwrap().len(), 2);
}

#[tokio::test]
async fn source_failure_degrades_to_empty_scan() {
    let db = ScanDb::open_in_memory().unwrap();
    let scanner = Scanner::with_parts(
        ScanConfig::default(),
        db.clone(),
        Arc::new(FailingSource),
        Arc::new(StubEnricher),
    );

    let findings = scanner.run_scan("example.com").await.unwrap();
    assert!(findings.is_empty());

    // The scan row itself is still recorded (audit trail).
    assert!(db.findings_for_scan(1).unwrap().is_empty());
}

#[tokio::test]
async fn enrichment_failure_degrades_fields_not_the_scan() {
    let db = ScanDb::open_in_memory().unwrap();
    let source = Arc::new(StubSource {
        names: vec!["dead.example.com".to_string()],
    });
    let scanner = Scanner::with_parts(ScanConfig::default(), db, source, Arc::new(DeadEnricher));

    let findings = scanner.run_scan("example.com").await.unwrap();
    assert_eq!(findings.len(), 1);
    let f = &findings[0];
    assert_eq!(f.ip, None);
    assert_eq!(f.asn, None);
    assert_eq!(f.status_code, None);
    assert_eq!(f.title, None);
    // Name keywords still classify without any HTTP metadata.
    assert!(f.risk_tags.is_empty());
    assert_eq!(f.severity, Severity::Low);
    assert!(f.is_new);
}

#[tokio::test]
async fn invalid_root_domain_is_rejected_before_any_work() {
    let db = ScanDb::open_in_memory().unwrap();
    let scanner = scanner_with(&["a.example.com"], db.clone(), ScanConfig::default());

    for bad in ["", "nodots", "https://example.com", "ex ample.com"] {
        assert!(scanner.run_scan(bad).await.is_err(), "should reject {bad:?}");
    }

    // No scan rows were created for rejected input.
    assert!(db.subdomain_history("example.com").unwrap().is_empty());
}

/// Cancels the scan's own token as part of each call, simulating a deadline
/// that fires while the first subdomain is in flight.
struct DeadlineEnricher {
    token: CancellationToken,
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Enricher for DeadlineEnricher {
    async fn enrich(&self, subdomain: &str) -> Enrichment {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.token.cancel();
        Enrichment {
            ip: None,
            asn: None,
            http: HttpMetadata::unreachable(format!("https://{subdomain}")),
        }
    }
}

#[tokio::test]
async fn persistence_failure_is_fatal() {
    let path = std::env::temp_dir().join(format!(
        "ct_hunter_pipeline_test_{}.db",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let db = ScanDb::open(&path).unwrap();

    // Drop the findings table out from under the store; the finding write
    // during the scan has nowhere to go.
    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute_batch("DROP TABLE findings;").unwrap();
    drop(raw);

    let scanner = scanner_with(&["a.example.com"], db, ScanConfig::default());
    let result = scanner.run_scan("example.com").await;
    assert!(result.is_err(), "a failed store write aborts the scan");

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn cancellation_mid_scan_returns_completed_findings_once() {
    let db = ScanDb::open_in_memory().unwrap();
    let token = CancellationToken::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let enricher = Arc::new(DeadlineEnricher {
        token: token.clone(),
        calls: calls.clone(),
    });
    let source = Arc::new(StubSource {
        names: vec![
            "a.example.com".to_string(),
            "b.example.com".to_string(),
            "c.example.com".to_string(),
        ],
    });
    // One worker: the second launch waits on the first worker's permit, by
    // which point the token has fired.
    let cfg = ScanConfig {
        concurrency: 1,
        ..ScanConfig::default()
    };
    let scanner = Scanner::with_parts(cfg, db.clone(), source, enricher);

    let findings = scanner
        .run_scan_with_cancel("example.com", token)
        .await
        .unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 1, "no new work after cancellation");
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].subdomain, "a.example.com");

    // The completed finding was persisted exactly once.
    let stored = db.findings_for_scan(1).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].subdomain, "a.example.com");
}

#[tokio::test]
async fn cancellation_stops_new_work_and_returns_what_was_collected() {
    let db = ScanDb::open_in_memory().unwrap();
    let scanner = scanner_with(
        &["a.example.com", "b.example.com", "c.example.com"],
        db,
        ScanConfig::default(),
    );

    let token = CancellationToken::new();
    token.cancel();

    let findings = scanner
        .run_scan_with_cancel("example.com", token)
        .await
        .unwrap();
    assert!(findings.is_empty());
}

#[tokio::test]
async fn dot_boundary_mode_is_configurable() {
    let names = ["notexample.com", "real.example.com"];

    let permissive = scanner_with(&names, ScanDb::open_in_memory().unwrap(), ScanConfig::default());
    let found: Vec<String> = permissive
        .run_scan("example.com")
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.subdomain)
        .collect();
    assert_eq!(found, vec!["notexample.com", "real.example.com"]);

    let strict_cfg = ScanConfig {
        dot_boundary: true,
        ..ScanConfig::default()
    };
    let strict = scanner_with(&names, ScanDb::open_in_memory().unwrap(), strict_cfg);
    let found: Vec<String> = strict
        .run_scan("example.com")
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.subdomain)
        .collect();
    assert_eq!(found, vec!["real.example.com"]);
}

#[tokio::test]
async fn max_subdomains_caps_a_scan() {
    let cfg = ScanConfig {
        max_subdomains: Some(1),
        ..ScanConfig::default()
    };
    let scanner = scanner_with(
        &["b.example.com", "a.example.com"],
        ScanDb::open_in_memory().unwrap(),
        cfg,
    );

    let findings = scanner.run_scan("example.com").await.unwrap();
    // Normalized order is sorted, so the cap keeps the first name.
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].subdomain, "a.example.com");
}
