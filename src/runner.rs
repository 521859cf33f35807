use std::path::{Path, PathBuf};

use crate::cli::{Cli, Commands};
use ct_hunter::config::ScanConfig;
use ct_hunter::pipeline::Scanner;
use ct_hunter::store::db::ScanDb;

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    // Configure logging based on global flags.
    // Keep external crates (reqwest/hyper) at INFO to avoid flooding the CLI.
    use tracing_subscriber::EnvFilter;
    let crate_level = if cli.debug { "debug" } else if cli.verbose { "info" } else { "warn" };
    let filter_str = format!("ct_hunter={crate_level},reqwest=info,hyper=info,h2=info");
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Scan { domain, db, out, concurrency, timeout, limit, dot_boundary } => {
            run_scan_command(domain, db, out, concurrency, timeout, limit, dot_boundary).await
        }
        Commands::History { domain, db } => run_history_command(&domain, &db),
    }
}

async fn run_scan_command(
    target: String,
    db: String,
    out: Option<String>,
    concurrency: usize,
    timeout: u64,
    limit: Option<usize>,
    dot_boundary: bool,
) -> anyhow::Result<()> {
    // Accept a full URL and reduce it to its host so the pipeline always
    // sees a bare domain.
    let domain = if target.starts_with("http://") || target.starts_with("https://") {
        match url::Url::parse(&target) {
            Ok(u) => u.host_str().map(|s| s.to_string()).unwrap_or(target.clone()),
            Err(_) => target.clone(),
        }
    } else {
        target.clone()
    };

    let cfg = ScanConfig {
        concurrency,
        http_timeout_secs: timeout,
        max_subdomains: limit,
        dot_boundary,
        db_path: PathBuf::from(&db),
        ..ScanConfig::default()
    };

    tracing::info!(domain = %domain, db = %db, concurrency, timeout, dot_boundary, "Starting scan");

    let store = ScanDb::open(&cfg.db_path)?;
    let scanner = Scanner::new(cfg, store);
    let findings = scanner.run_scan(&domain).await?;

    println!("\nScan complete. {} subdomains evaluated.\n", findings.len());
    for f in &findings {
        let marker = if f.is_new { "[NEW]" } else { "     " };
        println!(
            "{} {:40} {:8} score={:3} ip={}",
            marker,
            f.subdomain,
            f.severity.as_str(),
            f.risk_score,
            f.ip.as_deref().unwrap_or("-"),
        );
    }

    if let Some(path) = out {
        ct_hunter::output::write_csv(Path::new(&path), &findings)?;
        println!("\nWrote CSV report to {path}");
    }

    Ok(())
}

fn run_history_command(domain: &str, db: &str) -> anyhow::Result<()> {
    let store = ScanDb::open(Path::new(db))?;
    let rows = store.subdomain_history(&domain.trim().to_lowercase())?;

    if rows.is_empty() {
        println!("No subdomains recorded for {domain}.");
        return Ok(());
    }

    println!("{} subdomains recorded for {domain}:\n", rows.len());
    for r in rows {
        println!(
            "{:40} first seen {}  last seen {}",
            r.name, r.first_seen, r.last_seen
        );
    }
    Ok(())
}
