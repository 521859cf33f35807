use std::net::Ipv4Addr;
use std::time::Duration;

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::ResolveError;
use hickory_resolver::TokioAsyncResolver;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DnsError {
    #[error("lookup failed: {0}")]
    Lookup(#[from] ResolveError),
    #[error("no A records")]
    NoRecords,
}

/// System-default resolver with a bounded per-query timeout.
pub fn create_resolver(timeout_secs: u64) -> TokioAsyncResolver {
    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_secs(timeout_secs);
    TokioAsyncResolver::tokio(ResolverConfig::default(), opts)
}

/// Resolve a hostname to its first IPv4 address.
pub async fn resolve_ipv4(resolver: &TokioAsyncResolver, name: &str) -> Result<Ipv4Addr, DnsError> {
    // Trailing dot: query the name as-is rather than walking search domains.
    let fqdn = format!("{}.", name.trim_end_matches('.'));
    let lookup = resolver.lookup_ip(fqdn).await?;
    lookup
        .iter()
        .find_map(|ip| match ip {
            std::net::IpAddr::V4(v4) => Some(v4),
            std::net::IpAddr::V6(_) => None,
        })
        .ok_or(DnsError::NoRecords)
}
