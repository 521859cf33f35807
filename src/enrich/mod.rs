pub mod asn;
pub mod dns;
pub mod http_meta;

pub use asn::AsnInfo;
pub use http_meta::HttpMetadata;

use std::net::Ipv4Addr;

use hickory_resolver::TokioAsyncResolver;
use reqwest::Client;

use crate::config::ScanConfig;
use crate::http_client::{create_lookup_client, create_metadata_client};

/// Everything the network could tell us about one subdomain. Absent fields
/// mean the corresponding lookup failed, which is never an error here.
#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    pub ip: Option<Ipv4Addr>,
    pub asn: Option<AsnInfo>,
    pub http: HttpMetadata,
}

/// Seam between the pipeline and the network. Tests substitute a canned
/// implementation so the orchestrator runs offline.
#[async_trait::async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, subdomain: &str) -> Enrichment;
}

/// Real enricher: DNS resolution, ASN lookup on the resolved address, and
/// an HTTP metadata fetch. The HTTP fetch runs concurrently with the
/// DNS-then-ASN chain; each lookup degrades to absence on failure.
pub struct NetworkEnricher {
    resolver: TokioAsyncResolver,
    metadata_client: Client,
    lookup_client: Client,
}

impl NetworkEnricher {
    pub fn new(cfg: &ScanConfig) -> Self {
        Self {
            resolver: dns::create_resolver(cfg.dns_timeout_secs),
            metadata_client: create_metadata_client(cfg.http_timeout_secs),
            lookup_client: create_lookup_client(cfg.http_timeout_secs),
        }
    }
}

#[async_trait::async_trait]
impl Enricher for NetworkEnricher {
    async fn enrich(&self, subdomain: &str) -> Enrichment {
        let network = async {
            let ip = match dns::resolve_ipv4(&self.resolver, subdomain).await {
                Ok(ip) => Some(ip),
                Err(e) => {
                    tracing::debug!(%subdomain, error = %e, "DNS resolution failed");
                    None
                }
            };
            let asn = match ip {
                Some(ip) => match asn::lookup_asn(&self.lookup_client, ip).await {
                    Ok(info) => Some(info),
                    Err(e) => {
                        tracing::debug!(%subdomain, %ip, error = %e, "ASN lookup failed");
                        None
                    }
                },
                None => None,
            };
            (ip, asn)
        };

        let http = http_meta::fetch_http_metadata(&self.metadata_client, subdomain);

        let ((ip, asn), http) = tokio::join!(network, http);
        Enrichment { ip, asn, http }
    }
}
