use reqwest::{Client, ClientBuilder};
use std::time::Duration;

const USER_AGENT: &str = "ct-hunter/0.1 (passive subdomain recon)";

/// Client for per-subdomain metadata fetches: short timeout, bounded
/// redirects, certificate validation on. This tool is read-only recon, so
/// it should only ever see what a regular browser would.
pub fn create_metadata_client(timeout_secs: u64) -> Client {
    ClientBuilder::new()
        // Connection pooling - subdomains of one root often share hosts
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Some(Duration::from_secs(90)))
        .tcp_keepalive(Some(Duration::from_secs(60)))
        .tcp_nodelay(true)

        // Timeouts
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(timeout_secs.min(5)))

        // Compression
        .gzip(true)
        .brotli(true)

        // TLS
        .use_rustls_tls()

        // Redirects
        .redirect(reqwest::redirect::Policy::limited(5))

        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to build HTTP client")
}

/// Client for the CT log and ASN lookup services. Longer timeout: crt.sh
/// responses for busy domains can take tens of seconds.
pub fn create_lookup_client(timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .use_rustls_tls()
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        // Builder panics on invalid configuration, so constructing both
        // clients is the whole test.
        let _ = create_metadata_client(5);
        let _ = create_lookup_client(30);
    }
}
