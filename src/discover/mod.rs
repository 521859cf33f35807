pub mod crtsh;

pub use crtsh::CrtShClient;

/// A source of raw candidate hostnames for a root domain. The pipeline only
/// depends on this trait, so tests can swap in a canned source.
#[async_trait::async_trait]
pub trait NameSource: Send + Sync {
    async fn fetch_names(&self, root_domain: &str) -> anyhow::Result<Vec<String>>;
}
