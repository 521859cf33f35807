use anyhow::{bail, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::discover::NameSource;
use crate::http_client::create_lookup_client;

/// Queries the public crt.sh JSON interface for certificate records issued
/// under a domain.
pub struct CrtShClient {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct CrtShEntry {
    common_name: Option<String>,
    name_value: Option<String>,
}

impl CrtShClient {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: create_lookup_client(timeout_secs),
        }
    }
}

#[async_trait::async_trait]
impl NameSource for CrtShClient {
    async fn fetch_names(&self, root_domain: &str) -> Result<Vec<String>> {
        let q = format!("%.{}", root_domain);
        let url = format!("https://crt.sh/?q={}&output=json", urlencoding::encode(&q));
        tracing::debug!(%url, "querying crt.sh");

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            bail!("crt.sh returned status {}", resp.status());
        }

        let txt = resp.text().await?;
        // crt.sh sometimes returns an HTML error page instead of JSON; the
        // parse error surfaces here and the pipeline degrades to zero names.
        let entries: Vec<CrtShEntry> = serde_json::from_str(&txt)?;

        let names = extract_names(&entries);
        tracing::info!(entries = entries.len(), names = names.len(), "crt.sh query complete");
        Ok(names)
    }
}

/// Pull every hostname out of the returned records. `name_value` can encode
/// multiple names separated by newlines.
fn extract_names(entries: &[CrtShEntry]) -> Vec<String> {
    let mut out = Vec::new();
    for entry in entries {
        if let Some(cn) = &entry.common_name {
            push_names(&mut out, cn);
        }
        if let Some(nv) = &entry.name_value {
            push_names(&mut out, nv);
        }
    }
    out
}

fn push_names(out: &mut Vec<String>, field: &str) {
    for name in field.split('\n') {
        let name = name.trim();
        if !name.is_empty() {
            out.push(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_newline_delimited_names() {
        let json = r#"[
            {"common_name": "www.example.com", "name_value": "www.example.com\napi.example.com"},
            {"common_name": null, "name_value": "*.example.com\n\n  mail.example.com  "}
        ]"#;
        let entries: Vec<CrtShEntry> = serde_json::from_str(json).unwrap();
        let names = extract_names(&entries);
        assert_eq!(
            names,
            vec![
                "www.example.com",
                "www.example.com",
                "api.example.com",
                "*.example.com",
                "mail.example.com",
            ]
        );
    }

    #[test]
    fn tolerates_missing_fields() {
        let json = r#"[{"common_name": null, "name_value": null}]"#;
        let entries: Vec<CrtShEntry> = serde_json::from_str(json).unwrap();
        assert!(extract_names(&entries).is_empty());
    }
}
