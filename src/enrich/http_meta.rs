use std::collections::HashMap;

use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

/// Characters of response body kept for classification.
pub const BODY_SNIPPET_CHARS: usize = 500;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("valid selector"));

/// Web metadata for one subdomain. When both schemes fail, `url` records the
/// first attempted URL and everything else stays absent/empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpMetadata {
    pub url: String,
    pub status_code: Option<u16>,
    pub headers: HashMap<String, String>,
    pub title: String,
    pub body_snippet: String,
}

impl HttpMetadata {
    pub fn unreachable(attempted_url: String) -> Self {
        Self {
            url: attempted_url,
            ..Default::default()
        }
    }
}

/// Fetch basic HTTP metadata, trying HTTPS first and falling back to HTTP.
/// Never fails: an unreachable host yields an empty record.
pub async fn fetch_http_metadata(client: &Client, subdomain: &str) -> HttpMetadata {
    let candidates = [format!("https://{subdomain}"), format!("http://{subdomain}")];

    for url in &candidates {
        match client.get(url).send().await {
            Ok(resp) => {
                let final_url = resp.url().to_string();
                let status = resp.status().as_u16();
                let headers = resp
                    .headers()
                    .iter()
                    .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                    .collect();
                let body = resp.text().await.unwrap_or_default();
                return HttpMetadata {
                    url: final_url,
                    status_code: Some(status),
                    headers,
                    title: extract_title(&body),
                    body_snippet: body.chars().take(BODY_SNIPPET_CHARS).collect(),
                };
            }
            Err(e) => {
                tracing::debug!(%url, error = %e, "metadata fetch attempt failed");
            }
        }
    }

    HttpMetadata::unreachable(candidates[0].clone())
}

/// Text of the first `<title>` element, if any. The HTML parser handles
/// case-insensitive tag matching.
fn extract_title(body: &str) -> String {
    let doc = Html::parse_document(body);
    doc.select(&TITLE_SELECTOR)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}
