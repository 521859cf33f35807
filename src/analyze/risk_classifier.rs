use std::fmt;

use serde::{Deserialize, Serialize};

use crate::enrich::http_meta::HttpMetadata;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword table and banding thresholds, passed into `classify` explicitly
/// so alternate rule sets can be tested. Keywords are an ordered list: tags
/// append in table order, keeping output deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskRuleset {
    pub keywords: Vec<(String, i32)>,
    /// Added when the endpoint answered with a non-error status, a weak
    /// signal that the host is live.
    pub liveness_bonus: i32,
    pub critical_threshold: i32,
    pub high_threshold: i32,
    pub medium_threshold: i32,
}

impl RiskRuleset {
    pub fn band(&self, score: i32) -> Severity {
        if score >= self.critical_threshold {
            Severity::Critical
        } else if score >= self.high_threshold {
            Severity::High
        } else if score >= self.medium_threshold {
            Severity::Medium
        } else {
            Severity::Low
        }
    }
}

impl Default for RiskRuleset {
    fn default() -> Self {
        let keywords = [
            ("admin", 30),
            ("login", 15),
            ("staging", 20),
            ("test", 10),
            ("dev", 10),
            ("backup", 25),
            ("index of /", 40),
            ("wp-login.php", 35),
        ]
        .iter()
        .map(|(k, w)| (k.to_string(), *w))
        .collect();

        Self {
            keywords,
            liveness_bonus: 5,
            critical_threshold: 60,
            high_threshold: 35,
            medium_threshold: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub tags: Vec<String>,
    pub score: i32,
    pub severity: Severity,
}

/// Pure keyword-heuristic classification over the subdomain name, final
/// URL, page title and body snippet. No I/O; identical inputs always yield
/// identical output.
pub fn classify(ruleset: &RiskRuleset, subdomain: &str, http: &HttpMetadata) -> RiskAssessment {
    let blob = format!(
        "{} {} {} {}",
        subdomain, http.url, http.title, http.body_snippet
    )
    .to_lowercase();

    let mut tags = Vec::new();
    let mut score = 0;
    for (keyword, weight) in &ruleset.keywords {
        if blob.contains(keyword.as_str()) {
            tags.push(keyword.clone());
            score += weight;
        }
    }

    if let Some(status) = http.status_code {
        if (200..400).contains(&status) {
            score += ruleset.liveness_bonus;
        }
    }

    let severity = ruleset.band(score);
    RiskAssessment { tags, score, severity }
}
