use std::collections::BTreeSet;

/// Canonicalize raw CT names into a sorted, deduplicated list scoped to the
/// root domain: lowercase, trimmed, wildcard prefix stripped, out-of-scope
/// names and the root itself dropped. Sorted output keeps novelty detection
/// and reports stable across runs.
///
/// `dot_boundary` controls the suffix check: false reproduces the permissive
/// plain-suffix match (notexample.com matches root example.com), true
/// requires a ".{root}" boundary.
pub fn normalize_subdomains(raw: &[String], root_domain: &str, dot_boundary: bool) -> Vec<String> {
    let root = root_domain.trim().to_lowercase();
    let mut normalized = BTreeSet::new();

    for name in raw {
        let mut s = name.trim().to_lowercase();
        if s.is_empty() {
            continue;
        }
        if let Some(stripped) = s.strip_prefix("*.") {
            s = stripped.to_string();
        }
        if s == root || !s.ends_with(&root) {
            continue;
        }
        if dot_boundary && s.as_bytes()[s.len() - root.len() - 1] != b'.' {
            continue;
        }
        normalized.insert(s);
    }

    normalized.into_iter().collect()
}
