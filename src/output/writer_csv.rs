use csv::Writer;
use std::fs::File;
use std::path::Path;

use crate::pipeline::Finding;

pub fn write_csv(path: &Path, findings: &[Finding]) -> anyhow::Result<()> {
    let f = File::create(path)?;
    let mut w = Writer::from_writer(f);
    w.write_record([
        "subdomain",
        "ip",
        "asn",
        "asn_description",
        "status_code",
        "title",
        "severity",
        "risk_score",
        "risk_tags",
        "is_new",
    ])?;
    for it in findings {
        w.write_record(&[
            it.subdomain.clone(),
            it.ip.clone().unwrap_or_default(),
            it.asn.map(|v| v.to_string()).unwrap_or_default(),
            it.asn_description.clone().unwrap_or_default(),
            it.status_code.map(|v| v.to_string()).unwrap_or_default(),
            it.title.clone().unwrap_or_default(),
            it.severity.as_str().to_string(),
            it.risk_score.to_string(),
            it.risk_tags.join(", "),
            it.is_new.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
