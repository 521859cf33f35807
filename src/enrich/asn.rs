use std::net::Ipv4Addr;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const IPTOASN_URL: &str = "https://api.iptoasn.com/v1/as/ip";

/// Network-ownership metadata for a resolved address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsnInfo {
    pub asn: u32,
    pub description: String,
}

#[derive(Debug, Error)]
pub enum AsnError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("lookup service returned status {0}")]
    Status(u16),
    #[error("address is not announced")]
    Unannounced,
}

#[derive(Debug, Deserialize)]
struct IpToAsnResponse {
    announced: bool,
    as_number: Option<u32>,
    as_description: Option<String>,
}

/// Look up the announcing AS for an IP via the public iptoasn.com API.
pub async fn lookup_asn(client: &Client, ip: Ipv4Addr) -> Result<AsnInfo, AsnError> {
    let url = format!("{IPTOASN_URL}/{ip}");
    let resp = client.get(&url).send().await?;
    if !resp.status().is_success() {
        return Err(AsnError::Status(resp.status().as_u16()));
    }
    let body: IpToAsnResponse = resp.json().await?;
    if !body.announced {
        return Err(AsnError::Unannounced);
    }
    Ok(AsnInfo {
        asn: body.as_number.ok_or(AsnError::Unannounced)?,
        description: body.as_description.unwrap_or_default(),
    })
}
