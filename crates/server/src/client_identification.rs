mod middleware;

use std::net::{IpAddr, SocketAddr};

use chat::ClientIdentity;
use config::ClientIdentificationConfig;
use http::{HeaderMap, header::USER_AGENT};
use sha2::{Digest, Sha256};

pub use middleware::ClientIdentificationLayer;

/// Derive the rate limiting key of a request.
///
/// The configured forwarded headers are tried in order and the first one carrying a valid IP
/// address wins. For comma-separated headers such as `x-forwarded-for` only the first entry,
/// the original client, is considered. Without a usable header the key is a hash of the user
/// agent and the API key header, so it is deterministic per client and never empty.
pub fn resolve_client_identity(headers: &HeaderMap, config: &ClientIdentificationConfig) -> ClientIdentity {
    for name in &config.forwarded_headers {
        let Some(value) = headers.get(name.as_str()).and_then(|value| value.to_str().ok()) else {
            continue;
        };

        let candidate = value.split(',').next().unwrap_or_default().trim();

        match parse_address(candidate) {
            Some(address) => return ClientIdentity::new(address.to_string()),
            None => log::debug!("Ignoring '{name}' header without a valid address: {value}"),
        }
    }

    let user_agent = header_str(headers, USER_AGENT.as_str());
    let api_key = header_str(headers, &config.api_key_header);

    let mut hasher = Sha256::new();
    hasher.update(user_agent.as_bytes());
    hasher.update(b"\n");
    hasher.update(api_key.as_bytes());

    let digest = format!("{:x}", hasher.finalize());

    ClientIdentity::new(format!("anon:{}", &digest[..16]))
}

fn parse_address(candidate: &str) -> Option<IpAddr> {
    candidate
        .parse::<IpAddr>()
        .or_else(|_| candidate.parse::<SocketAddr>().map(|address| address.ip()))
        .ok()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}
