//! External DNSBL client lookups.
//!
//! Standard DNSBL pattern: reverse the IP octets and query an A record
//! under the provider zone. Checking `1.2.3.4` against `dnsbl.dronebl.org`
//! queries `4.3.2.1.dnsbl.dronebl.org`; any `127.0.0.X` answer means
//! listed, NXDOMAIN means clean.

use std::net::Ipv4Addr;

use hickory_resolver::error::ResolveErrorKind;
use hickory_resolver::{config::ResolverConfig, config::ResolverOpts, TokioAsyncResolver};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{EngineError, Result};

/// Client for one DNSBL provider zone.
pub struct DnsblClient {
    zone: String,
}

impl DnsblClient {
    /// Create a client for the given zone (e.g. `dnsbl.dronebl.org`).
    #[must_use]
    pub fn new(zone: impl Into<String>) -> Self {
        Self { zone: zone.into() }
    }

    /// Build the reversed-octet query name for an address.
    #[must_use]
    pub fn query_name(&self, addr: Ipv4Addr) -> String {
        let o = addr.octets();
        format!("{}.{}.{}.{}.{}.", o[3], o[2], o[1], o[0], self.zone)
    }

    /// Query the provider; `Ok(Some(tag))` when listed, `Ok(None)` when
    /// clean.
    pub async fn check(&self, addr: Ipv4Addr) -> Result<Option<Map<String, Value>>> {
        let name = self.query_name(addr);
        debug!(query = %name, "dnsbl lookup");

        let resolver =
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

        let response = match resolver.ipv4_lookup(name.clone()).await {
            Ok(response) => response,
            Err(err) => {
                if matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. }) {
                    return Ok(None);
                }
                return Err(EngineError::Dnsbl(format!("{name}: {err}")));
            }
        };

        let codes: Vec<Value> = response
            .iter()
            .map(|a| Value::String(Ipv4Addr::from(*a).to_string()))
            .collect();
        if codes.is_empty() {
            return Ok(None);
        }

        let mut tag = Map::new();
        tag.insert("source".into(), Value::String("dronebl".into()));
        tag.insert("name".into(), Value::String("DroneBL".into()));
        tag.insert("codes".into(), Value::Array(codes));
        Ok(Some(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_name_reverses_octets() {
        let client = DnsblClient::new("dnsbl.dronebl.org");
        assert_eq!(
            client.query_name(Ipv4Addr::new(1, 2, 3, 4)),
            "4.3.2.1.dnsbl.dronebl.org."
        );
        assert_eq!(
            client.query_name(Ipv4Addr::new(192, 168, 1, 100)),
            "100.1.168.192.dnsbl.dronebl.org."
        );
    }
}
