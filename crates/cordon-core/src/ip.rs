//! IPv4 address and CIDR arithmetic.
//!
//! Every address is carried through the system as its unsigned 32-bit
//! big-endian integer form (`ip_int`). A CIDR becomes the closed interval
//! `[network, broadcast]` in that space; a bare address becomes the
//! degenerate interval `[ip, ip]`.

use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::error::{CoreError, Result};

/// Convert a dotted-quad string to its 32-bit integer form.
///
/// Rejects anything `std::net::Ipv4Addr` rejects: out-of-range octets,
/// missing octets, leading `+`/whitespace, IPv6.
pub fn ip_to_int(s: &str) -> Result<u32> {
    let addr: Ipv4Addr = s
        .parse()
        .map_err(|_| CoreError::InvalidIp(s.to_string()))?;
    Ok(u32::from(addr))
}

/// Convert a 32-bit integer back to dotted-quad form.
#[must_use]
pub fn int_to_ip(n: u32) -> String {
    Ipv4Addr::from(n).to_string()
}

/// Parse a CIDR or single address into a closed `[start, end]` interval.
///
/// `10.0.0.0/24` covers `10.0.0.0` through `10.0.0.255` inclusive (the
/// network and broadcast addresses are part of the range — source lists
/// publish address *space*, not host sets). `1.2.3.4` covers exactly itself.
///
/// IPv6 input is reported as [`CoreError::InvalidNetwork`]; callers on the
/// feed path treat that as "silently drop".
pub fn network_to_range(s: &str) -> Result<(u32, u32)> {
    if let Some((_addr, _len)) = s.split_once('/') {
        let net: Ipv4Net = s
            .parse()
            .map_err(|_| CoreError::InvalidNetwork(s.to_string()))?;
        Ok((u32::from(net.network()), u32::from(net.broadcast())))
    } else {
        let n = ip_to_int(s).map_err(|_| CoreError::InvalidNetwork(s.to_string()))?;
        Ok((n, n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ip_to_int() {
        assert_eq!(ip_to_int("0.0.0.0").unwrap(), 0);
        assert_eq!(ip_to_int("0.0.0.1").unwrap(), 1);
        assert_eq!(ip_to_int("1.2.3.4").unwrap(), 0x0102_0304);
        assert_eq!(ip_to_int("255.255.255.255").unwrap(), u32::MAX);
    }

    #[test]
    fn test_ip_to_int_rejects_garbage() {
        assert!(ip_to_int("not.an.ip").is_err());
        assert!(ip_to_int("256.1.1.1").is_err());
        assert!(ip_to_int("1.2.3").is_err());
        assert!(ip_to_int("1.2.3.4.5").is_err());
        assert!(ip_to_int("").is_err());
        assert!(ip_to_int("::1").is_err());
    }

    #[test]
    fn test_int_to_ip_roundtrip() {
        for s in ["0.0.0.0", "10.0.0.128", "172.16.254.1", "255.255.255.255"] {
            assert_eq!(int_to_ip(ip_to_int(s).unwrap()), s);
        }
    }

    #[test]
    fn test_network_to_range_cidr() {
        let (a, b) = network_to_range("10.0.0.0/24").unwrap();
        assert_eq!(a, ip_to_int("10.0.0.0").unwrap());
        assert_eq!(b, ip_to_int("10.0.0.255").unwrap());

        let (a, b) = network_to_range("10.0.0.128/25").unwrap();
        assert_eq!(a, ip_to_int("10.0.0.128").unwrap());
        assert_eq!(b, ip_to_int("10.0.0.255").unwrap());
    }

    #[test]
    fn test_network_to_range_host() {
        let (a, b) = network_to_range("1.1.1.1").unwrap();
        assert_eq!(a, b);
        assert_eq!(a, ip_to_int("1.1.1.1").unwrap());

        // /32 behaves like a bare host.
        let (a, b) = network_to_range("1.1.1.1/32").unwrap();
        assert_eq!((a, b), (ip_to_int("1.1.1.1").unwrap(), ip_to_int("1.1.1.1").unwrap()));
    }

    #[test]
    fn test_network_to_range_whole_space() {
        let (a, b) = network_to_range("0.0.0.0/0").unwrap();
        assert_eq!(a, 0);
        assert_eq!(b, u32::MAX);
    }

    #[test]
    fn test_network_to_range_rejects_ipv6() {
        assert!(network_to_range("2600:1f18::/32").is_err());
        assert!(network_to_range("::1").is_err());
    }
}
