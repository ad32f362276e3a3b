use url::Host;

use crate::error::ScanError;

/// Normalizes a user supplied target into the host part of a `host:port` address.
///
/// Domains are kept as given and are only resolved later, when dialing. IPv6
/// addresses must come bracketed and are rendered bracketed.
pub fn parse_host(target: &str) -> Result<String, ScanError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ScanError::EmptyHost);
    }

    let host = Host::parse(target).map_err(ScanError::HostParseFailed)?;

    match host {
        Host::Domain(ref dmn) => log::debug!("Target `{}` is a domain", dmn),
        Host::Ipv4(ip) => log::debug!("Target `{}` is an IPv4 address", ip),
        Host::Ipv6(ip) => log::debug!("Target `{}` is an IPv6 address", ip),
    }

    Ok(host.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_domains_and_ipv4() {
        assert_eq!(parse_host("localhost").unwrap(), "localhost");
        assert_eq!(parse_host(" 192.168.1.1 ").unwrap(), "192.168.1.1");
    }

    #[test]
    fn brackets_ipv6() {
        assert_eq!(parse_host("[::1]").unwrap(), "[::1]");
    }

    #[test]
    fn rejects_empty_and_malformed() {
        assert!(matches!(parse_host("  "), Err(ScanError::EmptyHost)));
        assert!(matches!(
            parse_host("::1"),
            Err(ScanError::HostParseFailed(_))
        ));
    }
}
