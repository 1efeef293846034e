//! Public-routability checks for hostnames and IP addresses.
//!
//! A host is considered safe only when it passes the textual denylist, resolves
//! to at least one address, and every resolved address is public.

use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

/// Hostnames that are always refused, matched exactly or as a parent domain.
const DENIED_HOSTNAMES: &[&str] = &[
    "localhost",
    "metadata.google.internal",
    "instance-data",
    "instance-data.ec2.internal",
];

/// Literal addresses that are refused without resolution.
const DENIED_LITERALS: &[&str] = &["127.0.0.1", "0.0.0.0", "::1", "255.255.255.255"];

/// Textual prefixes of loopback, link-local and multicast ranges.
const DENIED_PREFIXES: &[&str] = &[
    "127.", "169.254.", "224.", "225.", "226.", "227.", "228.", "229.", "230.", "231.", "232.",
    "233.", "234.", "235.", "236.", "237.", "238.", "239.",
];

/// Resolves a hostname to the set of addresses it points at.
///
/// # Implementations
///
/// - [`crate::infrastructure::network::SystemResolver`] - OS resolver via tokio
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Looks up every address for `host`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when resolution fails or times out.
    async fn lookup(&self, host: &str) -> io::Result<Vec<IpAddr>>;
}

/// Decides whether a hostname is safe to contact from the server.
#[derive(Clone)]
pub struct AddressSafety {
    resolver: Arc<dyn Resolver>,
}

impl AddressSafety {
    pub fn new(resolver: Arc<dyn Resolver>) -> Self {
        Self { resolver }
    }

    /// Returns `true` only if every address `hostname` resolves to is public.
    ///
    /// Fails closed: a resolution error or an empty answer is "not routable".
    pub async fn is_publicly_routable(&self, hostname: &str) -> bool {
        let host = strip_brackets(hostname).to_ascii_lowercase();

        if host.is_empty() || is_denied_hostname(&host) {
            tracing::debug!(host = %host, "Host matches denylist");
            return false;
        }

        if let Ok(ip) = host.parse::<IpAddr>() {
            return is_public_ip(ip);
        }

        let addresses = match self.resolver.lookup(&host).await {
            Ok(addresses) => addresses,
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "DNS resolution failed");
                return false;
            }
        };

        if addresses.is_empty() {
            tracing::debug!(host = %host, "DNS resolution returned no addresses");
            return false;
        }

        match addresses.iter().find(|ip| !is_public_ip(**ip)) {
            Some(ip) => {
                tracing::warn!(host = %host, address = %ip, "Host resolves to a non-public address");
                false
            }
            None => true,
        }
    }
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// Returns `true` if the lowercase host matches the textual denylist.
pub fn is_denied_hostname(host: &str) -> bool {
    let host = host.trim_end_matches('.');

    if DENIED_LITERALS.contains(&host) {
        return true;
    }

    if DENIED_HOSTNAMES
        .iter()
        .any(|denied| host == *denied || host.ends_with(&format!(".{denied}")))
    {
        return true;
    }

    DENIED_PREFIXES.iter().any(|prefix| host.starts_with(prefix))
}

/// Returns `true` if the address is publicly routable.
pub fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_ipv4(v4),
        IpAddr::V6(v6) => is_public_ipv6(v6),
    }
}

fn is_public_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, _, _] = ip.octets();
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_unspecified()
        // 0.0.0.0/8 reaches the local host on most stacks
        || a == 0
        || ip.is_multicast()
        || ip.is_broadcast()
        || ip.is_link_local()
        // 169.254.0.0/16, some classifiers miss it
        || (a == 169 && b == 254)
        // 224.0.0.0 - 239.255.255.255
        || (224..=239).contains(&a))
}

fn is_public_ipv6(ip: Ipv6Addr) -> bool {
    if let Some(v4) = embedded_ipv4(ip) {
        return is_public_ipv4(v4);
    }

    let segments = ip.segments();
    !(ip.is_loopback()
        || ip.is_unspecified()
        || ip.is_multicast()
        // fc00::/7 unique local
        || (segments[0] & 0xfe00) == 0xfc00
        // fe80::/10 link local
        || (segments[0] & 0xffc0) == 0xfe80)
}

/// IPv4 address carried by mapped (`::ffff:a.b.c.d`), NAT64 (`64:ff9b::/96`)
/// or IPv4-compatible (`::a.b.c.d`) forms.
fn embedded_ipv4(ip: Ipv6Addr) -> Option<Ipv4Addr> {
    if let Some(v4) = ip.to_ipv4_mapped() {
        return Some(v4);
    }

    let [tail_hi, tail_lo] = [ip.segments()[6], ip.segments()[7]];
    let tail = Ipv4Addr::new(
        (tail_hi >> 8) as u8,
        tail_hi as u8,
        (tail_lo >> 8) as u8,
        tail_lo as u8,
    );

    match ip.segments() {
        [0x64, 0xff9b, 0, 0, 0, 0, _, _] | [0, 0, 0, 0, 0, 0, _, _] => Some(tail),
        _ => None,
    }
}
