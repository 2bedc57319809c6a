//! SSRF protection: classifies resolved addresses as internal/reserved and
//! resolves hostnames before anything is fetched.

use std::collections::HashMap;
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use url::{Host, Url};

/// Check whether an IP address is private, loopback, link-local, or otherwise
/// not a routable public destination.
pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => is_private_v6(v6),
    }
}

fn is_private_v4(v4: &Ipv4Addr) -> bool {
    let [a, b, c, _] = v4.octets();
    v4.is_loopback()
        || v4.is_private()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.is_broadcast()
        || v4.is_multicast()
        || a == 0 // "this network" 0.0.0.0/8
        || (a == 100 && (b & 0xc0) == 64) // shared address space 100.64.0.0/10
        || (a == 192 && b == 0 && c == 0) // protocol assignments 192.0.0.0/24
        || (a == 192 && b == 0 && c == 2) // TEST-NET-1
        || (a == 198 && b == 51 && c == 100) // TEST-NET-2
        || (a == 203 && b == 0 && c == 113) // TEST-NET-3
        || (a == 198 && (b & 0xfe) == 18) // benchmarking 198.18.0.0/15
        || a >= 240 // reserved 240.0.0.0/4
}

fn is_private_v6(v6: &Ipv6Addr) -> bool {
    if let Some(v4) = v6.to_ipv4_mapped() {
        return is_private_v4(&v4);
    }
    let segs = v6.segments();
    v6.is_loopback()
        || v6.is_unspecified()
        || v6.is_multicast()
        || (segs[0] & 0xfe00) == 0xfc00 // unique-local fc00::/7
        || (segs[0] & 0xffc0) == 0xfe80 // link-local fe80::/10
        || (segs[0] & 0xffc0) == 0xfec0 // site-local fec0::/10
        || (segs[0] == 0x2001 && segs[1] == 0x0db8) // documentation 2001:db8::/32
        || (segs[0] == 0x0100 && segs[1] == 0 && segs[2] == 0 && segs[3] == 0) // discard 100::/64
}

/// Check whether a hostname string names the local machine without needing
/// a lookup.
pub fn is_private_host(host: &str) -> bool {
    let bare = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
        .trim_end_matches('.');
    if bare.eq_ignore_ascii_case("localhost") || bare.to_ascii_lowercase().ends_with(".localhost")
    {
        return true;
    }
    if let Ok(ip) = bare.parse::<IpAddr>() {
        return is_private_ip(&ip);
    }
    false
}

pub type LookupFuture<'a> = Pin<Box<dyn Future<Output = io::Result<Vec<IpAddr>>> + Send + 'a>>;

/// Resolves a hostname to every address it points at.
pub trait HostLookup: Send + Sync {
    fn lookup<'a>(&'a self, host: &'a str, port: u16) -> LookupFuture<'a>;
}

/// Lookup through the operating system resolver.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLookup;

impl HostLookup for SystemLookup {
    fn lookup<'a>(&'a self, host: &'a str, port: u16) -> LookupFuture<'a> {
        Box::pin(async move {
            let addrs = tokio::net::lookup_host((host, port)).await?;
            Ok(addrs.map(|addr| addr.ip()).collect())
        })
    }
}

/// Fixed host table; unknown hosts fail to resolve.
#[derive(Debug, Clone, Default)]
pub struct StaticLookup {
    hosts: HashMap<String, Vec<IpAddr>>,
}

impl StaticLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(
        mut self,
        host: impl Into<String>,
        addrs: impl IntoIterator<Item = IpAddr>,
    ) -> Self {
        self.hosts
            .insert(host.into().to_ascii_lowercase(), addrs.into_iter().collect());
        self
    }
}

impl HostLookup for StaticLookup {
    fn lookup<'a>(&'a self, host: &'a str, _port: u16) -> LookupFuture<'a> {
        Box::pin(async move {
            self.hosts
                .get(&host.to_ascii_lowercase())
                .cloned()
                .ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, format!("no such host: {host}"))
                })
        })
    }
}

/// Why a URL was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    NoHost,
    LocalName(String),
    PrivateAddress(IpAddr),
    LookupFailed(String),
    NoAddresses,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoHost => write!(f, "URL has no host"),
            Self::LocalName(host) => write!(f, "host '{host}' names the local machine"),
            Self::PrivateAddress(ip) => write!(f, "resolves to private address {ip}"),
            Self::LookupFailed(err) => write!(f, "lookup failed: {err}"),
            Self::NoAddresses => write!(f, "lookup returned no addresses"),
        }
    }
}

impl std::error::Error for BlockReason {}

/// Resolve the URL's host and require every address to be public.
///
/// Fails closed: a failed or empty lookup blocks the URL.
pub async fn check_public_url(lookup: &dyn HostLookup, url: &Url) -> Result<(), BlockReason> {
    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = match url.host() {
        None => return Err(BlockReason::NoHost),
        Some(Host::Ipv4(v4)) => vec![IpAddr::V4(v4)],
        Some(Host::Ipv6(v6)) => vec![IpAddr::V6(v6)],
        Some(Host::Domain(domain)) => {
            if is_private_host(domain) {
                return Err(BlockReason::LocalName(domain.to_string()));
            }
            lookup
                .lookup(domain, port)
                .await
                .map_err(|e| BlockReason::LookupFailed(e.to_string()))?
        }
    };
    require_public(&addrs)
}

fn require_public(addrs: &[IpAddr]) -> Result<(), BlockReason> {
    if addrs.is_empty() {
        return Err(BlockReason::NoAddresses);
    }
    match addrs.iter().find(|ip| is_private_ip(ip)) {
        Some(ip) => Err(BlockReason::PrivateAddress(*ip)),
        None => Ok(()),
    }
}

/// DNS for the HTTP client: every name the transport connects to goes
/// through `lookup` again and is refused when any answer is private.
///
/// A host that passed [`check_public_url`] can still answer differently
/// when the connection is made.
pub struct PublicAddressResolver {
    lookup: Arc<dyn HostLookup>,
}

impl PublicAddressResolver {
    pub fn new(lookup: Arc<dyn HostLookup>) -> Self {
        Self { lookup }
    }
}

impl Resolve for PublicAddressResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(resolve_public(Arc::clone(&self.lookup), name))
    }
}

async fn resolve_public(
    lookup: Arc<dyn HostLookup>,
    name: Name,
) -> Result<Addrs, Box<dyn std::error::Error + Send + Sync>> {
    let host = name.as_str();
    if is_private_host(host) {
        return Err(BlockReason::LocalName(host.to_string()).into());
    }
    let ips = lookup.lookup(host, 0).await?;
    require_public(&ips)?;
    Ok(Box::new(ips.into_iter().map(|ip| SocketAddr::new(ip, 0))))
}
