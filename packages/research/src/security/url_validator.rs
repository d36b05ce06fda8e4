//! SSRF checks for candidate URLs.
//!
//! Search results are untrusted input: a provider can hand back any URL,
//! including ones that point into the host's own network. Every page fetch is
//! checked here first.

use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::IpNet;
use url::Url;

use crate::error::{SecurityError, SecurityResult};

const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "::1",
    "[::1]",
    "0.0.0.0",
    "metadata.google.internal",
    "metadata.gke.internal",
    "instance-data",
];

const BLOCKED_CIDRS: &[&str] = &[
    "0.0.0.0/8",
    "10.0.0.0/8",
    "100.64.0.0/10", // carrier-grade NAT
    "127.0.0.0/8",
    "169.254.0.0/16", // link-local, cloud metadata
    "172.16.0.0/12",
    "192.168.0.0/16",
    "::1/128",
    "fc00::/7",
    "fe80::/10",
];

/// Rejects URLs that are not plain HTTP(S) to a public host.
#[derive(Debug, Clone)]
pub struct UrlValidator {
    blocked_hosts: HashSet<String>,
    blocked_cidrs: Vec<IpNet>,
    /// Hosts that skip every other check (test servers).
    allowed_hosts: HashSet<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    pub fn new() -> Self {
        Self {
            blocked_hosts: BLOCKED_HOSTS.iter().map(|h| h.to_string()).collect(),
            blocked_cidrs: BLOCKED_CIDRS.iter().filter_map(|c| c.parse().ok()).collect(),
            allowed_hosts: HashSet::new(),
        }
    }

    /// Let a host through unconditionally.
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }

    /// Block an additional host.
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into());
        self
    }

    /// Block an additional CIDR range.
    pub fn block_cidr(mut self, cidr: IpNet) -> Self {
        self.blocked_cidrs.push(cidr);
        self
    }

    /// Static checks: scheme, host list, literal IPs.
    pub fn validate(&self, url: &str) -> SecurityResult<()> {
        let parsed = Url::parse(url)?;
        self.check_parsed(&parsed).map(|_| ())
    }

    /// Static checks plus DNS resolution of the host, so a public-looking name
    /// that resolves into a blocked range is rejected too.
    pub async fn validate_with_dns(&self, url: &str) -> SecurityResult<()> {
        let parsed = Url::parse(url)?;
        let Some(host) = self.check_parsed(&parsed)? else {
            return Ok(());
        };

        let port = parsed.port_or_known_default().unwrap_or(80);
        let addrs = tokio::net::lookup_host((host.as_str(), port))
            .await
            .map_err(|e| SecurityError::DnsResolution(format!("{}: {}", host, e)))?;

        for addr in addrs {
            self.check_ip(&addr.ip()).map_err(|_| {
                SecurityError::BlockedCidr(format!("{} resolved to {}", host, addr.ip()))
            })?;
        }

        Ok(())
    }

    /// Returns the host name still needing DNS resolution, if any.
    fn check_parsed(&self, parsed: &Url) -> SecurityResult<Option<String>> {
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(SecurityError::DisallowedScheme(other.to_string())),
        }

        let host = parsed.host_str().ok_or(SecurityError::NoHost)?;
        if self.allowed_hosts.contains(host) {
            return Ok(None);
        }
        if self.blocked_hosts.contains(host) {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }

        let bare = host.trim_start_matches('[').trim_end_matches(']');
        match bare.parse::<IpAddr>() {
            Ok(ip) => self.check_ip(&ip).map(|_| None),
            Err(_) => Ok(Some(host.to_string())),
        }
    }

    fn check_ip(&self, ip: &IpAddr) -> SecurityResult<()> {
        if self.blocked_cidrs.iter().any(|cidr| cidr.contains(ip)) {
            return Err(SecurityError::BlockedCidr(ip.to_string()));
        }
        Ok(())
    }
}
