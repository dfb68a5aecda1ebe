use crate::model::SubdomainRecord;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use std::{sync::Arc, time::Duration};
use tracing::debug;

pub const RESOLVE_DNS_TIMEOUT_MS: u64 = 4000;

/// Placeholder address for names that do not resolve, the response
/// schema stays uniform either way.
pub const UNKNOWN_IP: &str = "Unknown";

pub type DnsResolver = Arc<TokioAsyncResolver>;

pub fn new_resolver() -> DnsResolver {
    let mut opts = ResolverOpts::default();
    opts.timeout = Duration::from_millis(RESOLVE_DNS_TIMEOUT_MS);
    debug!("DNS resolver options: {:?}", opts);
    let dns_resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), opts);

    debug!("DNS resolver created: {:?}", dns_resolver);
    Arc::new(dns_resolver)
}

/// Resolution failures are absorbed here, the caller always gets a record.
pub async fn resolve(dns_resolver: &DnsResolver, subdomain: String) -> SubdomainRecord {
    match dns_resolver.lookup_ip(subdomain.as_str()).await {
        Ok(lookup_ip) => {
            debug!("{:12} - {:?}", "RESOLVED", lookup_ip);
            let ip = match lookup_ip.iter().next() {
                Some(addr) => addr.to_string(),
                None => UNKNOWN_IP.to_string(),
            };
            SubdomainRecord { subdomain, ip }
        }
        Err(err) => {
            debug!("{:12} - {:?}", "NOT RESOLVED", err);
            SubdomainRecord {
                subdomain,
                ip: UNKNOWN_IP.to_string(),
            }
        }
    }
}
