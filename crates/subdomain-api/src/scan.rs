use crate::dns::{self, DnsResolver};
use crate::model::EnumerationReport;
use crate::runner::{filter_candidates, ToolError, ToolRunner};
use futures::{stream, StreamExt};
use tracing::{info, instrument};

const RESOLVE_DNS_CONCURRENCY: usize = 100;

/// Full pipeline for one domain: run the tool, filter its output into
/// candidates, resolve each one. `buffered` keeps the response order equal
/// to the tool's output order, one record per candidate line.
#[instrument(name = "enumerate", level = "info", skip_all, fields(domain = domain))]
pub async fn enumerate(
    runner: &dyn ToolRunner,
    dns_resolver: &DnsResolver,
    domain: &str,
) -> core::result::Result<EnumerationReport, ToolError> {
    let output = runner.run(domain).await?;

    let candidates = filter_candidates(domain, &output.logs);
    info!("{:12} - {:?}", "TO RESOLVE", candidates.len());

    let subdomains = stream::iter(candidates.into_iter())
        .map(|candidate| dns::resolve(dns_resolver, candidate))
        .buffered(RESOLVE_DNS_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    info!("{:12} - {:?}", "RESOLVED", subdomains.len());
    Ok(EnumerationReport {
        subdomains,
        logs: output.logs,
    })
}
