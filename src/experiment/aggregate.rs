//! Batch aggregation.
//!
//! Folds the [`TargetResult`]s of one input batch into a [`BatchResult`].
//! HTTP outcomes and metadata are keyed by target string; DNS and
//! traceroute outcomes by domain. When two targets share a domain the
//! later one overwrites the earlier entry.

use crate::experiment::types::{BatchResult, TargetResult};
use std::collections::HashMap;

/// Incremental fold of target results into a batch result.
#[derive(Debug, Default)]
pub struct BatchAggregator {
    result: BatchResult,
    domain_owners: HashMap<String, String>,
}

impl BatchAggregator {
    /// Start an empty batch.
    pub fn new(batch_name: impl Into<String>) -> Self {
        Self {
            result: BatchResult {
                batch_name: batch_name.into(),
                ..BatchResult::default()
            },
            domain_owners: HashMap::new(),
        }
    }

    /// Fold one target result into the batch.
    pub fn add(&mut self, target_result: TargetResult) {
        let TargetResult {
            target,
            http,
            dns,
            traceroutes,
        } = target_result;
        let domain = target.host_no_port;

        if let Some(previous) = self
            .domain_owners
            .insert(domain.clone(), target.target.clone())
        {
            if previous != target.target {
                tracing::debug!(
                    "{domain}: DNS and traceroute entries of {previous} replaced by {}",
                    target.target
                );
            }
        }

        self.result.http.insert(target.target.clone(), http);
        self.result.dns.insert(domain.clone(), dns);
        // Methods are written in order, so the last one is what remains
        if let Some(outcome) = traceroutes.values().last() {
            self.result
                .traceroute
                .insert(domain.clone(), outcome.clone());
        }
        self.result
            .traceroute_by_method
            .insert(domain.clone(), traceroutes);
        self.result.domains.insert(target.target.clone(), domain);
        self.result.metadata.insert(target.target, target.metadata);
    }

    /// Finish the batch.
    #[must_use]
    pub fn finish(self) -> BatchResult {
        self.result
    }
}

/// Fold a whole sequence of target results.
///
/// # Example
///
/// ```ignore
/// let batch = aggregate("world", results);
/// println!("{} targets", batch.target_count());
/// ```
pub fn aggregate(
    batch_name: impl Into<String>,
    results: impl IntoIterator<Item = TargetResult>,
) -> BatchResult {
    let mut aggregator = BatchAggregator::new(batch_name);
    for result in results {
        aggregator.add(result);
    }
    aggregator.finish()
}
