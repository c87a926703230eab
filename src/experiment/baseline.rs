//! Baseline experiment.
//!
//! Runs HTTP, DNS and traceroute probes for every target of every input
//! batch. Targets within a batch are probed concurrently up to a fixed
//! limit; batches run one after another.

use crate::experiment::aggregate::BatchAggregator;
use crate::experiment::prober::TargetProber;
use crate::experiment::types::{BatchResult, ExperimentReport, InputBatch, TargetResult};
use crate::target::{normalize_line, TargetDescriptor};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Default number of targets probed at once.
pub const DEFAULT_CONCURRENCY: usize = 8;

/// Baseline experiment runner.
///
/// # Example
///
/// ```ignore
/// let experiment = BaselineExperiment::new(prober, DEFAULT_CONCURRENCY);
/// let report = experiment.run(vec![InputBatch::new("world", lines)]).await;
/// ```
pub struct BaselineExperiment {
    prober: Arc<TargetProber>,
    concurrency: usize,
}

impl BaselineExperiment {
    /// Experiment name used in reports.
    pub const NAME: &'static str = "baseline";

    /// Create a runner probing at most `concurrency` targets at once.
    #[must_use]
    pub fn new(prober: TargetProber, concurrency: usize) -> Self {
        Self {
            prober: Arc::new(prober),
            concurrency: concurrency.max(1),
        }
    }

    /// Run every batch and collect the report.
    pub async fn run(&self, batches: Vec<InputBatch>) -> ExperimentReport {
        let started_at = Utc::now();
        let mut results = Vec::with_capacity(batches.len());

        for batch in batches {
            info!("Testing input file {}...", batch.name);
            results.push(self.run_batch(batch).await);
        }

        ExperimentReport {
            experiment: Self::NAME.to_string(),
            started_at,
            finished_at: Utc::now(),
            traceroute_methods: self.prober.methods().to_vec(),
            batches: results,
        }
    }

    /// Probe every target of one batch and aggregate the results.
    ///
    /// Blank lines are skipped; every other line yields exactly one
    /// target result, whatever its probes did.
    pub async fn run_batch(&self, batch: InputBatch) -> BatchResult {
        let targets: Vec<TargetDescriptor> = batch
            .lines
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| normalize_line(line))
            .collect();

        let results = self.probe_all(targets).await;
        let failures: usize = results.iter().map(TargetResult::failure_count).sum();
        info!(
            "{}: {} targets probed, {} probes failed",
            batch.name,
            results.len(),
            failures
        );

        let mut aggregator = BatchAggregator::new(batch.name);
        for result in results {
            aggregator.add(result);
        }
        aggregator.finish()
    }

    /// Probe targets concurrently, returning results in input order.
    async fn probe_all(&self, targets: Vec<TargetDescriptor>) -> Vec<TargetResult> {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = Vec::with_capacity(targets.len());

        for target in targets {
            // The semaphore is never closed, so this always yields a permit
            let permit = semaphore.clone().acquire_owned().await.ok();
            let prober = self.prober.clone();
            let fallback = target.clone();

            let handle = tokio::spawn(async move {
                let result = prober.probe(target).await;
                drop(permit);
                result
            });
            handles.push((fallback, handle));
        }

        let (fallbacks, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        join_all(handles)
            .await
            .into_iter()
            .zip(fallbacks)
            .map(|(joined, target)| match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!("{}: probe task failed: {e}", target.target);
                    TargetResult::failed(
                        target,
                        self.prober.methods(),
                        &format!("probe task failed: {e}"),
                    )
                }
            })
            .collect()
    }
}
