// Scan engine for ChronosRedirect
// Runs every (target, payload) pair under a global concurrency ceiling

use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::client::FetchClient;
use crate::errors::ScanError;
use crate::fuzzer::{fill_payload, has_marker};
use crate::models::{Finding, ScanConfig, ScanSummary};
use crate::reporting::ScanReporter;
use crate::verdict::classify;

/// Bounds of the randomized stealth delay, in milliseconds
pub const STEALTH_DELAY_MS: (u64, u64) = (500, 1500);

pub struct ScanEngine {
    config: Arc<ScanConfig>,
    client: FetchClient,
}

/// Tracks how many work items are currently waiting on the network
#[derive(Default)]
struct InFlight {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl InFlight {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }
}

struct WorkItem {
    template: String,
    payload: String,
}

impl ScanEngine {
    pub fn new(config: ScanConfig) -> Result<Self, ScanError> {
        if config.concurrency == 0 || config.concurrency > Semaphore::MAX_PERMITS {
            return Err(ScanError::InvalidConcurrency);
        }
        let client = FetchClient::new(config.proxy.as_deref(), config.timeout)?;
        Ok(Self {
            config: Arc::new(config),
            client,
        })
    }

    /// Scan the Cartesian product of `targets` and `payloads`.
    ///
    /// A work item is spawned only once a semaphore slot is free. Tasks live
    /// in a `JoinSet`, so dropping this future aborts every in-flight request
    /// and the JSON report is never written.
    pub async fn run(&self, targets: &[String], payloads: &[String]) -> Result<ScanSummary, ScanError> {
        let total = targets.len() * payloads.len();
        let reporter = Arc::new(ScanReporter::new(
            &self.config.csv_path,
            &self.config.log_path,
            self.config.output.as_deref(),
            total,
            self.config.silent,
        )?);
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let in_flight = Arc::new(InFlight::default());
        let mut tasks: JoinSet<Result<(), ScanError>> = JoinSet::new();

        info!(
            targets = targets.len(),
            payloads = payloads.len(),
            concurrency = self.config.concurrency,
            method = %self.config.method,
            "starting scan"
        );

        let items = targets.iter().flat_map(|template| {
            payloads.iter().map(move |payload| WorkItem {
                template: template.clone(),
                payload: payload.clone(),
            })
        });

        for item in items {
            let permit = loop {
                // Reap finished tasks while waiting so sink errors surface early
                tokio::select! {
                    permit = semaphore.clone().acquire_owned() => {
                        break permit?;
                    }
                    Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                        joined??;
                    }
                }
            };

            let config = Arc::clone(&self.config);
            let client = self.client.clone();
            let reporter = Arc::clone(&reporter);
            let in_flight = Arc::clone(&in_flight);

            tasks.spawn(async move {
                let result = process_item(&config, &client, &reporter, &in_flight, item).await;
                drop(permit);
                result
            });
        }

        while let Some(joined) = tasks.join_next().await {
            joined??;
        }

        let summary = reporter.finish(in_flight.peak.load(Ordering::SeqCst)).await?;
        info!(
            vulnerable = summary.vulnerable,
            partial = summary.partial,
            safe = summary.safe,
            failed = summary.failed,
            "scan finished"
        );
        Ok(summary)
    }
}

async fn process_item(
    config: &ScanConfig,
    client: &FetchClient,
    reporter: &ScanReporter,
    in_flight: &InFlight,
    item: WorkItem,
) -> Result<(), ScanError> {
    if !has_marker(&item.template, &config.keyword) {
        reporter.record_skipped().await;
        return Ok(());
    }

    if config.stealth {
        tokio::time::sleep(stealth_delay()).await;
    }

    let filled_url = fill_payload(&item.template, &config.keyword, &item.payload);

    in_flight.enter();
    let outcome = client.fetch(config.method, &filled_url).await;
    in_flight.leave();

    match outcome {
        Ok(outcome) if outcome.redirected => {
            let classification = classify(&filled_url, &outcome.final_url, &item.payload, &outcome.body);
            reporter
                .record_finding(Finding::new(filled_url, outcome.final_url, classification))
                .await
        }
        Ok(_) => {
            reporter.record_skipped().await;
            Ok(())
        }
        Err(err) => {
            warn!(url = %filled_url, kind = err.kind(), error = %err, "fetch failed");
            reporter.record_failure(&filled_url, &err).await
        }
    }
}

fn stealth_delay() -> Duration {
    let (low, high) = STEALTH_DELAY_MS;
    Duration::from_millis(rand::thread_rng().gen_range(low..=high))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stealth_delay_within_bounds() {
        for _ in 0..100 {
            let delay = stealth_delay();
            assert!(delay >= Duration::from_millis(500));
            assert!(delay <= Duration::from_millis(1500));
        }
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = ScanConfig {
            concurrency: 0,
            ..ScanConfig::default()
        };
        assert!(matches!(ScanEngine::new(config), Err(ScanError::InvalidConcurrency)));
    }

    #[test]
    fn concurrency_above_semaphore_limit_rejected() {
        let config = ScanConfig {
            concurrency: usize::MAX,
            ..ScanConfig::default()
        };
        assert!(matches!(ScanEngine::new(config), Err(ScanError::InvalidConcurrency)));

        let config = ScanConfig {
            concurrency: Semaphore::MAX_PERMITS,
            ..ScanConfig::default()
        };
        assert!(ScanEngine::new(config).is_ok());
    }

    #[test]
    fn in_flight_tracks_peak() {
        let tracker = InFlight::default();
        tracker.enter();
        tracker.enter();
        tracker.leave();
        tracker.enter();
        assert_eq!(tracker.peak.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.current.load(Ordering::SeqCst), 2);
    }
}
