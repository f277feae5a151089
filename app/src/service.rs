use chrono::{DateTime, Utc};
use common::{
    models::{Exchange, PriceComparison, PriceSample},
    Comparator, Error, Result,
};
use connectors::ExchangeConnector;
use std::collections::BTreeMap;
use std::sync::Arc;
use store::PriceStore;
use tracing::{error, info, warn};

/// An exchange that could not return data during a cycle
#[derive(Debug, Clone)]
pub struct FetchFailure {
    pub exchange: Exchange,
    pub message: String,
}

/// What happened to the comparison step of a cycle
#[derive(Debug, Clone)]
pub enum ComparisonOutcome {
    Compared {
        comparisons: usize,
        skipped_samples: usize,
        /// `None` when no symbol was common to both exchanges
        cycle_id: Option<i64>,
    },
    /// Only one side was available, so nothing could be compared
    Skipped { failed: Vec<Exchange> },
}

/// Summary of one fetch -> compare -> store run
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub samples: BTreeMap<Exchange, usize>,
    pub fetch_failures: Vec<FetchFailure>,
    pub outcome: ComparisonOutcome,
}

impl CycleReport {
    /// Cycle id assigned to this run's comparisons, if any were stored
    pub fn cycle_id(&self) -> Option<i64> {
        match &self.outcome {
            ComparisonOutcome::Compared { cycle_id, .. } => *cycle_id,
            ComparisonOutcome::Skipped { .. } => None,
        }
    }

    /// Largest differences stored by this run. Empty when the run stored
    /// none, even if earlier cycles did.
    pub async fn top_differences(
        &self,
        store: &PriceStore,
        n: usize,
    ) -> Result<Vec<PriceComparison>> {
        match self.cycle_id() {
            Some(cycle_id) => Ok(store.get_top_differences_for_cycle(cycle_id, n).await?),
            None => Ok(Vec::new()),
        }
    }
}

/// Runs fetch cycles against two exchanges
pub struct PriceService {
    exchange_a: Arc<dyn ExchangeConnector>,
    exchange_b: Arc<dyn ExchangeConnector>,
    comparator: Comparator,
}

impl PriceService {
    pub fn new(
        exchange_a: Arc<dyn ExchangeConnector>,
        exchange_b: Arc<dyn ExchangeConnector>,
    ) -> Self {
        let comparator = Comparator::new(exchange_a.exchange(), exchange_b.exchange());
        Self {
            exchange_a,
            exchange_b,
            comparator,
        }
    }

    /// Fetch both exchanges, persist what arrived, then compare and persist
    /// the differences.
    ///
    /// A failed fetch on one side skips the comparison but still stores the
    /// other side. Both sides failing, or any storage failure, is an error.
    pub async fn run_cycle(&self, store: &PriceStore) -> Result<CycleReport> {
        let started_at = Utc::now();
        let (exchange_a, exchange_b) = self.comparator.exchanges();

        info!("Starting fetch cycle: {} vs {}", exchange_a, exchange_b);

        let (result_a, result_b) = tokio::join!(
            self.exchange_a.fetch_samples(),
            self.exchange_b.fetch_samples()
        );

        let mut samples = BTreeMap::new();
        let mut fetch_failures = Vec::new();

        let samples_a =
            persist(exchange_a, result_a, store, &mut samples, &mut fetch_failures).await?;
        let samples_b =
            persist(exchange_b, result_b, store, &mut samples, &mut fetch_failures).await?;

        let outcome = match (samples_a, samples_b) {
            (Some(a), Some(b)) => {
                let batch = self.comparator.compare(&a, &b, Utc::now());
                let cycle_id = store.insert_comparisons(&batch.comparisons).await?;

                info!(
                    "Compared {} common symbols ({} samples skipped)",
                    batch.comparisons.len(),
                    batch.skipped.len()
                );

                ComparisonOutcome::Compared {
                    comparisons: batch.comparisons.len(),
                    skipped_samples: batch.skipped.len(),
                    cycle_id,
                }
            }
            (None, None) => {
                let reasons: Vec<String> = fetch_failures
                    .iter()
                    .map(|f| format!("{}: {}", f.exchange, f.message))
                    .collect();
                return Err(Error::ExchangeError(format!(
                    "No exchange returned data ({})",
                    reasons.join("; ")
                )));
            }
            _ => {
                let failed: Vec<Exchange> = fetch_failures.iter().map(|f| f.exchange).collect();
                warn!(
                    "Comparison skipped: no data from {:?}",
                    failed.iter().map(|e| e.as_str()).collect::<Vec<_>>()
                );
                ComparisonOutcome::Skipped { failed }
            }
        };

        Ok(CycleReport {
            started_at,
            samples,
            fetch_failures,
            outcome,
        })
    }
}

async fn persist(
    exchange: Exchange,
    fetched: Result<Vec<PriceSample>>,
    store: &PriceStore,
    counts: &mut BTreeMap<Exchange, usize>,
    failures: &mut Vec<FetchFailure>,
) -> Result<Option<Vec<PriceSample>>> {
    match fetched {
        Ok(samples) => {
            let stored = store.insert_samples(&samples).await?;
            info!("{}: stored {} samples", exchange, stored);
            counts.insert(exchange, stored);
            Ok(Some(samples))
        }
        Err(e) => {
            error!("Failed to fetch {} prices: {}", exchange, e);
            failures.push(FetchFailure {
                exchange,
                message: e.to_string(),
            });
            Ok(None)
        }
    }
}
