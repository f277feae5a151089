//! Cross-exchange price comparison.
//!
//! Joins two exchanges' samples on symbol and ranks the resulting
//! differences by absolute size, largest first.

use crate::models::{
    normalize_symbol, Exchange, PriceComparison, PriceSample, SkipReason, SkippedSample,
};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Output of one comparison run
#[derive(Debug, Clone, Default)]
pub struct ComparisonBatch {
    /// One entry per symbol quoted on both exchanges, largest difference first
    pub comparisons: Vec<PriceComparison>,
    /// Samples excluded from the join
    pub skipped: Vec<SkippedSample>,
}

impl ComparisonBatch {
    pub fn top(&self, n: usize) -> &[PriceComparison] {
        &self.comparisons[..n.min(self.comparisons.len())]
    }
}

/// Compares the prices of one exchange against another
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    exchange_a: Exchange,
    exchange_b: Exchange,
}

impl Comparator {
    pub fn new(exchange_a: Exchange, exchange_b: Exchange) -> Self {
        Self {
            exchange_a,
            exchange_b,
        }
    }

    pub fn exchanges(&self) -> (Exchange, Exchange) {
        (self.exchange_a, self.exchange_b)
    }

    /// Join `samples_a` and `samples_b` on symbol.
    ///
    /// Symbols present on only one side produce nothing. Invalid samples are
    /// collected in [`ComparisonBatch::skipped`] and never fail the batch.
    pub fn compare(
        &self,
        samples_a: &[PriceSample],
        samples_b: &[PriceSample],
        compared_at: DateTime<Utc>,
    ) -> ComparisonBatch {
        let mut skipped = Vec::new();
        let prices_a = price_map(self.exchange_a, samples_a, &mut skipped);
        let prices_b = price_map(self.exchange_b, samples_b, &mut skipped);

        let mut comparisons: Vec<PriceComparison> = prices_a
            .iter()
            .filter_map(|(symbol, &price_a)| {
                prices_b.get(symbol).map(|&price_b| {
                    PriceComparison::from_prices(
                        symbol.clone(),
                        (self.exchange_a, price_a),
                        (self.exchange_b, price_b),
                        compared_at,
                    )
                })
            })
            .collect();

        comparisons.sort_by(rank);

        for skip in &skipped {
            warn!(
                "Skipping {} sample {:?} (price {}): {}",
                skip.exchange, skip.symbol, skip.price, skip.reason
            );
        }

        debug!(
            "Compared {} {} symbols against {} {} symbols: {} common, {} skipped",
            prices_a.len(),
            self.exchange_a,
            prices_b.len(),
            self.exchange_b,
            comparisons.len(),
            skipped.len()
        );

        ComparisonBatch {
            comparisons,
            skipped,
        }
    }
}

/// Canonical ordering: absolute difference descending, then symbol ascending
pub fn rank(a: &PriceComparison, b: &PriceComparison) -> Ordering {
    b.absolute_difference
        .total_cmp(&a.absolute_difference)
        .then_with(|| a.symbol.cmp(&b.symbol))
}

fn price_map(
    exchange: Exchange,
    samples: &[PriceSample],
    skipped: &mut Vec<SkippedSample>,
) -> HashMap<String, f64> {
    let mut prices = HashMap::with_capacity(samples.len());

    for sample in samples {
        let verdict = if sample.exchange != exchange {
            Err(SkipReason::WrongExchange)
        } else {
            sample.validate()
        };

        let symbol = normalize_symbol(&sample.symbol);
        let verdict = verdict.and_then(|_| {
            if prices.contains_key(&symbol) {
                Err(SkipReason::DuplicateSymbol)
            } else {
                Ok(())
            }
        });

        match verdict {
            Ok(()) => {
                prices.insert(symbol, sample.price);
            }
            Err(reason) => skipped.push(SkippedSample {
                symbol: sample.symbol.clone(),
                exchange: sample.exchange,
                price: sample.price,
                reason,
            }),
        }
    }

    prices
}
