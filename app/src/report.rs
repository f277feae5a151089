//! Plain-text tables for the command line.

use crate::service::{ComparisonOutcome, CycleReport};
use common::models::{CommonSymbol, Exchange, ExchangeStats, LatestPrice, PriceComparison};
use std::collections::BTreeMap;
use std::fmt;

pub struct CycleSummary<'a>(pub &'a CycleReport);

impl fmt::Display for CycleSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.0;
        writeln!(f, "Fetch cycle started {}", report.started_at.format("%F %T UTC"))?;
        for (exchange, count) in &report.samples {
            writeln!(f, "  {:<12} {:>5} pairs stored", exchange.as_str(), count)?;
        }
        for failure in &report.fetch_failures {
            writeln!(f, "  {:<12} FAILED: {}", failure.exchange.as_str(), failure.message)?;
        }
        match &report.outcome {
            ComparisonOutcome::Compared {
                comparisons,
                skipped_samples,
                ..
            } => writeln!(
                f,
                "  {} price comparisons, {} samples skipped",
                comparisons, skipped_samples
            ),
            ComparisonOutcome::Skipped { failed } => {
                let names: Vec<&str> = failed.iter().map(Exchange::as_str).collect();
                writeln!(f, "  comparison skipped: no data from {}", names.join(", "))
            }
        }
    }
}

pub struct TopDifferences<'a>(pub &'a [PriceComparison]);

impl fmt::Display for TopDifferences<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No price differences recorded");
        }

        writeln!(
            f,
            "{:<3} {:<15} {:<12} {:>15} {:<12} {:>15} {:>15} {:>8}",
            "#", "Symbol", "Exchange 1", "Price 1", "Exchange 2", "Price 2", "Difference", "%"
        )?;
        writeln!(f, "{}", "-".repeat(102))?;
        for (i, c) in self.0.iter().enumerate() {
            writeln!(
                f,
                "{:<3} {:<15} {:<12} {:>15.6} {:<12} {:>15.6} {:>15.6} {:>7.2}%",
                i + 1,
                c.symbol,
                c.exchange_a.as_str(),
                c.price_a,
                c.exchange_b.as_str(),
                c.price_b,
                c.absolute_difference,
                c.percentage_difference
            )?;
        }
        Ok(())
    }
}

pub struct StatsTable<'a>(pub &'a BTreeMap<Exchange, ExchangeStats>);

impl fmt::Display for StatsTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No data in the store");
        }

        writeln!(f, "{:<15} {:>6}  {}", "Exchange", "Pairs", "Last updated")?;
        writeln!(f, "{}", "-".repeat(48))?;
        let mut total = 0;
        for (exchange, stats) in self.0 {
            total += stats.pair_count;
            writeln!(
                f,
                "{:<15} {:>6}  {}",
                exchange.as_str(),
                stats.pair_count,
                stats.last_updated.format("%F %T UTC")
            )?;
        }
        writeln!(f, "{}", "-".repeat(48))?;
        writeln!(f, "{:<15} {:>6}", "Total", total)
    }
}

pub struct LatestPrices<'a> {
    pub prices: &'a [LatestPrice],
    pub limit: usize,
}

impl fmt::Display for LatestPrices<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prices.is_empty() {
            return writeln!(f, "No data in the store");
        }

        writeln!(f, "{:<3} {:<15} {:<12} {:>15}  {}", "#", "Symbol", "Exchange", "Price", "Time")?;
        writeln!(f, "{}", "-".repeat(80))?;
        for (i, p) in self.prices.iter().take(self.limit).enumerate() {
            writeln!(
                f,
                "{:<3} {:<15} {:<12} {:>15.6}  {}",
                i + 1,
                p.symbol,
                p.exchange.as_str(),
                p.price,
                p.timestamp.format("%F %T")
            )?;
        }
        if self.prices.len() > self.limit {
            writeln!(f, "... and {} more", self.prices.len() - self.limit)?;
        }
        Ok(())
    }
}

pub struct CommonSymbols<'a>(pub &'a [CommonSymbol]);

impl fmt::Display for CommonSymbols<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No symbols shared between exchanges");
        }

        writeln!(f, "{} symbols shared between exchanges", self.0.len())?;
        writeln!(f, "{}", "-".repeat(80))?;
        for common in self.0 {
            let prices: Vec<String> = common
                .prices
                .iter()
                .map(|p| format!("{}: {:.6}", p.exchange, p.price))
                .collect();
            writeln!(f, "{:<15} {}", common.symbol, prices.join(" | "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::FetchFailure;
    use chrono::{TimeZone, Utc};

    fn comparison(symbol: &str, a: f64, b: f64) -> PriceComparison {
        PriceComparison::from_prices(
            symbol.to_string(),
            (Exchange::Hyperliquid, a),
            (Exchange::Lighter, b),
            Utc::now(),
        )
    }

    #[test]
    fn top_differences_are_numbered_rows() {
        let rows = vec![comparison("BTC", 50000.0, 50100.0), comparison("ETH", 3000.0, 3000.0)];

        let text = TopDifferences(&rows).to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 4);
        assert!(lines[2].starts_with("1   BTC"));
        assert!(lines[2].contains("100.000000"));
        assert!(lines[2].ends_with("0.20%"));
        assert!(lines[3].starts_with("2   ETH"));
    }

    #[test]
    fn empty_tables_say_so() {
        assert_eq!(TopDifferences(&[]).to_string(), "No price differences recorded\n");
        assert_eq!(StatsTable(&BTreeMap::new()).to_string(), "No data in the store\n");
        assert_eq!(
            CommonSymbols(&[]).to_string(),
            "No symbols shared between exchanges\n"
        );
    }

    #[test]
    fn stats_table_totals_pairs() {
        let updated = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let mut stats = BTreeMap::new();
        stats.insert(
            Exchange::Hyperliquid,
            ExchangeStats {
                pair_count: 2,
                last_updated: updated,
            },
        );
        stats.insert(
            Exchange::Lighter,
            ExchangeStats {
                pair_count: 3,
                last_updated: updated,
            },
        );

        let text = StatsTable(&stats).to_string();

        assert!(text.contains("hyperliquid          2  2026-01-02 03:04:05 UTC"));
        assert!(text.lines().last().unwrap().ends_with("5"));
    }

    #[test]
    fn latest_prices_are_truncated() {
        let ts = Utc::now();
        let prices: Vec<LatestPrice> = ["A", "B", "C"]
            .iter()
            .map(|s| LatestPrice {
                symbol: s.to_string(),
                exchange: Exchange::Lighter,
                price: 1.0,
                timestamp: ts,
            })
            .collect();

        let text = LatestPrices {
            prices: &prices,
            limit: 2,
        }
        .to_string();

        assert!(text.contains("... and 1 more"));
        assert!(!text.contains(" C "));
    }

    #[test]
    fn skipped_cycle_names_failed_exchange() {
        let mut samples = BTreeMap::new();
        samples.insert(Exchange::Hyperliquid, 190);
        let report = CycleReport {
            started_at: Utc::now(),
            samples,
            fetch_failures: vec![FetchFailure {
                exchange: Exchange::Lighter,
                message: "timeout".to_string(),
            }],
            outcome: ComparisonOutcome::Skipped {
                failed: vec![Exchange::Lighter],
            },
        };

        let text = CycleSummary(&report).to_string();

        assert!(text.contains("hyperliquid    190 pairs stored"));
        assert!(text.contains("lighter      FAILED: timeout"));
        assert!(text.contains("comparison skipped: no data from lighter"));
    }
}
