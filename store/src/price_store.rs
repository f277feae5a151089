use crate::{StoreConfig, StoreError};
use chrono::{DateTime, Duration, Utc};
use common::models::{
    CommonSymbol, Exchange, ExchangeStats, LatestPrice, PriceComparison, PriceSample,
};
use rusqlite::{params, types::Type, Connection, Row};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS trading_pairs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol TEXT NOT NULL,
        exchange TEXT NOT NULL,
        price REAL NOT NULL,
        timestamp DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS price_comparisons (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        cycle_id INTEGER NOT NULL,
        symbol TEXT NOT NULL,
        exchange1 TEXT NOT NULL,
        price1 REAL NOT NULL,
        exchange2 TEXT NOT NULL,
        price2 REAL NOT NULL,
        price_difference REAL NOT NULL,
        percentage_difference REAL NOT NULL,
        timestamp DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_symbol_exchange ON trading_pairs(symbol, exchange);
    CREATE INDEX IF NOT EXISTS idx_timestamp ON trading_pairs(timestamp);
    CREATE INDEX IF NOT EXISTS idx_price_diff ON price_comparisons(price_difference);
    CREATE INDEX IF NOT EXISTS idx_cycle ON price_comparisons(cycle_id);
";

const COMPARISON_COLUMNS: &str = "symbol, exchange1, price1, exchange2, price2, \
     price_difference, percentage_difference, timestamp";

/// Append-only SQLite store for price samples and comparisons.
///
/// Cloning is cheap and every clone shares one connection. Each insert batch
/// runs in a single transaction while holding the connection lock, so
/// concurrent writers are serialized per batch.
#[derive(Clone)]
pub struct PriceStore {
    conn: Arc<Mutex<Connection>>,
}

/// Rows removed by [`PriceStore::prune_older_than`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneSummary {
    pub samples: usize,
    pub comparisons: usize,
}

impl PriceStore {
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        if config.is_in_memory() {
            return Self::in_memory();
        }

        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        debug!("Opening price store at {}", config.path.display());

        let conn = Connection::open(&config.path)?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "synchronous", "NORMAL").ok();
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Append samples. Identical samples are stored as separate rows.
    pub async fn insert_samples(&self, samples: &[PriceSample]) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO trading_pairs (symbol, exchange, price, timestamp)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for sample in samples {
                stmt.execute(params![
                    sample.symbol,
                    sample.exchange.as_str(),
                    sample.price,
                    sample.observed_at,
                ])?;
            }
        }
        tx.commit()?;

        debug!("Stored {} samples", samples.len());
        Ok(samples.len())
    }

    /// Append one cycle's comparisons under a fresh cycle id.
    ///
    /// Returns the assigned cycle id, or `None` for an empty batch.
    pub async fn insert_comparisons(
        &self,
        comparisons: &[PriceComparison],
    ) -> Result<Option<i64>, StoreError> {
        if comparisons.is_empty() {
            return Ok(None);
        }

        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let cycle_id: i64 = tx.query_row(
            "SELECT COALESCE(MAX(cycle_id), 0) + 1 FROM price_comparisons",
            [],
            |row| row.get(0),
        )?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO price_comparisons
                 (cycle_id, symbol, exchange1, price1, exchange2, price2,
                  price_difference, percentage_difference, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for c in comparisons {
                stmt.execute(params![
                    cycle_id,
                    c.symbol,
                    c.exchange_a.as_str(),
                    c.price_a,
                    c.exchange_b.as_str(),
                    c.price_b,
                    c.absolute_difference,
                    c.percentage_difference,
                    c.compared_at,
                ])?;
            }
        }
        tx.commit()?;

        info!(
            "Stored {} comparisons as cycle {}",
            comparisons.len(),
            cycle_id
        );
        Ok(Some(cycle_id))
    }

    /// Largest differences of the most recent cycle, largest first
    pub async fn get_top_differences(&self, n: usize) -> Result<Vec<PriceComparison>, StoreError> {
        let sql = format!(
            "SELECT {COMPARISON_COLUMNS} FROM price_comparisons
             WHERE cycle_id = (SELECT MAX(cycle_id) FROM price_comparisons)
             ORDER BY price_difference DESC, symbol ASC, id ASC
             LIMIT ?1"
        );
        self.query_comparisons(&sql, n).await
    }

    /// Largest differences recorded under `cycle_id`, largest first
    pub async fn get_top_differences_for_cycle(
        &self,
        cycle_id: i64,
        n: usize,
    ) -> Result<Vec<PriceComparison>, StoreError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {COMPARISON_COLUMNS} FROM price_comparisons
             WHERE cycle_id = ?1
             ORDER BY price_difference DESC, symbol ASC, id ASC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![cycle_id, limit], comparison_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Largest differences across every stored cycle, largest first
    pub async fn get_top_differences_all_time(
        &self,
        n: usize,
    ) -> Result<Vec<PriceComparison>, StoreError> {
        let sql = format!(
            "SELECT {COMPARISON_COLUMNS} FROM price_comparisons
             ORDER BY price_difference DESC, symbol ASC, id ASC
             LIMIT ?1"
        );
        self.query_comparisons(&sql, n).await
    }

    async fn query_comparisons(
        &self,
        sql: &str,
        n: usize,
    ) -> Result<Vec<PriceComparison>, StoreError> {
        let limit = i64::try_from(n).unwrap_or(i64::MAX);
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(sql)?;
        let rows = stmt.query_map([limit], comparison_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Distinct symbols and newest sample time per exchange
    pub async fn get_exchange_stats(&self) -> Result<BTreeMap<Exchange, ExchangeStats>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "SELECT exchange, COUNT(DISTINCT symbol), MAX(timestamp)
             FROM trading_pairs
             GROUP BY exchange",
        )?;

        let rows = stmt.query_map([], |row| {
            let exchange = exchange_column(row, 0)?;
            let pair_count: i64 = row.get(1)?;
            let last_updated: DateTime<Utc> = row.get(2)?;
            Ok((exchange, pair_count, last_updated))
        })?;

        let mut stats = BTreeMap::new();
        for row in rows {
            let (exchange, pair_count, last_updated) = row?;
            let pair_count = usize::try_from(pair_count)
                .map_err(|e| StoreError::ConversionError(format!("pair count: {}", e)))?;
            stats.insert(
                exchange,
                ExchangeStats {
                    pair_count,
                    last_updated,
                },
            );
        }
        Ok(stats)
    }

    /// Newest sample for every (symbol, exchange), ordered by exchange then symbol
    pub async fn get_latest_prices(
        &self,
        exchange: Option<Exchange>,
    ) -> Result<Vec<LatestPrice>, StoreError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare_cached(
            "WITH ranked AS (
                SELECT symbol, exchange, price, timestamp,
                       ROW_NUMBER() OVER (
                           PARTITION BY symbol, exchange
                           ORDER BY timestamp DESC, id DESC
                       ) AS rn
                FROM trading_pairs
                WHERE ?1 IS NULL OR exchange = ?1
             )
             SELECT symbol, exchange, price, timestamp
             FROM ranked
             WHERE rn = 1
             ORDER BY exchange, symbol",
        )?;

        let rows = stmt.query_map([exchange.map(|e| e.as_str())], |row| {
            Ok(LatestPrice {
                symbol: row.get(0)?,
                exchange: exchange_column(row, 1)?,
                price: row.get(2)?,
                timestamp: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Symbols whose latest price is known on more than one exchange
    pub async fn get_common_symbols(&self) -> Result<Vec<CommonSymbol>, StoreError> {
        let mut by_symbol: BTreeMap<String, Vec<LatestPrice>> = BTreeMap::new();
        for price in self.get_latest_prices(None).await? {
            by_symbol.entry(price.symbol.clone()).or_default().push(price);
        }

        Ok(by_symbol
            .into_iter()
            .filter(|(_, prices)| prices.len() > 1)
            .map(|(symbol, prices)| CommonSymbol { symbol, prices })
            .collect())
    }

    pub async fn sample_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().await;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM trading_pairs", [], |row| row.get(0))?;
        usize::try_from(count).map_err(|e| StoreError::ConversionError(e.to_string()))
    }

    /// Retention maintenance: delete samples and comparisons older than `days`
    pub async fn prune_older_than(&self, days: u32) -> Result<PruneSummary, StoreError> {
        self.prune_before(Utc::now() - Duration::days(i64::from(days)))
            .await
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<PruneSummary, StoreError> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;
        let samples = tx.execute("DELETE FROM trading_pairs WHERE timestamp < ?1", [cutoff])?;
        let comparisons =
            tx.execute("DELETE FROM price_comparisons WHERE timestamp < ?1", [cutoff])?;
        tx.commit()?;

        info!(
            "Pruned {} samples and {} comparisons older than {}",
            samples, comparisons, cutoff
        );
        Ok(PruneSummary {
            samples,
            comparisons,
        })
    }
}

fn exchange_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Exchange> {
    let name: String = row.get(idx)?;
    name.parse::<Exchange>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn comparison_from_row(row: &Row<'_>) -> rusqlite::Result<PriceComparison> {
    Ok(PriceComparison {
        symbol: row.get(0)?,
        exchange_a: exchange_column(row, 1)?,
        price_a: row.get(2)?,
        exchange_b: exchange_column(row, 3)?,
        price_b: row.get(4)?,
        absolute_difference: row.get(5)?,
        percentage_difference: row.get(6)?,
        compared_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::Comparator;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample(exchange: Exchange, symbol: &str, price: f64, ts: DateTime<Utc>) -> PriceSample {
        PriceSample::new(symbol, exchange, price, ts).unwrap()
    }

    fn hyperliquid_cycle(ts: DateTime<Utc>) -> Vec<PriceSample> {
        vec![
            sample(Exchange::Hyperliquid, "BTC", 50000.0, ts),
            sample(Exchange::Hyperliquid, "ETH", 3000.0, ts),
        ]
    }

    fn lighter_cycle(ts: DateTime<Utc>) -> Vec<PriceSample> {
        vec![
            sample(Exchange::Lighter, "BTC", 50100.0, ts),
            sample(Exchange::Lighter, "ETH", 3000.0, ts),
            sample(Exchange::Lighter, "SOL", 100.0, ts),
        ]
    }

    async fn store_with_cycle() -> PriceStore {
        let store = PriceStore::in_memory().expect("Failed to create store");
        let a = hyperliquid_cycle(at(0));
        let b = lighter_cycle(at(1));
        store.insert_samples(&a).await.unwrap();
        store.insert_samples(&b).await.unwrap();

        let batch = Comparator::new(Exchange::Hyperliquid, Exchange::Lighter).compare(&a, &b, at(2));
        store.insert_comparisons(&batch.comparisons).await.unwrap();
        store
    }

    #[tokio::test]
    async fn duplicate_samples_are_appended_not_upserted() {
        let store = PriceStore::in_memory().unwrap();
        let s = sample(Exchange::Hyperliquid, "BTC", 50000.0, at(0));

        store.insert_samples(&[s.clone()]).await.unwrap();
        store.insert_samples(&[s]).await.unwrap();

        assert_eq!(store.sample_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn top_difference_of_the_cycle() {
        let store = store_with_cycle().await;

        let top = store.get_top_differences(1).await.unwrap();

        assert_eq!(top.len(), 1);
        assert_eq!(top[0].symbol, "BTC");
        assert_eq!(top[0].absolute_difference, 100.0);
        assert_eq!(top[0].exchange_a, Exchange::Hyperliquid);
        assert_eq!(top[0].exchange_b, Exchange::Lighter);
        assert_eq!(top[0].compared_at, at(2));
    }

    #[tokio::test]
    async fn top_differences_are_bounded_sorted_and_idempotent() {
        let store = store_with_cycle().await;

        let first = store.get_top_differences(5).await.unwrap();
        let second = store.get_top_differences(5).await.unwrap();

        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
        assert!(first
            .windows(2)
            .all(|w| w[0].absolute_difference >= w[1].absolute_difference));
        assert!(store.get_top_differences(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn top_differences_read_only_the_latest_cycle() {
        let store = store_with_cycle().await;

        let later = vec![PriceComparison::from_prices(
            "ETH".to_string(),
            (Exchange::Hyperliquid, 3000.0),
            (Exchange::Lighter, 3010.0),
            at(60),
        )];
        let cycle = store.insert_comparisons(&later).await.unwrap();
        assert_eq!(cycle, Some(2));

        let latest = store.get_top_differences(5).await.unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].absolute_difference, 10.0);

        let all = store.get_top_differences_all_time(5).await.unwrap();
        let symbols: Vec<&str> = all.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "ETH"]);
    }

    #[tokio::test]
    async fn top_differences_for_an_earlier_cycle() {
        let store = store_with_cycle().await;
        store
            .insert_comparisons(&[PriceComparison::from_prices(
                "ETH".to_string(),
                (Exchange::Hyperliquid, 3000.0),
                (Exchange::Lighter, 3010.0),
                at(60),
            )])
            .await
            .unwrap();

        let first = store.get_top_differences_for_cycle(1, 5).await.unwrap();
        let symbols: Vec<&str> = first.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH"]);

        assert_eq!(store.get_top_differences_for_cycle(2, 5).await.unwrap().len(), 1);
        assert!(store.get_top_differences_for_cycle(3, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_comparison_batch_writes_nothing() {
        let store = PriceStore::in_memory().unwrap();

        assert_eq!(store.insert_comparisons(&[]).await.unwrap(), None);
        assert!(store.get_top_differences(5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn exchange_stats_count_distinct_symbols() {
        let store = store_with_cycle().await;
        // a second cycle re-observes the same symbols
        store.insert_samples(&lighter_cycle(at(30))).await.unwrap();

        let stats = store.get_exchange_stats().await.unwrap();

        assert_eq!(stats[&Exchange::Hyperliquid].pair_count, 2);
        assert_eq!(stats[&Exchange::Lighter].pair_count, 3);
        assert_eq!(stats[&Exchange::Hyperliquid].last_updated, at(0));
        assert_eq!(stats[&Exchange::Lighter].last_updated, at(30));
    }

    #[tokio::test]
    async fn latest_prices_pick_newest_sample() {
        let store = store_with_cycle().await;
        store
            .insert_samples(&[sample(Exchange::Lighter, "BTC", 50200.0, at(30))])
            .await
            .unwrap();

        let lighter = store.get_latest_prices(Some(Exchange::Lighter)).await.unwrap();
        let prices: Vec<(&str, f64)> = lighter.iter().map(|p| (p.symbol.as_str(), p.price)).collect();
        assert_eq!(prices, vec![("BTC", 50200.0), ("ETH", 3000.0), ("SOL", 100.0)]);

        let all = store.get_latest_prices(None).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].exchange, Exchange::Hyperliquid);
    }

    #[tokio::test]
    async fn common_symbols_span_both_exchanges() {
        let store = store_with_cycle().await;

        let common = store.get_common_symbols().await.unwrap();

        let symbols: Vec<&str> = common.iter().map(|c| c.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH"]);
        assert!(common.iter().all(|c| c.prices.len() == 2));
    }

    #[tokio::test]
    async fn prune_removes_only_old_rows() {
        let store = store_with_cycle().await;
        let recent = Utc::now();
        store
            .insert_samples(&[sample(Exchange::Hyperliquid, "BTC", 1.0, recent)])
            .await
            .unwrap();

        let summary = store.prune_older_than(7).await.unwrap();

        assert_eq!(
            summary,
            PruneSummary {
                samples: 5,
                comparisons: 2
            }
        );
        assert_eq!(store.sample_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::new(dir.path().join("nested").join("prices.db"));

        {
            let store = PriceStore::open(&config).unwrap();
            store.insert_samples(&hyperliquid_cycle(at(0))).await.unwrap();
        }

        let reopened = PriceStore::open(&config).unwrap();
        assert_eq!(reopened.sample_count().await.unwrap(), 2);
        let stats = reopened.get_exchange_stats().await.unwrap();
        assert_eq!(stats[&Exchange::Hyperliquid].pair_count, 2);
    }

    #[tokio::test]
    async fn unreachable_storage_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let result = PriceStore::open(&StoreConfig::new(blocker.join("prices.db")));

        assert!(matches!(result, Err(StoreError::IoError(_))));
    }

    #[tokio::test]
    async fn unknown_exchange_rows_fail_conversion() {
        let store = PriceStore::in_memory().unwrap();
        {
            let conn = store.conn.lock().await;
            conn.execute(
                "INSERT INTO trading_pairs (symbol, exchange, price, timestamp)
                 VALUES ('BTC', 'mystery', 1.0, ?1)",
                [at(0)],
            )
            .unwrap();
        }

        assert!(store.get_exchange_stats().await.is_err());
    }
}
