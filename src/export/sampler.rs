//! Average-row-size estimation
//!
//! The partition width is derived from how big one exported row is on
//! average. Rather than scanning the whole table, the sampler takes the
//! textual length of a small prefix of rows (whatever order the server
//! returns them in; no ORDER BY) and averages it server-side.

use crate::client::QueryExecutor;
use crate::error::{EstimationError, Result};

/// Multiplier applied to the raw sampled average to account for the
/// difference between `length(row::text)` and the bytes actually written
/// by COPY (quoting, delimiters, framing). Empirical, not derived.
pub const ROW_SIZE_INFLATION: f64 = 1.45;

/// Estimates the exported size of one row
#[derive(Debug, Clone, Copy)]
pub struct Sampler {
    sample_size: u32,
    inflation: f64,
}

impl Sampler {
    /// Create a sampler that averages over the first `sample_size` rows
    pub fn new(sample_size: u32) -> Self {
        Self {
            sample_size,
            inflation: ROW_SIZE_INFLATION,
        }
    }

    /// Override the inflation factor
    pub fn with_inflation(mut self, inflation: f64) -> Self {
        self.inflation = inflation;
        self
    }

    /// Estimate the average exported row size of `table`, in bytes
    ///
    /// # Errors
    /// [`EstimationError::EmptySample`] when the table yields no sample rows,
    /// [`EstimationError::InvalidAverage`] when the server's average cannot
    /// be parsed as a number.
    pub async fn estimate_average_row_size(
        &self,
        executor: &dyn QueryExecutor,
        table: &str,
    ) -> Result<f64> {
        let sql = format!(
            "SELECT AVG(length) FROM \
             (SELECT length({table}::text) FROM {table} LIMIT {limit}) AS length;",
            limit = self.sample_size
        );
        let rows = executor.query(&sql).await?;

        // AVG over zero rows is NULL, which -t -A prints as an empty line
        // that the executor already filters out.
        let raw = rows
            .first()
            .ok_or_else(|| EstimationError::EmptySample(table.to_string()))?;

        let average: f64 = raw
            .parse()
            .map_err(|_| EstimationError::InvalidAverage(raw.clone()))?;
        if !(average.is_finite() && average > 0.0) {
            return Err(EstimationError::InvalidAverage(raw.clone()).into());
        }

        Ok(average * self.inflation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct CannedExecutor {
        rows: Vec<String>,
        seen_sql: std::sync::Mutex<String>,
    }

    impl CannedExecutor {
        fn new(rows: &[&str]) -> Self {
            Self {
                rows: rows.iter().map(|s| s.to_string()).collect(),
                seen_sql: std::sync::Mutex::new(String::new()),
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for CannedExecutor {
        async fn query(&self, sql: &str) -> Result<Vec<String>> {
            *self.seen_sql.lock().unwrap() = sql.to_string();
            Ok(self.rows.clone())
        }
    }

    #[test]
    fn test_inflation_applied_to_sampled_average() {
        let executor = CannedExecutor::new(&["100"]);
        let sampler = Sampler::new(100);
        let size = tokio_test::block_on(sampler.estimate_average_row_size(&executor, "orders"))
            .unwrap();
        assert!((size - 145.0).abs() < 1e-9);
    }

    #[test]
    fn test_inflation_override() {
        let executor = CannedExecutor::new(&["200.5"]);
        let sampler = Sampler::new(100).with_inflation(1.0);
        let size = tokio_test::block_on(sampler.estimate_average_row_size(&executor, "orders"))
            .unwrap();
        assert!((size - 200.5).abs() < 1e-9);
    }

    #[test]
    fn test_sample_size_reaches_query() {
        let executor = CannedExecutor::new(&["42"]);
        let sampler = Sampler::new(500);
        tokio_test::block_on(sampler.estimate_average_row_size(&executor, "orders")).unwrap();
        let sql = executor.seen_sql.lock().unwrap().clone();
        assert!(sql.contains("LIMIT 500"));
        assert!(!sql.to_uppercase().contains("ORDER BY"));
    }

    #[test]
    fn test_empty_sample_fails() {
        let executor = CannedExecutor::new(&[]);
        let sampler = Sampler::new(100);
        let err = tokio_test::block_on(sampler.estimate_average_row_size(&executor, "orders"))
            .unwrap_err();
        assert!(err.to_string().contains("no sample rows"));
    }

    #[test]
    fn test_unparsable_average_fails() {
        let executor = CannedExecutor::new(&["not-a-number"]);
        let sampler = Sampler::new(100);
        let err = tokio_test::block_on(sampler.estimate_average_row_size(&executor, "orders"))
            .unwrap_err();
        assert!(err.to_string().contains("not-a-number"));
    }
}
