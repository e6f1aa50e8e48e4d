//! Split-column range probe
//!
//! One MIN/MAX query over the full table (not sampled) establishes the key
//! range that planning will partition.

use crate::client::QueryExecutor;
use crate::error::{RangeError, Result};

/// Fetch the inclusive `[min, max]` range of `column` across `table`
///
/// # Errors
/// [`RangeError::EmptyRange`] when the table has no rows (MIN/MAX are NULL),
/// [`RangeError::NonIntegerDomain`] when the column's values are not whole
/// numbers. Only integer-like split columns are supported.
pub async fn fetch_bounds(
    executor: &dyn QueryExecutor,
    table: &str,
    column: &str,
) -> Result<(i64, i64)> {
    let sql = format!("SELECT MIN({column}), MAX({column}) FROM {table};");
    let rows = executor.query(&sql).await?;

    let empty_range = || RangeError::EmptyRange {
        table: table.to_string(),
        column: column.to_string(),
    };

    // With -t -A the single result row is "min|max"; an empty table yields
    // "|" (two empty fields), which the line filter may drop entirely.
    let row = rows.first().ok_or_else(empty_range)?;
    let mut fields = row.split('|');
    let (raw_min, raw_max) = match (fields.next(), fields.next()) {
        (Some(min), Some(max)) => (min.trim(), max.trim()),
        _ => return Err(empty_range().into()),
    };

    if raw_min.is_empty() || raw_max.is_empty() {
        return Err(empty_range().into());
    }

    let parse = |raw: &str| -> Result<i64> {
        raw.parse().map_err(|_| {
            RangeError::NonIntegerDomain {
                column: column.to_string(),
                value: raw.to_string(),
            }
            .into()
        })
    };

    Ok((parse(raw_min)?, parse(raw_max)?))
}
