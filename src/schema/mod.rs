//! Split-column discovery for parcopy
//!
//! The dump is parallelized by partitioning the value range of one numeric
//! column, so before anything else the tool has to know which columns are
//! candidates. Numeric columns come from `information_schema.columns`;
//! indexed columns are parsed out of `pg_indexes.indexdef` and surfaced as
//! the preferred default, since range scans over an unindexed column make
//! every worker a sequential scan.
//!
//! Selection itself goes through the [`Prompter`] capability so non-interactive
//! callers can pin the column with `--split-column`.

use tracing::{debug, warn};

use crate::client::QueryExecutor;
use crate::error::{Result, SchemaError};
use crate::prompt::Prompter;

/// Candidate split columns for one table
#[derive(Debug, Clone)]
pub struct SplitCandidates {
    /// All numeric columns of the table
    pub numeric: Vec<String>,

    /// The subset of numeric columns that appear in an index
    pub indexed: Vec<String>,
}

/// Discover the numeric and indexed columns of `table`
///
/// Fails with [`SchemaError::NoNumericColumn`] when the table has no numeric
/// column at all. Index discovery is best-effort: a failing catalog query
/// only costs the preferred default, not the run.
pub async fn discover_split_candidates(
    executor: &dyn QueryExecutor,
    table: &str,
) -> Result<SplitCandidates> {
    // Catalog lookups want the bare table name even when the target is
    // schema-qualified.
    let bare = table.rsplit('.').next().unwrap_or(table);

    let numeric_sql = format!(
        "SELECT column_name FROM information_schema.columns col \
         WHERE col.table_name='{bare}' AND numeric_precision NOTNULL;"
    );
    let numeric = executor.query(&numeric_sql).await?;
    if numeric.is_empty() {
        return Err(SchemaError::NoNumericColumn(table.to_string()).into());
    }

    let index_sql = format!("SELECT indexdef FROM pg_indexes WHERE tablename='{bare}';");
    let indexed = match executor.query(&index_sql).await {
        Ok(rows) => {
            let mut cols: Vec<String> = rows
                .iter()
                .flat_map(|def| parse_index_columns(def))
                .filter(|col| numeric.contains(col))
                .collect();
            cols.dedup();
            cols
        }
        Err(e) => {
            warn!("Index discovery failed, no preferred column: {}", e);
            Vec::new()
        }
    };

    debug!(
        "Split candidates for '{}': numeric={:?} indexed={:?}",
        table, numeric, indexed
    );

    Ok(SplitCandidates { numeric, indexed })
}

/// Extract the column list from a `pg_indexes.indexdef` string
///
/// The definition looks like
/// `CREATE UNIQUE INDEX orders_pkey ON public.orders USING btree (id)`;
/// rather than parsing the full statement, only the parenthesized column
/// list is pulled out.
fn parse_index_columns(indexdef: &str) -> Vec<String> {
    let Some(open) = indexdef.find('(') else {
        return Vec::new();
    };
    let Some(close) = indexdef.rfind(')') else {
        return Vec::new();
    };
    if close <= open {
        return Vec::new();
    }

    indexdef[open + 1..close]
        .split(',')
        .map(|col| col.trim().to_string())
        .filter(|col| !col.is_empty())
        .collect()
}

/// Resolve the split column, prompting only when nothing was preselected
///
/// # Arguments
/// * `candidates` - Discovered candidate columns
/// * `requested` - Column pinned via `--split-column`, if any
/// * `prompter` - Interactive fallback
/// * `table` - Table name, for error messages
pub fn select_split_column(
    candidates: &SplitCandidates,
    requested: Option<&str>,
    prompter: &dyn Prompter,
    table: &str,
) -> Result<String> {
    if let Some(column) = requested {
        if candidates.numeric.iter().any(|c| c == column) {
            return Ok(column.to_string());
        }
        return Err(SchemaError::UnknownColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
        .into());
    }

    if candidates.numeric.len() == 1 {
        return Ok(candidates.numeric[0].clone());
    }

    let message = format!(
        "Which column do you use to split dump files? Indexed columns are {:?}",
        candidates.indexed
    );
    let preferred = candidates.indexed.first().map(String::as_str);
    prompter.select(&message, &candidates.numeric, preferred)
}
