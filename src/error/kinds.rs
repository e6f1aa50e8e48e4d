use std::{fmt, io};

/// Crate-wide `Result` type using [`ParcopyError`] as the error.
///
/// This alias is re-exported by the parent `error` module and is intended
/// to be used throughout the crate for fallible operations.
pub type Result<T> = std::result::Result<T, ParcopyError>;

/// Top-level error type for parcopy operations.
///
/// This type wraps more specific error kinds and provides a single
/// error type that can be used throughout the crate.
#[derive(Debug)]
pub enum ParcopyError {
    /// Connection and query-transport errors.
    Connection(ConnectionError),

    /// Split-column discovery errors.
    Schema(SchemaError),

    /// Row-size estimation errors.
    Estimation(EstimationError),

    /// Split-column range probe errors.
    Range(RangeError),

    /// Partition planning errors.
    Plan(PlanError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// The user declined a confirmation prompt.
    Cancelled,

    /// Generic error with a free-form message.
    Generic(String),
}

/// Connection-specific errors.
///
/// Everything here is fatal: without a working `psql` and a reachable
/// server there is nothing to plan against.
#[derive(Debug)]
pub enum ConnectionError {
    /// The `psql` binary is not on PATH.
    PsqlNotFound,

    /// The server could not be reached or rejected the connection.
    ConnectFailed(String),

    /// A read-only query failed.
    QueryFailed(String),
}

/// Schema discovery errors.
#[derive(Debug)]
pub enum SchemaError {
    /// The table has no numeric column to split on.
    NoNumericColumn(String),

    /// A requested split column is not among the numeric candidates.
    UnknownColumn { table: String, column: String },
}

/// Row-size estimation errors.
#[derive(Debug)]
pub enum EstimationError {
    /// The sample query returned no rows (empty table).
    EmptySample(String),

    /// The sampled average could not be parsed as a number.
    InvalidAverage(String),
}

/// Range probe errors.
#[derive(Debug)]
pub enum RangeError {
    /// MIN/MAX are undefined because the table has no matching rows.
    EmptyRange { table: String, column: String },

    /// The split column's values are not whole numbers.
    NonIntegerDomain { column: String, value: String },
}

/// Partition planning errors.
#[derive(Debug)]
pub enum PlanError {
    /// The per-file byte budget is smaller than one average row, so the
    /// computed rows-per-partition is zero. Rejected up front instead of
    /// producing one-row partitions forever.
    DegenerateConfig {
        target_bytes: u64,
        average_row_size: f64,
    },
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for ParcopyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParcopyError::Connection(e) => write!(f, "Connection error: {e}"),
            ParcopyError::Schema(e) => write!(f, "Schema error: {e}"),
            ParcopyError::Estimation(e) => write!(f, "Estimation error: {e}"),
            ParcopyError::Range(e) => write!(f, "Range error: {e}"),
            ParcopyError::Plan(e) => write!(f, "Planning error: {e}"),
            ParcopyError::Config(e) => write!(f, "Configuration error: {e}"),
            ParcopyError::Io(e) => write!(f, "I/O error: {e}"),
            ParcopyError::Cancelled => write!(f, "Stopped: cancelled by user"),
            ParcopyError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::PsqlNotFound => write!(
                f,
                "psql not found on PATH. Install the PostgreSQL client first:\n\
                 \x20 (macOS): brew install postgresql\n\
                 \x20 (RHEL/CentOS): dnf install postgresql\n\
                 \x20 (Debian/Ubuntu): apt-get install postgresql-client"
            ),
            ConnectionError::ConnectFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::QueryFailed(msg) => write!(f, "Query failed: {msg}"),
        }
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::NoNumericColumn(table) => write!(
                f,
                "Table '{table}' has no numeric column to split dump files on. \
                 At least one numeric column is required, and ideally it should \
                 be indexed for better performance"
            ),
            SchemaError::UnknownColumn { table, column } => write!(
                f,
                "Column '{column}' is not a numeric column of table '{table}'"
            ),
        }
    }
}

impl fmt::Display for EstimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EstimationError::EmptySample(table) => {
                write!(f, "Cannot estimate row size: table '{table}' returned no sample rows")
            }
            EstimationError::InvalidAverage(raw) => {
                write!(f, "Cannot parse sampled average row size: '{raw}'")
            }
        }
    }
}

impl fmt::Display for RangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeError::EmptyRange { table, column } => write!(
                f,
                "Table '{table}' has no rows, MIN/MAX of '{column}' are undefined"
            ),
            RangeError::NonIntegerDomain { column, value } => write!(
                f,
                "Split column '{column}' must contain whole numbers, got '{value}'"
            ),
        }
    }
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::DegenerateConfig {
                target_bytes,
                average_row_size,
            } => write!(
                f,
                "Target file size of {target_bytes} bytes is smaller than one \
                 average row ({average_row_size:.1} bytes); increase --size"
            ),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for ParcopyError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for SchemaError {}
impl std::error::Error for EstimationError {}
impl std::error::Error for RangeError {}
impl std::error::Error for PlanError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to ParcopyError ========================= */

impl From<io::Error> for ParcopyError {
    fn from(err: io::Error) -> Self {
        ParcopyError::Io(err)
    }
}

impl From<ConnectionError> for ParcopyError {
    fn from(err: ConnectionError) -> Self {
        ParcopyError::Connection(err)
    }
}

impl From<SchemaError> for ParcopyError {
    fn from(err: SchemaError) -> Self {
        ParcopyError::Schema(err)
    }
}

impl From<EstimationError> for ParcopyError {
    fn from(err: EstimationError) -> Self {
        ParcopyError::Estimation(err)
    }
}

impl From<RangeError> for ParcopyError {
    fn from(err: RangeError) -> Self {
        ParcopyError::Range(err)
    }
}

impl From<PlanError> for ParcopyError {
    fn from(err: PlanError) -> Self {
        ParcopyError::Plan(err)
    }
}

impl From<ConfigError> for ParcopyError {
    fn from(err: ConfigError) -> Self {
        ParcopyError::Config(err)
    }
}

impl From<String> for ParcopyError {
    fn from(msg: String) -> Self {
        ParcopyError::Generic(msg)
    }
}

impl From<&str> for ParcopyError {
    fn from(msg: &str) -> Self {
        ParcopyError::Generic(msg.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_config_display() {
        let err = ParcopyError::from(PlanError::DegenerateConfig {
            target_bytes: 10,
            average_row_size: 145.0,
        });
        let msg = err.to_string();
        assert!(msg.contains("10 bytes"));
        assert!(msg.contains("--size"));
    }

    #[test]
    fn test_psql_not_found_carries_install_hints() {
        let msg = ConnectionError::PsqlNotFound.to_string();
        assert!(msg.contains("brew install postgresql"));
        assert!(msg.contains("apt-get install postgresql-client"));
    }

    #[test]
    fn test_non_integer_domain_display() {
        let err = RangeError::NonIntegerDomain {
            column: "price".to_string(),
            value: "12.5".to_string(),
        };
        assert!(err.to_string().contains("price"));
        assert!(err.to_string().contains("12.5"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: ParcopyError = io_err.into();
        assert!(matches!(err, ParcopyError::Io(_)));
    }
}
