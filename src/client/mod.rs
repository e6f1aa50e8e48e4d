//! Database access for parcopy
//!
//! There is no persistent driver connection: every read-only query is one
//! short-lived `psql` invocation, and the export workers themselves are
//! independent `psql` processes. This module owns the connection parameters
//! and the query transport.
//!
//! Components that need to read from the database (schema discovery, the
//! sampler, the range probe) depend on the [`QueryExecutor`] trait rather
//! than on `psql` directly, so they can be tested with canned results.

use async_trait::async_trait;
use std::io;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ConnectionError, Result};

/// Connection parameters for the target database
///
/// Passed explicitly to every component that talks to the server; the
/// password travels to `psql` through the `PGPASSWORD` environment variable
/// and never appears on a command line.
#[derive(Debug, Clone)]
pub struct ConnectionParams {
    /// Database server host
    pub host: String,

    /// Database server port
    pub port: u16,

    /// Database to be dumped
    pub dbname: String,

    /// Database user name
    pub username: String,

    /// Password for the database user
    pub password: String,
}

impl ConnectionParams {
    /// The common `psql` connection arguments
    pub fn base_args(&self) -> Vec<String> {
        vec![
            "-h".to_string(),
            self.host.clone(),
            "-p".to_string(),
            self.port.to_string(),
            "-d".to_string(),
            self.dbname.clone(),
            "-U".to_string(),
            self.username.clone(),
        ]
    }

    /// Connection target for display, without credentials
    pub fn display_target(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.dbname)
    }
}

/// Trait for executing read-only SQL and getting raw textual rows back
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a query and return one string per non-empty result row
    ///
    /// # Arguments
    /// * `sql` - Query text
    ///
    /// # Returns
    /// * `Result<Vec<String>>` - Trimmed result rows
    async fn query(&self, sql: &str) -> Result<Vec<String>>;
}

/// Query executor backed by the `psql` command-line client
pub struct PsqlClient {
    params: ConnectionParams,
}

impl PsqlClient {
    /// Create a new client for the given connection parameters
    pub fn new(params: ConnectionParams) -> Self {
        Self { params }
    }

    /// Get the connection parameters
    pub fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Verify that the `psql` binary is available on PATH
    ///
    /// # Returns
    /// * `Result<()>` - Ok, or [`ConnectionError::PsqlNotFound`] with install hints
    pub async fn check_binary() -> Result<()> {
        let status = Command::new("psql")
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => Err(ConnectionError::PsqlNotFound.into()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(ConnectionError::PsqlNotFound.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Full argument list for a read-only query invocation
    ///
    /// `-t -A` strips headers and alignment so result rows come back as
    /// plain `|`-separated text; `-X` skips psqlrc, `-q` suppresses chatter.
    fn query_args(&self, sql: &str) -> Vec<String> {
        let mut args = self.params.base_args();
        args.extend(
            ["-X", "-q", "-t", "-A", "-c", sql]
                .iter()
                .map(|s| s.to_string()),
        );
        args
    }
}

#[async_trait]
impl QueryExecutor for PsqlClient {
    async fn query(&self, sql: &str) -> Result<Vec<String>> {
        debug!("psql query: {}", sql);

        let output = Command::new("psql")
            .args(self.query_args(sql))
            .env("PGPASSWORD", &self.params.password)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    ConnectionError::PsqlNotFound.into()
                } else {
                    crate::error::ParcopyError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(ConnectionError::QueryFailed(stderr).into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout
            .lines()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_params() -> ConnectionParams {
        ConnectionParams {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "sales".to_string(),
            username: "alice".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn test_base_args() {
        let params = test_params();
        assert_eq!(
            params.base_args(),
            vec!["-h", "localhost", "-p", "5432", "-d", "sales", "-U", "alice"]
        );
    }

    #[test]
    fn test_query_args_carry_sql_last() {
        let client = PsqlClient::new(test_params());
        let args = client.query_args("SELECT 1;");
        assert_eq!(args.last().unwrap(), "SELECT 1;");
        assert!(args.contains(&"-t".to_string()));
        assert!(args.contains(&"-A".to_string()));
        // The password must never appear in the argument list.
        assert!(!args.iter().any(|a| a.contains("secret")));
    }

    #[test]
    fn test_display_target_hides_credentials() {
        let params = test_params();
        let target = params.display_target();
        assert_eq!(target, "localhost:5432/sales");
        assert!(!target.contains("alice"));
        assert!(!target.contains("secret"));
    }
}
