//! Command-line interface for parcopy
//!
//! This module handles:
//! - Command-line argument parsing using clap
//! - Configuration loading and validation
//! - Resolution of connection parameters and export options
//! - Subcommands (version, completion, config)

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::client::ConnectionParams;
use crate::config::{Config, LogLevel, OutputFormat};
use crate::error::{ConfigError, ParcopyError, Result};
use crate::export::ExportOptions;
use crate::prompt::Prompter;
use crate::utils::validate;

/// COPY a PostgreSQL table in parallel using psql workers
#[derive(Parser, Debug)]
#[command(
    name = "parcopy",
    version,
    about = "COPY a table in parallel using the psql command",
    long_about = "Dumps a large PostgreSQL table as a set of smaller files by splitting a \
numeric key range into partitions and running one psql COPY worker per partition, \
up to a configurable number of workers at a time."
)]
pub struct CliArgs {
    /// Table to be dumped
    #[arg(short = 't', long, value_name = "TABLE")]
    pub table: Option<String>,

    /// Database to be dumped (default: current user name)
    #[arg(short = 'd', long, value_name = "NAME")]
    pub dbname: Option<String>,

    /// Number of parallel worker processes
    ///
    /// Should match the number of CPUs the PostgreSQL server can spare.
    /// Defaults to the CPUs available on this machine.
    #[arg(short = 'c', long, value_name = "N")]
    pub count: Option<usize>,

    /// Directory to save dump files (default: ./parcopy-<timestamp>)
    #[arg(long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Target size of each dump file in MB
    #[arg(short = 's', long, value_name = "MB")]
    pub size: Option<u64>,

    /// Output format (csv, text, binary)
    #[arg(short = 'f', long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// Database server host
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Database server port
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,

    /// Database user name (default: current user name)
    #[arg(short = 'U', long, value_name = "USERNAME")]
    pub username: Option<String>,

    /// Password (default: $PGPASSWORD, else prompted)
    #[arg(short = 'W', long, value_name = "PASSWORD")]
    pub password: Option<String>,

    /// Numeric column to split on, skipping the interactive selection
    #[arg(long, value_name = "COLUMN")]
    pub split_column: Option<String>,

    /// Reuse an existing output directory without asking
    #[arg(short = 'y', long = "yes")]
    pub assume_yes: bool,

    /// Wait for all workers to finish and report their exit status
    #[arg(long)]
    pub wait: bool,

    /// Configuration file path
    #[arg(long = "config", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Quiet mode (minimal output)
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose mode (detailed logging)
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Very verbose mode (debug logging)
    #[arg(long = "vv")]
    pub very_verbose: bool,

    /// Subcommands
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Subcommands for parcopy
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show version information
    Version,

    /// Generate shell completion script
    Completion {
        /// Shell type (bash, zsh, fish, powershell)
        #[arg(value_name = "SHELL")]
        shell: String,
    },

    /// Show configuration
    Config {
        /// Show effective configuration
        #[arg(long)]
        show: bool,

        /// Validate configuration file
        #[arg(long)]
        validate: bool,
    },
}

/// CLI interface handler
pub struct CliInterface {
    /// Parsed command-line arguments
    args: CliArgs,

    /// Loaded configuration
    config: Config,
}

impl CliInterface {
    /// Create a new CLI interface
    ///
    /// # Returns
    /// * `Result<Self>` - New CLI interface or error
    pub fn new() -> Result<Self> {
        let args = CliArgs::parse();
        let config = Self::load_config(&args)?;

        Ok(Self { args, config })
    }

    /// Load configuration from file and merge with arguments
    fn load_config(args: &CliArgs) -> Result<Config> {
        let mut config = Config::load_from_file(args.config_file.as_deref())?;
        Self::apply_args_to_config(&mut config, args);
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI arguments to configuration
    ///
    /// Overrides configuration values with CLI arguments where provided
    fn apply_args_to_config(config: &mut Config, args: &CliArgs) {
        if let Some(ref host) = args.host {
            config.connection.host = host.clone();
        }
        if let Some(port) = args.port {
            config.connection.port = port;
        }
        if let Some(ref dbname) = args.dbname {
            config.connection.dbname = Some(dbname.clone());
        }
        if let Some(ref username) = args.username {
            config.connection.username = Some(username.clone());
        }
        if let Some(size) = args.size {
            config.export.target_size_mb = size;
        }
        if let Some(count) = args.count {
            config.export.concurrency = Some(count);
        }

        config.logging.level = if args.very_verbose {
            LogLevel::Trace
        } else if args.verbose {
            LogLevel::Debug
        } else if args.quiet {
            LogLevel::Error
        } else {
            config.logging.level
        };
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the CLI arguments
    pub fn args(&self) -> &CliArgs {
        &self.args
    }

    /// The table to dump
    ///
    /// # Returns
    /// * `Result<&str>` - Validated table name, or an error when missing
    pub fn table(&self) -> Result<&str> {
        let table = self
            .args
            .table
            .as_deref()
            .ok_or_else(|| ParcopyError::Generic("--table is required".to_string()))?;

        if !validate::is_valid_table_name(table) {
            return Err(ConfigError::InvalidValue {
                field: "table".to_string(),
                value: table.to_string(),
            }
            .into());
        }
        Ok(table)
    }

    /// Database name: argument, config, current user, in that order
    pub fn dbname(&self) -> String {
        self.config
            .connection
            .dbname
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "postgres".to_string())
    }

    /// User name: argument, config, current user, in that order
    pub fn username(&self) -> String {
        self.config
            .connection
            .username
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .unwrap_or_else(|| "postgres".to_string())
    }

    /// Password: argument, $PGPASSWORD, interactive prompt, in that order
    pub fn resolve_password(&self, prompter: &dyn Prompter) -> Result<String> {
        if let Some(ref password) = self.args.password {
            return Ok(password.clone());
        }
        if let Ok(password) = std::env::var("PGPASSWORD") {
            return Ok(password);
        }
        prompter.secret("password for database")
    }

    /// Assemble connection parameters with the resolved password
    pub fn connection_params(&self, password: String) -> ConnectionParams {
        ConnectionParams {
            host: self.config.connection.host.clone(),
            port: self.config.connection.port,
            dbname: self.dbname(),
            username: self.username(),
            password,
        }
    }

    /// Worker cap: argument/config, else the CPUs available here
    pub fn concurrency(&self) -> usize {
        self.config.export.concurrency.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Output directory: argument, else a timestamped directory under CWD
    pub fn output_directory(&self) -> PathBuf {
        self.args.directory.clone().unwrap_or_else(|| {
            let stamp = chrono::Local::now().format("%Y%m%d%H%M%S");
            PathBuf::from(format!("parcopy-{stamp}"))
        })
    }

    /// Resolve the export options for this invocation
    pub fn export_options(&self) -> Result<ExportOptions> {
        let table = self.table()?.to_string();

        if let Some(ref column) = self.args.split_column
            && !validate::is_valid_identifier(column)
        {
            return Err(ConfigError::InvalidValue {
                field: "split-column".to_string(),
                value: column.clone(),
            }
            .into());
        }

        let format = match self.args.format {
            Some(ref raw) => OutputFormat::parse(raw).ok_or_else(|| ConfigError::InvalidValue {
                field: "format".to_string(),
                value: raw.clone(),
            })?,
            None => self.config.export.format,
        };

        Ok(ExportOptions {
            table,
            split_column: self.args.split_column.clone(),
            concurrency: self.concurrency(),
            target_bytes: self.config.target_bytes(),
            sample_size: self.config.export.sample_size,
            inflation: self.config.export.inflation,
            format,
            directory: self.output_directory(),
            assume_yes: self.args.assume_yes,
            wait_for_workers: self.args.wait,
            show_progress: !self.args.quiet,
            poll_interval: self.config.poll_interval(),
        })
    }

    /// Handle subcommands
    ///
    /// # Returns
    /// * `Result<bool>` - True if a subcommand was handled, false to continue
    pub async fn handle_subcommand(&self) -> Result<bool> {
        match &self.args.command {
            Some(Commands::Version) => {
                self.show_version();
                Ok(true)
            }
            Some(Commands::Completion { shell }) => {
                self.generate_completion(shell)?;
                Ok(true)
            }
            Some(Commands::Config { show, validate }) => {
                self.handle_config_command(*show, *validate)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Show version information
    fn show_version(&self) {
        println!("parcopy version {}", env!("CARGO_PKG_VERSION"));
        println!("Rust version: {}", env!("CARGO_PKG_RUST_VERSION"));
    }

    /// Generate shell completion script on stdout
    fn generate_completion(&self, shell: &str) -> Result<()> {
        let shell: Shell = shell
            .parse()
            .map_err(|_| ParcopyError::Generic(format!("Unsupported shell: {shell}")))?;
        let mut command = CliArgs::command();
        clap_complete::generate(shell, &mut command, "parcopy", &mut std::io::stdout());
        Ok(())
    }

    /// Handle config subcommand
    fn handle_config_command(&self, show: bool, validate: bool) -> Result<()> {
        if validate {
            self.validate_config_file()?;
        }

        if show {
            self.show_config()?;
        }

        Ok(())
    }

    /// Validate configuration file
    fn validate_config_file(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("Validating configuration file: {}", path.display());

        if !path.exists() {
            println!("Configuration file does not exist");
            return Ok(());
        }

        match Config::load_from_file(self.args.config_file.as_deref()) {
            Ok(config) => match config.validate() {
                Ok(_) => println!("Configuration is valid"),
                Err(e) => println!("Configuration validation failed: {}", e),
            },
            Err(e) => println!("Failed to load configuration: {}", e),
        }

        Ok(())
    }

    /// Show effective configuration
    fn show_config(&self) -> Result<()> {
        let path = self.get_config_path();
        println!("Configuration file: {}", path.display());
        println!();
        println!("=== Effective Configuration ===");
        println!();
        println!("{}", self.config.to_toml()?);
        Ok(())
    }

    /// Get configuration file path (from args or default)
    fn get_config_path(&self) -> PathBuf {
        self.args
            .config_file
            .as_ref()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Config::default_config_path)
    }

    /// Print banner with version and connection info
    pub fn print_banner(&self) {
        if !self.args.quiet {
            println!(
                "Dumping table '{}' from {}:{}/{}",
                self.args.table.as_deref().unwrap_or("?"),
                self.config.connection.host,
                self.config.connection.port,
                self.dbname()
            );
            println!("Using parcopy: {}", env!("CARGO_PKG_VERSION"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interface(argv: &[&str]) -> CliInterface {
        let args = CliArgs::try_parse_from(argv).unwrap();
        // Bypass the config file so tests never touch the home directory.
        let mut config = Config::default();
        CliInterface::apply_args_to_config(&mut config, &args);
        CliInterface { args, config }
    }

    #[test]
    fn test_cli_args_parsing() {
        let args = CliArgs::try_parse_from(vec!["parcopy", "-t", "orders"]).unwrap();
        assert_eq!(args.table, Some("orders".to_string()));
        assert!(args.dbname.is_none());
        assert!(!args.assume_yes);
    }

    #[test]
    fn test_cli_args_with_flags() {
        let args = CliArgs::try_parse_from(vec![
            "parcopy", "-t", "orders", "--yes", "--wait", "-q", "-c", "8",
        ])
        .unwrap();
        assert!(args.assume_yes);
        assert!(args.wait);
        assert!(args.quiet);
        assert_eq!(args.count, Some(8));
    }

    #[test]
    fn test_args_override_config() {
        let cli = interface(&[
            "parcopy", "-t", "orders", "--host", "db.internal", "-p", "5433", "-s", "256",
        ]);
        assert_eq!(cli.config().connection.host, "db.internal");
        assert_eq!(cli.config().connection.port, 5433);
        assert_eq!(cli.config().export.target_size_mb, 256);
    }

    #[test]
    fn test_export_options_size_in_bytes() {
        let cli = interface(&["parcopy", "-t", "orders", "-s", "2"]);
        let options = cli.export_options().unwrap();
        assert_eq!(options.target_bytes, 2 * 1024 * 1024);
        assert_eq!(options.format, OutputFormat::Csv);
    }

    #[test]
    fn test_export_options_format_parse() {
        let cli = interface(&["parcopy", "-t", "orders", "-f", "BINARY"]);
        let options = cli.export_options().unwrap();
        assert_eq!(options.format, OutputFormat::Binary);

        let cli = interface(&["parcopy", "-t", "orders", "-f", "parquet"]);
        assert!(cli.export_options().is_err());
    }

    #[test]
    fn test_export_options_requires_table() {
        let cli = interface(&["parcopy"]);
        let err = cli.export_options().unwrap_err();
        assert!(err.to_string().contains("--table"));
    }

    #[test]
    fn test_invalid_table_name_rejected() {
        let cli = interface(&["parcopy", "-t", "orders; DROP TABLE x"]);
        assert!(cli.export_options().is_err());
    }

    #[test]
    fn test_invalid_split_column_rejected() {
        let cli = interface(&["parcopy", "-t", "orders", "--split-column", "id or 1=1"]);
        assert!(cli.export_options().is_err());
    }

    #[test]
    fn test_schema_qualified_table_accepted() {
        let cli = interface(&["parcopy", "-t", "public.orders"]);
        assert_eq!(cli.table().unwrap(), "public.orders");
    }

    #[test]
    fn test_default_output_directory_is_timestamped() {
        let cli = interface(&["parcopy", "-t", "orders"]);
        let dir = cli.output_directory();
        assert!(dir.to_string_lossy().starts_with("parcopy-"));

        let cli = interface(&["parcopy", "-t", "orders", "--directory", "/data/dump"]);
        assert_eq!(cli.output_directory(), PathBuf::from("/data/dump"));
    }

    #[test]
    fn test_concurrency_defaults_to_available_cpus() {
        let cli = interface(&["parcopy", "-t", "orders"]);
        assert!(cli.concurrency() >= 1);

        let cli = interface(&["parcopy", "-t", "orders", "-c", "5"]);
        assert_eq!(cli.concurrency(), 5);
    }

    #[test]
    fn test_connection_params_from_args() {
        let cli = interface(&[
            "parcopy", "-t", "orders", "--host", "db", "-p", "5433", "-d", "sales", "-U", "alice",
        ]);
        let params = cli.connection_params("pw".to_string());
        assert_eq!(params.host, "db");
        assert_eq!(params.port, 5433);
        assert_eq!(params.dbname, "sales");
        assert_eq!(params.username, "alice");
        assert_eq!(params.password, "pw");
    }

    #[test]
    fn test_verbosity_maps_to_log_level() {
        let cli = interface(&["parcopy", "-t", "orders", "-v"]);
        assert_eq!(cli.config().logging.level, LogLevel::Debug);

        let cli = interface(&["parcopy", "-t", "orders", "--vv"]);
        assert_eq!(cli.config().logging.level, LogLevel::Trace);

        let cli = interface(&["parcopy", "-t", "orders", "-q"]);
        assert_eq!(cli.config().logging.level, LogLevel::Error);
    }
}
