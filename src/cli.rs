//! Command-line argument parsing for the SQL gateway.
//!
//! Every flag can also be supplied through the environment variable named in
//! its help text.

use crate::config::{Config, ConnectionConfig, ServerConfig};
use crate::error::Result;
use clap::parser::ValueSource;
use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use std::path::PathBuf;

/// A read-only HTTP gateway for SELECT queries against PostgreSQL.
#[derive(Parser, Debug)]
#[command(name = "sql-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Interface to listen on
    #[arg(long, value_name = "HOST", env = "GATEWAY_HOST")]
    pub bind_host: Option<String>,

    /// Port to listen on
    #[arg(long, value_name = "PORT", env = "GATEWAY_PORT")]
    pub bind_port: Option<u16>,

    /// PostgreSQL connection string; takes precedence over the individual --db-* options
    #[arg(long, value_name = "URL", env = "DATABASE_URL", hide_env_values = true)]
    pub database_url: Option<String>,

    /// Database host
    #[arg(long, value_name = "HOST", env = "DB_HOST")]
    pub db_host: Option<String>,

    /// Database port
    #[arg(long, value_name = "PORT", env = "DB_PORT")]
    pub db_port: Option<u16>,

    /// Database name
    #[arg(long, value_name = "NAME", env = "DB_NAME")]
    pub db_name: Option<String>,

    /// Database user
    #[arg(long, value_name = "USER", env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, value_name = "PASSWORD", env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// The --db-* values typed on the command line, as opposed to read from
    /// the environment.
    #[arg(skip)]
    command_line_db: ConnectionConfig,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::from_matches(&Self::command().get_matches()).unwrap_or_else(|e| e.exit())
    }

    /// Parses the given arguments, returning an error instead of exiting.
    pub fn try_parse_args_from<I, T>(args: I) -> std::result::Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::from_matches(&Self::command().try_get_matches_from(args)?)
    }

    fn from_matches(matches: &ArgMatches) -> std::result::Result<Self, clap::Error> {
        let mut cli = Self::from_arg_matches(matches)?;
        let typed = |id: &str| matches.value_source(id) == Some(ValueSource::CommandLine);

        cli.command_line_db = ConnectionConfig {
            host: cli.db_host.clone().filter(|_| typed("db_host")),
            port: cli.db_port.filter(|_| typed("db_port")),
            database: cli.db_name.clone().filter(|_| typed("db_name")),
            user: cli.db_user.clone().filter(|_| typed("db_user")),
            password: cli.db_password.clone().filter(|_| typed("db_password")),
        };
        Ok(cli)
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Converts flags and environment into a partial config to layer over
    /// the file config.
    ///
    /// Layering, lowest first: `DB_*` variables, the database URL (flag or
    /// `DATABASE_URL`), then `--db-*` flags typed on the command line.
    pub fn to_overrides(&self) -> Result<Config> {
        let mut database = match &self.database_url {
            Some(url) => ConnectionConfig::from_connection_string(url)?,
            None => ConnectionConfig {
                host: self.db_host.clone(),
                port: self.db_port,
                database: self.db_name.clone(),
                user: self.db_user.clone(),
                password: self.db_password.clone(),
            },
        };
        database.merge(&self.command_line_db);

        Ok(Config {
            server: ServerConfig {
                host: self.bind_host.clone(),
                port: self.bind_port,
            },
            database,
        })
    }

    /// Loads the config file and applies flag and environment overrides.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = Config::load_from_file(&self.config_path())?;
        config.merge(&self.to_overrides()?);
        Ok(config)
    }
}
