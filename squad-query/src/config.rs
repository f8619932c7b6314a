//! Configuration file parsing for `squad.toml`.
//!
//! ```toml
//! [database]
//! dialect = "postgresql"
//!
//! [query]
//! max_rows = 500
//!
//! [debug]
//! log_queries = true
//! slow_query_threshold = 250
//!
//! [environments.test.debug]
//! log_queries = false
//! ```
//!
//! `${VAR}` references are replaced with environment variables before
//! parsing. Unknown keys are rejected.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::sql::DatabaseType;

/// Contents of `squad.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SquadConfig {
    /// `[database]`
    #[serde(default)]
    pub database: DatabaseConfig,

    /// `[query]`
    #[serde(default)]
    pub query: QueryConfig,

    /// `[debug]`
    #[serde(default)]
    pub debug: DebugConfig,

    /// `[environments.<name>.*]` tables, applied by [`with_environment`](Self::with_environment).
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl SquadConfig {
    /// Read and parse a `squad.toml` file.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::invalid_configuration(format!("cannot read {}", path.display()))
                .with_source(e)
        })?;

        Self::from_str(&content)
    }

    /// Parse TOML text after `${VAR}` expansion.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content)?;

        toml::from_str(&expanded).map_err(|e| {
            QueryError::invalid_configuration(format!("invalid squad.toml: {}", e.message()))
                .with_source(e)
        })
    }

    /// Layer the values set under `[environments.<env>]` over the base
    /// sections. An unknown environment leaves the config unchanged.
    pub fn with_environment(mut self, env: &str) -> Self {
        let Some(EnvironmentOverride {
            database,
            query,
            debug,
        }) = self.environments.remove(env)
        else {
            return self;
        };

        let dialect = database.and_then(|d| d.dialect);
        self.database.dialect = dialect.unwrap_or(self.database.dialect);

        if let Some(max_rows) = query.and_then(|q| q.max_rows) {
            self.query.max_rows = Some(max_rows);
        }

        let debug = debug.unwrap_or_default();
        self.debug.log_queries = debug.log_queries.unwrap_or(self.debug.log_queries);
        self.debug.slow_query_threshold = debug
            .slow_query_threshold
            .unwrap_or(self.debug.slow_query_threshold);
        self
    }

    /// The runtime settings operations read.
    pub fn settings(&self) -> QuerySettings {
        QuerySettings {
            dialect: self.database.dialect,
            max_rows: self.query.max_rows,
            log_queries: self.debug.log_queries,
            slow_query_threshold: Duration::from_millis(self.debug.slow_query_threshold),
        }
    }
}

/// `[database]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQL dialect used when rendering statements.
    #[serde(default)]
    pub dialect: DatabaseType,
}

/// `[query]` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Row cap applied to selects that set no limit of their own.
    pub max_rows: Option<u64>,
}

/// `[debug]` section.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every executed statement at debug level.
    #[serde(default)]
    pub log_queries: bool,

    /// Statements slower than this many milliseconds are logged as warnings.
    #[serde(default = "default_slow_query_threshold")]
    pub slow_query_threshold: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_queries: false,
            slow_query_threshold: default_slow_query_threshold(),
        }
    }
}

fn default_slow_query_threshold() -> u64 {
    1000
}

/// One `[environments.<name>]` table. Unset keys keep the base value.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// `[environments.<name>.database]`
    pub database: Option<DatabaseOverride>,

    /// `[environments.<name>.query]`
    pub query: Option<QueryConfig>,

    /// `[environments.<name>.debug]`
    pub debug: Option<DebugOverride>,
}

/// Overridable `[database]` keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseOverride {
    /// Replacement dialect.
    pub dialect: Option<DatabaseType>,
}

/// Overridable `[debug]` keys.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOverride {
    /// Replacement for `log_queries`.
    pub log_queries: Option<bool>,

    /// Replacement for `slow_query_threshold`.
    pub slow_query_threshold: Option<u64>,
}

/// Resolved settings carried by the factory and every operation it creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySettings {
    /// Dialect for rendered SQL.
    pub dialect: DatabaseType,
    /// Default row cap for selects.
    pub max_rows: Option<u64>,
    /// Whether executed statements are logged.
    pub log_queries: bool,
    /// Statements slower than this are logged as warnings.
    pub slow_query_threshold: Duration,
}

impl Default for QuerySettings {
    fn default() -> Self {
        SquadConfig::default().settings()
    }
}

/// Replace `${NAME}` with the value of environment variable `NAME`.
/// References to unset variables stay as written.
fn expand_env_vars(content: &str) -> QueryResult<String> {
    let reference = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| QueryError::internal("invalid env pattern").with_source(e))?;

    let expanded = reference.replace_all(content, |caps: &regex_lite::Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });
    Ok(expanded.into_owned())
}
