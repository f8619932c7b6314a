//! Logging setup and statement logging.
//!
//! The library itself only emits `tracing` events. Binaries and tests that
//! want to see them call [`init`] once, which installs a
//! `tracing-subscriber` registry (cargo feature `tracing-subscriber`)
//! configured from the environment:
//!
//! - `SQUAD_DEBUG=true|1|yes` enables debug-level output
//! - `SQUAD_LOG_LEVEL=trace|debug|info|warn|error` sets the level explicitly
//! - `SQUAD_LOG_FORMAT=json|pretty|compact` picks the output format (default: json)
//!
//! ```rust,no_run
//! use squad_query::logging::{self, LogFormat, LogSettings};
//!
//! // From the environment
//! logging::init();
//!
//! // Or explicitly
//! logging::init_with(LogSettings::new("debug", LogFormat::Compact));
//! ```
//!
//! Executed statements are logged at debug level with their SQL when
//! `[debug] log_queries` is on, and at warn level when slower than
//! `[debug] slow_query_threshold`.

use std::env;
use std::sync::Once;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::QuerySettings;

static INIT: Once = Once::new();

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line, human-oriented.
    Pretty,
    /// Single-line, human-oriented.
    Compact,
}

impl LogFormat {
    /// Parse a format name; unknown names fall back to JSON.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

/// Level and format for [`init_with`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Level directive applied to the squad crates.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl LogSettings {
    /// Explicit settings.
    pub fn new(level: impl Into<String>, format: LogFormat) -> Self {
        Self {
            level: level.into(),
            format,
        }
    }

    /// Settings read from `SQUAD_LOG_LEVEL`, `SQUAD_DEBUG` and
    /// `SQUAD_LOG_FORMAT`.
    pub fn from_env() -> Self {
        let format = env::var("SQUAD_LOG_FORMAT")
            .map(|f| LogFormat::parse(&f))
            .unwrap_or_default();
        Self::new(log_level(), format)
    }
}

/// Whether `SQUAD_DEBUG` is set to "true", "1" or "yes" (any case).
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var("SQUAD_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(false)
}

/// The level from `SQUAD_LOG_LEVEL`; otherwise "debug" when `SQUAD_DEBUG`
/// is enabled and "warn" when it is not.
pub fn log_level() -> &'static str {
    let fallback = if is_debug_enabled() { "debug" } else { "warn" };
    match env::var("SQUAD_LOG_LEVEL") {
        Ok(level) => match level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "info" => "info",
            "warn" => "warn",
            "error" => "error",
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

/// Install the subscriber from the environment.
///
/// Does nothing unless `SQUAD_DEBUG` or `SQUAD_LOG_LEVEL` is set, and only
/// the first call in a process has any effect.
pub fn init() {
    if !is_debug_enabled() && env::var("SQUAD_LOG_LEVEL").is_err() {
        return;
    }
    init_with(LogSettings::from_env());
}

/// Install the subscriber with explicit settings.
///
/// Only the first call in a process has any effect. Without the
/// `tracing-subscriber` feature this is a no-op and events reach whatever
/// subscriber the application installed itself.
pub fn init_with(settings: LogSettings) {
    INIT.call_once(|| {
        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt, prelude::*};

            let filter = EnvFilter::try_new(format!(
                "squad={},squad_query={}",
                settings.level, settings.level
            ))
            .unwrap_or_else(|_| EnvFilter::new("warn"));

            let registry = tracing_subscriber::registry().with(filter);
            let installed = match settings.format {
                LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
                LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
                LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            };

            if installed.is_ok() {
                tracing::info!(
                    level = %settings.level,
                    format = ?settings.format,
                    "squad logging initialized"
                );
            }
        }

        #[cfg(not(feature = "tracing-subscriber"))]
        let _ = settings;
    });
}

/// Record one executed statement.
pub(crate) fn statement_executed(
    settings: &QuerySettings,
    kind: &'static str,
    sql: &str,
    params: usize,
    elapsed: Duration,
) {
    let elapsed_ms = elapsed.as_millis() as u64;
    if elapsed >= settings.slow_query_threshold {
        warn!(kind, sql, params, elapsed_ms, "slow statement");
    } else if settings.log_queries {
        debug!(kind, sql, params, elapsed_ms, "statement executed");
    }
}

/// Debug-level event, emitted only when `SQUAD_DEBUG` is enabled.
#[macro_export]
macro_rules! squad_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}

/// Trace-level event, emitted only when `SQUAD_DEBUG` is enabled.
#[macro_export]
macro_rules! squad_trace {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::trace!($($arg)*);
        }
    };
}
