/*!
 * Runtime Configuration
 *
 * Timer backend, tracing format and blocking deadline, with environment
 * overrides:
 * - PROCFLOW_TIMER: `thread` or `tokio` (default: thread)
 * - PROCFLOW_TRACE_JSON: `1`/`true` for JSON tracing output
 * - PROCFLOW_BLOCKING_TIMEOUT_MS: deadline for blocking runs, unset for none
 */

use crate::core::limits::{
    DEFAULT_TIMER_THREAD_NAME, ENV_BLOCKING_TIMEOUT_MS, ENV_TIMER, ENV_TRACE_JSON,
};
use crate::core::types::Exit;
use crate::process::Process;
use crate::runtime::blocking::{invoke_blocking, invoke_blocking_timeout};
use crate::runtime::timer::{ThreadTimer, Timer, TokioTimer};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::warn;

/// Configuration errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Unknown timer kind: {0}")]
    #[diagnostic(
        code(config::timer_kind),
        help("Use `thread` or `tokio`.")
    )]
    UnknownTimer(String),

    #[error("Invalid value for {var}: {value}")]
    #[diagnostic(
        code(config::invalid_env),
        help("Blocking timeouts are given in whole milliseconds.")
    )]
    InvalidEnv { var: &'static str, value: String },

    #[error("Malformed configuration: {0}")]
    #[diagnostic(code(config::json))]
    Json(#[from] serde_json::Error),
}

/// Timer backend used for delays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// One parked thread per armed delay
    #[default]
    Thread,
    /// `tokio::time::sleep` on the current runtime
    Tokio,
}

impl FromStr for TimerKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "thread" => Ok(TimerKind::Thread),
            "tokio" => Ok(TimerKind::Tokio),
            other => Err(ConfigError::UnknownTimer(other.to_string())),
        }
    }
}

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Timer backend (default: thread)
    pub timer: TimerKind,

    /// JSON tracing output (default: false)
    pub trace_json: bool,

    /// Name given to timer threads
    pub timer_thread_name: String,

    /// Deadline for blocking runs; `None` waits forever
    pub blocking_timeout: Option<Duration>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timer: TimerKind::Thread,
            trace_json: false,
            timer_thread_name: DEFAULT_TIMER_THREAD_NAME.to_string(),
            blocking_timeout: None,
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokio timers with JSON tracing, for services
    pub fn service() -> Self {
        Self {
            timer: TimerKind::Tokio,
            trace_json: true,
            ..Self::default()
        }
    }

    /// Thread timers with a short blocking deadline, for tests
    pub fn testing() -> Self {
        Self {
            blocking_timeout: Some(Duration::from_secs(10)),
            ..Self::default()
        }
    }

    /// Defaults overridden by the environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides(|var| std::env::var(var).ok())
    }

    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_TIMER) {
            self.timer = value.parse()?;
        }
        if let Some(value) = lookup(ENV_TRACE_JSON) {
            self.trace_json = value == "1" || value.eq_ignore_ascii_case("true");
        }
        if let Some(value) = lookup(ENV_BLOCKING_TIMEOUT_MS) {
            let millis: u64 = value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                var: ENV_BLOCKING_TIMEOUT_MS,
                value: value.clone(),
            })?;
            self.blocking_timeout = Some(Duration::from_millis(millis));
        }
        Ok(self)
    }

    /// Build the configured timer
    ///
    /// A tokio timer requested outside a runtime falls back to a thread
    /// timer.
    pub fn build_timer(&self) -> Arc<dyn Timer> {
        match self.timer {
            TimerKind::Thread => Arc::new(ThreadTimer::with_thread_name(&self.timer_thread_name)),
            TimerKind::Tokio => match Handle::try_current() {
                Ok(handle) => Arc::new(TokioTimer::new(handle)),
                Err(_) => {
                    warn!("tokio timer requested outside a runtime, using thread timer");
                    Arc::new(ThreadTimer::with_thread_name(&self.timer_thread_name))
                }
            },
        }
    }

    /// Drive `process` to completion, honouring `blocking_timeout`
    pub fn run<P>(&self, process: &P) -> Exit
    where
        P: Process + ?Sized,
    {
        match self.blocking_timeout {
            Some(timeout) => invoke_blocking_timeout(process, timeout),
            None => invoke_blocking(process),
        }
    }
}
