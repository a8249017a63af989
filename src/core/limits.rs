/*!
 * Limits and Constants
 *
 * Centralized location for defaults, environment variable names and
 * thresholds used across the crate.
 */

use std::time::Duration;

// =============================================================================
// TIMERS
// =============================================================================

/// Name given to threads spawned by `ThreadTimer`
pub const DEFAULT_TIMER_THREAD_NAME: &str = "procflow-timer";

/// Delays shorter than this fire without parking a thread
pub const MIN_TIMER_DELAY: Duration = Duration::from_micros(1);

// =============================================================================
// BLOCKING BRIDGE
// =============================================================================

/// How long `invoke_blocking_timeout` waits for a killed process to report
/// its exit before giving up on it
pub const KILL_GRACE_PERIOD: Duration = Duration::from_secs(5);

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Selects the timer backend (`thread` or `tokio`)
pub const ENV_TIMER: &str = "PROCFLOW_TIMER";

/// Enables JSON log output when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "PROCFLOW_TRACE_JSON";

/// Default deadline in milliseconds for blocking runs
pub const ENV_BLOCKING_TIMEOUT_MS: &str = "PROCFLOW_BLOCKING_TIMEOUT_MS";
