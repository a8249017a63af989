/*!
 * Run Tracing
 * Structured tracing for process runs using the tracing crate
 *
 * Every run driven through a bridge gets a span carrying a trace ID, the
 * root process name and, once it finishes, the result kind and duration.
 * Combinator lifecycle events (invoked, completed, failed, kill requested)
 * are emitted inside that span at debug/trace level.
 */

use crate::core::limits::ENV_TRACE_JSON;
use crate::core::types::PResult;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};
use uuid::Uuid;

/// Runs slower than this are reported at warn level
const SLOW_RUN_THRESHOLD: Duration = Duration::from_secs(10);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - PROCFLOW_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let use_json = std::env::var(ENV_TRACE_JSON)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);
    init_tracing_with(use_json)
}

/// Initialize structured tracing with an explicit output format
pub fn init_tracing_with(use_json: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "process tracing initialized");
    }
    installed
}

/// Generate a unique trace ID for run correlation
pub fn generate_trace_id() -> String {
    Uuid::new_v4().to_string()
}

/// Span covering one run of a process tree
pub struct RunSpan {
    span: Span,
    start: Instant,
    trace_id: String,
    process: &'static str,
}

impl RunSpan {
    pub fn new(process: &'static str) -> Self {
        let trace_id = generate_trace_id();
        let span = span!(
            Level::DEBUG,
            "run",
            trace_id = %trace_id,
            process = process,
            result = tracing::field::Empty,
            duration_ms = tracing::field::Empty,
        );

        span.in_scope(|| debug!(process, "run started"));

        Self {
            span,
            start: Instant::now(),
            trace_id,
            process,
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Clone of the underlying span, for entering on other threads
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// Record how the run ended
    pub fn record_result(&self, result: &PResult) {
        let kind = match result {
            PResult::Done => "done",
            PResult::Killed => "killed",
            PResult::Exception(_) => "exception",
        };
        self.span.record("result", kind);
        if let PResult::Exception(err) = result {
            self.span.in_scope(|| debug!(error = %err, "run failed"));
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for RunSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        self.span.record("duration_ms", duration.as_millis() as u64);
        let _entered = self.span.enter();

        if duration > SLOW_RUN_THRESHOLD {
            warn!(
                trace_id = %self.trace_id,
                process = self.process,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow run detected"
            );
        } else {
            debug!(
                trace_id = %self.trace_id,
                process = self.process,
                duration_us = duration.as_micros() as u64,
                "run finished"
            );
        }
    }
}
