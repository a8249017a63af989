/*!
 * Monitoring
 * Tracing setup and per-run spans
 */

pub mod tracer;

pub use tracer::{generate_trace_id, init_tracing, init_tracing_with, RunSpan};
