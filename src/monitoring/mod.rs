/*!
 * Monitoring
 * Structured logging setup and dispatch spans
 */

mod tracer;

pub use tracer::{init_tracing, span_handler, HandlerSpan, SLOW_HANDLER_THRESHOLD, TRACE_JSON_ENV};
