/*!
 * Structured Tracing
 * Subscriber setup and spans for active-message dispatch
 *
 * Features:
 * - Environment-driven filtering via RUST_LOG
 * - JSON output for log shipping, compact output for development
 * - Per-message spans with slow-handler warnings
 */

use crate::core::types::{HandlerId, ProcessId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level, Span};
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Environment variable selecting JSON output
pub const TRACE_JSON_ENV: &str = "GROUP_RUNTIME_TRACE_JSON";

/// Handlers running longer than this are reported as slow
pub const SLOW_HANDLER_THRESHOLD: Duration = Duration::from_millis(10);

static NEXT_TRACE_ID: AtomicU64 = AtomicU64::new(1);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - GROUP_RUNTIME_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns false if a global subscriber was already installed, which makes
/// repeated calls from tests harmless.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var(TRACE_JSON_ENV)
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .with_file(true)
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
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_line_number(true)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Structured tracing initialized");
    }
    installed
}

/// Span covering one active-message handler invocation
pub struct HandlerSpan {
    span: Span,
    start: Instant,
    trace_id: u64,
    handler: HandlerId,
}

impl HandlerSpan {
    pub fn new(rank: ProcessId, src: ProcessId, handler: HandlerId, payload_len: usize) -> Self {
        let trace_id = NEXT_TRACE_ID.fetch_add(1, Ordering::Relaxed);
        let span = span!(
            Level::DEBUG,
            "active_message",
            trace_id,
            rank,
            src,
            handler,
            payload_len,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            trace_id,
            handler,
        }
    }

    pub fn trace_id(&self) -> u64 {
        self.trace_id
    }

    /// Record the handler outcome
    pub fn record_result(&self, success: bool) {
        self.span
            .record("result", if success { "success" } else { "error" });
    }

    /// Enter the span context
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Drop for HandlerSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_HANDLER_THRESHOLD {
            warn!(
                trace_id = self.trace_id,
                handler = self.handler,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "slow active-message handler"
            );
        } else {
            debug!(
                trace_id = self.trace_id,
                handler = self.handler,
                duration_us = duration.as_micros() as u64,
                "active-message handler completed"
            );
        }
    }
}

/// Helper to create a handler span
#[inline]
pub fn span_handler(
    rank: ProcessId,
    src: ProcessId,
    handler: HandlerId,
    payload_len: usize,
) -> HandlerSpan {
    HandlerSpan::new(rank, src, handler, payload_len)
}
