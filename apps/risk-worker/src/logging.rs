//! Worker log output.
//!
//! One JSON object per line. Engine events are emitted inside the
//! orchestrator's `calculate_at` span, so the current span is attached to
//! every line: a batch's interleaved calculations can be told apart by the
//! span's `risk_id` and `trigger` fields.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is not set: per-step engine detail, info elsewhere.
pub const DEFAULT_LOG_FILTER: &str = "info,riskwise_engine=debug";

/// `RUST_LOG` if set, otherwise `fallback`.
fn worker_filter(fallback: &str) -> Result<EnvFilter, ParseError> {
    EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))
}

/// Install the JSON subscriber for the worker process.
///
/// Exits the process when the filter does not parse.
pub fn init_logging(fallback: &str) {
    let filter = match worker_filter(fallback) {
        Ok(filter) => filter,
        Err(e) => {
            eprintln!("FATAL: Invalid log filter: {e}");
            std::process::exit(1);
        }
    };

    let json = fmt::layer()
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .with_span_list(false)
        .with_target(true);

    tracing_subscriber::registry().with(json).with(filter).init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        fallback_filter = %fallback,
        "Risk worker logging initialized"
    );
}
