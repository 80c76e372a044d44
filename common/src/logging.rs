//! Structured logging setup + the `[IST ts] component: op ...` event format
//! from §6. The teacher's server logs via `tracing` + `tracing-subscriber`
//! (`server/src/main.rs`); this generalizes that to also persist an
//! append-only file sink via `tracing-appender`, which stands in for the
//! out-of-scope "append-only text log file" interface spec.md names.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::time::ist_now_string;

/// Initializes the global tracing subscriber: a stdout layer plus a
/// rolling-file layer under `logs/<component>.log`. The returned guard must
/// be held for the process lifetime (dropping it stops the background
/// flush worker).
pub fn init(component: &'static str) -> WorkerGuard {
    std::fs::create_dir_all("logs").ok();
    let file_appender = tracing_appender::rolling::never("logs", format!("{component}.log"));
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);
    let stdout_layer = tracing_subscriber::fmt::layer();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| format!("{component}=info").into()),
        )
        .with(stdout_layer)
        .with(file_layer)
        .init();

    guard
}

/// Emit one event line in the exact shape spec §6 requires:
/// `[IST timestamp] <component>: <op> user=<u> details=<kv> result=<n>`.
///
/// NM operations are echoed to stdout by the `init`ed stdout layer
/// automatically; this function only needs to log once.
pub fn log_event(component: &str, op: &str, user: &str, details: &str, result: i32) {
    let ts = ist_now_string();
    tracing::info!(
        target: "docs_event",
        "[{ts}] {component}: {op} user={user} details={details} result={result}"
    );
}
