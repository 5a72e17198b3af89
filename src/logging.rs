//! Tracing subscriber setup.
//!
//! The crate itself only emits through the `tracing` facade; binaries and
//! tests that want the structured log lines on stdout can call [`init`].

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs a compact stdout subscriber.
///
/// Filter comes from `RUST_LOG` when set, otherwise `svclink=info`. Safe to
/// call once per process; returns whether this call installed the subscriber.
pub fn init() -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("svclink=info"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
