//! Opt-in `tracing` subscriber installation. Nothing in this crate calls this
//! implicitly — library code stays free of ambient side effects; a host
//! application (or a test) calls `init_tracing()` once if it wants structured
//! logs on stderr.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TELEMETRY_INIT: OnceCell<()> = OnceCell::new();

const DEFAULT_LOG_DIRECTIVES: &str = "info,chronophrase::engine=debug";

/// Installs a process-wide `tracing` subscriber. Idempotent: later calls are
/// no-ops, so it's safe to call from every `#[test]` that wants log output.
pub fn init_tracing() {
    TELEMETRY_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVES));

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_target(true))
            .init();
    });
}
