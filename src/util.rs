use std::sync::Once;

use tracing_subscriber::EnvFilter;

static LOG_INIT: Once = Once::new();

/// One-shot tracing setup for tests and embedding harnesses. Honors
/// `RUST_LOG`; defaults to warnings only so assertion output stays
/// readable. Safe to call from every test.
pub fn init_test_logging() {
    LOG_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
