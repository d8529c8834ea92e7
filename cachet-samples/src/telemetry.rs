//! Process-wide tracing setup for demos and tests.

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Install the fmt subscriber once, filtered by `RUST_LOG`.
///
/// Safe to call from every test; repeated calls are no-ops.
pub fn init_tracing() {
    INIT.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init()
            .ok();
    });
}
