//! Shared helpers for opgraph integration tests: definition and config
//! builders, a scriptable run launcher, a monitor harness and log capture.

pub mod builders;
pub mod fake_launcher;
pub mod log_capture;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use opgraph::logging::LOG_ENV_VAR;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// Output goes through `with_test_writer()`, so it only shows up for failing
/// tests (or with `-- --nocapture`). Levels come from `OPGRAPH_LOG`, e.g.
/// `OPGRAPH_LOG=opgraph::monitor=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info"));

        // Another harness may already have installed a global subscriber.
        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than `secs` seconds.
pub async fn with_timeout<F, T>(secs: u64, f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(Duration::from_secs(secs), f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {secs} seconds"))
}
