//! Structured logging setup (SPEC_FULL.md §11).
//!
//! Grounded on `examples/appujet-baja/src/common/logger/mod.rs`'s `init`:
//! a `tracing_subscriber` registry with an `EnvFilter` layer and an `fmt`
//! layer. The teacher additionally wires a circular file writer and a
//! custom RAM-usage formatter for its own server's operational needs;
//! this codec drops both (SPEC_FULL.md §11, DESIGN.md) and keeps only the
//! filtering and formatting layers a library-grade crate needs.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Installs the global `tracing` subscriber from `config`. Call once, near
/// the start of `main`; a second call is a no-op (and logged as such)
/// since `tracing` only accepts one global subscriber per process.
pub fn init(config: &LoggingConfig) {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    for directive in &config.filters {
        match directive.parse() {
            Ok(d) => filter = filter.add_directive(d),
            Err(e) => eprintln!("pbstream: ignoring invalid logging filter {directive:?}: {e}"),
        }
    }

    let fmt_layer = fmt::layer().with_target(true).with_level(true);

    if tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already initialized, skipping");
    }
}
