//! Logging to stderr.
//!
//! stdout carries the LSP transport (or converted output in the CLI), so every
//! log line goes to stderr. `RUST_LOG` overrides the default level:
//!
//! ```bash
//! RUST_LOG=debug luamod index .
//! RUST_LOG=luamod_lsp=trace luamod-lsp
//! ```

use std::sync::Once;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

static INIT: Once = Once::new();

/// Install the global subscriber. Only the first call takes effect.
pub fn init(default_level: &str) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(default_level)
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(false)
            .with_filter(filter);

        // A subscriber installed by an embedding process wins.
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
}
