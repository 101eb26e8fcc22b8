//! Subscriber setup for the `pfa` binary.
//!
//! Library crates only emit events; installing a subscriber is the host's
//! business. The filter comes from `PFA_LOG`, falling back to `RUST_LOG`
//! and then to `warn`. `PFA_LOG_TREE=1` switches to an indented span tree.

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};
use tracing_tree::HierarchicalLayer;

static INIT: Once = Once::new();

/// Install the global subscriber. Later calls do nothing.
pub fn init() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env("PFA_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("warn"));
        let registry = tracing_subscriber::registry().with(filter);

        let tree = std::env::var("PFA_LOG_TREE").is_ok_and(|v| v == "1");
        let installed = if tree {
            registry
                .with(
                    HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true)
                        .with_writer(std::io::stderr),
                )
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
                .try_init()
        };
        if installed.is_err() {
            eprintln!("warning: a tracing subscriber is already installed");
        }
    });
}
