//! Process-wide tracing setup shared by the material store binaries.

/// Subscriber construction (filters, JSON layer).
pub mod tracing;

pub use tracing::{DEFAULT_DIRECTIVE, env_filter};

/// Initialize JSON tracing with the `RUST_LOG` filter (default `info`).
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    tracing::init(DEFAULT_DIRECTIVE);
}

/// Like [`init`], with a caller-chosen fallback directive.
pub fn init_with_default(directive: &str) {
    tracing::init(directive);
}
