//! Tracing, logging, metrics (shared setup).

/// Initialize process-wide observability (tracing/logging).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init("info");
}

/// Initialize with an explicit default level (`RUST_LOG` still wins).
pub fn init_with_level(level: &str) {
    tracing::init(level);
}

/// Tracing configuration (filters, layers).
pub mod tracing;
