//! Tracing/logging setup shared by binaries and tests.

/// Initialize process-wide tracing for the order core.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Subscriber configuration (filters, output format).
pub mod tracing;
