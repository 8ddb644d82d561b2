use parking_lot::RwLock;
use std::sync::Arc;

/// A thread-safe, shareable, mutable cell.
pub type Atomic<T> = Arc<RwLock<T>>;

/// Wraps a value in an [Atomic] cell.
pub fn atomic<T>(t: T) -> Atomic<T> {
    Arc::new(RwLock::new(t))
}
