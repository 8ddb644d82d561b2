use crate::errors::GraphResult;

/// Backend contract for transactions.
///
/// # Purpose
/// Implemented by each store backend to provide its transaction semantics.
/// The [`Transaction`] wrapper drives this trait and guarantees that
/// `complete()` runs on every exit path.
///
/// # Contract
/// - `mark_success()` flags the transaction for commit
/// - `mark_failure()` flags the transaction for rollback; once flagged, the
///   transaction cannot succeed
/// - `complete()` commits or rolls back based on the flags; it must be
///   idempotent, as the wrapper may call it from `Drop` as a safety net
pub trait TransactionProvider: Send + Sync {
    /// Gets the transaction id.
    fn id(&self) -> &str;

    /// Flags the transaction for commit.
    fn mark_success(&self);

    /// Flags the transaction for rollback.
    fn mark_failure(&self);

    /// Completes the transaction: commit if flagged successful, rollback
    /// otherwise. Idempotent.
    fn complete(&self) -> GraphResult<()>;
}

/// A handle to an open transaction.
///
/// # Usage
/// Mirrors the host-store transaction discipline: mark the outcome, then
/// finish. A transaction that is finished (or dropped) without `success()`
/// rolls back.
///
/// ```rust,ignore
/// let tx = store.begin_tx()?;
/// match do_work(&store) {
///     Ok(_) => tx.success(),
///     Err(_) => tx.failure(),
/// }
/// tx.finish()?;
/// ```
///
/// # Nesting
/// Transactions nest: an inner transaction joins the outermost one, and a
/// failure at any depth poisons the whole. Only the outermost `finish`
/// actually commits or rolls back.
///
/// # Drop behaviour
/// Dropping an unfinished transaction completes it. Since `success()` was
/// either called or not by then, drop-completion preserves the marked
/// outcome; a transaction abandoned mid-error therefore rolls back.
pub struct Transaction {
    inner: Box<dyn TransactionProvider>,
    finished: bool,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.inner.id())
            .field("finished", &self.finished)
            .finish()
    }
}

impl Transaction {
    /// Wraps a backend transaction provider.
    pub fn new<T: TransactionProvider + 'static>(inner: T) -> Self {
        Transaction {
            inner: Box::new(inner),
            finished: false,
        }
    }

    /// Gets the transaction id.
    pub fn id(&self) -> &str {
        self.inner.id()
    }

    /// Flags the transaction for commit.
    pub fn success(&self) {
        self.inner.mark_success();
    }

    /// Flags the transaction for rollback.
    pub fn failure(&self) {
        self.inner.mark_failure();
    }

    /// Completes the transaction, committing or rolling back based on the
    /// outcome flags.
    pub fn finish(mut self) -> GraphResult<()> {
        self.finished = true;
        self.inner.complete()
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        if !self.finished {
            if let Err(e) = self.inner.complete() {
                log::error!("Failed to complete dropped transaction {}: {}", self.inner.id(), e);
            }
        }
    }
}
