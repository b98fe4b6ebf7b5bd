//! ExecutionContext - per-consumer delivery queue with a dedicated worker
//!
//! The scheduling context a consumer expects its callbacks on. Jobs queued
//! onto one context run in FIFO order on a dedicated worker task, so
//! per-consumer delivery order matches enqueue order. Enqueueing never
//! blocks the caller, which keeps the backend's notifying thread free.

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

/// Identity of an execution context, usable to assert where a callback runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static ACTIVE_CONTEXT: Cell<Option<ContextId>> = const { Cell::new(None) };
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a running execution context.
///
/// Cloneable; the worker task stops once every handle is dropped and the
/// queue has drained.
#[derive(Clone)]
pub struct ExecutionContext {
    id: ContextId,
    label: Arc<str>,
    tx: mpsc::UnboundedSender<Job>,
}

impl ExecutionContext {
    /// Spawn a new context with a dedicated worker task.
    ///
    /// Requires a running tokio runtime.
    pub fn spawn(label: impl Into<String>) -> Self {
        let id = ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed));
        let label: Arc<str> = Arc::from(label.into());
        let (tx, rx) = mpsc::unbounded_channel();

        let worker_label = Arc::clone(&label);
        tokio::spawn(async move {
            context_worker(id, worker_label, rx).await;
        });

        Self { id, label, tx }
    }

    /// This context's identity.
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Context label for logging.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The context the calling code is currently running on, if any.
    ///
    /// Set for the duration of each job; callbacks use this to verify they
    /// were marshalled onto their declared context.
    pub fn current() -> Option<ContextId> {
        ACTIVE_CONTEXT.with(|c| c.get())
    }

    /// Whether the calling code is running on this context.
    pub fn is_current(&self) -> bool {
        Self::current() == Some(self.id)
    }

    /// Enqueue a job. Non-blocking; returns false if the worker is gone.
    pub fn dispatch(&self, job: impl FnOnce() + Send + 'static) -> bool {
        let accepted = self.tx.send(Box::new(job)).is_ok();
        if !accepted {
            trace!(context = %self.id, label = %self.label, "dispatch to stopped context");
        }
        accepted
    }

    /// Barrier: resolves after every job queued before this call has run.
    ///
    /// Tests use this as the bounded quiescence window after detach.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.dispatch(move || {
            let _ = done_tx.send(());
        }) {
            let _ = done_rx.await;
        }
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish()
    }
}

/// Clears the active-context marker even when a job unwinds.
struct ActiveContextGuard;

impl Drop for ActiveContextGuard {
    fn drop(&mut self) {
        ACTIVE_CONTEXT.with(|c| c.set(None));
    }
}

/// Worker loop draining one context's queue in FIFO order.
async fn context_worker(id: ContextId, label: Arc<str>, mut rx: mpsc::UnboundedReceiver<Job>) {
    debug!(context = %id, label = %label, "context worker started");

    while let Some(job) = rx.recv().await {
        // Jobs are synchronous; the marker stays accurate because nothing
        // else can run on this thread until the job returns.
        ACTIVE_CONTEXT.with(|c| c.set(Some(id)));
        let _guard = ActiveContextGuard;
        job();
    }

    debug!(context = %id, label = %label, "context worker stopped");
}
