//! Observer Handle
//!
//! The teardown object handed back by every observer.

use std::fmt;
use std::rc::Rc;

/// Something an [`ObserverHandle`] can shut down
pub(crate) trait Dispose {
    /// Disconnect, cancel pending work, dispatch the active teardown.
    /// Must be idempotent.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// Cancellation handle for a running observer
///
/// The first [`disconnect`](Self::disconnect) severs every event
/// subscription, cancels any pending settle, and dispatches the active
/// teardown in the background. Later calls do nothing. Clones share the
/// same observer. Dropping a handle does not stop the observer; use
/// [`into_guard`](Self::into_guard) for scope-bound observation.
#[derive(Clone)]
pub struct ObserverHandle {
    inner: Rc<dyn Dispose>,
}

impl ObserverHandle {
    pub(crate) fn new(inner: Rc<dyn Dispose>) -> Self {
        Self { inner }
    }

    /// Stop observing. Idempotent.
    pub fn disconnect(&self) {
        self.inner.dispose();
    }

    /// Check if the observer is still running
    pub fn is_connected(&self) -> bool {
        !self.inner.is_disposed()
    }

    /// Wrap in a guard that disconnects on drop
    pub fn into_guard(self) -> ObserverGuard {
        ObserverGuard { handle: self }
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Disconnects its observer when dropped
#[derive(Debug)]
#[must_use = "the observer stops as soon as the guard is dropped"]
pub struct ObserverGuard {
    handle: ObserverHandle,
}

impl ObserverGuard {
    /// The underlying handle
    pub fn handle(&self) -> &ObserverHandle {
        &self.handle
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.handle.disconnect();
    }
}
