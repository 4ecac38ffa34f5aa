use crate::Gate;
use core::time::Duration;

/// Handle passed to every worker body.
///
/// Carries the worker's id (`0..n`, in spawn order) and the group's shutdown
/// [`Gate`]. Cloning is cheap.
#[derive(Clone, Debug)]
pub struct WorkerContext {
    id: usize,
    gate: Gate,
}

impl WorkerContext {
    pub(crate) const fn new(id: usize, gate: Gate) -> Self {
        Self { id, gate }
    }

    /// The worker's id within its group.
    pub const fn id(&self) -> usize {
        self.id
    }

    /// The group's shutdown gate.
    pub const fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Returns `true` once the group has been told to shut down.
    pub fn is_shutdown(&self) -> bool {
        self.gate.is_fired()
    }

    /// Blocks the current thread until the group is told to shut down.
    pub fn wait_for_shutdown(&self) {
        self.gate.wait();
    }

    /// Like [`Self::wait_for_shutdown`], giving up after `timeout`.
    ///
    /// Returns `true` if shutdown was signalled within the timeout.
    pub fn wait_for_shutdown_timeout(&self, timeout: Duration) -> bool {
        self.gate.wait_timeout(timeout)
    }

    /// Resolves once the group is told to shut down.
    #[cfg(feature = "futures")]
    #[cfg_attr(docsrs, doc(cfg(feature = "futures")))]
    pub fn shutdown(&self) -> crate::Fired<'_> {
        self.gate.fired()
    }
}
