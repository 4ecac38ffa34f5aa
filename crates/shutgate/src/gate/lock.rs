use crate::{Error, FireStatus, Result};
use core::{fmt, time::Duration};
use parking_lot::{Condvar, Mutex};
use std::{sync::Arc, time::Instant};
#[cfg(feature = "tracing")]
use tracing::instrument;

/// A broadcast-once shutdown signal.
///
/// A [`Gate`] starts open. Firing it wakes every thread blocked in
/// [`Gate::wait`] (and, with the `futures` feature, every task awaiting
/// [`Gate::fired`]) and makes every later wait return immediately. A gate
/// never re-arms.
///
/// Cloning a gate is cheap and yields another handle on the same signal.
///
/// ## Features
///
/// - ✅ Thread-safe
/// - ✅ Waiters may register before or after the gate fires
/// - ✅ Blocking and async waits on the same gate (`futures` feature)
///
/// # Example
///
/// ```
/// use shutgate::Gate;
/// use std::thread;
///
/// let gate = Gate::new();
/// let waiter = {
///     let gate = gate.clone();
///     thread::spawn(move || gate.wait())
/// };
///
/// assert!(gate.fire().is_first());
/// waiter.join().unwrap();
/// assert!(gate.is_fired());
/// ```
#[derive(Clone, Default)]
pub struct Gate {
    pub(crate) inner: Arc<GateInner>,
}

#[derive(Default)]
pub(crate) struct GateInner {
    fired: Mutex<bool>,
    cvar: Condvar,
    #[cfg(feature = "futures")]
    pub(crate) token: tokio_util::sync::CancellationToken,
}

impl Gate {
    /// Creates a new gate that has not fired.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the gate, waking all current waiters.
    ///
    /// Firing is tolerant: only the first call has an effect and returns
    /// [`FireStatus::Fired`]. Every later call returns
    /// [`FireStatus::AlreadyFired`]. Use [`Self::try_fire`] when a second
    /// fire should be treated as an error.
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    pub fn fire(&self) -> FireStatus {
        let mut fired = self.inner.fired.lock();
        if *fired {
            return FireStatus::AlreadyFired;
        }
        *fired = true;
        drop(fired);

        self.inner.cvar.notify_all();
        #[cfg(feature = "futures")]
        self.inner.token.cancel();

        #[cfg(feature = "tracing")]
        tracing::trace!("Gate fired");
        FireStatus::Fired
    }

    /// Fires the gate, failing if it had already been fired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyFired`] if any earlier call fired the gate.
    pub fn try_fire(&self) -> Result<()> {
        match self.fire() {
            FireStatus::Fired => Ok(()),
            FireStatus::AlreadyFired => Err(Error::AlreadyFired),
        }
    }

    /// Returns `true` once the gate has been fired.
    pub fn is_fired(&self) -> bool {
        *self.inner.fired.lock()
    }

    /// Blocks the current thread until the gate fires.
    ///
    /// Returns immediately if the gate has already fired.
    pub fn wait(&self) {
        let mut fired = self.inner.fired.lock();
        while !*fired {
            self.inner.cvar.wait(&mut fired);
        }
    }

    /// Blocks the current thread until the gate fires or `timeout` elapses.
    ///
    /// Returns `true` if the gate fired within the timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.wait();
            return true;
        };

        let mut fired = self.inner.fired.lock();
        while !*fired {
            if self.inner.cvar.wait_until(&mut fired, deadline).timed_out() {
                return *fired;
            }
        }
        true
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("fired", &self.is_fired())
            .finish()
    }
}
