use core::time::Duration;

/// Represents the outcome of firing a [`Gate`].
///
/// A gate fires exactly once. The call that flips it observes
/// [`FireStatus::Fired`]; every later call observes
/// [`FireStatus::AlreadyFired`] and has no effect.
///
/// # Example
///
/// ```
/// use shutgate::{FireStatus, Gate};
///
/// let gate = Gate::new();
/// assert_eq!(gate.fire(), FireStatus::Fired);
/// assert_eq!(gate.fire(), FireStatus::AlreadyFired);
/// ```
///
/// [`Gate`]: crate::Gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a second fire is usually a bug at the call site"]
pub enum FireStatus {
    /// This call fired the gate and woke every waiter.
    Fired,
    /// The gate had been fired by an earlier call.
    AlreadyFired,
}

impl FireStatus {
    /// Returns `true` if this call was the one that fired the gate.
    pub const fn is_first(self) -> bool {
        matches!(self, Self::Fired)
    }
}

/// Summary returned once every worker in a group has completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Number of workers the group started.
    pub spawned: usize,
    /// Number of completion reports observed. Always equal to `spawned` in a
    /// report returned from `await_all`.
    pub completed: usize,
    /// Time between the group firing its gate and the last worker being
    /// joined. `None` if the gate was fired through a cloned handle rather
    /// than through the group.
    pub drain: Option<Duration>,
}

/// Outcome of a race: the first worker to deliver, its value, and how the
/// rest of the group drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceOutcome<T> {
    /// Id of the worker whose value was accepted.
    pub winner: usize,
    /// The accepted value.
    pub value: T,
    /// Shutdown summary for the whole group, winner included.
    pub report: ShutdownReport,
}
