use crate::impl_display_by_debug;
use std::time::Duration;

/// Default capacity of the poll event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Used when a deadline would overflow `Instant`.
pub const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// Enums used to describe the phases of one event loop turn
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Phase {
    /// Due timers are fired.
    Timers,
    /// The poller waits and woken futures are polled.
    Poll,
    /// Immediates queued before this phase are run.
    Check,
}

impl_display_by_debug!(Phase);

/// Enums used to describe which adapter built an operation
#[allow(missing_docs)]
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum OperationKind {
    Sleep,
    Defer,
    NextTick,
    Once,
    Task,
    Thunk,
    Future,
    Take,
    Put,
    Spawn,
    Select,
    Custom,
}

impl_display_by_debug!(OperationKind);

impl From<OperationKind> for &str {
    fn from(val: OperationKind) -> Self {
        match val {
            OperationKind::Sleep => "sleep",
            OperationKind::Defer => "defer",
            OperationKind::NextTick => "next_tick",
            OperationKind::Once => "once",
            OperationKind::Task => "task",
            OperationKind::Thunk => "thunk",
            OperationKind::Future => "future",
            OperationKind::Take => "take",
            OperationKind::Put => "put",
            OperationKind::Spawn => "spawn",
            OperationKind::Select => "select",
            OperationKind::Custom => "custom",
        }
    }
}

/// Enums used to describe selector state
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SelectorState {
    /// Registrations are still racing.
    Pending,
    /// A registration won, every other one was cancelled.
    Settled,
}

impl_display_by_debug!(SelectorState);
