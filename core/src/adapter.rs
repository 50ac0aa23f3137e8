//! Adapters turning one external async source into an [`Operation`].
//!
//! Every adapter is pure: it only captures its inputs. The wait is registered
//! with the source when the returned operation is started. Adapters relying on
//! the timer service or the task spawner look up the [`Handle`] of the loop
//! running on the current thread and fail to start with
//! [`Error::NoEventLoop`] without one.

use crate::common::constants::OperationKind;
use crate::common::traits::Current;
use crate::config::Diagnostics;
use crate::coroutine::{self, Computation};
use crate::error::{Error, Result};
use crate::event::{self, EventSource};
use crate::event_loop::Handle;
use crate::operation::{Operation, Reject, Resolve};
use crate::port::{AsPutPort, AsTakePort, PutPort, TakePort};
use crate::select::{self, Selector};
use std::future::Future;
use std::time::Duration;

/// The `(error, data)` callback handed to a callback-style task.
pub type Completion<T, E> = Box<dyn FnOnce(std::result::Result<T, E>)>;

fn current_loop() -> Result<Handle> {
    Handle::current().ok_or(Error::NoEventLoop)
}

/// Succeed with `()` once `duration` elapsed.
pub fn sleep<E: 'static>(duration: Duration) -> Operation<(), E> {
    Operation::with_kind(OperationKind::Sleep, move |resolve, _| {
        _ = current_loop()?.set_timeout(duration, move || resolve(()));
        Ok(())
    })
}

/// Succeed with `()` in the check phase, after the pending I/O was polled.
pub fn defer<E: 'static>() -> Operation<(), E> {
    Operation::with_kind(OperationKind::Defer, |resolve, _| {
        current_loop()?.set_immediate(move || resolve(()));
        Ok(())
    })
}

/// Succeed with `()` as soon as the current callback returns, before any I/O.
pub fn next_tick<E: 'static>() -> Operation<(), E> {
    Operation::with_kind(OperationKind::NextTick, |resolve, _| {
        current_loop()?.next_tick(move || resolve(()));
        Ok(())
    })
}

/// Succeed with the payload of the first `kind` event fired by `source`.
///
/// The listener removes itself when it fires.
pub fn once<S, E>(source: &S, kind: S::Kind) -> Operation<S::Payload, E>
where
    S: EventSource + Clone + 'static,
    S::Kind: Clone,
    E: 'static,
{
    let source = source.clone();
    Operation::with_kind(OperationKind::Once, move |resolve, _| {
        // nothing to cancel, the subscription ends with the event
        drop(event::subscribe_once(&source, kind, resolve));
        Ok(())
    })
}

/// Hand both continuations to `f`, which must call exactly one of them.
pub fn task<T: 'static, E: 'static>(
    f: impl FnOnce(Resolve<T>, Reject<E>) + 'static,
) -> Operation<T, E> {
    Operation::with_kind(OperationKind::Task, move |resolve, reject| {
        f(resolve, reject);
        Ok(())
    })
}

/// Run a callback-style task: `Ok(data)` succeeds, `Err(error)` fails.
pub fn thunk<T: 'static, E: 'static>(f: impl FnOnce(Completion<T, E>) + 'static) -> Operation<T, E> {
    Operation::with_kind(OperationKind::Thunk, move |resolve, reject| {
        f(Box::new(move |outcome| match outcome {
            Ok(data) => resolve(data),
            Err(error) => reject(error),
        }));
        Ok(())
    })
}

/// Spawn `future` on the current loop and settle with its output.
pub fn future<T: 'static, E: 'static>(
    future: impl Future<Output = std::result::Result<T, E>> + 'static,
) -> Operation<T, E> {
    Operation::with_kind(OperationKind::Future, move |resolve, reject| {
        _ = current_loop()?.spawn(async move {
            match future.await {
                Ok(value) => resolve(value),
                Err(error) => reject(error),
            }
        });
        Ok(())
    })
}

/// Succeed with the next value yielded by the receive endpoint of `port`.
pub fn take<P, E>(port: &P) -> Operation<<P::Port as TakePort>::Item, E>
where
    P: AsTakePort + Clone + 'static,
    E: 'static,
{
    let port = port.clone();
    Operation::with_kind(OperationKind::Take, move |resolve, _| {
        drop(port.take_port().take(resolve));
        Ok(())
    })
}

/// Succeed with `()` once the send endpoint of `port` accepted `value`.
pub fn put<P, E>(port: &P, value: <P::Port as PutPort>::Item) -> Operation<(), E>
where
    P: AsPutPort + Clone + 'static,
    E: 'static,
{
    let port = port.clone();
    Operation::with_kind(OperationKind::Put, move |resolve, _| {
        drop(port.put_port().put(value, Box::new(move || resolve(()))));
        Ok(())
    })
}

/// Drive `computation` through the coroutine engine.
pub fn spawn<T: 'static, E: 'static>(computation: Computation<T, E>) -> Operation<T, E> {
    Operation::with_kind(OperationKind::Spawn, move |resolve, reject| {
        coroutine::run(computation, resolve, reject);
        Ok(())
    })
}

/// Builds operations carrying injected [`Diagnostics`].
///
/// The free functions of this module build plain operations; a factory applies
/// its diagnostics to everything it builds, including selectors.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Factory {
    diagnostics: Diagnostics,
}

impl Factory {
    /// Create a factory applying `diagnostics`.
    #[must_use]
    pub fn new(diagnostics: Diagnostics) -> Self {
        Factory { diagnostics }
    }

    /// The diagnostics applied by this factory.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    fn wrap<T: 'static, E: 'static>(&self, operation: Operation<T, E>) -> Operation<T, E> {
        operation.with_diagnostics(&self.diagnostics)
    }

    /// See [`sleep`].
    pub fn sleep<E: 'static>(&self, duration: Duration) -> Operation<(), E> {
        self.wrap(sleep(duration))
    }

    /// See [`defer`].
    pub fn defer<E: 'static>(&self) -> Operation<(), E> {
        self.wrap(defer())
    }

    /// See [`next_tick`].
    pub fn next_tick<E: 'static>(&self) -> Operation<(), E> {
        self.wrap(next_tick())
    }

    /// See [`once`].
    pub fn once<S, E>(&self, source: &S, kind: S::Kind) -> Operation<S::Payload, E>
    where
        S: EventSource + Clone + 'static,
        S::Kind: Clone,
        E: 'static,
    {
        self.wrap(once(source, kind))
    }

    /// See [`task`].
    pub fn task<T: 'static, E: 'static>(
        &self,
        f: impl FnOnce(Resolve<T>, Reject<E>) + 'static,
    ) -> Operation<T, E> {
        self.wrap(task(f))
    }

    /// See [`thunk`].
    pub fn thunk<T: 'static, E: 'static>(
        &self,
        f: impl FnOnce(Completion<T, E>) + 'static,
    ) -> Operation<T, E> {
        self.wrap(thunk(f))
    }

    /// See [`future`].
    pub fn future<T: 'static, E: 'static>(
        &self,
        future: impl Future<Output = std::result::Result<T, E>> + 'static,
    ) -> Operation<T, E> {
        self.wrap(self::future(future))
    }

    /// See [`take`].
    pub fn take<P, E>(&self, port: &P) -> Operation<<P::Port as TakePort>::Item, E>
    where
        P: AsTakePort + Clone + 'static,
        E: 'static,
    {
        self.wrap(take(port))
    }

    /// See [`put`].
    pub fn put<P, E>(&self, port: &P, value: <P::Port as PutPort>::Item) -> Operation<(), E>
    where
        P: AsPutPort + Clone + 'static,
        E: 'static,
    {
        self.wrap(put(port, value))
    }

    /// See [`spawn`].
    pub fn spawn<T: 'static, E: 'static>(&self, computation: Computation<T, E>) -> Operation<T, E> {
        self.wrap(spawn(computation))
    }

    /// See [`select::select`]. The selector gets this factory's diagnostics.
    pub fn select<T: 'static, E: 'static>(
        &self,
        setup: impl FnOnce(&mut Selector<T, E>) -> Result<()> + 'static,
    ) -> Operation<T, E> {
        select::select_with(self.diagnostics, setup)
    }
}
