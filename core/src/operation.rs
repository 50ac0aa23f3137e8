use crate::common::constants::OperationKind;
use crate::config::Diagnostics;
use crate::error::Result;
use backtrace::Backtrace;
use futures::channel::oneshot;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

/// The success continuation of an operation.
pub type Resolve<T> = Box<dyn FnOnce(T)>;

/// The failure continuation of an operation.
pub type Reject<E> = Box<dyn FnOnce(E)>;

type Body<T, E> = Box<dyn FnOnce(Resolve<T>, Reject<E>) -> Result<()>>;

/// A startable unit of async work.
///
/// Starting an operation registers its wait with some external source; the
/// source later invokes exactly one of the two continuations, exactly once.
/// This is a convention every adapter follows, it is not checked at runtime.
///
/// `start` itself returns a [`Result`]: the adapters only fail there when they
/// cannot reach the event loop, and [`crate::select`] reports a failing setup
/// routine there instead of through the failure continuation.
pub struct Operation<T, E> {
    kind: OperationKind,
    origin: Option<Backtrace>,
    trace: bool,
    body: Body<T, E>,
}

impl<T, E> Debug for Operation<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("kind", &self.kind)
            .field("origin", &self.origin.is_some())
            .field("trace", &self.trace)
            .finish_non_exhaustive()
    }
}

impl<T: 'static, E: 'static> Operation<T, E> {
    /// Wrap a raw body. The body receives both continuations and must arrange
    /// for exactly one of them to be called once.
    pub fn new(body: impl FnOnce(Resolve<T>, Reject<E>) -> Result<()> + 'static) -> Self {
        Self::with_kind(OperationKind::Custom, body)
    }

    pub(crate) fn with_kind(
        kind: OperationKind,
        body: impl FnOnce(Resolve<T>, Reject<E>) -> Result<()> + 'static,
    ) -> Self {
        Operation {
            kind,
            origin: None,
            trace: false,
            body: Box::new(body),
        }
    }

    /// Which adapter built this operation.
    #[must_use]
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Where this operation was created, if origin capture was enabled.
    #[must_use]
    pub fn origin(&self) -> Option<&Backtrace> {
        self.origin.as_ref()
    }

    /// Apply `diagnostics` to this operation.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: &Diagnostics) -> Self {
        if diagnostics.capture_origin() {
            self.origin = Some(Backtrace::new_unresolved());
        }
        self.trace = diagnostics.trace();
        self
    }

    /// Start the underlying async work.
    pub fn start(
        self,
        on_success: impl FnOnce(T) + 'static,
        on_failure: impl FnOnce(E) + 'static,
    ) -> Result<()> {
        if self.trace {
            match self.origin {
                Some(mut origin) => {
                    origin.resolve();
                    crate::debug!("start {} operation created at\n{:?}", self.kind, origin);
                }
                None => {
                    crate::debug!("start {} operation", self.kind);
                }
            }
        }
        (self.body)(Box::new(on_success), Box::new(on_failure))
    }

    /// Transform the success value.
    #[must_use]
    pub fn map<U: 'static>(self, f: impl FnOnce(T) -> U + 'static) -> Operation<U, E> {
        let Operation {
            kind,
            origin,
            trace,
            body,
        } = self;
        Operation {
            kind,
            origin,
            trace,
            body: Box::new(move |resolve: Resolve<U>, reject: Reject<E>| {
                body(Box::new(move |value| resolve(f(value))), reject)
            }),
        }
    }

    /// Transform the failure value.
    #[must_use]
    pub fn map_err<F: 'static>(self, f: impl FnOnce(E) -> F + 'static) -> Operation<T, F> {
        let Operation {
            kind,
            origin,
            trace,
            body,
        } = self;
        Operation {
            kind,
            origin,
            trace,
            body: Box::new(move |resolve: Resolve<T>, reject: Reject<F>| {
                body(resolve, Box::new(move |error| reject(f(error))))
            }),
        }
    }

    /// Start the operation now and observe its outcome as a future.
    ///
    /// The future yields `None` if both continuations were dropped without
    /// being called.
    pub fn into_future(self) -> Result<OperationFuture<T, E>> {
        let (tx, rx) = oneshot::channel();
        let tx = Rc::new(RefCell::new(Some(tx)));
        let (on_success, on_failure) = (tx.clone(), tx);
        self.start(
            move |value| {
                if let Some(tx) = on_success.borrow_mut().take() {
                    _ = tx.send(Ok(value));
                }
            },
            move |error| {
                if let Some(tx) = on_failure.borrow_mut().take() {
                    _ = tx.send(Err(error));
                }
            },
        )?;
        Ok(OperationFuture { rx })
    }
}

/// The outcome of a started [`Operation`], see [`Operation::into_future`].
#[derive(Debug)]
#[must_use = "futures do nothing unless polled"]
pub struct OperationFuture<T, E> {
    rx: oneshot::Receiver<std::result::Result<T, E>>,
}

impl<T, E> Future for OperationFuture<T, E> {
    type Output = Option<std::result::Result<T, E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(std::result::Result::ok)
    }
}
