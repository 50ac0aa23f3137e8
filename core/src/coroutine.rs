//! Resumable computations driven by a stackful coroutine engine.
//!
//! A [`Computation`] is a body that can suspend itself on any [`Operation`]
//! through its [`Suspender`]. [`run`] starts each awaited operation and resumes
//! the body from that operation's continuation, so the body reads like
//! straight-line code while the thread keeps running the event loop.

use crate::error::{Error, Result};
use crate::operation::{Operation, Reject, Resolve};
use corosensei::{Coroutine, CoroutineResult, Yielder};
use std::cell::{Cell, RefCell};
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

type Wake = Box<dyn FnOnce()>;

/// Handed out of the coroutine on every suspension: starts the awaited
/// operation, which calls the wake-up once it settled.
type Park = Box<dyn FnOnce(Wake) -> Result<()>>;

/// Lets a running [`Computation`] wait for operations.
pub struct Suspender<'s> {
    yielder: &'s Yielder<Result<()>, Park>,
    name: &'s str,
}

impl Debug for Suspender<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Suspender")
            .field("name", &self.name)
            .finish()
    }
}

impl Suspender<'_> {
    /// The name of the computation this suspender belongs to.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Suspend until `operation` settles and return its outcome.
    ///
    /// If the operation cannot even be started, the start error is converted
    /// into the operation's failure type.
    pub fn wait<U: 'static, F: From<Error> + 'static>(
        &self,
        operation: Operation<U, F>,
    ) -> std::result::Result<U, F> {
        let slot = Rc::new(RefCell::new(None));
        let (ok_slot, err_slot) = (slot.clone(), slot.clone());
        let park: Park = Box::new(move |wake: Wake| {
            let wake = Rc::new(Cell::new(Some(wake)));
            let (ok_wake, err_wake) = (wake.clone(), wake);
            operation.start(
                move |value| {
                    *ok_slot.borrow_mut() = Some(Ok(value));
                    if let Some(wake) = ok_wake.take() {
                        wake();
                    }
                },
                move |error| {
                    *err_slot.borrow_mut() = Some(Err(error));
                    if let Some(wake) = err_wake.take() {
                        wake();
                    }
                },
            )
        });
        self.yielder.suspend(park).map_err(F::from)?;
        let outcome = slot.borrow_mut().take();
        outcome.unwrap_or_else(|| Err(F::from(Error::Unsettled)))
    }
}

/// A suspendable unit of work, see [`run`].
pub struct Computation<T, E> {
    name: String,
    coroutine: Coroutine<Result<()>, Park, std::result::Result<T, E>>,
}

impl<T, E> Debug for Computation<T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Computation")
            .field("name", &self.name)
            .field("started", &self.coroutine.started())
            .field("done", &self.coroutine.done())
            .finish()
    }
}

impl<T: 'static, E: 'static> Computation<T, E> {
    /// Create a computation from `body`. Nothing runs until it is handed to
    /// [`run`].
    pub fn new(body: impl FnOnce(&Suspender<'_>) -> std::result::Result<T, E> + 'static) -> Self {
        let name = format!("computation-{}", uuid::Uuid::new_v4());
        let co_name = name.clone();
        let coroutine = Coroutine::new(move |yielder: &Yielder<Result<()>, Park>, _: Result<()>| {
            body(&Suspender {
                yielder,
                name: &co_name,
            })
        });
        Computation { name, coroutine }
    }

    /// The generated name of this computation.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

struct Driver<T, E> {
    name: String,
    coroutine: RefCell<Option<Coroutine<Result<()>, Park, std::result::Result<T, E>>>>,
    on_success: Cell<Option<Resolve<T>>>,
    on_failure: Cell<Option<Reject<E>>>,
}

impl<T: 'static, E: 'static> Driver<T, E> {
    fn step(self: &Rc<Self>, mut input: Result<()>) {
        loop {
            let resumed = {
                let mut coroutine = self.coroutine.borrow_mut();
                let Some(coroutine) = coroutine.as_mut() else {
                    return;
                };
                coroutine.resume(input)
            };
            match resumed {
                CoroutineResult::Yield(park) => {
                    let driver = Rc::clone(self);
                    let woken = Rc::new(Cell::new(false));
                    let wake_flag = Rc::clone(&woken);
                    let wake: Wake = Box::new(move || {
                        wake_flag.set(true);
                        driver.step(Ok(()));
                    });
                    match park(wake) {
                        Ok(()) => return,
                        // the body already moved past this suspension
                        Err(e) if woken.get() => {
                            crate::warn!("{} start failed after settling: {}", self.name, e);
                            return;
                        }
                        Err(e) => input = Err(e),
                    }
                }
                CoroutineResult::Return(outcome) => {
                    let finished = self.coroutine.borrow_mut().take();
                    drop(finished);
                    crate::debug!("{} finished", self.name);
                    match outcome {
                        Ok(value) => {
                            if let Some(on_success) = self.on_success.take() {
                                on_success(value);
                            }
                        }
                        Err(error) => {
                            if let Some(on_failure) = self.on_failure.take() {
                                on_failure(error);
                            }
                        }
                    }
                    return;
                }
            }
        }
    }
}

/// Drive `computation` to completion; its result settles `on_success` or
/// `on_failure`.
///
/// The computation runs synchronously up to its first suspension. Panics of
/// the body propagate to whoever resumed it.
pub fn run<T: 'static, E: 'static>(
    computation: Computation<T, E>,
    on_success: impl FnOnce(T) + 'static,
    on_failure: impl FnOnce(E) + 'static,
) {
    let Computation { name, coroutine } = computation;
    crate::debug!("{} start", name);
    let driver = Rc::new(Driver {
        name,
        coroutine: RefCell::new(Some(coroutine)),
        on_success: Cell::new(Some(Box::new(on_success))),
        on_failure: Cell::new(Some(Box::new(on_failure))),
    });
    driver.step(Ok(()));
}
