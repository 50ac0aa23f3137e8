use crate::coroutine::{self, Computation};
use crate::operation::{Reject, Resolve};
use std::fmt::{Debug, Formatter};

/// What a selector does with the payload of the registration that won.
///
/// The variant is picked when the registration is made, the selector never
/// inspects the handler at runtime to guess what it is.
pub enum Handler<A, T, E> {
    /// No handler: the payload itself is the success result.
    Settle(fn(A) -> T),
    /// No handler: the payload itself is the failure result.
    Fail(fn(A) -> E),
    /// A plain function: `Ok` is the success result, `Err` the failure result.
    Call(Box<dyn FnOnce(A) -> Result<T, E>>),
    /// A resumable computation factory, driven by the coroutine engine. The
    /// computation's result settles the selector.
    Resume(Box<dyn FnOnce(A) -> Computation<T, E>>),
}

impl<A, T, E> Debug for Handler<A, T, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Handler::Settle(_) => "Handler::Settle",
            Handler::Fail(_) => "Handler::Fail",
            Handler::Call(_) => "Handler::Call",
            Handler::Resume(_) => "Handler::Resume",
        })
    }
}

impl<A: 'static, T: 'static, E: 'static> Handler<A, T, E> {
    /// Settle with the payload.
    #[must_use]
    pub fn settle() -> Self
    where
        A: Into<T>,
    {
        Handler::Settle(<A as Into<T>>::into)
    }

    /// Fail with the payload.
    #[must_use]
    pub fn fail() -> Self
    where
        A: Into<E>,
    {
        Handler::Fail(<A as Into<E>>::into)
    }

    /// Call `f` with the payload.
    pub fn call(f: impl FnOnce(A) -> Result<T, E> + 'static) -> Self {
        Handler::Call(Box::new(f))
    }

    /// Build a computation from the payload and run it.
    pub fn resume(factory: impl FnOnce(A) -> Computation<T, E> + 'static) -> Self {
        Handler::Resume(Box::new(factory))
    }

    /// Settle through `on_success`/`on_failure` according to this handler.
    pub(crate) fn dispatch(self, payload: A, on_success: Resolve<T>, on_failure: Reject<E>) {
        match self {
            Handler::Settle(into) => on_success(into(payload)),
            Handler::Fail(into) => on_failure(into(payload)),
            Handler::Call(f) => match f(payload) {
                Ok(value) => on_success(value),
                Err(error) => on_failure(error),
            },
            Handler::Resume(factory) => coroutine::run(factory(payload), on_success, on_failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coroutine::Suspender;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Outcome = Rc<RefCell<Option<Result<String, String>>>>;

    fn dispatch(handler: Handler<&'static str, String, String>, payload: &'static str) -> Outcome {
        let outcome: Outcome = Rc::new(RefCell::new(None));
        let (ok, err) = (outcome.clone(), outcome.clone());
        handler.dispatch(
            payload,
            Box::new(move |v| *ok.borrow_mut() = Some(Ok(v))),
            Box::new(move |e| *err.borrow_mut() = Some(Err(e))),
        );
        outcome
    }

    #[test]
    fn settle_and_fail_pass_payload_through() {
        assert_eq!(Some(Ok("p".to_string())), *dispatch(Handler::settle(), "p").borrow());
        assert_eq!(Some(Err("p".to_string())), *dispatch(Handler::fail(), "p").borrow());
    }

    #[test]
    fn call_maps_return_and_error() {
        let ok = dispatch(Handler::call(|p: &str| Ok(p.to_uppercase())), "p");
        assert_eq!(Some(Ok("P".to_string())), *ok.borrow());
        let err = dispatch(Handler::call(|p: &str| Err(format!("bad {p}"))), "p");
        assert_eq!(Some(Err("bad p".to_string())), *err.borrow());
    }

    #[test]
    fn resume_runs_computation() {
        let handler = Handler::resume(|p: &'static str| {
            Computation::new(move |s: &Suspender<'_>| Ok(format!("{p} in {}", s.name().len())))
        });
        assert_eq!("Handler::Resume", format!("{handler:?}"));
        let outcome = dispatch(handler, "p");
        assert!(outcome
            .borrow()
            .as_ref()
            .is_some_and(|r| r.as_ref().is_ok_and(|s| s.starts_with("p in "))));
    }
}
