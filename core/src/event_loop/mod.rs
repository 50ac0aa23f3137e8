//! A single-threaded event loop: the timer service and future spawner the
//! adapters rely on.
//!
//! One turn of the loop runs three phases, see [`Phase`]:
//!
//! 1. `Timers`: every due timer fires, earliest deadline first.
//! 2. `Poll`: the thread waits on the poller until the next deadline (or
//!    until a waker interrupts it), then every woken future is polled.
//! 3. `Check`: the immediates queued before the phase began are run.
//!
//! Microtasks queued with [`Handle::next_tick`] are drained after every single
//! callback, so they always run before the loop reaches I/O again.

use crate::common::constants::Phase;
use crate::common::slots::{Slots, Token};
use crate::common::traits::Current;
use crate::config::{Config, Diagnostics};
use crate::error::{Error, Result};
use crate::event_loop::poller::{Events, Poller};
use crate::event_loop::timer::TimerHeap;
use crate::event_loop::waker::{TaskWaker, WakeQueue};
use crate::impl_current_for;
use crate::operation::Operation;
use derivative::Derivative;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

pub use timer::TimerId;

mod poller;

mod timer;

mod waker;

/// A callback scheduled on the loop.
pub type Callback = Box<dyn FnOnce()>;

type LocalFuture = Pin<Box<dyn Future<Output = ()>>>;

#[derive(Derivative)]
#[derivative(Debug)]
struct Shared {
    config: Config,
    poller: Arc<Poller>,
    woken: Arc<WakeQueue>,
    timers: RefCell<TimerHeap>,
    #[derivative(Debug = "ignore")]
    immediates: RefCell<VecDeque<Callback>>,
    #[derivative(Debug = "ignore")]
    microtasks: RefCell<VecDeque<Callback>>,
    // `None` while the task is being polled
    #[derivative(Debug = "ignore")]
    tasks: RefCell<Slots<Option<LocalFuture>>>,
}

/// A cloneable reference to an [`EventLoop`].
///
/// The handle of the running loop is available through [`Current`], which is
/// how the adapters find their timer service.
#[derive(Debug, Clone)]
pub struct Handle(Rc<Shared>);

impl_current_for!(EVENT_LOOP, Handle);

impl Handle {
    /// The configuration of this loop.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// The diagnostics of this loop.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        self.0.config.diagnostics()
    }

    /// Run `callback` once `delay` elapsed.
    pub fn set_timeout(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        let deadline = crate::common::get_timeout_time(delay);
        self.0
            .timers
            .borrow_mut()
            .insert(deadline, Box::new(callback))
    }

    /// Cancel a timer. Returns `false` if it already fired or was cancelled.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        self.0.timers.borrow_mut().cancel(id)
    }

    /// Run `callback` in the check phase, after the next poll.
    pub fn set_immediate(&self, callback: impl FnOnce() + 'static) {
        self.0.immediates.borrow_mut().push_back(Box::new(callback));
    }

    /// Run `callback` as soon as the current callback returns, before any I/O.
    pub fn next_tick(&self, callback: impl FnOnce() + 'static) {
        self.0.microtasks.borrow_mut().push_back(Box::new(callback));
    }

    /// Spawn a future onto this loop. It is first polled in the next poll
    /// phase.
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) -> TaskHandle {
        let token = self.0.tasks.borrow_mut().insert(Some(Box::pin(future)));
        self.0.woken.push(token);
        TaskHandle {
            token,
            handle: self.clone(),
        }
    }

    /// Whether anything can still make progress.
    #[must_use]
    pub fn has_work(&self) -> bool {
        !self.0.timers.borrow().is_empty()
            || !self.0.immediates.borrow().is_empty()
            || !self.0.microtasks.borrow().is_empty()
            || !self.0.tasks.borrow().is_empty()
    }

    fn run_microtasks(&self) {
        loop {
            let next = self.0.microtasks.borrow_mut().pop_front();
            match next {
                Some(callback) => callback(),
                None => break,
            }
        }
    }

    fn poll_task(&self, token: Token) {
        let future = match self.0.tasks.borrow_mut().get_mut(token) {
            Some(slot) => slot.take(),
            None => return,
        };
        let Some(mut future) = future else {
            return;
        };
        let waker = TaskWaker::waker(token, &self.0.woken, &self.0.poller);
        let mut cx = Context::from_waker(&waker);
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                _ = self.0.tasks.borrow_mut().remove(token);
            }
            Poll::Pending => {
                let mut tasks = self.0.tasks.borrow_mut();
                if let Some(slot) = tasks.get_mut(token) {
                    *slot = Some(future);
                    return;
                }
                drop(tasks);
                // aborted while it was being polled
                drop(future);
            }
        }
    }

    fn turn(&self, events: &mut Events) -> Result<()> {
        self.run_microtasks();

        crate::debug!(
            "event loop enter {} with {} timers",
            Phase::Timers,
            self.0.timers.borrow().len()
        );
        let expired = self.0.timers.borrow_mut().pop_expired(Instant::now());
        for callback in expired {
            callback();
            self.run_microtasks();
        }

        crate::debug!("event loop enter {}", Phase::Poll);
        let timeout = self.poll_timeout();
        _ = self.0.poller.select(events, timeout)?;
        for token in self.0.woken.drain() {
            self.poll_task(token);
            self.run_microtasks();
        }

        crate::debug!("event loop enter {}", Phase::Check);
        let immediates = std::mem::take(&mut *self.0.immediates.borrow_mut());
        for callback in immediates {
            callback();
            self.run_microtasks();
        }
        Ok(())
    }

    fn poll_timeout(&self) -> Option<Duration> {
        if !self.0.immediates.borrow().is_empty()
            || !self.0.microtasks.borrow().is_empty()
            || !self.0.woken.is_empty()
        {
            return Some(Duration::ZERO);
        }
        if let Some(deadline) = self.0.timers.borrow_mut().next_deadline() {
            return Some(deadline.saturating_duration_since(Instant::now()));
        }
        if self.0.tasks.borrow().is_empty() {
            return Some(Duration::ZERO);
        }
        // only futures are left, wait for one of their wakers
        None
    }

    fn shutdown(&self) {
        self.0.timers.borrow_mut().clear();
        let immediates = std::mem::take(&mut *self.0.immediates.borrow_mut());
        let microtasks = std::mem::take(&mut *self.0.microtasks.borrow_mut());
        let tasks = std::mem::take(&mut *self.0.tasks.borrow_mut());
        drop((immediates, microtasks, tasks));
    }
}

/// Owns a spawned future. Dropping the handle does not abort the task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    token: Token,
    handle: Handle,
}

impl TaskHandle {
    /// Drop the future without polling it again. Returns `false` if it already
    /// completed or was aborted.
    pub fn abort(&self) -> bool {
        // dropped only after the borrow ends, the future may re-enter the loop
        let removed = self.handle.0.tasks.borrow_mut().remove(self.token);
        removed.is_some()
    }

    /// Whether the future completed or was aborted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        !self.handle.0.tasks.borrow().contains(self.token)
    }
}

/// The event loop driving every adapter on one thread.
#[derive(Debug)]
pub struct EventLoop {
    handle: Handle,
}

impl EventLoop {
    /// Create a loop with the default [`Config`].
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Create a loop with `config`.
    pub fn with_config(config: Config) -> Result<Self> {
        let shared = Shared {
            config,
            poller: Arc::new(Poller::new()?),
            woken: Arc::new(WakeQueue::default()),
            timers: RefCell::new(TimerHeap::default()),
            immediates: RefCell::new(VecDeque::new()),
            microtasks: RefCell::new(VecDeque::new()),
            tasks: RefCell::new(Slots::new()),
        };
        crate::debug!("event loop created with {:?}", config);
        Ok(EventLoop {
            handle: Handle(Rc::new(shared)),
        })
    }

    /// A handle to this loop.
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    /// An adapter factory carrying this loop's diagnostics.
    #[must_use]
    pub fn factory(&self) -> crate::adapter::Factory {
        crate::adapter::Factory::new(self.handle.diagnostics())
    }

    /// Run until nothing is left to do.
    pub fn run(&self) -> Result<()> {
        Handle::init_current(&self.handle);
        let result = self.run_until(|| false);
        Handle::clean_current();
        if result.is_ok() {
            crate::info!("event loop ran out of work");
        }
        result
    }

    /// Start `operation` on this loop and run until it settles.
    ///
    /// The outer `Result` reports start failures and [`Error::Unsettled`] when
    /// the loop ran out of work first; the inner one is the operation's own
    /// outcome.
    pub fn block_on<T: 'static, E: 'static>(
        &self,
        operation: Operation<T, E>,
    ) -> Result<std::result::Result<T, E>> {
        let slot = Rc::new(RefCell::new(None));
        let (on_success, on_failure) = (slot.clone(), slot.clone());
        Handle::init_current(&self.handle);
        let result = operation
            .start(
                move |value| *on_success.borrow_mut() = Some(Ok(value)),
                move |error| *on_failure.borrow_mut() = Some(Err(error)),
            )
            .and_then(|()| self.run_until(|| slot.borrow().is_some()));
        Handle::clean_current();
        result?;
        let settled = slot.borrow_mut().take();
        settled.ok_or_else(|| {
            crate::warn!("event loop ran out of work before the operation settled");
            Error::Unsettled
        })
    }

    fn run_until(&self, done: impl Fn() -> bool) -> Result<()> {
        let mut events = Events::with_capacity(self.handle.config().event_capacity());
        self.handle.run_microtasks();
        while !done() && self.handle.has_work() {
            self.handle.turn(&mut events)?;
        }
        Ok(())
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.handle.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn phases_run_in_order() -> Result<()> {
        let event_loop = EventLoop::new()?;
        let handle = event_loop.handle();
        let log = Rc::new(RefCell::new(Vec::new()));
        let (l1, l2, l3, l4) = (log.clone(), log.clone(), log.clone(), log.clone());
        _ = handle.set_timeout(Duration::from_millis(20), move || l1.borrow_mut().push("timeout"));
        handle.set_immediate(move || l2.borrow_mut().push("immediate"));
        handle.next_tick(move || l3.borrow_mut().push("tick"));
        let inner = handle.clone();
        handle.set_immediate(move || {
            inner.next_tick(move || l4.borrow_mut().push("tick in immediate"));
        });
        event_loop.run()?;
        assert_eq!(
            vec!["tick", "immediate", "tick in immediate", "timeout"],
            *log.borrow()
        );
        assert!(!handle.has_work());
        Ok(())
    }

    #[test]
    fn cleared_timeout_does_not_fire() -> Result<()> {
        let event_loop = EventLoop::new()?;
        let handle = event_loop.handle();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        let id = handle.set_timeout(Duration::from_millis(5), move || f.set(true));
        assert!(handle.clear_timeout(id));
        event_loop.run()?;
        assert!(!fired.get());
        Ok(())
    }

    #[test]
    fn spawned_future_runs_and_abort_drops() -> Result<()> {
        let event_loop = EventLoop::new()?;
        let handle = event_loop.handle();
        let ran = Rc::new(Cell::new(0));
        let r = ran.clone();
        let finished = handle.spawn(async move { r.set(r.get() + 1) });
        let r = ran.clone();
        let aborted = handle.spawn(async move { r.set(r.get() + 10) });
        assert!(aborted.abort());
        assert!(!aborted.abort());
        event_loop.run()?;
        assert_eq!(1, ran.get());
        assert!(finished.is_finished());
        Ok(())
    }

    #[test]
    fn current_is_set_while_running() -> Result<()> {
        let event_loop = EventLoop::new()?;
        assert!(Handle::current().is_none());
        let seen = Rc::new(Cell::new(false));
        let s = seen.clone();
        event_loop
            .handle()
            .next_tick(move || s.set(Handle::current().is_some()));
        event_loop.run()?;
        assert!(seen.get());
        assert!(Handle::current().is_none());
        Ok(())
    }
}
