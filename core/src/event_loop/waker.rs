use crate::common::slots::Token;
use crate::event_loop::poller::Poller;
use crossbeam_deque::{Injector, Steal};
use std::sync::Arc;
use std::task::{Wake, Waker};

/// Tasks woken from any thread, drained by the loop in its poll phase.
#[derive(Debug, Default)]
pub(crate) struct WakeQueue {
    woken: Injector<Token>,
}

impl WakeQueue {
    pub(crate) fn push(&self, token: Token) {
        self.woken.push(token);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.woken.is_empty()
    }

    pub(crate) fn drain(&self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            match self.woken.steal() {
                Steal::Success(token) => {
                    if !tokens.contains(&token) {
                        tokens.push(token);
                    }
                }
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }
        tokens
    }
}

/// A waker for one spawned task.
pub(crate) struct TaskWaker {
    token: Token,
    queue: Arc<WakeQueue>,
    poller: Arc<Poller>,
}

impl TaskWaker {
    pub(crate) fn waker(token: Token, queue: &Arc<WakeQueue>, poller: &Arc<Poller>) -> Waker {
        Waker::from(Arc::new(TaskWaker {
            token,
            queue: Arc::clone(queue),
            poller: Arc::clone(poller),
        }))
    }
}

impl Wake for TaskWaker {
    fn wake(self: Arc<Self>) {
        self.wake_by_ref();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.queue.push(self.token);
        if let Err(e) = self.poller.wake() {
            crate::error!("wake task {:?} failed: {}", self.token, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::slots::Slots;

    #[test]
    fn drain_deduplicates() -> std::io::Result<()> {
        let mut slots = Slots::new();
        let a = slots.insert(());
        let b = slots.insert(());
        let queue = Arc::new(WakeQueue::default());
        let poller = Arc::new(Poller::new()?);
        let waker = TaskWaker::waker(a, &queue, &poller);
        waker.wake_by_ref();
        waker.wake();
        queue.push(b);
        assert_eq!(vec![a, b], queue.drain());
        assert!(queue.is_empty());
        Ok(())
    }
}
