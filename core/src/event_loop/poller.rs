use std::num::NonZeroUsize;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

pub(crate) struct Events(polling::Events);

impl Events {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self(polling::Events::with_capacity(
            NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
        ))
    }
}

impl Deref for Events {
    type Target = polling::Events;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Events {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Blocks the loop thread between turns and lets wakers from any thread
/// interrupt the wait.
#[derive(Debug)]
pub(crate) struct Poller {
    inner: polling::Poller,
}

impl Poller {
    pub(crate) fn new() -> std::io::Result<Self> {
        Ok(Self {
            inner: polling::Poller::new()?,
        })
    }

    pub(crate) fn select(
        &self,
        events: &mut Events,
        timeout: Option<Duration>,
    ) -> std::io::Result<usize> {
        events.clear();
        self.inner.wait(events, timeout)
    }

    /// Interrupt a running or the next `select`.
    pub(crate) fn wake(&self) -> std::io::Result<()> {
        self.inner.notify()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn wake_interrupts_select() -> std::io::Result<()> {
        let poller = Poller::new()?;
        let mut events = Events::with_capacity(8);
        poller.wake()?;
        let start = Instant::now();
        _ = poller.select(&mut events, Some(Duration::from_secs(5)))?;
        assert!(start.elapsed() < Duration::from_secs(1));
        Ok(())
    }
}
