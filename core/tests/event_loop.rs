use altwait_core::adapter;
use altwait_core::{Config, Diagnostics, Error, EventLoop};
use std::time::{Duration, Instant};

#[test]
fn waker_from_other_thread_interrupts_poll() -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let (tx, rx) = futures::channel::oneshot::channel();
    let sender = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        _ = tx.send(7);
    });
    let start = Instant::now();
    let outcome = event_loop.block_on(adapter::future(async move {
        rx.await.map_err(|_| "cancelled")
    }))?;
    assert_eq!(Ok(7), outcome);
    assert!(start.elapsed() >= Duration::from_millis(20));
    sender.join().map_err(|_| anyhow::anyhow!("sender panicked"))?;
    Ok(())
}

#[test]
fn block_on_reports_unsettled() -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let never = adapter::task::<(), ()>(|_, _| {});
    assert!(matches!(event_loop.block_on(never), Err(Error::Unsettled)));
    Ok(())
}

#[test]
fn configured_factory_traces() -> anyhow::Result<()> {
    altwait_core::common::init_log();
    let mut config = Config::default();
    _ = config
        .set_event_capacity(16)
        .set_diagnostics(Diagnostics::verbose());
    let event_loop = EventLoop::with_config(config)?;
    let factory = event_loop.factory();
    assert_eq!(Diagnostics::verbose(), factory.diagnostics());
    let sleep = factory.sleep::<()>(Duration::from_millis(1));
    assert!(sleep.origin().is_some());
    assert_eq!(Ok(()), event_loop.block_on(sleep)?);
    Ok(())
}
