use altwait::{select, Chan, Config, Emitter, Error, EventLoop, Handler, TakePort};
use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[test]
fn channel_value_before_timeout() -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let chan_a: Chan<&str> = Chan::new(0);
    let sender = chan_a.clone();
    _ = event_loop
        .handle()
        .set_timeout(Duration::from_millis(10), move || {
            _ = sender.try_send("x");
        });
    let fired = Rc::new(Cell::new(false));
    let f = fired.clone();
    let start = Instant::now();
    let outcome = event_loop.block_on(select::<&str, &str>(move |s| {
        _ = s.take(&chan_a, Handler::settle())?.timeout(
            Duration::from_millis(50),
            Handler::call(move |()| {
                f.set(true);
                Err("timeout")
            }),
        )?;
        Ok(())
    }))?;
    assert_eq!(Ok("x"), outcome);
    assert!(start.elapsed() < Duration::from_millis(50));
    event_loop.run()?;
    assert!(!fired.get());
    Ok(())
}

#[test]
fn silent_emitter_settles_by_timeout() -> anyhow::Result<()> {
    let emitter: Emitter<&str, ()> = Emitter::new();
    let e = emitter.clone();
    let start = Instant::now();
    let outcome = altwait::run(
        Config::default(),
        select::<&str, ()>(move |s| {
            _ = s
                .once(&e, "done", Handler::call(|()| Ok("done")))?
                .timeout(Duration::from_millis(10), Handler::call(|()| Ok("timeout")))?;
            Ok(())
        }),
    )?;
    assert_eq!(Ok("timeout"), outcome);
    assert!(start.elapsed() >= Duration::from_millis(10));
    assert_eq!(0, emitter.listener_count(&"done"));
    Ok(())
}

#[test]
fn setup_failure_is_returned_from_start() {
    let called = Rc::new(Cell::new(false));
    let (ok, err) = (called.clone(), called.clone());
    let started = select::<(), ()>(|_| Err(Error::msg("bad")))
        .start(move |()| ok.set(true), move |()| err.set(true));
    match started {
        Err(Error::Message(message)) => assert_eq!("bad", message),
        other => panic!("unexpected start result {other:?}"),
    }
    assert!(!called.get());
}

#[test]
fn duplicate_port_is_a_programmer_error() -> anyhow::Result<()> {
    let chan: Chan<u8> = Chan::new(0);
    let c = chan.clone();
    let outcome = altwait::run(
        Config::default(),
        select::<u8, ()>(move |s| {
            _ = s.take(&c, Handler::settle())?.take(c.output(), Handler::settle())?;
            Ok(())
        }),
    );
    match outcome {
        Err(Error::DuplicateRegistration(port)) => {
            assert_eq!(chan.output().port_id(), port);
            assert_eq!(
                format!("Cannot have duplicated port {port} in one selector!"),
                Error::DuplicateRegistration(port).to_string()
            );
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    // the first take was cancelled along with the failed setup
    assert_eq!(0, chan.waiting_takers());
    Ok(())
}

#[test]
fn losers_are_cancelled_and_late_completions_ignored() -> anyhow::Result<()> {
    let event_loop = EventLoop::new()?;
    let (fast, slow): (Chan<u8>, Chan<u8>) = (Chan::new(0), Chan::new(0));
    let emitter: Emitter<&str, u8> = Emitter::new();
    let settlements = Rc::new(Cell::new(0));
    let (ok, err) = (settlements.clone(), settlements.clone());
    let (f, s, e) = (fast.clone(), slow.clone(), emitter.clone());
    let handle = event_loop.handle();
    handle.next_tick(move || {
        let started = select::<u8, ()>(move |sel| {
            _ = sel
                .take(&f, Handler::settle())?
                .put(&s, 1, Handler::call(|()| Ok(100)))?
                .once(&e, "late", Handler::settle())?
                .timeout(Duration::from_millis(30), Handler::call(|()| Err(())))?;
            Ok(())
        })
        .start(
            move |_| ok.set(ok.get() + 1),
            move |()| err.set(err.get() + 1),
        );
        assert!(started.is_ok());
    });
    let sender = fast.clone();
    _ = handle.set_timeout(Duration::from_millis(5), move || {
        _ = sender.try_send(7);
    });
    event_loop.run()?;
    assert_eq!(1, settlements.get());
    assert_eq!(0, slow.waiting_putters());
    assert_eq!(0, emitter.emit(&"late", 1));
    assert_eq!(Err(8), fast.try_send(8));
    Ok(())
}
