#![deny(
    // The following are allowed by default lints according to
    // https://doc.rust-lang.org/rustc/lints/listing/allowed-by-default.html
    anonymous_parameters,
    bare_trait_objects,
    // elided_lifetimes_in_paths, // allow anonymous lifetime
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    single_use_lifetimes,
    trivial_casts,
    trivial_numeric_casts,
    // unreachable_pub, allow clippy::redundant_pub_crate lint instead
    unsafe_code,
    unstable_features,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results,
    variant_size_differences,

    warnings, // treat all wanings as errors

    clippy::all,
    // clippy::restriction,
    clippy::pedantic,
    // clippy::nursery, // It's still under development
    clippy::cargo,
    unreachable_pub,
)]
#![allow(
    // Some explicitly allowed Clippy lints, must have clear reason to allow
    clippy::implicit_return, // actually omitting the return keyword is idiomatic Rust code
    clippy::module_name_repetitions, // repeation of module name in a struct name is not big deal
    clippy::multiple_crate_versions, // multi-version dependency crates is not able to fix
    clippy::missing_errors_doc, // TODO: add error docs
    clippy::type_complexity, // continuations are boxed closures
)]
//! Callback-style async operations and a selective wait racing them.
//!
//! An [`Operation`] is a startable unit of async work that settles exactly one
//! of two continuations. The [`adapter`] module turns timers, events, futures,
//! raw tasks and channel endpoints into operations, and [`select()`] races
//! several sources at once:
//!
//! ```no_run
//! use altwait_core::{select, Chan, EventLoop, Handler};
//! use std::time::Duration;
//!
//! let event_loop = EventLoop::new()?;
//! let chan: Chan<&str> = Chan::new(0);
//! let c = chan.clone();
//! let outcome = event_loop.block_on(select::<String, String>(move |s| {
//!     _ = s
//!         .take(&c, Handler::call(|v: &str| Ok(v.to_string())))?
//!         .timeout(Duration::from_millis(50), Handler::call(|()| Err("timed out".into())))?;
//!     Ok(())
//! }))?;
//! assert_eq!(Err("timed out".to_string()), outcome);
//! # Ok::<(), altwait_core::Error>(())
//! ```

/// Common traits, macros and constants.
pub mod common;

/// Configuration and diagnostics.
pub mod config;

mod error;

/// The event loop providing timers, immediates and a future spawner.
pub mod event_loop;

mod operation;

pub mod adapter;

pub mod port;

pub mod chan;

pub mod event;

pub mod coroutine;

pub mod select;

pub use adapter::{Completion, Factory};
pub use chan::{Chan, Receiver, Sender};
pub use common::constants::{OperationKind, SelectorState};
pub use config::{Config, Diagnostics};
pub use coroutine::{Computation, Suspender};
pub use error::{Error, Result};
pub use event::{Emitter, EventSource, ListenerId};
pub use event_loop::{EventLoop, Handle, TaskHandle, TimerId};
pub use operation::{Operation, OperationFuture, Reject, Resolve};
pub use port::{AsPutPort, AsTakePort, Cancellation, PortId, PutPort, TakePort};
pub use select::{select, select_with, Handler, Selector};
