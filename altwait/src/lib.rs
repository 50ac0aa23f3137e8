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
)]
//! Race heterogeneous async sources and commit to the first one to complete.
//!
//! See [`altwait_core`] for the building blocks; this crate re-exports them and
//! adds [`run`] to drive one operation on a fresh event loop.

pub use altwait_core::adapter::{
    defer, future, next_tick, once, put, sleep, spawn, take, task, thunk, Completion, Factory,
};
pub use altwait_core::common::init_log;
pub use altwait_core::{
    select, select_with, AsPutPort, AsTakePort, Cancellation, Chan, Computation, Config,
    Diagnostics, Emitter, Error, EventLoop, EventSource, Handle, Handler, ListenerId, Operation,
    OperationFuture, OperationKind, PortId, PutPort, Receiver, Reject, Resolve, Result, Selector,
    SelectorState, Sender, Suspender, TakePort, TaskHandle, TimerId,
};

/// Run `operation` on a new [`EventLoop`] built from `config` until it
/// settles.
///
/// The outer `Result` carries start failures (including a failing
/// [`select`] setup) and [`Error::Unsettled`]; the inner one is the outcome of
/// the operation itself.
pub fn run<T: 'static, E: 'static>(
    config: Config,
    operation: Operation<T, E>,
) -> Result<std::result::Result<T, E>> {
    EventLoop::with_config(config)?.block_on(operation)
}
