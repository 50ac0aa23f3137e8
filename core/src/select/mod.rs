//! The selective wait: race several sources, keep the first, cancel the rest.

use crate::common::constants::OperationKind;
use crate::config::Diagnostics;
use crate::error::Result;
use crate::operation::Operation;

pub use handler::Handler;
pub use selector::Selector;

mod handler;

mod selector;

/// Build an operation racing the registrations made by `setup`.
///
/// Starting the operation creates a fresh [`Selector`] bound to the start's
/// continuations and calls `setup` with it. If `setup` fails, every
/// registration made so far is cancelled and the error is returned from
/// [`Operation::start`]; neither continuation runs.
pub fn select<T: 'static, E: 'static>(
    setup: impl FnOnce(&mut Selector<T, E>) -> Result<()> + 'static,
) -> Operation<T, E> {
    select_with(Diagnostics::default(), setup)
}

/// [`select`] with explicit diagnostics.
pub fn select_with<T: 'static, E: 'static>(
    diagnostics: Diagnostics,
    setup: impl FnOnce(&mut Selector<T, E>) -> Result<()> + 'static,
) -> Operation<T, E> {
    Operation::with_kind(OperationKind::Select, move |on_success, on_failure| {
        let mut selector = Selector::new(on_success, on_failure, diagnostics);
        if let Err(e) = setup(&mut selector) {
            crate::warn!("select setup failed: {}", e);
            selector.abandon();
            return Err(e);
        }
        Ok(())
    })
    .with_diagnostics(&diagnostics)
}
