use crate::port::PortId;

/// Errors reported synchronously by this crate.
///
/// Failures of the raced sources themselves travel through the failure
/// continuation with the caller's own error type; this enum only covers what
/// has to be reported at the call site.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The same port endpoint was registered twice on one selector.
    #[error("Cannot have duplicated port {0} in one selector!")]
    DuplicateRegistration(PortId),
    /// An adapter needing the event loop was started outside of it.
    #[error("no event loop is running on the current thread")]
    NoEventLoop,
    /// The event loop ran out of work before the operation settled.
    #[error("operation never settled")]
    Unsettled,
    /// A free-form failure.
    #[error("{0}")]
    Message(String),
    /// The poller failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an [`Error::Message`].
    pub fn msg(message: impl Into<String>) -> Self {
        Error::Message(message.into())
    }
}

/// Result type of this crate.
pub type Result<T> = std::result::Result<T, Error>;
