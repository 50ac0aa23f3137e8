use crate::common::constants::DEFAULT_EVENT_CAPACITY;

/// Diagnostics injected into factories and selectors.
///
/// Everything is off by default.
#[repr(C)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct Diagnostics {
    capture_origin: bool,
    trace: bool,
}

impl Diagnostics {
    /// Capture the creation backtrace of every operation and log everything.
    #[must_use]
    pub fn verbose() -> Self {
        Diagnostics {
            capture_origin: true,
            trace: true,
        }
    }

    /// Whether operations record the backtrace of their creation site.
    #[must_use]
    pub fn capture_origin(&self) -> bool {
        self.capture_origin
    }

    /// Whether operation starts and selector settlements are logged.
    #[must_use]
    pub fn trace(&self) -> bool {
        self.trace
    }

    /// Toggle origin capture.
    pub fn set_capture_origin(&mut self, capture_origin: bool) -> &mut Self {
        self.capture_origin = capture_origin;
        self
    }

    /// Toggle tracing.
    pub fn set_trace(&mut self, trace: bool) -> &mut Self {
        self.trace = trace;
        self
    }
}

/// Event loop configuration.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Config {
    event_capacity: usize,
    diagnostics: Diagnostics,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            diagnostics: Diagnostics::default(),
        }
    }
}

impl Config {
    /// Capacity of the poll event buffer, never zero.
    #[must_use]
    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    /// Diagnostics handed to factories built from this loop.
    #[must_use]
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    /// Set the poll event buffer capacity; zero is bumped to one.
    pub fn set_event_capacity(&mut self, event_capacity: usize) -> &mut Self {
        self.event_capacity = event_capacity.max(1);
        self
    }

    /// Set the diagnostics.
    pub fn set_diagnostics(&mut self, diagnostics: Diagnostics) -> &mut Self {
        self.diagnostics = diagnostics;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_setters() {
        let mut config = Config::default();
        assert_eq!(DEFAULT_EVENT_CAPACITY, config.event_capacity());
        _ = config
            .set_event_capacity(0)
            .set_diagnostics(Diagnostics::verbose());
        assert_eq!(1, config.event_capacity());
        assert!(config.diagnostics().capture_origin());
        assert!(config.diagnostics().trace());
    }
}
