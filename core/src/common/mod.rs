use crate::common::constants::FAR_FUTURE;
use std::time::{Duration, Instant};

/// Traits.
pub mod traits;

pub(crate) mod macros;

/// Constants.
pub mod constants;

/// Generation-checked slot storage.
pub mod slots;

/// `Instant::now()` add `dur`, saturating far in the future on overflow.
#[must_use]
pub fn get_timeout_time(dur: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(dur)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// Install the global `tracing` subscriber, only the first call takes effect.
#[cfg(feature = "log")]
pub fn init_log() {
    static LOG: once_cell::sync::OnceCell<()> = once_cell::sync::OnceCell::new();
    _ = LOG.get_or_init(|| {
        let offset = time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC);
        _ = tracing_subscriber::fmt()
            .with_timer(tracing_subscriber::fmt::time::OffsetTime::new(
                offset,
                time::format_description::well_known::Rfc3339,
            ))
            .with_thread_names(true)
            .try_init();
    });
}

/// No-op without the `log` feature.
#[cfg(not(feature = "log"))]
pub fn init_log() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_time_saturates() {
        let start = Instant::now();
        assert!(get_timeout_time(Duration::from_millis(10)) >= start);
        assert!(get_timeout_time(Duration::MAX) > start);
    }
}
