use std::sync::atomic::{AtomicU64, Ordering};

/// At-most-once gate for remote dispatch on one dispatcher instance.
///
/// The host logging framework has been observed to invoke the write path
/// twice for a single logical error (once via its exception handler, once
/// via a duplicate record). The guard keeps an instance-scoped counter:
/// the first exception-path dispatch moves it 0→1 and proceeds; any
/// dispatch attempt observed while the counter is already non-zero is
/// suppressed.
///
/// This is a coarse instance-lifetime workaround, not content-based
/// deduplication: two genuinely distinct errors on the same instance after
/// the first exception are also suppressed. The counter resets only by
/// constructing a new dispatcher.
#[derive(Debug, Default)]
pub struct DispatchGuard {
    fired: AtomicU64,
}

impl DispatchGuard {
    pub fn new() -> Self {
        DispatchGuard::default()
    }

    /// Returns whether this dispatch may proceed to the remote client.
    ///
    /// Exception-path dispatches claim the one permitted slot atomically;
    /// message-path dispatches never change state and remain allowed for
    /// as long as no exception has fired.
    pub fn should_dispatch(&self, is_exception_path: bool) -> bool {
        if is_exception_path {
            self.fired
                .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        } else {
            self.fired.load(Ordering::Acquire) == 0
        }
    }

    /// True once the one permitted exception dispatch has happened.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_exception_fires_then_everything_is_suppressed() {
        let guard = DispatchGuard::new();
        assert!(guard.should_dispatch(true));
        assert!(!guard.should_dispatch(false));
        assert!(!guard.should_dispatch(true));
        assert!(guard.has_fired());
    }

    #[test]
    fn message_dispatches_repeat_while_fresh() {
        let guard = DispatchGuard::new();
        assert!(guard.should_dispatch(false));
        assert!(guard.should_dispatch(false));
        assert!(!guard.has_fired());
        // The message path never claims the slot.
        assert!(guard.should_dispatch(true));
    }

    // Note: suppression is per instance lifetime, so a second *distinct*
    // error on the same instance is dropped too. That matches the observed
    // double-fire workaround; it is not per-event deduplication.
    #[test]
    fn distinct_errors_on_one_instance_are_also_suppressed() {
        let guard = DispatchGuard::new();
        assert!(guard.should_dispatch(true));
        assert!(!guard.should_dispatch(true));

        let fresh = DispatchGuard::new();
        assert!(fresh.should_dispatch(true));
    }
}
