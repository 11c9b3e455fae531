use std::sync::atomic::{AtomicBool, Ordering};

/// Re-entrancy flag for one class of operation.
///
/// [`InFlightGuard::try_begin`] hands out at most one [`InFlight`] ticket at a
/// time; the flag clears when the ticket drops, including on early return.
#[derive(Debug, Default)]
pub struct InFlightGuard {
    busy: AtomicBool,
}

impl InFlightGuard {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    /// `None` while another ticket is outstanding
    pub fn try_begin(&self) -> Option<InFlight<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| InFlight { guard: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

#[derive(Debug)]
pub struct InFlight<'a> {
    guard: &'a InFlightGuard,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.guard.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_ticket_refused_until_first_drops() {
        let guard = InFlightGuard::new();
        let first = guard.try_begin();
        assert!(first.is_some());
        assert!(guard.try_begin().is_none());
        assert!(guard.is_busy());

        drop(first);
        assert!(!guard.is_busy());
        assert!(guard.try_begin().is_some());
    }
}
