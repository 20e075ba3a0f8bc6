//! Read-state tracking, confirmed to the backend on its own cadence.

/// Unread flag of the open conversation plus bookkeeping for the in-flight
/// mark-read request.
#[derive(Debug, Default)]
pub struct ReadTracker {
    has_unread: bool,
    in_flight: bool,
    /// Unread content arrived after the in-flight request was dispatched.
    arrived_during_flight: bool,
}

impl ReadTracker {
    pub fn has_unread(&self) -> bool {
        self.has_unread
    }

    /// New content from someone else was synced.
    pub fn mark_unread(&mut self) {
        self.has_unread = true;
        if self.in_flight {
            self.arrived_during_flight = true;
        }
    }

    /// Conversation opened: the flag clears at once. Returns true when a
    /// forced mark-read should be sent for the backend's unread count.
    pub fn on_open(&mut self, backend_unread: u32) -> bool {
        self.has_unread = false;
        self.arrived_during_flight = false;
        if backend_unread > 0 && !self.in_flight {
            self.in_flight = true;
            true
        } else {
            false
        }
    }

    /// Periodic tick. Returns true when a mark-read should be dispatched.
    pub fn on_tick(&mut self) -> bool {
        if self.has_unread && !self.in_flight {
            self.in_flight = true;
            self.arrived_during_flight = false;
            true
        } else {
            false
        }
    }

    /// Mark-read completed. The flag clears on success unless more unread
    /// content arrived meanwhile; on failure it stays for the next tick.
    pub fn on_marked(&mut self, ok: bool) {
        self.in_flight = false;
        if ok && !self.arrived_during_flight {
            self.has_unread = false;
        }
        self.arrived_during_flight = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_only_fires_when_unread() {
        let mut t = ReadTracker::default();
        assert!(!t.on_tick());
        t.mark_unread();
        assert!(t.on_tick());
        // Already in flight.
        assert!(!t.on_tick());
        t.on_marked(true);
        assert!(!t.has_unread());
        assert!(!t.on_tick());
    }

    #[test]
    fn test_open_clears_and_forces_when_backend_unread() {
        let mut t = ReadTracker::default();
        t.mark_unread();
        assert!(t.on_open(3));
        assert!(!t.has_unread());
        t.on_marked(true);

        let mut t = ReadTracker::default();
        assert!(!t.on_open(0));
    }

    #[test]
    fn test_failure_retries_next_tick() {
        let mut t = ReadTracker::default();
        t.mark_unread();
        assert!(t.on_tick());
        t.on_marked(false);
        assert!(t.has_unread());
        assert!(t.on_tick());
    }

    #[test]
    fn test_arrival_during_flight_survives_completion() {
        let mut t = ReadTracker::default();
        t.mark_unread();
        assert!(t.on_tick());
        t.mark_unread();
        t.on_marked(true);
        assert!(t.has_unread());
    }
}
