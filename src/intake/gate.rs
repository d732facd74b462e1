use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GateState {
    Armed,
    Holding { since: Instant },
}

/// Lets one scan through, then holds until rearmed. A code held in front of
/// the camera keeps producing events; only the first becomes a record.
#[derive(Debug, Clone)]
pub struct ScanGate {
    state: GateState,
    rearm_delay: Option<Duration>,
}

impl ScanGate {
    /// `rearm_delay` re-opens the gate on its own after that long; `None`
    /// waits for [`ScanGate::rearm`].
    pub fn new(rearm_delay: Option<Duration>) -> Self {
        Self {
            state: GateState::Armed,
            rearm_delay,
        }
    }

    pub fn try_accept(&mut self) -> bool {
        self.try_accept_at(Instant::now())
    }

    pub fn rearm(&mut self) {
        self.state = GateState::Armed;
    }

    pub fn is_holding(&self) -> bool {
        self.is_holding_at(Instant::now())
    }

    fn try_accept_at(&mut self, now: Instant) -> bool {
        if self.is_holding_at(now) {
            return false;
        }
        self.state = GateState::Holding { since: now };
        true
    }

    fn is_holding_at(&self, now: Instant) -> bool {
        match (self.state, self.rearm_delay) {
            (GateState::Armed, _) => false,
            (GateState::Holding { .. }, None) => true,
            (GateState::Holding { since }, Some(delay)) => now.saturating_duration_since(since) < delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_gate_holds_until_rearmed() {
        let mut gate = ScanGate::new(None);
        assert!(!gate.is_holding());
        assert!(gate.try_accept());
        assert!(gate.is_holding());
        assert!(!gate.try_accept());
        assert!(!gate.try_accept());

        gate.rearm();
        assert!(gate.try_accept());
    }

    #[test]
    fn test_delay_rearms_automatically() {
        let mut gate = ScanGate::new(Some(Duration::from_millis(500)));
        let start = Instant::now();

        assert!(gate.try_accept_at(start));
        assert!(!gate.try_accept_at(start + Duration::from_millis(499)));
        assert!(gate.try_accept_at(start + Duration::from_millis(500)));
        assert!(!gate.try_accept_at(start + Duration::from_millis(600)));
    }

    #[test]
    fn test_manual_rearm_beats_delay() {
        let mut gate = ScanGate::new(Some(Duration::from_secs(60)));
        let start = Instant::now();
        assert!(gate.try_accept_at(start));
        gate.rearm();
        assert!(gate.try_accept_at(start + Duration::from_millis(1)));
    }
}
