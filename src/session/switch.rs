//! Position-switch state machine.
//!
//! ```text
//!            begin()                     settle(latest generation)
//! Stable ──────────────▶ Switching ─────────────────────────────▶ Stable
//!                         │    ▲
//!                         └────┘ begin() again: new generation,
//!                                earlier timers become stale
//! ```
//!
//! The gate flag mirrors `Switching` and is read lock-free by the frame
//! delivery path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchState {
    Stable,
    Switching { generation: u64 },
}

#[derive(Debug)]
pub(crate) struct PositionSwitch {
    state: SwitchState,
    generation: u64,
    gate: Arc<AtomicBool>,
}

impl PositionSwitch {
    pub(crate) fn new(gate: Arc<AtomicBool>) -> Self {
        gate.store(false, Ordering::Release);
        Self {
            state: SwitchState::Stable,
            generation: 0,
            gate,
        }
    }

    pub(crate) fn state(&self) -> SwitchState {
        self.state
    }

    pub(crate) fn is_switching(&self) -> bool {
        matches!(self.state, SwitchState::Switching { .. })
    }

    /// Enter `Switching`. Returns the generation the caller's settle timer
    /// must present, and whether this was a `Stable -> Switching` transition.
    pub(crate) fn begin(&mut self) -> (u64, bool) {
        let entered = !self.is_switching();
        self.generation = self.generation.wrapping_add(1);
        self.state = SwitchState::Switching {
            generation: self.generation,
        };
        self.gate.store(true, Ordering::Release);
        (self.generation, entered)
    }

    /// Settle timer fired. Only the latest generation returns to `Stable`.
    pub(crate) fn settle(&mut self, generation: u64) -> bool {
        match self.state {
            SwitchState::Switching { generation: current } if current == generation => {
                self.state = SwitchState::Stable;
                self.gate.store(false, Ordering::Release);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> (PositionSwitch, Arc<AtomicBool>) {
        let gate = Arc::new(AtomicBool::new(true));
        (PositionSwitch::new(gate.clone()), gate)
    }

    #[test]
    fn test_starts_stable_with_open_gate() {
        let (switch, gate) = machine();
        assert_eq!(switch.state(), SwitchState::Stable);
        assert!(!gate.load(Ordering::Acquire));
    }

    #[test]
    fn test_single_cycle() {
        let (mut switch, gate) = machine();
        let (generation, entered) = switch.begin();
        assert!(entered);
        assert!(gate.load(Ordering::Acquire));

        assert!(switch.settle(generation));
        assert_eq!(switch.state(), SwitchState::Stable);
        assert!(!gate.load(Ordering::Acquire));
    }

    #[test]
    fn test_second_begin_supersedes_first_timer() {
        let (mut switch, gate) = machine();
        let (first, entered_first) = switch.begin();
        let (second, entered_second) = switch.begin();
        assert!(entered_first);
        assert!(!entered_second);

        assert!(!switch.settle(first));
        assert!(switch.is_switching());
        assert!(gate.load(Ordering::Acquire));

        assert!(switch.settle(second));
        assert!(!switch.is_switching());
    }

    #[test]
    fn test_settle_when_stable_is_ignored() {
        let (mut switch, _gate) = machine();
        let (generation, _) = switch.begin();
        assert!(switch.settle(generation));
        assert!(!switch.settle(generation));
    }
}
