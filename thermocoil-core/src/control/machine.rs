//! Output state machine
//!
//! The coil is either idle or energized. Every other piece of behavior is a
//! function of this state, the mode and the tick inputs.

use crate::safety::FaultKind;

/// Output states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputState {
    /// Output off, settings may be changed
    #[default]
    Idle,
    /// Output on, fire held
    Energized,
}

/// Events that trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Fire pressed with a resistance reading and no fault
    Fire,
    /// Fire released
    Release,
    /// Fault reported by the output stage
    Fault(FaultKind),
}

impl OutputState {
    /// Check if the coil is being driven
    pub const fn is_energized(&self) -> bool {
        matches!(self, OutputState::Energized)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use OutputState::*;

        match (self, event) {
            (Idle, Fire) => Energized,
            (Energized, Release) => Idle,
            (Energized, Fault(_)) => Idle,

            // Default: stay in current state
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fire_energizes() {
        assert_eq!(OutputState::Idle.transition(Event::Fire), OutputState::Energized);
    }

    #[test]
    fn test_release_returns_to_idle() {
        assert_eq!(
            OutputState::Energized.transition(Event::Release),
            OutputState::Idle
        );
    }

    #[test]
    fn test_fault_forces_idle() {
        let kinds = [
            FaultKind::Short,
            FaultKind::Open,
            FaultKind::WeakBattery,
            FaultKind::OverTemp,
        ];

        for kind in kinds {
            let next = OutputState::Energized.transition(Event::Fault(kind));
            assert_eq!(next, OutputState::Idle);
            assert_eq!(OutputState::Idle.transition(Event::Fault(kind)), OutputState::Idle);
        }
    }

    #[test]
    fn test_ignored_events_keep_state() {
        assert_eq!(OutputState::Idle.transition(Event::Release), OutputState::Idle);
        assert_eq!(
            OutputState::Energized.transition(Event::Fire),
            OutputState::Energized
        );
    }
}
