//! Two-threshold (Schmitt trigger) state machine.
//!
//! Pure logic. The engine never resolves anything itself; the node hands it
//! a numeric sample and the thresholds resolved for the same event.

use serde::Serialize;

use crate::state::State;
use crate::threshold::Thresholds;

/// A committed state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub from: State,
    pub to: State,
}

/// Apply the transition rule without mutating anything.
///
/// The falling check runs first, so with an inverted band (`rising <
/// falling`) a sample below `falling` always wins. `Undefined` is never
/// produced.
pub fn next_state(current: State, sample: f64, thresholds: Thresholds) -> Option<State> {
    if current != State::Low && sample < thresholds.falling {
        Some(State::Low)
    } else if current != State::High && sample > thresholds.rising {
        Some(State::High)
    } else {
        None
    }
}

/// Owns the current [`State`] of one node.
#[derive(Debug, Clone, Default)]
pub struct HysteresisEngine {
    state: State,
}

impl HysteresisEngine {
    pub fn new(initial: State) -> Self {
        Self { state: initial }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Apply one sample. Returns the transition if the state changed.
    pub fn apply(&mut self, sample: f64, thresholds: Thresholds) -> Option<Transition> {
        let to = next_state(self.state, sample, thresholds)?;
        let from = std::mem::replace(&mut self.state, to);
        Some(Transition { from, to })
    }

    /// Re-initialize the state. This is the only way back to `Undefined`.
    pub fn reset(&mut self, initial: State) {
        self.state = initial;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const BAND: Thresholds = Thresholds {
        rising: 10.0,
        falling: 8.0,
    };

    fn run(initial: State, samples: &[f64], thresholds: Thresholds) -> Vec<Option<State>> {
        let mut engine = HysteresisEngine::new(initial);
        samples
            .iter()
            .map(|&s| engine.apply(s, thresholds).map(|t| t.to))
            .collect()
    }

    // -- Transition rule --------------------------------------------------

    #[test]
    fn rises_above_and_falls_below() {
        let out = run(State::Undefined, &[11.0, 12.0, 9.0, 7.0, 7.5, 11.0], BAND);
        assert_eq!(
            out,
            vec![Some(State::High), None, None, Some(State::Low), None, Some(State::High)]
        );
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(next_state(State::Undefined, 10.0, BAND), None);
        assert_eq!(next_state(State::Undefined, 8.0, BAND), None);
        assert_eq!(next_state(State::Low, 10.0, BAND), None);
        assert_eq!(next_state(State::High, 8.0, BAND), None);
    }

    #[test]
    fn inside_band_keeps_undefined() {
        assert_eq!(run(State::Undefined, &[9.0, 8.5, 9.9], BAND), vec![None, None, None]);
    }

    #[test]
    fn falling_check_wins_on_inverted_band() {
        let inverted = Thresholds::new(8.0, 10.0);
        assert_eq!(next_state(State::Undefined, 9.0, inverted), Some(State::Low));
        assert_eq!(next_state(State::Low, 9.0, inverted), Some(State::High));
        assert_eq!(next_state(State::High, 9.0, inverted), Some(State::Low));
        assert!(inverted.is_degenerate());
    }

    #[test]
    fn equal_thresholds_switch_on_either_side() {
        let flat = Thresholds::new(9.0, 9.0);
        assert_eq!(run(State::Undefined, &[9.0, 9.5, 8.5, 9.0], flat), vec![
            None,
            Some(State::High),
            Some(State::Low),
            None
        ]);
    }

    // -- State bookkeeping -------------------------------------------------

    #[test]
    fn transition_reports_previous_state() {
        let mut engine = HysteresisEngine::new(State::Low);
        let t = engine.apply(11.0, BAND).unwrap();
        assert_eq!(t, Transition { from: State::Low, to: State::High });
        assert_eq!(engine.state(), State::High);
    }

    #[test]
    fn undefined_is_never_reentered() {
        let mut engine = HysteresisEngine::default();
        let samples = [11.0, 7.0, 9.0, f64::INFINITY, f64::NEG_INFINITY, 9.0, 100.0, -100.0];
        let bands = [BAND, Thresholds::new(8.0, 10.0), Thresholds::new(9.0, 9.0)];
        for (i, sample) in samples.iter().enumerate() {
            engine.apply(*sample, bands[i % bands.len()]);
            if i > 0 {
                assert_ne!(engine.state(), State::Undefined);
            }
        }
    }

    #[test]
    fn emits_only_on_change() {
        let mut engine = HysteresisEngine::new(State::High);
        for sample in [11.0, 12.0, 9.0, 10.0, 8.0] {
            assert!(engine.apply(sample, BAND).is_none());
        }
        assert_eq!(engine.state(), State::High);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut engine = HysteresisEngine::new(State::Undefined);
        engine.apply(11.0, BAND);
        engine.reset(State::Undefined);
        assert_eq!(engine.state(), State::Undefined);
    }
}
