//! Per-turn state tracking.
//!
//! The orchestrator drives every turn through the same phase sequence and
//! owns the counters that bound it: specialist runs, inline rewrites, and
//! the degradation flags surfaced in the final report. Stages never keep
//! their own counters.

use concierge_types::{Degradation, TurnPhase};

/// Returns true when `to` is a legal successor of `from`.
///
/// `Failed` is reachable from any non-terminal phase; the two terminal
/// phases have no successors.
pub(crate) fn transition_permitted(from: TurnPhase, to: TurnPhase) -> bool {
    if from.is_terminal() {
        return false;
    }
    matches!(
        (from, to),
        (TurnPhase::Routing, TurnPhase::SpecialistActive)
            | (TurnPhase::SpecialistActive, TurnPhase::ReviewPending)
            | (TurnPhase::ReviewPending, TurnPhase::Revision)
            | (TurnPhase::ReviewPending, TurnPhase::LifecycleAssessment)
            | (TurnPhase::Revision, TurnPhase::SpecialistActive)
            | (TurnPhase::LifecycleAssessment, TurnPhase::Complete)
            | (_, TurnPhase::Failed)
    )
}

/// Mutable state for one turn in flight.
#[derive(Debug)]
pub(crate) struct TurnState {
    phase: TurnPhase,
    specialist_runs: u32,
    rewrites_used: u32,
    degradations: Vec<Degradation>,
}

impl TurnState {
    pub(crate) fn new() -> Self {
        Self {
            phase: TurnPhase::Routing,
            specialist_runs: 0,
            rewrites_used: 0,
            degradations: Vec::new(),
        }
    }

    pub(crate) fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Moves to the next phase. Illegal moves indicate an orchestrator bug
    /// and trip a debug assertion; the phase is recorded either way so the
    /// failure is visible in span attributes.
    pub(crate) fn advance(&mut self, to: TurnPhase) {
        debug_assert!(
            transition_permitted(self.phase, to),
            "illegal turn transition {:?} -> {:?}",
            self.phase,
            to
        );
        self.phase = to;
    }

    /// Counts a specialist invocation and returns the new run number.
    pub(crate) fn record_specialist_run(&mut self) -> u32 {
        self.specialist_runs += 1;
        self.specialist_runs
    }

    pub(crate) fn record_rewrite(&mut self) {
        self.rewrites_used += 1;
    }

    pub(crate) fn rewrites_used(&self) -> u32 {
        self.rewrites_used
    }

    /// Flags a degradation, once. Repeat flags of the same kind collapse.
    pub(crate) fn mark_degraded(&mut self, degradation: Degradation) {
        if !self.degradations.contains(&degradation) {
            self.degradations.push(degradation);
        }
    }

    pub(crate) fn review_exhausted(&self) -> bool {
        self.degradations.contains(&Degradation::ReviewExhausted)
    }

    pub(crate) fn degradations(&self) -> &[Degradation] {
        &self.degradations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_permitted() {
        let legal = [
            (TurnPhase::Routing, TurnPhase::SpecialistActive),
            (TurnPhase::SpecialistActive, TurnPhase::ReviewPending),
            (TurnPhase::ReviewPending, TurnPhase::LifecycleAssessment),
            (TurnPhase::LifecycleAssessment, TurnPhase::Complete),
        ];
        for (from, to) in legal {
            assert!(transition_permitted(from, to), "{from:?} -> {to:?}");
        }
    }

    #[test]
    fn revision_loops_back_to_specialist() {
        assert!(transition_permitted(
            TurnPhase::ReviewPending,
            TurnPhase::Revision
        ));
        assert!(transition_permitted(
            TurnPhase::Revision,
            TurnPhase::SpecialistActive
        ));
    }

    #[test]
    fn skipping_review_is_illegal() {
        assert!(!transition_permitted(
            TurnPhase::SpecialistActive,
            TurnPhase::LifecycleAssessment
        ));
        assert!(!transition_permitted(
            TurnPhase::Routing,
            TurnPhase::ReviewPending
        ));
        assert!(!transition_permitted(
            TurnPhase::Routing,
            TurnPhase::Complete
        ));
    }

    #[test]
    fn failed_is_reachable_from_any_live_phase() {
        for from in [
            TurnPhase::Routing,
            TurnPhase::SpecialistActive,
            TurnPhase::ReviewPending,
            TurnPhase::Revision,
            TurnPhase::LifecycleAssessment,
        ] {
            assert!(transition_permitted(from, TurnPhase::Failed), "{from:?}");
        }
    }

    #[test]
    fn terminal_phases_have_no_successors() {
        for to in [
            TurnPhase::Routing,
            TurnPhase::SpecialistActive,
            TurnPhase::Complete,
            TurnPhase::Failed,
        ] {
            assert!(!transition_permitted(TurnPhase::Complete, to));
            assert!(!transition_permitted(TurnPhase::Failed, to));
        }
    }

    #[test]
    fn degradations_collapse_duplicates() {
        let mut state = TurnState::new();
        state.mark_degraded(Degradation::IterationCapReached);
        state.mark_degraded(Degradation::IterationCapReached);
        state.mark_degraded(Degradation::ReviewExhausted);
        assert_eq!(state.degradations().len(), 2);
        assert!(state.review_exhausted());
    }

    #[test]
    fn counters_start_at_zero_and_tick() {
        let mut state = TurnState::new();
        assert_eq!(state.rewrites_used(), 0);
        assert_eq!(state.record_specialist_run(), 1);
        assert_eq!(state.record_specialist_run(), 2);
        state.record_rewrite();
        assert_eq!(state.rewrites_used(), 1);
    }
}
