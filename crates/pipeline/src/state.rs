//! Run states and the per-run transition trace.

use std::fmt;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

/// Where an analysis run is.
///
/// Runs move strictly forward through the working states and end in
/// either `Complete` or `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    AwaitingInput,
    FetchingRasters,
    ComputingIndices,
    ComputingBaseline,
    Scoring,
    Deciding,
    Complete,
    Failed,
}

impl RunState {
    pub fn name(&self) -> &'static str {
        match self {
            RunState::AwaitingInput => "awaiting input",
            RunState::FetchingRasters => "fetching rasters",
            RunState::ComputingIndices => "computing indices",
            RunState::ComputingBaseline => "computing baseline",
            RunState::Scoring => "scoring",
            RunState::Deciding => "deciding",
            RunState::Complete => "complete",
            RunState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed)
    }

    /// Allowed successor states.
    pub fn can_enter(&self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Complete | Failed, _) => false,
            (_, Failed) => true,
            (AwaitingInput, FetchingRasters)
            | (FetchingRasters, ComputingIndices)
            | (ComputingIndices, ComputingBaseline)
            | (ComputingBaseline, Scoring)
            | (Scoring, Deciding)
            | (Deciding, Complete) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One state entry, timed from the start of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transition {
    pub state: RunState,
    pub elapsed_ms: u64,
}

/// Every state a run passed through.
#[derive(Debug, Clone, Serialize)]
pub struct RunTrace {
    pub location_label: String,
    pub transitions: Vec<Transition>,
    #[serde(skip)]
    started: Instant,
}

impl RunTrace {
    /// Begin a trace in [`RunState::AwaitingInput`].
    pub fn start(location_label: impl Into<String>) -> Self {
        let mut trace = Self {
            location_label: location_label.into(),
            transitions: Vec::with_capacity(8),
            started: Instant::now(),
        };
        trace.record(RunState::AwaitingInput);
        trace
    }

    pub fn current(&self) -> RunState {
        self.transitions
            .last()
            .map_or(RunState::AwaitingInput, |t| t.state)
    }

    /// Move to `next`. Transitions the state machine does not allow are
    /// logged, leave the trace untouched and return `false`.
    #[must_use]
    pub fn enter(&mut self, next: RunState) -> bool {
        let current = self.current();
        if !current.can_enter(next) {
            warn!(location = %self.location_label, from = %current, to = %next, "refused run state transition");
            return false;
        }
        self.record(next);
        true
    }

    pub fn states(&self) -> Vec<RunState> {
        self.transitions.iter().map(|t| t.state).collect()
    }

    fn record(&mut self, state: RunState) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        info!(location = %self.location_label, state = %state, elapsed_ms, "run state");
        self.transitions.push(Transition { state, elapsed_ms });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path_reaches_complete() {
        let mut trace = RunTrace::start("site");
        for state in [
            RunState::FetchingRasters,
            RunState::ComputingIndices,
            RunState::ComputingBaseline,
            RunState::Scoring,
            RunState::Deciding,
            RunState::Complete,
        ] {
            assert!(trace.enter(state), "could not enter {state}");
        }
        assert_eq!(trace.states().len(), 7);
        assert!(trace.current().is_terminal());
    }

    #[test]
    fn skipping_states_is_refused() {
        let mut trace = RunTrace::start("site");
        assert!(!trace.enter(RunState::Scoring));
        assert_eq!(trace.current(), RunState::AwaitingInput);
        assert_eq!(trace.states(), vec![RunState::AwaitingInput]);
    }

    #[test]
    fn finished_run_stays_finished() {
        let mut trace = RunTrace::start("site");
        for state in [
            RunState::FetchingRasters,
            RunState::ComputingIndices,
            RunState::ComputingBaseline,
            RunState::Scoring,
            RunState::Deciding,
            RunState::Complete,
        ] {
            assert!(trace.enter(state));
        }
        assert!(!trace.enter(RunState::Failed));
        assert!(!trace.enter(RunState::Complete));
        assert_eq!(trace.current(), RunState::Complete);
        assert_eq!(trace.states().len(), 7);
    }

    #[test]
    fn any_working_state_can_fail_once() {
        let mut trace = RunTrace::start("site");
        assert!(trace.enter(RunState::FetchingRasters));
        assert!(trace.enter(RunState::Failed));
        assert!(!trace.enter(RunState::Failed));
        assert!(!trace.enter(RunState::ComputingIndices));
        assert_eq!(
            trace.states(),
            vec![RunState::AwaitingInput, RunState::FetchingRasters, RunState::Failed]
        );
    }

    #[test]
    fn serializes_without_clock() {
        let trace = RunTrace::start("site");
        let value = serde_json::to_value(&trace).unwrap();
        assert_eq!(value["transitions"][0]["state"], "AWAITING_INPUT");
        assert!(value.get("started").is_none());
    }
}
