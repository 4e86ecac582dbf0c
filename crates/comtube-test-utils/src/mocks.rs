//! Mock collaborators for the preview driver.
//!
//! Provides lightweight stand-ins for the stance scheduler, the tube
//! geometry provider, the QP solver, the downstream trajectory sink, and
//! the enclosing control loop.

use std::cell::Cell;

use comtube_core::{SolveError, TubeError};
use comtube_mpc::{
    Halfspaces, HrepTube, LoopControl, PointMassState, PreviewSink, PreviewSolution,
    PreviewTargetSource, PreviewTargets, QpProblem, QpSolver, TubeBuilder,
};
use nalgebra::{DVector, Vector3};

// ---------------------------------------------------------------------------
// ScriptedTargets
// ---------------------------------------------------------------------------

/// A scheduler that plays back a fixed list of targets, one per phase.
///
/// Stances are plain support-region indices: phase `i` stands on region `i`
/// and steps onto region `i + 1`.
pub struct ScriptedTargets {
    script: Vec<PreviewTargets>,
    cursor: usize,
    cur: usize,
    next: usize,
}

impl ScriptedTargets {
    /// Create a scheduler over `script`.
    ///
    /// # Panics
    /// If `script` is empty.
    pub fn new(script: Vec<PreviewTargets>) -> Self {
        assert!(!script.is_empty(), "target script must not be empty");
        Self {
            script,
            cursor: 0,
            cur: 0,
            next: 1,
        }
    }

    /// A single phase reaching `target` at rest over `horizon` seconds.
    pub fn constant(target: Vector3<f64>, horizon: f64, switch_time: f64) -> Self {
        Self::new(vec![PreviewTargets {
            switch_time,
            horizon,
            target: PointMassState::at_rest(target),
            phase_id: 0,
        }])
    }

    /// Move to the next scripted phase. Stays on the last one once reached.
    pub fn advance(&mut self) {
        if self.cursor + 1 < self.script.len() {
            self.cursor += 1;
            self.cur = self.cursor;
            self.next = self.cursor + 1;
        }
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }
}

impl PreviewTargetSource for ScriptedTargets {
    type Stance = usize;

    fn cur_stance(&self) -> &usize {
        &self.cur
    }

    fn next_stance(&self) -> &usize {
        &self.next
    }

    fn preview_targets(&self) -> PreviewTargets {
        self.script[self.cursor].clone()
    }
}

// ---------------------------------------------------------------------------
// BoxTubes / FailingTubes
// ---------------------------------------------------------------------------

/// A tube builder returning symmetric acceleration boxes.
///
/// The first regime is bounded by `before`, the second by `after`, on every
/// axis. Records how often it was called.
pub struct BoxTubes {
    before: f64,
    after: f64,
    calls: usize,
}

impl BoxTubes {
    /// Both regimes bounded by `limit`.
    pub const fn uniform(limit: f64) -> Self {
        Self::new(limit, limit)
    }

    pub const fn new(before: f64, after: f64) -> Self {
        Self {
            before,
            after,
            calls: 0,
        }
    }

    pub const fn calls(&self) -> usize {
        self.calls
    }
}

fn accel_box(limit: f64) -> Halfspaces {
    Halfspaces::bounds(
        &DVector::from_element(3, -limit),
        &DVector::from_element(3, limit),
    )
}

impl<S> TubeBuilder<S> for BoxTubes {
    type Tube = HrepTube;

    fn build_tube(
        &mut self,
        _start: &Vector3<f64>,
        _target: &Vector3<f64>,
        _cur_stance: &S,
        _next_stance: &S,
        _radius: f64,
    ) -> Result<HrepTube, TubeError> {
        self.calls += 1;
        Ok(HrepTube::new(accel_box(self.before), accel_box(self.after)))
    }
}

/// A tube builder for which no feasible tube ever exists.
#[derive(Default)]
pub struct FailingTubes {
    calls: usize,
}

impl FailingTubes {
    pub const fn calls(&self) -> usize {
        self.calls
    }
}

impl<S> TubeBuilder<S> for FailingTubes {
    type Tube = HrepTube;

    fn build_tube(
        &mut self,
        _start: &Vector3<f64>,
        _target: &Vector3<f64>,
        _cur_stance: &S,
        _next_stance: &S,
        _radius: f64,
    ) -> Result<HrepTube, TubeError> {
        self.calls += 1;
        Err(TubeError::new("stances do not overlap"))
    }
}

// ---------------------------------------------------------------------------
// FailingSolver
// ---------------------------------------------------------------------------

/// A QP solver that always fails with the same error.
pub struct FailingSolver {
    error: SolveError,
    calls: Cell<usize>,
}

impl FailingSolver {
    pub const fn new(error: SolveError) -> Self {
        Self {
            error,
            calls: Cell::new(0),
        }
    }

    pub const fn infeasible() -> Self {
        Self::new(SolveError::PrimalInfeasible)
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl QpSolver for FailingSolver {
    fn solve_qp(&self, _problem: &QpProblem) -> Result<DVector<f64>, SolveError> {
        self.calls.set(self.calls.get() + 1);
        Err(self.error.clone())
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// A sink that keeps every published solution.
#[derive(Default)]
pub struct RecordingSink {
    pub received: Vec<PreviewSolution>,
}

impl RecordingSink {
    pub fn len(&self) -> usize {
        self.received.len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }

    pub fn last(&self) -> Option<&PreviewSolution> {
        self.received.last()
    }
}

impl PreviewSink for RecordingSink {
    fn update_preview(&mut self, solution: PreviewSolution) {
        self.received.push(solution);
    }
}

// ---------------------------------------------------------------------------
// StopCounter
// ---------------------------------------------------------------------------

/// A loop handle that counts stop requests.
#[derive(Default)]
pub struct StopCounter {
    pub stops: usize,
    pub last_reason: Option<SolveError>,
}

impl StopCounter {
    pub const fn stopped(&self) -> bool {
        self.stops > 0
    }
}

impl LoopControl for StopCounter {
    fn request_stop(&mut self, reason: &SolveError) {
        self.stops += 1;
        self.last_reason = Some(reason.clone());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
