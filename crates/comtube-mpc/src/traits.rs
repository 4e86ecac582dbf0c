//! Collaborators of the real-time driver.

use comtube_core::SolveError;

use crate::preview::PreviewSolution;
use crate::types::PreviewTargets;

// ---------------------------------------------------------------------------
// PreviewTargetSource
// ---------------------------------------------------------------------------

/// Stance scheduler: current/next support regions and the preview target.
pub trait PreviewTargetSource {
    /// Opaque stance description, passed through to the tube builder.
    type Stance;

    /// Support region in effect now.
    fn cur_stance(&self) -> &Self::Stance;

    /// Support region in effect after the switch time.
    fn next_stance(&self) -> &Self::Stance;

    /// Switch time, horizon, and target state for this tick.
    fn preview_targets(&self) -> PreviewTargets;
}

// ---------------------------------------------------------------------------
// PreviewSink
// ---------------------------------------------------------------------------

/// Downstream consumer that turns a solved preview into a trajectory.
pub trait PreviewSink {
    /// Replace the current plan. Called at most once per successful tick.
    fn update_preview(&mut self, solution: PreviewSolution);
}

// ---------------------------------------------------------------------------
// LoopControl
// ---------------------------------------------------------------------------

/// Handle on the enclosing fixed-rate control loop.
pub trait LoopControl {
    /// Ask the loop to stop after the current tick.
    fn request_stop(&mut self, reason: &SolveError);
}
