//! Linear preview control of a point-mass center of mass inside tubes.
//!
//! This crate plans the center-of-mass acceleration of a walking robot over
//! a short receding horizon:
//!
//! 1. **Dynamics**: discrete linear model `x_{k+1} = A x_k + B u_k`
//! 2. **Horizon expansion**: condensed form `x_N = Φ x_0 + Ψ U`
//! 3. **Cost synthesis**: effort plus weighted terminal tracking
//! 4. **Constraint assembly**: block-diagonal tube halfspaces, switched at
//!    the contact transition
//! 5. **QP solve**: Clarabel interior point, Cholesky when unconstrained
//! 6. **Driver**: per-tick gather, tube, build, solve, publish
//!
//! # Architecture
//!
//! The point mass is a 3-D double integrator. The condensed QP eliminates
//! the states and solves only for the stacked accelerations (3*N variables
//! over N horizon steps). Each tick re-plans from scratch; the last
//! published plan is played back by a [`PreviewBuffer`] until the next one.

pub mod buffer;
pub mod com;
pub mod constraints;
pub mod cost;
pub mod driver;
pub mod dynamics;
pub mod horizon;
pub mod preview;
pub mod solver;
pub mod traits;
pub mod tube;
pub mod types;

pub use buffer::PreviewBuffer;
pub use com::{ComPreviewControl, tube_constraints};
pub use constraints::{
    Halfspaces, InequalitySystem, Regime, assemble_constraints, block_diag, switch_step,
};
pub use cost::{QuadraticCost, weighted_cost};
pub use driver::{TickOutcome, TickReport, TubePreviewDriver};
pub use dynamics::LinearDynamics;
pub use horizon::{LiftedDynamics, expand_horizon};
pub use preview::{LiftedPreview, PreviewControl, PreviewSolution};
pub use solver::{ClarabelSolver, QpProblem, QpSolver};
pub use traits::{LoopControl, PreviewSink, PreviewTargetSource};
pub use tube::{HrepTube, Tube, TubeBuilder};
pub use types::{CONTROL_DIM, POSITION_DIM, PointMassState, PreviewTargets, STATE_DIM};
