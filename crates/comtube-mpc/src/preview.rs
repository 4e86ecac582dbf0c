//! Preview control for a system with linear dynamics.
//!
//! ```text
//! x_{k+1} = A x_k + B u_k,     x_0 = x_init,     G U <= h
//! ```
//!
//! An instance lives for one control tick and moves through three states,
//! each its own type so a stage cannot be skipped:
//!
//! 1. [`PreviewControl`]: problem data, dynamics not yet expanded.
//! 2. [`LiftedPreview`]: `phi_last`/`psi_last` computed.
//! 3. [`PreviewSolution`]: control sequence `U` solved.

use std::time::Instant;

use comtube_core::{CostWeights, SolveError};
use nalgebra::{DMatrix, DVector, DVectorView};
use tracing::debug;

use crate::constraints::InequalitySystem;
use crate::cost::{QuadraticCost, weighted_cost};
use crate::dynamics::LinearDynamics;
use crate::horizon::{LiftedDynamics, expand_horizon};
use crate::solver::{QpProblem, QpSolver};

/// Preview problem before the horizon expansion.
#[derive(Clone, Debug)]
pub struct PreviewControl {
    dynamics: LinearDynamics,
    constraints: InequalitySystem,
    x_init: DVector<f64>,
    x_goal: DVector<f64>,
    nb_steps: usize,
    timestep: f64,
    created: Instant,
}

impl PreviewControl {
    /// # Panics
    /// On a zero step count or any dimension mismatch between the
    /// dynamics, the states, and the constraint columns.
    pub fn new(
        dynamics: LinearDynamics,
        constraints: InequalitySystem,
        x_init: DVector<f64>,
        x_goal: DVector<f64>,
        nb_steps: usize,
        timestep: f64,
    ) -> Self {
        assert!(nb_steps > 0, "preview horizon needs at least one step");
        let x_dim = dynamics.state_dim();
        assert_eq!(x_init.len(), x_dim, "x_init has wrong dimension");
        assert_eq!(x_goal.len(), x_dim, "x_goal has wrong dimension");
        assert_eq!(
            constraints.n_vars(),
            dynamics.control_dim() * nb_steps,
            "G must have one column per stacked control entry"
        );
        Self {
            dynamics,
            constraints,
            x_init,
            x_goal,
            nb_steps,
            timestep,
            created: Instant::now(),
        }
    }

    pub const fn nb_steps(&self) -> usize {
        self.nb_steps
    }

    pub const fn timestep(&self) -> f64 {
        self.timestep
    }

    pub const fn constraints(&self) -> &InequalitySystem {
        &self.constraints
    }

    pub const fn x_init(&self) -> &DVector<f64> {
        &self.x_init
    }

    pub const fn x_goal(&self) -> &DVector<f64> {
        &self.x_goal
    }

    /// Dimension of the stacked control vector `U`.
    pub fn u_stacked_dim(&self) -> usize {
        self.dynamics.control_dim() * self.nb_steps
    }

    /// Expand the dynamics over the horizon.
    pub fn compute_dynamics(self) -> LiftedPreview {
        let lifted = expand_horizon(&self.dynamics, self.nb_steps);
        LiftedPreview {
            problem: self,
            lifted,
        }
    }
}

/// Preview problem with its lifted dynamics.
#[derive(Clone, Debug)]
pub struct LiftedPreview {
    problem: PreviewControl,
    lifted: LiftedDynamics,
}

impl LiftedPreview {
    pub const fn lifted(&self) -> &LiftedDynamics {
        &self.lifted
    }

    pub const fn problem(&self) -> &PreviewControl {
        &self.problem
    }

    /// Weighted effort + terminal tracking cost.
    pub fn cost(&self, weights: &CostWeights) -> QuadraticCost {
        weighted_cost(
            &self.lifted,
            &self.problem.x_init,
            &self.problem.x_goal,
            weights,
        )
    }

    /// Full QP handed to the solver.
    pub fn qp(&self, weights: &CostWeights) -> QpProblem {
        QpProblem::new(self.cost(weights), self.problem.constraints.clone())
    }

    /// Solve for the control sequence.
    ///
    /// Consumes the instance: on failure there is nothing left to publish.
    pub fn compute_control<S: QpSolver + ?Sized>(
        self,
        solver: &S,
        weights: &CostWeights,
    ) -> Result<PreviewSolution, SolveError> {
        let qp = self.qp(weights);
        let build_time_us = elapsed_us(self.problem.created);

        let start = Instant::now();
        let controls = solver.solve_qp(&qp)?;
        let solve_time_us = elapsed_us(start);
        assert_eq!(
            controls.len(),
            qp.n_vars(),
            "solver returned {} entries for {} variables",
            controls.len(),
            qp.n_vars()
        );

        debug!(
            build_time_us,
            solve_time_us,
            total_time_us = elapsed_us(self.problem.created),
            "solved preview QP"
        );

        let PreviewControl {
            dynamics,
            x_init,
            x_goal,
            nb_steps,
            timestep,
            ..
        } = self.problem;

        Ok(PreviewSolution {
            dynamics,
            lifted: self.lifted,
            x_init,
            x_goal,
            controls,
            nb_steps,
            timestep,
            build_time_us,
            solve_time_us,
        })
    }
}

/// Solved preview: what the driver publishes downstream.
#[derive(Clone, Debug)]
pub struct PreviewSolution {
    dynamics: LinearDynamics,
    lifted: LiftedDynamics,
    x_init: DVector<f64>,
    x_goal: DVector<f64>,
    controls: DVector<f64>,
    nb_steps: usize,
    timestep: f64,
    build_time_us: u64,
    solve_time_us: u64,
}

impl PreviewSolution {
    pub const fn phi_last(&self) -> &DMatrix<f64> {
        &self.lifted.phi_last
    }

    pub const fn psi_last(&self) -> &DMatrix<f64> {
        &self.lifted.psi_last
    }

    /// Stacked control sequence `U = [u_0, ..., u_{N-1}]`.
    pub const fn controls(&self) -> &DVector<f64> {
        &self.controls
    }

    pub const fn x_init(&self) -> &DVector<f64> {
        &self.x_init
    }

    pub const fn x_goal(&self) -> &DVector<f64> {
        &self.x_goal
    }

    pub const fn dynamics(&self) -> &LinearDynamics {
        &self.dynamics
    }

    pub const fn nb_steps(&self) -> usize {
        self.nb_steps
    }

    pub const fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Preview duration covered by the plan (s).
    #[allow(clippy::cast_precision_loss)]
    pub fn duration(&self) -> f64 {
        self.timestep * self.nb_steps as f64
    }

    /// Time from instance creation to the solver call, in microseconds.
    pub const fn build_time_us(&self) -> u64 {
        self.build_time_us
    }

    /// QP solve time in microseconds.
    pub const fn solve_time_us(&self) -> u64 {
        self.solve_time_us
    }

    /// Control `u_k`.
    ///
    /// # Panics
    /// If `k >= nb_steps`.
    pub fn control(&self, k: usize) -> DVectorView<'_, f64> {
        assert!(k < self.nb_steps, "step {k} outside horizon of {}", self.nb_steps);
        let u_dim = self.dynamics.control_dim();
        self.controls.rows(k * u_dim, u_dim)
    }

    /// `x_N = phi_last x_init + psi_last U`.
    pub fn terminal_state(&self) -> DVector<f64> {
        self.lifted.terminal_state(&self.x_init, &self.controls)
    }

    /// `|x_N - x_goal|`.
    pub fn terminal_error(&self) -> f64 {
        (self.terminal_state() - &self.x_goal).norm()
    }

    /// Position part of the terminal residual, for states laid out as
    /// `[p, pd]` with equal halves.
    pub fn terminal_position_error(&self) -> f64 {
        let half = self.x_init.len() / 2;
        (self.terminal_state() - &self.x_goal).rows(0, half).norm()
    }

    /// Velocity part of the terminal residual, for `[p, pd]` states.
    pub fn terminal_velocity_error(&self) -> f64 {
        let half = self.x_init.len() / 2;
        (self.terminal_state() - &self.x_goal)
            .rows(half, self.x_init.len() - half)
            .norm()
    }

    /// States `x_0, ..., x_N` obtained by applying `U` step by step.
    pub fn state_trajectory(&self) -> Vec<DVector<f64>> {
        let mut states = Vec::with_capacity(self.nb_steps + 1);
        let mut x = self.x_init.clone();
        states.push(x.clone());
        for k in 0..self.nb_steps {
            x = self.dynamics.step(&x, &self.control(k).clone_owned());
            states.push(x.clone());
        }
        states
    }
}

fn elapsed_us(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}
