//! QP solver boundary.
//!
//! The preview controller only fixes the problem shape:
//!
//! ```text
//! minimize    1/2 U^T P U + q^T U
//! subject to  G U <= h
//! ```
//!
//! [`ClarabelSolver`] solves it with Clarabel (pure Rust interior-point
//! solver). Clarabel's `A z + s = b, s >= 0` form is exactly `G U <= h`
//! with a single nonnegative cone. Problems without inequality rows skip
//! the interior-point method and solve `P U = -q` by Cholesky.

use clarabel::algebra::CscMatrix;
use clarabel::solver::{
    DefaultSettingsBuilder, DefaultSolver, IPSolver, SolverStatus, SupportedConeT::NonnegativeConeT,
};
use comtube_core::{SolveError, SolverSettings};
use nalgebra::{DMatrix, DVector};

use crate::constraints::InequalitySystem;
use crate::cost::QuadraticCost;

/// Entries below this magnitude are dropped when building sparse matrices.
const SPARSITY_EPS: f64 = 1e-15;

/// Stacked QP matrices for one preview solve.
#[derive(Clone, Debug, PartialEq)]
pub struct QpProblem {
    /// Symmetric cost Hessian.
    pub p: DMatrix<f64>,
    /// Cost linear term.
    pub q: DVector<f64>,
    /// Inequality matrix.
    pub g: DMatrix<f64>,
    /// Inequality bounds.
    pub h: DVector<f64>,
}

impl QpProblem {
    /// # Panics
    /// If the cost and constraints disagree on the number of variables.
    pub fn new(cost: QuadraticCost, constraints: InequalitySystem) -> Self {
        let n = cost.n_vars();
        assert_eq!(cost.p.shape(), (n, n), "P must be {n}x{n}");
        assert_eq!(
            constraints.n_vars(),
            n,
            "G has {} columns but the cost has {n} variables",
            constraints.n_vars()
        );
        Self {
            p: cost.p,
            q: cost.q,
            g: constraints.g,
            h: constraints.h,
        }
    }

    pub fn n_vars(&self) -> usize {
        self.q.len()
    }

    pub fn n_ineq(&self) -> usize {
        self.h.len()
    }
}

/// Anything that can solve a [`QpProblem`].
pub trait QpSolver {
    /// Return the minimizer `U`, or why none could be found.
    fn solve_qp(&self, problem: &QpProblem) -> Result<DVector<f64>, SolveError>;
}

/// Clarabel-backed QP solver.
#[derive(Clone, Debug, Default)]
pub struct ClarabelSolver {
    settings: SolverSettings,
}

impl ClarabelSolver {
    pub const fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub const fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    fn solve_unconstrained(problem: &QpProblem) -> Result<DVector<f64>, SolveError> {
        let chol = problem.p.clone().cholesky().ok_or(SolveError::Singular)?;
        Ok(chol.solve(&(-&problem.q)))
    }

    fn solve_interior_point(&self, problem: &QpProblem) -> Result<DVector<f64>, SolveError> {
        let p_csc = dmatrix_to_csc_upper_tri(&problem.p);
        let g_csc = dmatrix_to_csc(&problem.g);
        let cones = [NonnegativeConeT(problem.n_ineq())];

        let settings = DefaultSettingsBuilder::default()
            .max_iter(self.settings.max_iter)
            .verbose(self.settings.verbose)
            .tol_gap_abs(self.settings.tol_gap_abs)
            .tol_gap_rel(self.settings.tol_gap_rel)
            .tol_feas(self.settings.tol_feas)
            .build()
            .map_err(|e| SolveError::Setup(e.to_string()))?;

        let mut solver = DefaultSolver::new(
            &p_csc,
            problem.q.as_slice(),
            &g_csc,
            problem.h.as_slice(),
            &cones,
            settings,
        )
        .map_err(|e| SolveError::Setup(format!("{e:?}")))?;

        solver.solve();
        let sol = &solver.solution;
        match sol.status {
            SolverStatus::Solved | SolverStatus::AlmostSolved => {
                Ok(DVector::from_column_slice(&sol.x))
            }
            SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
                Err(SolveError::PrimalInfeasible)
            }
            SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
                Err(SolveError::DualInfeasible)
            }
            status => Err(SolveError::NotConverged {
                status: format!("{status:?}"),
            }),
        }
    }
}

impl QpSolver for ClarabelSolver {
    fn solve_qp(&self, problem: &QpProblem) -> Result<DVector<f64>, SolveError> {
        if problem.n_ineq() == 0 {
            Self::solve_unconstrained(problem)
        } else {
            self.solve_interior_point(problem)
        }
    }
}

/// Convert a nalgebra `DMatrix<f64>` to a Clarabel `CscMatrix<f64>` (full matrix).
fn dmatrix_to_csc(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..nrows {
            let v = m[(i, j)];
            if v.abs() > SPARSITY_EPS {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}

/// Convert a symmetric nalgebra `DMatrix<f64>` to upper-triangular `CscMatrix<f64>`.
fn dmatrix_to_csc_upper_tri(m: &DMatrix<f64>) -> CscMatrix<f64> {
    let (nrows, ncols) = m.shape();
    let mut colptr = vec![0usize; ncols + 1];
    let mut rowval = Vec::new();
    let mut nzval = Vec::new();

    for j in 0..ncols {
        for i in 0..=j.min(nrows.saturating_sub(1)) {
            let v = m[(i, j)];
            if v.abs() > SPARSITY_EPS {
                rowval.push(i);
                nzval.push(v);
            }
        }
        colptr[j + 1] = rowval.len();
    }

    CscMatrix::new(nrows, ncols, colptr, rowval, nzval)
}
