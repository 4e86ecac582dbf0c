//! Per-step control constraints over the preview horizon.
//!
//! Each step k contributes a block `C(k) u_k <= d(k)`. Up to and including
//! the switch step the first halfspace regime applies; after it, the second.
//! The blocks are stacked block-diagonally into `G U <= h`.

use nalgebra::{DMatrix, DVector};

/// A set of halfspaces `C u <= d`.
#[derive(Clone, Debug, PartialEq)]
pub struct Halfspaces {
    pub c: DMatrix<f64>,
    pub d: DVector<f64>,
}

impl Halfspaces {
    /// # Panics
    /// If `c` and `d` have different row counts.
    pub fn new(c: DMatrix<f64>, d: DVector<f64>) -> Self {
        assert_eq!(
            c.nrows(),
            d.len(),
            "halfspace matrix and vector row counts differ: {} vs {}",
            c.nrows(),
            d.len()
        );
        Self { c, d }
    }

    /// Axis-aligned box `lower <= u <= upper`.
    pub fn bounds(lower: &DVector<f64>, upper: &DVector<f64>) -> Self {
        assert_eq!(lower.len(), upper.len(), "bound vectors differ in length");
        let n = lower.len();
        let mut c = DMatrix::zeros(2 * n, n);
        let mut d = DVector::zeros(2 * n);
        for i in 0..n {
            c[(2 * i, i)] = 1.0;
            d[2 * i] = upper[i];
            c[(2 * i + 1, i)] = -1.0;
            d[2 * i + 1] = -lower[i];
        }
        Self { c, d }
    }

    pub fn n_rows(&self) -> usize {
        self.c.nrows()
    }

    /// Dimension of the vector the halfspaces act on.
    pub fn dim(&self) -> usize {
        self.c.ncols()
    }

    /// Whether `C u <= d + tol` holds.
    pub fn contains(&self, u: &DVector<f64>, tol: f64) -> bool {
        (&self.c * u - &self.d).iter().all(|&r| r <= tol)
    }
}

/// Which halfspace regime is active at a preview step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regime {
    /// Support region in effect up to and including the switch step.
    BeforeSwitch,
    /// Support region in effect after the switch step.
    AfterSwitch,
}

impl Regime {
    /// Regime of step `k`. The boundary is inclusive: `k == switch_step`
    /// still uses [`Regime::BeforeSwitch`].
    pub fn at_step(k: usize, switch_step: Option<usize>) -> Self {
        match switch_step {
            Some(s) if k > s => Self::AfterSwitch,
            _ => Self::BeforeSwitch,
        }
    }
}

/// Stacked inequality system `G U <= h`.
#[derive(Clone, Debug, PartialEq)]
pub struct InequalitySystem {
    pub g: DMatrix<f64>,
    pub h: DVector<f64>,
}

impl InequalitySystem {
    /// No rows over `n_vars` decision variables.
    pub fn unconstrained(n_vars: usize) -> Self {
        Self {
            g: DMatrix::zeros(0, n_vars),
            h: DVector::zeros(0),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.g.nrows()
    }

    pub fn n_vars(&self) -> usize {
        self.g.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.g.nrows() == 0
    }

    /// Largest `(G U - h)_i`, or 0 when every row is satisfied.
    pub fn max_violation(&self, u: &DVector<f64>) -> f64 {
        (&self.g * u - &self.h)
            .iter()
            .copied()
            .fold(0.0_f64, f64::max)
    }
}

/// Horizon index at which the regime changes.
///
/// `floor(switch_time / dt)`, or `None` when that falls outside
/// `[0, nb_steps - 1)`, in which case the whole horizon uses the first
/// regime.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss
)]
pub fn switch_step(switch_time: f64, dt: f64, nb_steps: usize) -> Option<usize> {
    let step = (switch_time / dt).floor();
    if !step.is_finite() || step < 0.0 || step >= nb_steps as f64 - 1.0 {
        return None;
    }
    Some(step as usize)
}

/// Block-diagonal stack of the given matrices.
pub fn block_diag(blocks: &[&DMatrix<f64>]) -> DMatrix<f64> {
    let rows = blocks.iter().map(|b| b.nrows()).sum();
    let cols = blocks.iter().map(|b| b.ncols()).sum();
    let mut out = DMatrix::zeros(rows, cols);
    let (mut r, mut c) = (0, 0);
    for block in blocks {
        out.view_mut((r, c), block.shape()).copy_from(*block);
        r += block.nrows();
        c += block.ncols();
    }
    out
}

/// Assemble `G U <= h` from the two regimes.
///
/// # Panics
/// If the two regimes act on vectors of different dimension.
pub fn assemble_constraints(
    before: &Halfspaces,
    after: &Halfspaces,
    switch_step: Option<usize>,
    nb_steps: usize,
) -> InequalitySystem {
    assert_eq!(
        before.dim(),
        after.dim(),
        "regimes must constrain the same control dimension"
    );

    let per_step: Vec<&Halfspaces> = (0..nb_steps)
        .map(|k| match Regime::at_step(k, switch_step) {
            Regime::BeforeSwitch => before,
            Regime::AfterSwitch => after,
        })
        .collect();

    let c_blocks: Vec<&DMatrix<f64>> = per_step.iter().map(|hs| &hs.c).collect();
    let g = block_diag(&c_blocks);

    let mut h = DVector::zeros(g.nrows());
    let mut row = 0;
    for hs in &per_step {
        h.rows_mut(row, hs.n_rows()).copy_from(&hs.d);
        row += hs.n_rows();
    }

    InequalitySystem { g, h }
}
