//! Tubes: per-regime control halfspaces connecting two support regions.
//!
//! A tube is computed by an external geometry provider from the current
//! and target positions, the current and next stances, and a radius. The
//! controller reads its dual halfspace representations, one per
//! [`Regime`], as constraints on the acceleration at each preview step.

use comtube_core::TubeError;
use nalgebra::Vector3;

use crate::constraints::{Halfspaces, Regime};

/// Halfspace description of a tube.
pub trait Tube {
    /// Control-space halfspaces `C u <= d` for a regime.
    fn dual_hrep(&self, regime: Regime) -> &Halfspaces;

    /// Position-space halfspaces `E p <= f` of the whole tube.
    ///
    /// Exposed for providers that compute it; the constraint assembler does
    /// not consume it.
    fn full_hrep(&self) -> Option<&Halfspaces> {
        None
    }
}

/// Builds a tube between two positions for a pair of stances.
pub trait TubeBuilder<S> {
    type Tube: Tube;

    /// Build the tube, or report that no feasible tube exists.
    fn build_tube(
        &mut self,
        start: &Vector3<f64>,
        target: &Vector3<f64>,
        cur_stance: &S,
        next_stance: &S,
        radius: f64,
    ) -> Result<Self::Tube, TubeError>;
}

/// A tube given directly by its halfspace representations.
#[derive(Clone, Debug, PartialEq)]
pub struct HrepTube {
    before_switch: Halfspaces,
    after_switch: Halfspaces,
    full: Option<Halfspaces>,
}

impl HrepTube {
    /// # Panics
    /// If the two regimes constrain vectors of different dimension.
    pub fn new(before_switch: Halfspaces, after_switch: Halfspaces) -> Self {
        assert_eq!(
            before_switch.dim(),
            after_switch.dim(),
            "tube regimes must constrain the same control dimension"
        );
        Self {
            before_switch,
            after_switch,
            full: None,
        }
    }

    /// Tube with a single regime over the whole horizon.
    pub fn single(halfspaces: Halfspaces) -> Self {
        Self::new(halfspaces.clone(), halfspaces)
    }

    /// Attach the position-space representation.
    #[must_use]
    pub fn with_full_hrep(mut self, full: Halfspaces) -> Self {
        self.full = Some(full);
        self
    }
}

impl Tube for HrepTube {
    fn dual_hrep(&self, regime: Regime) -> &Halfspaces {
        match regime {
            Regime::BeforeSwitch => &self.before_switch,
            Regime::AfterSwitch => &self.after_switch,
        }
    }

    fn full_hrep(&self) -> Option<&Halfspaces> {
        self.full.as_ref()
    }
}
