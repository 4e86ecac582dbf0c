use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_nb_steps() -> usize {
    10
}
const fn default_tube_radius() -> f64 {
    0.015
}
const fn default_effort_weight() -> f64 {
    1.0
}
const fn default_tracking_weight() -> f64 {
    1000.0
}
const fn default_max_iter() -> u32 {
    100
}
const fn default_tolerance() -> f64 {
    1e-7
}

// ---------------------------------------------------------------------------
// CostWeights
// ---------------------------------------------------------------------------

/// Weights of the two quadratic cost terms.
///
/// The terms are summed, not prioritized: raising `tracking` relative to
/// `effort` buys terminal accuracy with larger accelerations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostWeights {
    /// Weight on `sum_k |u_k|^2`.
    #[serde(default = "default_effort_weight")]
    pub effort: f64,

    /// Weight on `|x_N - x_goal|^2`.
    #[serde(default = "default_tracking_weight")]
    pub tracking: f64,
}

impl Default for CostWeights {
    fn default() -> Self {
        Self {
            effort: default_effort_weight(),
            tracking: default_tracking_weight(),
        }
    }
}

impl CostWeights {
    pub const fn new(effort: f64, tracking: f64) -> Self {
        Self { effort, tracking }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (term, value) in [("effort", self.effort), ("tracking", self.tracking)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight { term, value });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// SolverSettings
// ---------------------------------------------------------------------------

/// Interior-point solver settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverSettings {
    /// Maximum QP solver iterations.
    #[serde(default = "default_max_iter")]
    pub max_iter: u32,

    #[serde(default = "default_tolerance")]
    pub tol_gap_abs: f64,

    #[serde(default = "default_tolerance")]
    pub tol_gap_rel: f64,

    #[serde(default = "default_tolerance")]
    pub tol_feas: f64,

    /// Print the solver's iteration log.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_iter: default_max_iter(),
            tol_gap_abs: default_tolerance(),
            tol_gap_rel: default_tolerance(),
            tol_feas: default_tolerance(),
            verbose: false,
        }
    }
}

// ---------------------------------------------------------------------------
// PreviewConfig
// ---------------------------------------------------------------------------

/// Configuration of the receding-horizon preview controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Number of discretization steps over the preview horizon.
    #[serde(default = "default_nb_steps")]
    pub nb_steps: usize,

    /// Tube radius, in L1 norm (meters).
    #[serde(default = "default_tube_radius")]
    pub tube_radius: f64,

    #[serde(default)]
    pub weights: CostWeights,

    #[serde(default)]
    pub solver: SolverSettings,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            nb_steps: default_nb_steps(),
            tube_radius: default_tube_radius(),
            weights: CostWeights::default(),
            solver: SolverSettings::default(),
        }
    }
}

impl PreviewConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nb_steps == 0 {
            return Err(ConfigError::ZeroSteps);
        }
        if !(self.tube_radius.is_finite() && self.tube_radius > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "tube_radius".into(),
                message: format!("{} (must be > 0)", self.tube_radius),
            });
        }
        self.weights.validate()?;
        if self.weights.effort == 0.0 && self.weights.tracking == 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "weights".into(),
                message: "at least one cost weight must be positive".into(),
            });
        }
        if self.solver.max_iter == 0 {
            return Err(ConfigError::InvalidValue {
                field: "solver.max_iter".into(),
                message: "must be >= 1".into(),
            });
        }
        Ok(())
    }

    /// Timestep of one preview step for a horizon of `duration` seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn timestep(&self, duration: f64) -> Result<f64, ConfigError> {
        let dt = duration / self.nb_steps as f64;
        if dt.is_finite() && dt > 0.0 {
            Ok(dt)
        } else {
            Err(ConfigError::InvalidTimestep(dt))
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
