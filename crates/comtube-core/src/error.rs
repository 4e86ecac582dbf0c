use thiserror::Error;

/// Top-level error type for comtube.
#[derive(Debug, Error)]
pub enum ComtubeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tube error: {0}")]
    Tube(#[from] TubeError),

    #[error("Solve error: {0}")]
    Solve(#[from] SolveError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid timestep: {0} (must be > 0)")]
    InvalidTimestep(f64),

    #[error("nb_steps must be >= 1")]
    ZeroSteps,

    #[error("Invalid weight for {term}: {value} (must be finite and >= 0)")]
    InvalidWeight { term: &'static str, value: f64 },

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

/// No tube connects the current position to the target under the given
/// stances and radius.
///
/// Recoverable: the driver skips the tick and tries again on the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no feasible tube: {reason}")]
pub struct TubeError {
    pub reason: String,
}

impl TubeError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// The QP solver could not produce an optimal control sequence.
///
/// Fatal for the current run: the driver asks the enclosing loop to stop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("QP is primal infeasible (inconsistent constraints)")]
    PrimalInfeasible,

    #[error("QP is dual infeasible (unbounded cost)")]
    DualInfeasible,

    #[error("QP solver did not converge: {status}")]
    NotConverged { status: String },

    #[error("QP setup failed: {0}")]
    Setup(String),

    #[error("QP cost matrix is not positive definite")]
    Singular,
}
