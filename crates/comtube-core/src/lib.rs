// comtube-core: configuration and error types shared by the comtube crates.

pub mod config;
pub mod error;

pub use config::{CostWeights, PreviewConfig, SolverSettings};
pub use error::{ComtubeError, ConfigError, SolveError, TubeError};
