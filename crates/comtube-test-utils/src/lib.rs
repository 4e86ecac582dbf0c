//! Shared test fixtures and utilities for comtube crates.
//!
//! Provides deterministic RNG setup, random linear systems, and mock
//! collaborators for the preview driver (target sources, tube builders,
//! solvers, sinks, and loop handles).

pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use mocks::{
    BoxTubes, FailingSolver, FailingTubes, RecordingSink, ScriptedTargets, StopCounter,
};
pub use rng::{random_dynamics, random_matrix, seeded_rng};
