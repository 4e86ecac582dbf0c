//! Real-time tube preview driver.
//!
//! Called once per control tick by an external fixed-rate loop. Each call
//! re-plans the whole horizon from scratch:
//!
//! 1. read the preview targets from the stance scheduler
//! 2. build a tube from the current to the target position
//! 3. build the point-mass preview problem inside that tube
//! 4. expand the dynamics, synthesize the cost, solve the QP
//! 5. publish the solution, or abort the tick
//!
//! A missing tube skips the tick. A QP failure asks the loop to stop. In
//! both cases the previously published plan stays untouched.

use comtube_core::{ConfigError, PreviewConfig, SolveError, TubeError};
use tracing::{debug, error, info, warn};

use crate::com::ComPreviewControl;
use crate::solver::QpSolver;
use crate::traits::{LoopControl, PreviewSink, PreviewTargetSource};
use crate::tube::TubeBuilder;
use crate::types::PointMassState;

/// Result of one tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// A new plan was handed to the sink.
    Published(TickReport),
    /// No tube connects the current and target positions; nothing published.
    Skipped(TubeError),
    /// The scheduler's horizon gives no positive timestep; nothing published.
    InvalidTargets(ConfigError),
    /// The QP could not be solved; the loop was asked to stop.
    Stopped(SolveError),
}

impl TickOutcome {
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published(_))
    }
}

/// Summary of a published tick.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Whether the scheduler phase changed since the previous tick.
    pub phase_switched: bool,
    pub switch_step: Option<usize>,
    pub timestep: f64,
    pub solve_time_us: u64,
}

/// Receding-horizon driver over its four collaborators.
pub struct TubePreviewDriver<F, B, Q, P> {
    config: PreviewConfig,
    targets: F,
    tubes: B,
    solver: Q,
    sink: P,
    /// Phase id of the last published tick, `None` before the first one.
    last_phase_id: Option<usize>,
}

impl<F, B, Q, P> TubePreviewDriver<F, B, Q, P>
where
    F: PreviewTargetSource,
    B: TubeBuilder<F::Stance>,
    Q: QpSolver,
    P: PreviewSink,
{
    /// Create a driver. Rejects invalid configuration.
    pub fn new(
        config: PreviewConfig,
        targets: F,
        tubes: B,
        solver: Q,
        sink: P,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            targets,
            tubes,
            solver,
            sink,
            last_phase_id: None,
        })
    }

    pub const fn config(&self) -> &PreviewConfig {
        &self.config
    }

    pub const fn sink(&self) -> &P {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut P {
        &mut self.sink
    }

    pub fn targets_mut(&mut self) -> &mut F {
        &mut self.targets
    }

    pub const fn last_phase_id(&self) -> Option<usize> {
        self.last_phase_id
    }

    /// Run one control tick from the current point-mass state.
    pub fn on_tick<L: LoopControl + ?Sized>(
        &mut self,
        com: &PointMassState,
        loop_control: &mut L,
    ) -> TickOutcome {
        let targets = self.targets.preview_targets();
        let timestep = match self.config.timestep(targets.horizon) {
            Ok(dt) => dt,
            Err(e) => {
                warn!(error = %e, "skipping tick: invalid preview horizon");
                return TickOutcome::InvalidTargets(e);
            }
        };
        debug!(
            cur_speed = com.velocity.norm(),
            target_speed = targets.target.velocity.norm(),
            horizon = targets.horizon,
            switch_time = targets.switch_time,
            timestep,
            "preview tick"
        );

        // Compared against the last published phase, so a switch that lands
        // on a skipped tick is still reported by the next published one.
        let phase_switched = self
            .last_phase_id
            .is_none_or(|last| last != targets.phase_id);

        let tube = match self.tubes.build_tube(
            &com.position,
            &targets.target.position,
            self.targets.cur_stance(),
            self.targets.next_stance(),
            self.config.tube_radius,
        ) {
            Ok(tube) => tube,
            Err(e) => {
                warn!(error = %e, "skipping tick: tube computation failed");
                return TickOutcome::Skipped(e);
            }
        };

        let com_preview = match ComPreviewControl::with_timestep(
            com,
            &targets.target,
            &tube,
            timestep,
            targets.switch_time,
            self.config.nb_steps,
        ) {
            Ok(preview) => preview,
            Err(e) => {
                warn!(error = %e, "skipping tick: invalid preview horizon");
                return TickOutcome::InvalidTargets(e);
            }
        };
        let switch_step = com_preview.switch_step;

        let lifted = com_preview.preview.compute_dynamics();
        match lifted.compute_control(&self.solver, &self.config.weights) {
            Ok(solution) => {
                let report = TickReport {
                    phase_switched,
                    switch_step,
                    timestep: solution.timestep(),
                    solve_time_us: solution.solve_time_us(),
                };
                self.sink.update_preview(solution);
                if phase_switched {
                    info!(phase_id = targets.phase_id, "preview phase switched");
                }
                self.last_phase_id = Some(targets.phase_id);
                TickOutcome::Published(report)
            }
            Err(e) => {
                error!(error = %e, "couldn't solve preview QP, stopping control loop");
                loop_control.request_stop(&e);
                TickOutcome::Stopped(e)
            }
        }
    }
}
