//! Integration test: drive the preview controller tick by tick.
//!
//! Wires the driver to scripted targets, box tubes, and either Clarabel or
//! a failing solver, and checks that:
//! 1. A feasible tick publishes exactly one plan inside the tube
//! 2. A missing tube skips the tick without stopping the loop
//! 3. A solver failure stops the loop once and keeps the previous plan
//! 4. Closed-loop playback moves the point mass toward the target

use approx::assert_relative_eq;
use comtube_core::{PreviewConfig, SolveError};
use comtube_mpc::{
    ClarabelSolver, PointMassState, PreviewBuffer, PreviewSink, PreviewTargets, TickOutcome,
    TubePreviewDriver,
};
use comtube_test_utils::{
    BoxTubes, FailingSolver, FailingTubes, RecordingSink, ScriptedTargets, StopCounter,
};
use nalgebra::{DVector, Vector3};

/// Control loop period (s).
const LOOP_DT: f64 = 0.02;

fn start() -> PointMassState {
    PointMassState::at_rest(Vector3::new(0.0, 0.0, 0.8))
}

fn target() -> Vector3<f64> {
    Vector3::new(0.1, 0.05, 0.8)
}

#[test]
fn feasible_tick_publishes_plan_inside_tube() {
    let mut driver = TubePreviewDriver::new(
        PreviewConfig::default(),
        ScriptedTargets::constant(target(), 1.0, 0.45),
        BoxTubes::new(0.5, 2.0),
        ClarabelSolver::default(),
        RecordingSink::default(),
    )
    .unwrap();
    let mut stop = StopCounter::default();

    let outcome = driver.on_tick(&start(), &mut stop);
    assert!(outcome.is_published());
    assert_eq!(driver.sink().len(), 1);
    assert!(!stop.stopped());

    let plan = driver.sink().last().unwrap();
    assert_eq!(plan.controls().len(), 3 * driver.config().nb_steps);
    for k in 0..plan.nb_steps() {
        let limit = if k <= 4 { 0.5 } else { 2.0 };
        assert!(plan.control(k).amax() <= limit + 1e-6, "step {k} leaves the tube");
    }
}

#[test]
fn missing_tube_skips_tick() {
    let mut driver = TubePreviewDriver::new(
        PreviewConfig::default(),
        ScriptedTargets::constant(target(), 1.0, 0.45),
        FailingTubes::default(),
        FailingSolver::infeasible(),
        RecordingSink::default(),
    )
    .unwrap();
    let mut stop = StopCounter::default();

    for _ in 0..3 {
        let outcome = driver.on_tick(&start(), &mut stop);
        assert!(matches!(outcome, TickOutcome::Skipped(_)));
    }
    assert!(driver.sink().is_empty());
    assert!(!stop.stopped());
}

#[test]
fn solver_failure_stops_loop_once_and_keeps_previous_plan() {
    let mut driver = TubePreviewDriver::new(
        PreviewConfig::default(),
        ScriptedTargets::constant(target(), 1.0, 0.45),
        BoxTubes::uniform(2.0),
        FailingSolver::infeasible(),
        PreviewBuffer::new(),
    )
    .unwrap();

    // Seed the sink with a plan solved elsewhere.
    let mut seeding = TubePreviewDriver::new(
        PreviewConfig::default(),
        ScriptedTargets::constant(target(), 1.0, 0.45),
        BoxTubes::uniform(2.0),
        ClarabelSolver::default(),
        PreviewBuffer::new(),
    )
    .unwrap();
    assert!(seeding.on_tick(&start(), &mut StopCounter::default()).is_published());
    let previous = seeding.sink().latest().unwrap().clone();
    driver.sink_mut().update_preview(previous.clone());

    let mut stop = StopCounter::default();
    let outcome = driver.on_tick(&start(), &mut stop);

    assert!(matches!(
        outcome,
        TickOutcome::Stopped(SolveError::PrimalInfeasible)
    ));
    assert_eq!(stop.stops, 1);
    assert_eq!(stop.last_reason, Some(SolveError::PrimalInfeasible));
    assert_eq!(driver.sink().updates(), 1);
    assert_eq!(
        driver.sink().latest().unwrap().controls(),
        previous.controls()
    );
}

#[test]
fn closed_loop_playback_approaches_target() {
    let phase = |phase_id, switch_time| PreviewTargets {
        switch_time,
        horizon: 1.0,
        target: PointMassState::at_rest(target()),
        phase_id,
    };
    let mut driver = TubePreviewDriver::new(
        PreviewConfig::default(),
        ScriptedTargets::new(vec![phase(0, 0.45), phase(1, 0.25)]),
        BoxTubes::uniform(3.0),
        ClarabelSolver::default(),
        PreviewBuffer::new(),
    )
    .unwrap();
    let mut stop = StopCounter::default();
    let mut com = start();
    let initial = (target() - com.position).norm();

    let mut switches = 0;
    for tick in 0..25 {
        if tick == 10 {
            driver.targets_mut().advance();
        }
        match driver.on_tick(&com, &mut stop) {
            TickOutcome::Published(report) => switches += usize::from(report.phase_switched),
            other => panic!("tick {tick} failed: {other:?}"),
        }
        let next = driver.sink().state_at(LOOP_DT).unwrap();
        com = PointMassState::from_state_vector(&next);
    }

    assert_eq!(switches, 2);
    assert_eq!(driver.sink().updates(), 25);
    assert!(!stop.stopped());
    assert!((target() - com.position).norm() < initial);
}

#[test]
fn constrained_and_unconstrained_paths_agree_when_inactive() {
    use comtube_mpc::{
        Halfspaces, HrepTube, InequalitySystem, LinearDynamics, PreviewControl, Tube, switch_step,
        tube_constraints,
    };

    let dynamics = LinearDynamics::point_mass(0.1).unwrap();
    let x_init = start().to_state_vector();
    let x_goal = PointMassState::at_rest(target()).to_state_vector();
    let weights = PreviewConfig::default().weights;

    let free = PreviewControl::new(
        dynamics.clone(),
        InequalitySystem::unconstrained(30),
        x_init.clone(),
        x_goal.clone(),
        10,
        0.1,
    )
    .compute_dynamics()
    .compute_control(&ClarabelSolver::default(), &weights)
    .unwrap();

    let wide = HrepTube::single(Halfspaces::bounds(
        &DVector::from_element(3, -100.0),
        &DVector::from_element(3, 100.0),
    ));
    assert!(wide.full_hrep().is_none());
    let boxed = PreviewControl::new(
        dynamics,
        tube_constraints(&wide, switch_step(0.5, 0.1, 10), 10),
        x_init,
        x_goal,
        10,
        0.1,
    )
    .compute_dynamics()
    .compute_control(&ClarabelSolver::default(), &weights)
    .unwrap();

    assert_relative_eq!(free.controls(), boxed.controls(), epsilon = 1e-4);
}
