use log::info;

use crate::{
    aggregator::aggregate,
    config::ContactParams,
    datatypes::{AnalysisResult, StepPlan, StepResult},
    error::AsperityError,
    planner,
    post_processor::RESULT_SNAPSHOT,
    runner::{self, join_path, ProgressRecorder},
    solver::ContactSolver,
    storage::ArtifactStore,
    topography::Topography,
    validator,
};

/// An analysis that can be run against a topography
///
/// Implementations bundle the compatibility check, the step planning and the
/// execution of single steps. [`run_analysis`] sequences them.
pub trait Workflow: Sync {
    /// Identifier the workflow is registered under
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn check_compatibility(&self, topography: &dyn Topography) -> Result<(), AsperityError>;

    fn plan(
        &self,
        topography: &dyn Topography,
        params: &ContactParams,
        solver: &dyn ContactSolver,
    ) -> Result<StepPlan, AsperityError>;

    #[allow(clippy::too_many_arguments)]
    fn run_step(
        &self,
        topography: &dyn Topography,
        index: usize,
        pressure: f64,
        params: &ContactParams,
        solver: &dyn ContactSolver,
        store: &dyn ArtifactStore,
        folder: &str,
    ) -> Result<StepResult, AsperityError>;
}

/// Contact of a rigid flat with the topography, solved at a series of applied pressures
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryElementMethod;

impl Workflow for BoundaryElementMethod {
    fn id(&self) -> &'static str {
        "contact-mechanics"
    }

    fn display_name(&self) -> &'static str {
        "Contact mechanics"
    }

    fn check_compatibility(&self, topography: &dyn Topography) -> Result<(), AsperityError> {
        validator::check_compatibility(topography)
    }

    fn plan(
        &self,
        topography: &dyn Topography,
        params: &ContactParams,
        solver: &dyn ContactSolver,
    ) -> Result<StepPlan, AsperityError> {
        planner::plan(
            params.substrate,
            params.nsteps,
            params.explicit_pressures(),
            solver.pressure_bounds(topography, params.hardness),
        )
    }

    fn run_step(
        &self,
        topography: &dyn Topography,
        index: usize,
        pressure: f64,
        params: &ContactParams,
        solver: &dyn ContactSolver,
        store: &dyn ArtifactStore,
        folder: &str,
    ) -> Result<StepResult, AsperityError> {
        runner::run_step(topography, index, pressure, params, solver, store, folder)
    }
}

/// All registered workflows
pub static WORKFLOWS: &[&dyn Workflow] = &[&BoundaryElementMethod];

/// Finds a registered workflow by identifier
pub fn lookup(id: &str) -> Option<&'static dyn Workflow> {
    WORKFLOWS.iter().copied().find(|w| w.id() == id)
}

/// Runs a complete analysis and stores its result snapshot
///
/// Steps run one after another in plan order. A solver failure in any step
/// fails the whole run; artifacts of earlier steps stay in storage.
///
/// # Arguments
/// * `workflow` - The workflow to run
/// * `topography` - The topography to analyze
/// * `params` - Run parameters
/// * `solver` - The contact solver
/// * `store` - Storage for step artifacts and the result snapshot
/// * `folder` - Storage folder of this run
/// * `progress` - Receives progress after each step
///
/// # Returns
/// The frozen AnalysisResult of the run
pub fn run_analysis(
    workflow: &dyn Workflow,
    topography: &dyn Topography,
    params: &ContactParams,
    solver: &dyn ContactSolver,
    store: &dyn ArtifactStore,
    folder: &str,
    progress: &dyn ProgressRecorder,
) -> Result<AnalysisResult, AsperityError> {
    params.validate()?;
    workflow.check_compatibility(topography)?;

    let plan = workflow.plan(topography, params, solver)?;
    info!(
        "running {} on '{}' with {} steps",
        workflow.display_name(),
        topography.name(),
        plan.len()
    );

    let start = std::time::Instant::now();
    let mut steps = Vec::with_capacity(plan.len());
    for (index, pressure) in plan.steps() {
        steps.push(workflow.run_step(
            topography, index, pressure, params, solver, store, folder,
        )?);
        progress.set_progress(index + 1, plan.len());
    }
    info!(
        "solved {} steps in {:.3} seconds",
        steps.len(),
        start.elapsed().as_secs_f32()
    );

    let result = aggregate(plan, steps, topography, params);

    store.write(&join_path(folder, RESULT_SNAPSHOT), &result.to_json()?)?;

    Ok(result)
}
