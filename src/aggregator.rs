use crate::{
    config::ContactParams,
    datatypes::{Alert, AnalysisResult, EffectiveKwargs, Severity, StepPlan, StepResult},
    topography::Topography,
};

/// Display name of contact-mechanics results
pub const RESULT_NAME: &str = "Contact mechanics";

/// Warns when the substrate boundary condition does not match the topography
fn periodicity_alert(topography: &dyn Topography, params: &ContactParams) -> Option<Alert> {
    match (topography.is_periodic(), params.substrate.is_periodic()) {
        (true, false) => Some(Alert {
            severity: Severity::Warning,
            message: format!(
                "Topography '{}' is periodic, but the analysis is configured for free boundaries.",
                topography.name()
            ),
        }),
        (false, true) => Some(Alert {
            severity: Severity::Warning,
            message: format!(
                "Topography '{}' is not periodic, \
                 but the analysis is configured for periodic boundaries.",
                topography.name()
            ),
        }),
        _ => None,
    }
}

/// Assembles the step results of a finished run into one AnalysisResult
///
/// # Arguments
/// * `plan` - The plan the steps were run from
/// * `steps` - One StepResult per planned pressure, in step order
/// * `topography` - The analyzed topography
/// * `params` - Parameters of the run
pub fn aggregate(
    plan: StepPlan,
    steps: Vec<StepResult>,
    topography: &dyn Topography,
    params: &ContactParams,
) -> AnalysisResult {
    debug_assert_eq!(plan.len(), steps.len());

    let alerts = periodicity_alert(topography, params).into_iter().collect();

    let effective_kwargs = EffectiveKwargs {
        substrate_str: params.substrate,
        hardness: params.hardness,
        nsteps: params.nsteps,
        pressures: plan.pressures().to_vec(),
        maxiter: params.maxiter,
    };

    AnalysisResult {
        name: RESULT_NAME.to_owned(),
        area_per_pt: topography.area_per_pt(),
        maxiter: params.maxiter,
        min_pentol: params.min_pentol,
        plan,
        steps,
        alerts,
        effective_kwargs,
    }
}
