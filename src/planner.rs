use log::debug;

use crate::{
    datatypes::{StepPlan, Substrate},
    error::AsperityError,
};

/// Derives the ordered applied pressures for a run
///
/// # Arguments
/// * `substrate` - Boundary condition of the run. Does not change the plan.
/// * `nsteps` - Number of log-spaced pressures, used only without explicit pressures
/// * `pressures` - Explicit pressures, used verbatim when non-empty
/// * `bounds` - Lowest and highest pressure of a generated plan
///
/// # Returns
/// A StepPlan with at least one pressure
pub fn plan(
    substrate: Substrate,
    nsteps: Option<usize>,
    pressures: Option<&[f64]>,
    bounds: (f64, f64),
) -> Result<StepPlan, AsperityError> {
    if let Some(pressures) = pressures.filter(|p| !p.is_empty()) {
        debug!(
            "planning {} given pressures on {} substrate",
            pressures.len(),
            substrate.as_str()
        );
        return StepPlan::new(pressures.to_vec());
    }

    let nsteps = match nsteps {
        Some(n) if n > 0 => n,
        _ => {
            return Err(AsperityError::Input(
                "Cannot plan steps without pressures or a positive nsteps".to_owned(),
            ))
        }
    };

    let (p_min, p_max) = bounds;
    if !(p_min > 0.0 && p_max >= p_min && p_max.is_finite()) {
        return Err(AsperityError::Input(format!(
            "Invalid pressure bounds ({p_min}, {p_max})"
        )));
    }

    debug!(
        "planning {nsteps} log-spaced pressures in [{p_min:e}, {p_max:e}] on {} substrate",
        substrate.as_str()
    );
    StepPlan::new(logspace(p_min, p_max, nsteps))
}

/// `n` values spaced evenly on a log scale, including both endpoints
fn logspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![start];
    }
    let (lo, hi) = (start.log10(), stop.log10());
    let delta = (hi - lo) / (n - 1) as f64;
    (0..n)
        .map(|i| match i {
            0 => start,
            i if i == n - 1 => stop,
            i => 10f64.powf(lo + delta * i as f64),
        })
        .collect()
}
