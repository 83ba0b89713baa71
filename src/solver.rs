use argmin::{
    core::{CostFunction, Error, Executor, State, TerminationReason},
    solver::brent::BrentRoot,
};
use log::debug;
use nalgebra::DMatrix;

use crate::{datatypes::Substrate, error::AsperityError, topography::Topography};

/// Lower end of a generated plan relative to its upper end
pub const PRESSURE_RANGE: f64 = 1e-3;
/// Plan bounds used when the topography has no height variation
pub const FLAT_PRESSURE_BOUNDS: (f64, f64) = (1e-4, 1e-1);

/// Everything the solver needs to know about one boundary-value problem
#[derive(Debug, Clone, PartialEq)]
pub struct SolveRequest {
    /// Applied mean pressure in units of E*
    pub pressure: f64,
    pub substrate: Substrate,
    pub hardness: Option<f64>,
    pub maxiter: usize,
    pub min_pentol: f64,
}

/// Field solution of one step, all matrices shaped like the topography
#[derive(Debug, Clone)]
pub struct ContactFields {
    pub pressure: DMatrix<f64>,
    pub gap: DMatrix<f64>,
    pub displacement: DMatrix<f64>,
    pub contacting_points: DMatrix<bool>,
    pub converged: bool,
}

/// Elastic contact solver used by the step runner
pub trait ContactSolver {
    /// Lowest and highest applied pressure for a generated plan
    fn pressure_bounds(&self, topography: &dyn Topography, hardness: Option<f64>) -> (f64, f64);

    /// Solves one contact problem. Failing to converge is reported through
    /// `ContactFields::converged`; an error means no solution exists at all.
    fn solve(
        &self,
        topography: &dyn Topography,
        request: &SolveRequest,
    ) -> Result<ContactFields, AsperityError>;
}

/// Contact of a rigid flat against the topography on an elastic foundation
///
/// Each grid point responds independently with stiffness `E*/l`, where `l` is
/// the grid spacing, and the local pressure is capped by the hardness. The
/// rigid-body approach that balances the applied pressure is found with a
/// Brent root search.
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticFoundation;

/// Difference between the mean foundation pressure at a given approach and the target
#[derive(Clone, Copy)]
struct PressureBalance<'a> {
    initial_gap: &'a DMatrix<f64>,
    spacing: f64,
    hardness: Option<f64>,
    target: f64,
}

impl PressureBalance<'_> {
    fn local_pressure(&self, approach: f64, initial_gap: f64) -> f64 {
        let p = ((approach - initial_gap) / self.spacing).max(0.0);
        match self.hardness {
            Some(h) => p.min(h),
            None => p,
        }
    }

    fn mean_pressure(&self, approach: f64) -> f64 {
        self.initial_gap
            .iter()
            .map(|g| self.local_pressure(approach, *g))
            .sum::<f64>()
            / self.initial_gap.len() as f64
    }
}

impl CostFunction for PressureBalance<'_> {
    type Param = f64;
    type Output = f64;

    fn cost(&self, approach: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.mean_pressure(*approach) - self.target)
    }
}

/// Grid spacing of a topography, the square root of the area per point
fn grid_spacing(topography: &dyn Topography) -> f64 {
    topography.area_per_pt().sqrt()
}

impl ContactSolver for ElasticFoundation {
    fn pressure_bounds(&self, topography: &dyn Topography, hardness: Option<f64>) -> (f64, f64) {
        let scale = topography.rms_height() / grid_spacing(topography);
        let (p_min, mut p_max) = if scale > 0.0 && scale.is_finite() {
            (PRESSURE_RANGE * scale, scale)
        } else {
            FLAT_PRESSURE_BOUNDS
        };

        // Pressures at the hardness can only be carried by full plastic contact
        if let Some(h) = hardness {
            p_max = p_max.min(0.9 * h);
        }
        (p_min.min(PRESSURE_RANGE * p_max), p_max)
    }

    fn solve(
        &self,
        topography: &dyn Topography,
        request: &SolveRequest,
    ) -> Result<ContactFields, AsperityError> {
        let heights = topography.heights();
        if heights.is_empty() {
            return Err(AsperityError::Solver("Topography has no grid points".to_owned()));
        }
        let spacing = grid_spacing(topography);
        if !(spacing > 0.0 && spacing.is_finite()) {
            return Err(AsperityError::Solver(format!(
                "Invalid grid spacing {spacing} for topography '{}'",
                topography.name()
            )));
        }

        let top = heights.max();
        let initial_gap = heights.map(|h| top - h);

        let balance = PressureBalance {
            initial_gap: &initial_gap,
            spacing,
            hardness: request.hardness,
            target: request.pressure,
        };

        // Full contact at this approach carries at least the target pressure
        // unless the hardness caps it, in which case Brent rejects the bracket.
        let max_approach = initial_gap.max() + request.pressure * spacing;
        let solver = BrentRoot::new(0.0, max_approach, request.min_pentol);

        let res = Executor::new(balance, solver)
            .configure(|state| state.max_iters(request.maxiter as u64))
            .run()
            .map_err(|err| {
                AsperityError::Solver(format!(
                    "No contact solution at pressure {}: {err}",
                    request.pressure
                ))
            })?;

        let approach = match res.state().best_param {
            Some(d) => d,
            None => {
                return Err(AsperityError::Solver(
                    "Root search could not produce a rigid-body approach".to_owned(),
                ))
            }
        };
        let converged = !matches!(
            res.state().get_termination_reason(),
            None | Some(TerminationReason::MaxItersReached)
        );

        debug!(
            "approach {approach:e} after {} iterations (converged: {converged})",
            res.state().get_iter()
        );

        let pressure = initial_gap.map(|g| balance.local_pressure(approach, g));
        let displacement = pressure.map(|p| p * spacing);
        let gap = initial_gap.zip_map(&displacement, |g, u| (g - approach + u).max(0.0));
        let contacting_points = pressure.map(|p| p > 0.0);

        Ok(ContactFields {
            pressure,
            gap,
            displacement,
            contacting_points,
            converged,
        })
    }
}
