use indicatif::ProgressBar;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::ContactParams,
    datatypes::StepResult,
    error::AsperityError,
    solver::{ContactFields, ContactSolver, SolveRequest},
    storage::ArtifactStore,
    topography::Topography,
};

/// File name of a persisted step artifact
pub const ARTIFACT_FILENAME: &str = "results.json";

/// Receives fractional progress of a multi-step run
pub trait ProgressRecorder {
    fn set_progress(&self, current: usize, total: usize);
}

/// Discards progress
pub struct NoProgress;

impl ProgressRecorder for NoProgress {
    fn set_progress(&self, _current: usize, _total: usize) {}
}

impl ProgressRecorder for ProgressBar {
    fn set_progress(&self, current: usize, total: usize) {
        self.set_length(total as u64);
        self.set_position(current as u64);
    }
}

/// Joins a storage folder and a relative path
pub fn join_path(folder: &str, path: &str) -> String {
    let folder = folder.trim_end_matches('/');
    if folder.is_empty() {
        path.to_owned()
    } else {
        format!("{folder}/{path}")
    }
}

/// Storage path of the field artifact of a step
pub fn artifact_path(folder: &str, index: usize) -> String {
    join_path(folder, &format!("step-{index}/fields/{ARTIFACT_FILENAME}"))
}

/// Raw field solution of one step as persisted in storage
///
/// Arrays are stored column-major with shape `nb_grid_pts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepArtifact {
    pub nb_grid_pts: (usize, usize),
    pub mean_pressure: f64,
    pub total_contact_area: f64,
    pub pressure: Vec<f64>,
    pub gap: Vec<f64>,
    pub displacement: Vec<f64>,
    pub contacting_points: Vec<bool>,
}

impl StepArtifact {
    fn from_fields(
        fields: &ContactFields,
        mean_pressure: f64,
        total_contact_area: f64,
    ) -> StepArtifact {
        StepArtifact {
            nb_grid_pts: fields.pressure.shape(),
            mean_pressure,
            total_contact_area,
            pressure: fields.pressure.as_slice().to_vec(),
            gap: fields.gap.as_slice().to_vec(),
            displacement: fields.displacement.as_slice().to_vec(),
            contacting_points: fields.contacting_points.as_slice().to_vec(),
        }
    }
}

/// Solves one step and persists its fields
///
/// # Arguments
/// * `topography` - The topography in contact
/// * `index` - Step index within the plan
/// * `pressure` - Applied mean pressure of this step
/// * `params` - Run parameters (substrate, hardness, convergence controls)
/// * `solver` - The contact solver
/// * `store` - Storage receiving the step artifact
/// * `folder` - Storage folder of the run
///
/// # Returns
/// The StepResult of the step, recorded even when the solver did not converge
pub fn run_step(
    topography: &dyn Topography,
    index: usize,
    pressure: f64,
    params: &ContactParams,
    solver: &dyn ContactSolver,
    store: &dyn ArtifactStore,
    folder: &str,
) -> Result<StepResult, AsperityError> {
    let request = SolveRequest {
        pressure,
        substrate: params.substrate,
        hardness: params.hardness,
        maxiter: params.maxiter,
        min_pentol: params.min_pentol,
    };

    let fields = solver.solve(topography, &request).map_err(|err| match err {
        AsperityError::Solver(msg) => AsperityError::Solver(format!("step {index}: {msg}")),
        other => other,
    })?;

    let nb_pts = fields.pressure.len().max(1) as f64;
    let mean_pressure = fields.pressure.mean();
    let total_contact_area =
        fields.contacting_points.iter().filter(|c| **c).count() as f64 / nb_pts;
    let mean_gap = fields.gap.mean();
    let mean_displacement = fields.displacement.mean();

    if !fields.converged {
        warn!(
            "step {index} at pressure {pressure:e} did not converge within {} iterations",
            params.maxiter
        );
    }

    let artifact = StepArtifact::from_fields(&fields, mean_pressure, total_contact_area);
    let bytes = serde_json::to_vec(&artifact).map_err(|err| {
        AsperityError::Solver(format!("Unable to encode fields of step {index}: {err}"))
    })?;

    let data_path = artifact_path(folder, index);
    store.write(&data_path, &bytes)?;

    info!(
        "step {index}: p = {mean_pressure:e}, A/A0 = {total_contact_area:.4}, converged = {}",
        fields.converged
    );

    Ok(StepResult {
        index,
        mean_pressure,
        total_contact_area,
        mean_gap,
        mean_displacement,
        converged: fields.converged,
        data_path,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use nalgebra::DMatrix;

    use super::*;
    use crate::{storage::MemoryStore, topography::tests::tilted_plane};

    /// Solver returning a fixed half-contact field, failing at chosen pressures
    pub(crate) struct ScriptedSolver {
        pub(crate) fail_above: f64,
        pub(crate) unconverged_at: Vec<f64>,
    }

    impl ContactSolver for ScriptedSolver {
        fn pressure_bounds(
            &self,
            _topography: &dyn Topography,
            _hardness: Option<f64>,
        ) -> (f64, f64) {
            (1e-3, 1e-1)
        }

        fn solve(
            &self,
            topography: &dyn Topography,
            request: &SolveRequest,
        ) -> Result<ContactFields, AsperityError> {
            if request.pressure > self.fail_above {
                return Err(AsperityError::Solver("diverged".to_owned()));
            }
            let (nx, ny) = topography.nb_grid_pts();
            let contacting_points = DMatrix::from_fn(nx, ny, |i, _| i < nx / 2);
            let pressure = contacting_points.map(|c| if c { 2.0 * request.pressure } else { 0.0 });
            Ok(ContactFields {
                gap: contacting_points.map(|c| if c { 0.0 } else { 1.0 }),
                displacement: pressure.clone(),
                pressure,
                contacting_points,
                converged: !self.unconverged_at.contains(&request.pressure),
            })
        }
    }

    pub(crate) fn scripted() -> ScriptedSolver {
        ScriptedSolver {
            fail_above: f64::INFINITY,
            unconverged_at: Vec::new(),
        }
    }

    #[test]
    fn summaries_are_derived_from_fields() {
        let store = MemoryStore::new();
        let topo = tilted_plane(4, false);
        let params = ContactParams::default();
        let step = run_step(&topo, 2, 0.01, &params, &scripted(), &store, "run").unwrap();

        assert_eq!(step.index, 2);
        assert!((step.mean_pressure - 0.01).abs() < 1e-15);
        assert_eq!(step.total_contact_area, 0.5);
        assert_eq!(step.mean_gap, 0.5);
        assert!(step.converged);
        assert_eq!(step.data_path, "run/step-2/fields/results.json");

        let artifact: StepArtifact =
            serde_json::from_slice(&store.read(&step.data_path).unwrap()).unwrap();
        assert_eq!(artifact.nb_grid_pts, (4, 4));
        assert_eq!(artifact.mean_pressure, step.mean_pressure);
        assert_eq!(artifact.total_contact_area, 0.5);
        assert_eq!(artifact.contacting_points.len(), 16);
    }

    #[test]
    fn unconverged_step_is_still_recorded() {
        let store = MemoryStore::new();
        let solver = ScriptedSolver {
            fail_above: f64::INFINITY,
            unconverged_at: vec![0.02],
        };
        let params = ContactParams::default();
        let topo = tilted_plane(4, false);
        let step = run_step(&topo, 0, 0.02, &params, &solver, &store, "").unwrap();
        assert!(!step.converged);
        assert!(store.exists("step-0/fields/results.json"));
    }

    #[test]
    fn solver_error_names_the_step() {
        let store = MemoryStore::new();
        let solver = ScriptedSolver {
            fail_above: 0.0,
            unconverged_at: Vec::new(),
        };
        let params = ContactParams::default();
        let err =
            run_step(&tilted_plane(4, false), 5, 0.02, &params, &solver, &store, "").unwrap_err();
        match err {
            AsperityError::Solver(msg) => assert!(msg.starts_with("step 5")),
            other => panic!("unexpected error {other}"),
        }
        assert!(store.paths().is_empty());
    }

    #[test]
    fn join_path_skips_empty_folder() {
        assert_eq!(join_path("", "result.json"), "result.json");
        assert_eq!(join_path("topo/", "result.json"), "topo/result.json");
    }
}
