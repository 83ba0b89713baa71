use serde::{Deserialize, Serialize};

use crate::error::AsperityError;

/// Boundary condition class of the elastic substrate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Substrate {
    Periodic,
    #[default]
    Nonperiodic,
}

impl Substrate {
    pub fn is_periodic(&self) -> bool {
        matches!(self, Substrate::Periodic)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Substrate::Periodic => "periodic",
            Substrate::Nonperiodic => "nonperiodic",
        }
    }
}

impl std::str::FromStr for Substrate {
    type Err = AsperityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "periodic" => Ok(Substrate::Periodic),
            "nonperiodic" => Ok(Substrate::Nonperiodic),
            other => Err(AsperityError::Input(format!(
                "Unknown substrate type '{other}', expected periodic or nonperiodic"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Danger,
}

/// A questionable but non-fatal input choice detected during a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub severity: Severity,
    pub message: String,
}

/// Applied pressures to solve for, in units of the effective modulus.
/// The step index of a pressure is its position in the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct StepPlan {
    pressures: Vec<f64>,
}

impl StepPlan {
    pub fn new(pressures: Vec<f64>) -> Result<StepPlan, AsperityError> {
        if pressures.is_empty() {
            return Err(AsperityError::Input(
                "A step plan needs at least one pressure".to_owned(),
            ));
        }
        Ok(StepPlan { pressures })
    }

    pub fn pressures(&self) -> &[f64] {
        &self.pressures
    }

    pub fn len(&self) -> usize {
        self.pressures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressures.is_empty()
    }

    /// Iterates over `(step index, pressure)` pairs
    pub fn steps(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.pressures.iter().copied().enumerate()
    }
}

/// Scalar summary of one solved boundary-value problem
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub index: usize,
    pub mean_pressure: f64,
    /// Fractional contact area A/A0
    pub total_contact_area: f64,
    pub mean_gap: f64,
    pub mean_displacement: f64,
    pub converged: bool,
    /// Storage path of the persisted field artifact
    pub data_path: String,
}

/// Parameters actually used for a run, after defaults and planning were resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectiveKwargs {
    pub substrate_str: Substrate,
    pub hardness: Option<f64>,
    pub nsteps: Option<usize>,
    pub pressures: Vec<f64>,
    pub maxiter: usize,
}

/// Complete record of one analysis run. Frozen once returned by the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ResultDocument", try_from = "ResultDocument")]
pub struct AnalysisResult {
    pub name: String,
    pub area_per_pt: f64,
    pub maxiter: usize,
    pub min_pentol: f64,
    pub plan: StepPlan,
    pub steps: Vec<StepResult>,
    pub alerts: Vec<Alert>,
    pub effective_kwargs: EffectiveKwargs,
}

impl AnalysisResult {
    pub fn mean_pressures(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.mean_pressure).collect()
    }

    pub fn total_contact_areas(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.total_contact_area).collect()
    }

    pub fn mean_gaps(&self) -> Vec<f64> {
        self.steps.iter().map(|s| s.mean_gap).collect()
    }

    pub fn converged(&self) -> Vec<bool> {
        self.steps.iter().map(|s| s.converged).collect()
    }

    pub fn to_json(&self) -> Result<Vec<u8>, AsperityError> {
        serde_json::to_vec_pretty(self)
            .map_err(|err| AsperityError::Input(format!("Unable to serialize result: {err}")))
    }

    pub fn from_json(bytes: &[u8]) -> Result<AnalysisResult, AsperityError> {
        serde_json::from_slice(bytes)
            .map_err(|err| AsperityError::Input(format!("Error in result json: {err}")))
    }
}

/// On-disk layout of `result.json`: one array per scalar, one entry per step
#[derive(Serialize, Deserialize)]
struct ResultDocument {
    name: String,
    area_per_pt: f64,
    maxiter: usize,
    min_pentol: f64,
    mean_pressures: Vec<f64>,
    total_contact_areas: Vec<f64>,
    mean_displacements: Vec<f64>,
    mean_gaps: Vec<f64>,
    converged: Vec<bool>,
    data_paths: Vec<String>,
    effective_kwargs: EffectiveKwargs,
    #[serde(default)]
    alerts: Vec<Alert>,
}

impl From<AnalysisResult> for ResultDocument {
    fn from(result: AnalysisResult) -> Self {
        let steps = &result.steps;
        ResultDocument {
            mean_pressures: steps.iter().map(|s| s.mean_pressure).collect(),
            total_contact_areas: steps.iter().map(|s| s.total_contact_area).collect(),
            mean_displacements: steps.iter().map(|s| s.mean_displacement).collect(),
            mean_gaps: steps.iter().map(|s| s.mean_gap).collect(),
            converged: steps.iter().map(|s| s.converged).collect(),
            data_paths: steps.iter().map(|s| s.data_path.clone()).collect(),
            name: result.name,
            area_per_pt: result.area_per_pt,
            maxiter: result.maxiter,
            min_pentol: result.min_pentol,
            effective_kwargs: result.effective_kwargs,
            alerts: result.alerts,
        }
    }
}

impl TryFrom<ResultDocument> for AnalysisResult {
    type Error = String;

    fn try_from(doc: ResultDocument) -> Result<Self, Self::Error> {
        let n = doc.effective_kwargs.pressures.len();
        let lengths = [
            doc.mean_pressures.len(),
            doc.total_contact_areas.len(),
            doc.mean_displacements.len(),
            doc.mean_gaps.len(),
            doc.converged.len(),
            doc.data_paths.len(),
        ];
        if lengths.iter().any(|&len| len != n) {
            return Err(format!(
                "result has {n} planned pressures but per-step arrays of lengths {lengths:?}"
            ));
        }

        let plan =
            StepPlan::new(doc.effective_kwargs.pressures.clone()).map_err(|e| e.to_string())?;

        let steps = (0..n)
            .map(|i| StepResult {
                index: i,
                mean_pressure: doc.mean_pressures[i],
                total_contact_area: doc.total_contact_areas[i],
                mean_gap: doc.mean_gaps[i],
                mean_displacement: doc.mean_displacements[i],
                converged: doc.converged[i],
                data_path: doc.data_paths[i].clone(),
            })
            .collect();

        Ok(AnalysisResult {
            name: doc.name,
            area_per_pt: doc.area_per_pt,
            maxiter: doc.maxiter,
            min_pentol: doc.min_pentol,
            plan,
            steps,
            alerts: doc.alerts,
            effective_kwargs: doc.effective_kwargs,
        })
    }
}

/// Identity of the analyzed topography or surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub id: u64,
    pub name: String,
}
