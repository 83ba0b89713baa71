use serde::{Deserialize, Serialize};

use crate::{datatypes::Substrate, error::AsperityError};

pub const MAX_NSTEPS: usize = 50;
pub const MAX_PRESSURES: usize = 50;
pub const MAX_MAXITER: usize = 1000;

/// Parameters of one contact-mechanics analysis
///
/// Every field has a default, so an empty JSON object `{}` is a valid
/// parameter file. When both `pressures` and `nsteps` are given, the
/// explicit pressures win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactParams {
    /// Boundary condition of the elastic half-space. Default: nonperiodic
    pub substrate: Substrate,
    /// Plastic hardness cap on the local pressure, in units of E*. Default: none
    pub hardness: Option<f64>,
    /// Number of log-spaced pressures to generate. Default: 10
    pub nsteps: Option<usize>,
    /// Explicit applied pressures, in units of E*. Default: none
    pub pressures: Option<Vec<f64>>,
    /// Iteration cap of the solver for each step. Default: 100
    pub maxiter: usize,
    /// Convergence tolerance of the solver. Default: 1e-12
    pub min_pentol: f64,
}

impl Default for ContactParams {
    fn default() -> Self {
        ContactParams {
            substrate: Substrate::Nonperiodic,
            hardness: None,
            nsteps: Some(10),
            pressures: None,
            maxiter: 100,
            min_pentol: 1e-12,
        }
    }
}

impl ContactParams {
    /// Parses parameters from the contents of a JSON parameter file
    pub fn from_json(contents: &str) -> Result<ContactParams, AsperityError> {
        let params: ContactParams = serde_json::from_str(contents)
            .map_err(|err| AsperityError::Input(format!("Error in parameter json: {err}")))?;
        params.validate()?;
        Ok(params)
    }

    /// Reads and validates a JSON parameter file
    pub fn load(path: &str) -> Result<ContactParams, AsperityError> {
        let contents = std::fs::read_to_string(path).map_err(|err| {
            AsperityError::Input(format!("Unable to open parameter file {path}: {err}"))
        })?;
        Self::from_json(&contents)
    }

    /// The explicit pressure list, if one was given and is non-empty
    pub fn explicit_pressures(&self) -> Option<&[f64]> {
        self.pressures.as_deref().filter(|p| !p.is_empty())
    }

    /// Checks parameter ranges
    pub fn validate(&self) -> Result<(), AsperityError> {
        if let Some(pressures) = self.explicit_pressures() {
            if pressures.len() > MAX_PRESSURES {
                return Err(AsperityError::Input(format!(
                    "At most {MAX_PRESSURES} pressures are allowed, got {}",
                    pressures.len()
                )));
            }
            if let Some(p) = pressures.iter().find(|p| !p.is_finite() || **p <= 0.0) {
                return Err(AsperityError::Input(format!(
                    "Pressures must be positive, got {p}"
                )));
            }
        } else {
            match self.nsteps {
                None => {
                    return Err(AsperityError::Input(
                        "Either nsteps or pressures must be given".to_owned(),
                    ))
                }
                Some(n) if n == 0 || n > MAX_NSTEPS => {
                    return Err(AsperityError::Input(format!(
                        "nsteps must be between 1 and {MAX_NSTEPS}, got {n}"
                    )))
                }
                Some(_) => {}
            }
        }

        if let Some(h) = self.hardness {
            if !h.is_finite() || h <= 0.0 {
                return Err(AsperityError::Input(format!(
                    "Hardness must be positive, got {h}"
                )));
            }
        }
        if self.maxiter == 0 || self.maxiter > MAX_MAXITER {
            return Err(AsperityError::Input(format!(
                "maxiter must be between 1 and {MAX_MAXITER}, got {}",
                self.maxiter
            )));
        }
        if !self.min_pentol.is_finite() || self.min_pentol <= 0.0 {
            return Err(AsperityError::Input(format!(
                "min_pentol must be positive, got {}",
                self.min_pentol
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let params = ContactParams::from_json("{}").unwrap();
        assert_eq!(params, ContactParams::default());
        assert_eq!(params.nsteps, Some(10));
        assert_eq!(params.substrate, Substrate::Nonperiodic);
    }

    #[test]
    fn pressures_override_missing_nsteps() {
        let params = ContactParams::from_json(
            r#"{"nsteps": null, "pressures": [0.002, 0.01], "substrate": "periodic"}"#,
        )
        .unwrap();
        assert_eq!(params.explicit_pressures(), Some(&[0.002, 0.01][..]));
        assert_eq!(params.substrate, Substrate::Periodic);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for json in [
            r#"{"nsteps": 0}"#,
            r#"{"nsteps": 51}"#,
            r#"{"nsteps": null}"#,
            r#"{"pressures": [0.1, -0.2]}"#,
            r#"{"hardness": 0.0}"#,
            r#"{"maxiter": 0}"#,
            r#"{"maxiter": 5000}"#,
            r#"{"min_pentol": -1.0}"#,
        ] {
            let err = ContactParams::from_json(json).unwrap_err();
            assert!(matches!(err, AsperityError::Input(_)), "{json} should fail");
        }
    }

    #[test]
    fn empty_pressure_list_falls_back_to_nsteps() {
        let params = ContactParams::from_json(r#"{"pressures": [], "nsteps": 3}"#).unwrap();
        assert_eq!(params.explicit_pressures(), None);
    }
}
