use crate::{error::AsperityError, topography::Topography};

/// Largest number of grid points accepted along either axis
pub const MAX_NB_GRID_PTS_PER_DIM: usize = 8192;
/// Largest total number of grid points accepted
pub const MAX_NB_GRID_PTS: usize = 1 << 25;

/// Checks whether a topography can be used for a contact-mechanics analysis
///
/// Contact mechanics needs a two-dimensional height map with positive
/// physical sizes, and the grid must stay small enough for the solver to
/// hold its fields in memory.
pub fn check_compatibility(topography: &dyn Topography) -> Result<(), AsperityError> {
    if topography.dim() != 2 {
        return Err(AsperityError::IncompatibleTopography(format!(
            "Contact mechanics requires a two-dimensional height map, but '{}' is a line scan",
            topography.name()
        )));
    }

    let (sx, sy) = topography.physical_sizes();
    if !(sx.is_finite() && sy.is_finite() && sx > 0.0 && sy > 0.0) {
        return Err(AsperityError::IncompatibleTopography(format!(
            "Topography '{}' has physical sizes {sx}x{sy}, both must be positive",
            topography.name()
        )));
    }

    let (nx, ny) = topography.nb_grid_pts();

    if nx > MAX_NB_GRID_PTS_PER_DIM || ny > MAX_NB_GRID_PTS_PER_DIM {
        return Err(AsperityError::IncompatibleTopography(format!(
            "Topography '{}' has {nx}x{ny} grid points, \
             at most {MAX_NB_GRID_PTS_PER_DIM} per axis are supported",
            topography.name()
        )));
    }

    match nx.checked_mul(ny) {
        Some(total) if total <= MAX_NB_GRID_PTS => Ok(()),
        _ => Err(AsperityError::IncompatibleTopography(format!(
            "Topography '{}' has {nx}x{ny} grid points, \
             at most {MAX_NB_GRID_PTS} in total are supported",
            topography.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;

    use super::*;
    use crate::topography::{tests::tilted_plane, HeightMap};

    /// Reports an arbitrary grid size without allocating heights
    struct Oversized {
        shape: (usize, usize),
        heights: DMatrix<f64>,
    }

    impl Topography for Oversized {
        fn name(&self) -> &str {
            "oversized"
        }
        fn dim(&self) -> usize {
            2
        }
        fn nb_grid_pts(&self) -> (usize, usize) {
            self.shape
        }
        fn physical_sizes(&self) -> (f64, f64) {
            (1.0, 1.0)
        }
        fn is_periodic(&self) -> bool {
            false
        }
        fn heights(&self) -> &DMatrix<f64> {
            &self.heights
        }
    }

    #[test]
    fn line_scans_are_incompatible() {
        let heights = (0..10).map(|x| 2.0 * x as f64).collect();
        let line = HeightMap::line_scan("line", heights, 10.0, false);
        let err = check_compatibility(&line).unwrap_err();
        assert!(matches!(err, AsperityError::IncompatibleTopography(_)));
    }

    #[test]
    fn too_many_grid_points_are_incompatible() {
        for shape in [(20000, 10000), (9999999, 3), (3, 9999999), (usize::MAX, 2)] {
            let topo = Oversized {
                shape,
                heights: DMatrix::zeros(1, 1),
            };
            let err = check_compatibility(&topo).unwrap_err();
            assert!(
                matches!(err, AsperityError::IncompatibleTopography(_)),
                "{shape:?} should be rejected"
            );
        }
    }

    #[test]
    fn degenerate_physical_sizes_are_incompatible() {
        let heights = DMatrix::from_row_slice(2, 2, &[0.0, 1.0, 2.0, 3.0]);
        let degenerate = [
            (0.0, 0.0),
            (1.0, 0.0),
            (-2.0, 1.0),
            (f64::NAN, 1.0),
            (1.0, f64::INFINITY),
        ];
        for sizes in degenerate {
            let topo = HeightMap::new("z", heights.clone(), sizes, false);
            let err = check_compatibility(&topo).unwrap_err();
            assert!(
                matches!(err, AsperityError::IncompatibleTopography(_)),
                "{sizes:?} should be rejected"
            );
        }
    }

    #[test]
    fn research_scale_maps_are_compatible() {
        check_compatibility(&tilted_plane(64, false)).unwrap();

        for shape in [(2048, 2048), (4096, 1024), (8192, 4096)] {
            let topo = Oversized {
                shape,
                heights: DMatrix::zeros(1, 1),
            };
            check_compatibility(&topo).unwrap();
        }
    }
}
