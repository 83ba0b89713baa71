use log::info;
use nalgebra::DMatrix;

use crate::error::AsperityError;

/// Read-only view of a measured surface topography
pub trait Topography {
    fn name(&self) -> &str;

    /// 1 for line scans, 2 for height maps
    fn dim(&self) -> usize;

    fn nb_grid_pts(&self) -> (usize, usize);

    fn physical_sizes(&self) -> (f64, f64);

    fn is_periodic(&self) -> bool;

    /// Heights with `nx` rows and `ny` columns
    fn heights(&self) -> &DMatrix<f64>;

    fn area_per_pt(&self) -> f64 {
        let (nx, ny) = self.nb_grid_pts();
        let (sx, sy) = self.physical_sizes();
        sx * sy / (nx * ny) as f64
    }

    fn rms_height(&self) -> f64 {
        let heights = self.heights();
        if heights.is_empty() {
            return 0.0;
        }
        let mean = heights.mean();
        let variance =
            heights.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / heights.len() as f64;
        variance.sqrt()
    }
}

/// Topography backed by a uniform grid of heights
#[derive(Debug, Clone)]
pub struct HeightMap {
    pub name: String,
    pub heights: DMatrix<f64>,
    pub physical_sizes: (f64, f64),
    pub periodic: bool,
    line_scan: bool,
}

impl HeightMap {
    pub fn new(
        name: &str,
        heights: DMatrix<f64>,
        physical_sizes: (f64, f64),
        periodic: bool,
    ) -> HeightMap {
        HeightMap {
            name: name.to_owned(),
            heights,
            physical_sizes,
            periodic,
            line_scan: false,
        }
    }

    /// A one-dimensional profile. The second physical size is unused.
    pub fn line_scan(name: &str, heights: Vec<f64>, length: f64, periodic: bool) -> HeightMap {
        let n = heights.len();
        HeightMap {
            name: name.to_owned(),
            heights: DMatrix::from_vec(n, 1, heights),
            physical_sizes: (length, 1.0),
            periodic,
            line_scan: true,
        }
    }
}

impl Topography for HeightMap {
    fn name(&self) -> &str {
        &self.name
    }

    fn dim(&self) -> usize {
        if self.line_scan {
            1
        } else {
            2
        }
    }

    fn nb_grid_pts(&self) -> (usize, usize) {
        self.heights.shape()
    }

    fn physical_sizes(&self) -> (f64, f64) {
        self.physical_sizes
    }

    fn is_periodic(&self) -> bool {
        self.periodic
    }

    fn heights(&self) -> &DMatrix<f64> {
        &self.heights
    }
}

/// Parses a height map from comma separated text
///
/// Each non-empty line is one grid row. A single line is read as a line scan.
/// Physical sizes default to one unit per grid point.
///
/// # Arguments
/// * `name` - Display name of the topography
/// * `contents` - The csv text
/// * `physical_sizes` - Optional physical sizes of the map
/// * `periodic` - Whether the map tiles at its edges
pub fn parse_csv(
    name: &str,
    contents: &str,
    physical_sizes: Option<(f64, f64)>,
    periodic: bool,
) -> Result<HeightMap, AsperityError> {
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let row = line
            .split(',')
            .map(|x| {
                x.trim().parse::<f64>().map_err(|_| {
                    AsperityError::Input(format!(
                        "Non-float value '{}' in height csv on line {}",
                        x.trim(),
                        line_no + 1
                    ))
                })
            })
            .collect::<Result<Vec<f64>, AsperityError>>()?;

        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(AsperityError::Input(format!(
                    "Height csv line {} has {} values, expected {}",
                    line_no + 1,
                    row.len(),
                    first.len()
                )));
            }
        }
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(AsperityError::Input("Height csv contains no values".to_owned()));
    }

    let nx = rows.len();
    let ny = rows[0].len();

    let map = if nx == 1 {
        let length = physical_sizes.map(|(sx, _)| sx).unwrap_or(ny as f64);
        HeightMap::line_scan(name, rows.remove(0), length, periodic)
    } else {
        let sizes = physical_sizes.unwrap_or((nx as f64, ny as f64));
        let heights = DMatrix::from_fn(nx, ny, |i, j| rows[i][j]);
        HeightMap::new(name, heights, sizes, periodic)
    };

    info!(
        "loaded topography '{}' with {:?} grid points",
        name,
        map.nb_grid_pts()
    );

    Ok(map)
}

/// Reads a height map csv file
pub fn load_csv(
    name: &str,
    csv_file: &str,
    physical_sizes: Option<(f64, f64)>,
    periodic: bool,
) -> Result<HeightMap, AsperityError> {
    let contents = std::fs::read_to_string(csv_file).map_err(|err| {
        AsperityError::Input(format!("Unable to open csv file {csv_file}: {err}"))
    })?;
    parse_csv(name, &contents, physical_sizes, periodic)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A tilted plane sampled on an `n`×`n` grid of unit spacing
    pub(crate) fn tilted_plane(n: usize, periodic: bool) -> HeightMap {
        let heights = DMatrix::from_fn(n, n, |i, j| 0.01 * i as f64 + 0.02 * j as f64);
        HeightMap::new("tilted", heights, (n as f64, n as f64), periodic)
    }

    #[test]
    fn parses_map_rows_as_grid_rows() {
        let map = parse_csv("m", "0, 1, 2\n3, 4, 5\n\n", None, false).unwrap();
        assert_eq!(map.dim(), 2);
        assert_eq!(map.nb_grid_pts(), (2, 3));
        assert_eq!(map.heights()[(1, 0)], 3.0);
        assert_eq!(map.area_per_pt(), 1.0);
    }

    #[test]
    fn single_line_is_a_line_scan() {
        let map = parse_csv("l", "0,2,4,6", Some((8.0, 8.0)), false).unwrap();
        assert_eq!(map.dim(), 1);
        assert_eq!(map.nb_grid_pts(), (4, 1));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(parse_csv("r", "0,1\n2\n", None, false).is_err());
        assert!(parse_csv("r", "0,x\n", None, false).is_err());
        assert!(parse_csv("r", "\n\n", None, false).is_err());
    }

    #[test]
    fn rms_height_of_constant_map_is_zero() {
        let map = HeightMap::new("flat", DMatrix::from_element(4, 4, 3.0), (4.0, 4.0), true);
        assert_eq!(map.rms_height(), 0.0);
    }
}
