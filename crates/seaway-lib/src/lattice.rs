//! Regular latitude/longitude lattice and its land/water split.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::classifier::GeometryOracle;
use crate::coord::{Coordinate, DEFAULT_RESOLUTION_DEG};
use crate::error::{Error, Result};

/// Bounds and spacing of the candidate grid.
///
/// Ranges are half-open: `lat_min` is included, `lat_max` is not, so a
/// `-180..180` longitude range never produces the same meridian twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeSpec {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_step: f64,
    pub lon_step: f64,
}

impl Default for LatticeSpec {
    fn default() -> Self {
        Self {
            lat_min: -60.0,
            lat_max: 83.0,
            lon_min: -180.0,
            lon_max: 180.0,
            lat_step: 0.1,
            lon_step: 0.1,
        }
    }
}

impl LatticeSpec {
    /// Square lattice with the same step on both axes.
    pub fn uniform(lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64, step: f64) -> Self {
        Self {
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            lat_step: step,
            lon_step: step,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let steps_ok = [self.lat_step, self.lon_step]
            .iter()
            .all(|step| step.is_finite() && *step > 0.0);
        if !steps_ok {
            return Err(invalid(format!(
                "lattice steps must be positive, got {}/{}",
                self.lat_step, self.lon_step
            )));
        }
        let corners = [
            Coordinate {
                lat: self.lat_min,
                lon: self.lon_min,
            },
            Coordinate {
                lat: self.lat_max,
                lon: self.lon_max,
            },
        ];
        if corners.iter().any(|corner| !corner.is_valid()) {
            return Err(invalid("lattice bounds are outside the globe".to_string()));
        }
        if self.lat_min >= self.lat_max || self.lon_min >= self.lon_max {
            return Err(invalid("lattice bounds are empty".to_string()));
        }
        Ok(())
    }

    pub fn latitudes(&self) -> Vec<f64> {
        axis(self.lat_min, self.lat_max, self.lat_step)
    }

    pub fn longitudes(&self) -> Vec<f64> {
        axis(self.lon_min, self.lon_max, self.lon_step)
    }

    /// Number of lattice points without materializing them.
    pub fn len(&self) -> usize {
        axis_len(self.lat_min, self.lat_max, self.lat_step)
            * axis_len(self.lon_min, self.lon_max, self.lon_step)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every lattice point, row by row (latitude outer, longitude inner).
    pub fn points(&self) -> Result<Vec<Coordinate>> {
        self.validate()?;
        let longitudes = self.longitudes();
        let mut points = Vec::with_capacity(self.len());
        for lat in self.latitudes() {
            for &lon in &longitudes {
                points.push(Coordinate { lat, lon });
            }
        }
        Ok(points)
    }

    /// Split the lattice into water and land points, `chunk_size` points at a
    /// time. `progress` receives `(processed, total)` after every chunk.
    pub fn classify<O, F>(
        &self,
        oracle: &O,
        chunk_size: usize,
        mut progress: F,
    ) -> Result<ClassifiedLattice>
    where
        O: GeometryOracle + ?Sized,
        F: FnMut(usize, usize),
    {
        let points = self.points()?;
        let total = points.len();
        let chunk_size = chunk_size.max(1);
        let mut classified = ClassifiedLattice::default();

        for (chunk_index, chunk) in points.chunks(chunk_size).enumerate() {
            for (point, on_land) in chunk.iter().zip(land_flags(oracle, chunk)) {
                if on_land {
                    classified.land.push(*point);
                } else {
                    classified.water.push(*point);
                }
            }

            let processed = (chunk_index * chunk_size + chunk.len()).min(total);
            debug!(
                processed,
                total,
                percent = percent(processed, total),
                "classified lattice chunk"
            );
            progress(processed, total);
        }

        info!(
            water = classified.water.len(),
            land = classified.land.len(),
            "lattice classified"
        );
        Ok(classified)
    }
}

/// Result of [`LatticeSpec::classify`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifiedLattice {
    pub water: Vec<Coordinate>,
    pub land: Vec<Coordinate>,
}

#[cfg(feature = "parallel")]
fn land_flags<O: GeometryOracle + ?Sized>(oracle: &O, chunk: &[Coordinate]) -> Vec<bool> {
    use rayon::prelude::*;
    chunk.par_iter().map(|point| oracle.is_land(point)).collect()
}

#[cfg(not(feature = "parallel"))]
fn land_flags<O: GeometryOracle + ?Sized>(oracle: &O, chunk: &[Coordinate]) -> Vec<bool> {
    chunk.iter().map(|point| oracle.is_land(point)).collect()
}

pub(crate) fn percent(processed: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        processed as f64 * 100.0 / total as f64
    }
}

fn axis_len(min: f64, max: f64, step: f64) -> usize {
    if !(step > 0.0) || max <= min {
        return 0;
    }
    // shave a hair off so floating error cannot add a value at `max`
    ((max - min) / step - 1e-9).ceil().max(0.0) as usize
}

fn axis(min: f64, max: f64, step: f64) -> Vec<f64> {
    (0..axis_len(min, max, step))
        .map(|i| round3(min + i as f64 * step))
        .collect()
}

fn round3(value: f64) -> f64 {
    let scale = 1.0 / DEFAULT_RESOLUTION_DEG;
    (value * scale).round() / scale
}

fn invalid(message: String) -> Error {
    Error::InvalidLattice { message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::OpenWater;

    struct WestIsLand;

    impl GeometryOracle for WestIsLand {
        fn is_land(&self, point: &Coordinate) -> bool {
            point.lon < 0.0
        }

        fn coast_distance_km(&self, _point: &Coordinate) -> Option<f64> {
            None
        }
    }

    #[test]
    fn axes_are_half_open_and_rounded() {
        let spec = LatticeSpec::uniform(0.0, 0.3, -180.0, 180.0, 0.1);
        assert_eq!(spec.latitudes(), vec![0.0, 0.1, 0.2]);
        let lons = spec.longitudes();
        assert_eq!(lons.len(), 3600);
        assert_eq!(lons[0], -180.0);
        assert_eq!(*lons.last().unwrap(), 179.9);
        assert_eq!(spec.len(), 3 * 3600);
    }

    #[test]
    fn default_matches_global_grid() {
        let spec = LatticeSpec::default();
        assert_eq!(spec.latitudes().len(), 1430);
        assert_eq!(spec.longitudes().len(), 3600);
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let mut spec = LatticeSpec::uniform(0.0, 1.0, 0.0, 1.0, 0.0);
        assert!(spec.points().is_err());
        spec.lat_step = 0.5;
        spec.lon_step = 0.5;
        spec.lat_max = 95.0;
        assert!(spec.points().is_err());
    }

    #[test]
    fn classify_splits_points_and_reports_progress() {
        let spec = LatticeSpec::uniform(0.0, 2.0, -2.0, 2.0, 1.0);
        let mut calls = Vec::new();
        let classified = spec
            .classify(&WestIsLand, 3, |done, total| calls.push((done, total)))
            .unwrap();

        assert_eq!(classified.land.len(), 4);
        assert_eq!(classified.water.len(), 4);
        assert!(classified.land.iter().all(|c| c.lon < 0.0));
        assert_eq!(calls, vec![(3, 8), (6, 8), (8, 8)]);
    }

    #[test]
    fn open_water_keeps_everything() {
        let spec = LatticeSpec::uniform(10.0, 11.0, 10.0, 11.0, 0.5);
        let classified = spec.classify(&OpenWater, 100, |_, _| {}).unwrap();
        assert_eq!(classified.water.len(), 4);
        assert!(classified.land.is_empty());
    }
}
