//! Needle-pattern construction: four plate detections (one primary, three
//! secondaries) reduced to distance, magnitude and position-angle
//! relationships between the primary and each secondary

use crate::geometry;
use crate::solver::config::Tolerances;
use crate::PlateObject;

//tp NeedleSecondary
/// A tolerance window around one measured plate quantity
#[derive(Debug, Clone, Copy)]
pub struct NeedleSecondary {
    pub plate_actual: f64,
    pub pattern_min: f64,
    pub pattern_max: f64,
}

impl NeedleSecondary {
    fn symmetric(plate_actual: f64, tol: f64) -> Self {
        Self {
            plate_actual,
            pattern_min: plate_actual - tol,
            pattern_max: plate_actual + tol,
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.pattern_min && v <= self.pattern_max
    }
}

//tp Needle
/// One secondary's contribution to the pattern: its distance and
/// magnitude windows relative to the primary, and a position-angle window
/// expressed as the difference against the *previous* needle (cyclically),
/// plus a flipped twin admitting the pattern's mirror image
#[derive(Debug, Clone, Copy)]
pub struct Needle {
    pub distance: NeedleSecondary,
    pub mag: NeedleSecondary,
    pub pa_min: f64,
    pub pa_max: f64,
    pub pa_min_flipped: f64,
    pub pa_max_flipped: f64,
}

//tp Pattern
/// A four-star asterism pulled from a sliding window of plate detections
#[derive(Debug, Clone)]
pub struct Pattern {
    pub primary: PlateObject,
    pub secondaries: [PlateObject; 3],
    pub needles: [Needle; 3],
}

impl Pattern {
    //cp build
    /// Build a pattern from a 4-element window, `window[0]` the primary
    pub fn build(window: &[PlateObject], tol: &Tolerances) -> Self {
        assert_eq!(window.len(), 4);
        let primary = window[0];
        let secondaries = [window[1], window[2], window[3]];

        let pa_actual: Vec<f64> = secondaries
            .iter()
            .map(|s| geometry::plate_pa(s.xy(), primary.xy()))
            .collect();

        let mut needles = [Needle {
            distance: NeedleSecondary::symmetric(0.0, 0.0),
            mag: NeedleSecondary::symmetric(0.0, 0.0),
            pa_min: 0.0,
            pa_max: 0.0,
            pa_min_flipped: 0.0,
            pa_max_flipped: 0.0,
        }; 3];

        for i in 0..3 {
            let sec = secondaries[i];
            let dist = geometry::plate_distance(sec.xy(), primary.xy()).sqrt();
            let mag = -2.5 * (sec.adu_or_one() / primary.adu_or_one()).log10();
            let distance = NeedleSecondary::symmetric(dist, tol.dist);
            let mag_needle = NeedleSecondary::symmetric(mag, tol.mag);

            let prev = (i + 2) % 3;
            let delta = geometry::quadrant_normalize(pa_actual[i] - pa_actual[prev]);
            let pa_min = delta - tol.pa;
            let pa_max = delta + tol.pa;
            let pa_min_flipped = geometry::quadrant_normalize(std::f64::consts::TAU - pa_max);
            let pa_max_flipped = geometry::quadrant_normalize(std::f64::consts::TAU - pa_min);

            needles[i] = Needle {
                distance,
                mag: mag_needle,
                pa_min,
                pa_max,
                pa_min_flipped,
                pa_max_flipped,
            };
        }

        Self {
            primary,
            secondaries,
            needles,
        }
    }
}

//fp windows
/// Every 4-element sliding window over detections sorted by intensity
/// descending
pub fn windows(plate_objects: &[PlateObject]) -> Vec<Vec<PlateObject>> {
    let mut sorted = plate_objects.to_vec();
    sorted.sort_by(|a, b| b.adu.cmp(&a.adu));
    if sorted.len() < 4 {
        return vec![];
    }
    (0..=sorted.len() - 4)
        .map(|start| sorted[start..start + 4].to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_slide_over_intensity_sorted_detections() {
        let objs = vec![
            PlateObject::new(0.0, 0.0, 10),
            PlateObject::new(1.0, 0.0, 90),
            PlateObject::new(2.0, 0.0, 50),
            PlateObject::new(3.0, 0.0, 80),
            PlateObject::new(4.0, 0.0, 20),
        ];
        let w = windows(&objs);
        assert_eq!(w.len(), 2);
        assert_eq!(w[0][0].adu, 90);
    }

    #[test]
    fn pattern_distance_needle_matches_self() {
        let window = vec![
            PlateObject::new(0.0, 0.0, 100),
            PlateObject::new(10.0, 0.0, 50),
            PlateObject::new(0.0, 10.0, 40),
            PlateObject::new(7.0, 7.0, 30),
        ];
        let tol = Tolerances::default();
        let pattern = Pattern::build(&window, &tol);
        assert!(pattern.needles[0].distance.contains(10.0));
    }
}
