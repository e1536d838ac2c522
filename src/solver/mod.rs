//! # Asterism plate solver
//!
//! Matches an unlabeled set of plate detections against a catalog by
//! building a four-star "needle" pattern from the brightest plate
//! detections and scanning a magnitude-sorted catalog haystack for a
//! matching primary and three secondaries, then uses the best match to
//! back-solve equatorial positions and magnitudes for every detection.

pub mod config;
mod backsolve;
mod haystack;
mod pattern;
mod stages;

pub use config::{Constraints, Tolerances};
pub use haystack::Haystack;
pub use pattern::Pattern;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use rayon::prelude::*;

use crate::diag::Diagnostics;
use crate::error::{Error, Result};
use crate::objectset::ObjectSet;
use crate::{CatalogObject, PlateObject, Vec3};

//tp SolvedObject
/// A lightweight, owned snapshot of a catalog object, used so the solver's
/// solutions table does not need to borrow from the catalog
#[derive(Debug, Clone, Copy)]
pub struct SolvedObject {
    pub id: u64,
    pub ra: f64,
    pub dec: f64,
    pub mag: f64,
    pub vector: Vec3,
}

impl From<&CatalogObject> for SolvedObject {
    fn from(o: &CatalogObject) -> Self {
        Self {
            id: o.id(),
            ra: o.ra(),
            dec: o.dec(),
            mag: o.mag(),
            vector: *o.vector(),
        }
    }
}

//tp Divergence
/// A solution's divergence score: lower is a better match
#[derive(Debug, Clone, Copy, Default)]
pub struct Divergence {
    pub mag: f64,
    pub distance: f64,
    pub pa: f64,
    pub total: f64,
}

//tp Solution
/// A candidate match: a primary and three secondaries, each paired with
/// the plate detection it stands for
#[derive(Debug, Clone)]
pub struct Solution {
    pub objects: [SolvedObject; 4],
    pub plate: [PlateObject; 4],
    pub rad_per_pixel: f64,
    pub flip: bool,
    pub divergence: Divergence,
}

impl Solution {
    fn dedup_key(&self) -> [u64; 4] {
        let mut ids = [
            self.objects[0].id,
            self.objects[1].id,
            self.objects[2].id,
            self.objects[3].id,
        ];
        ids.sort_unstable();
        ids
    }
}

//tp Reference
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    pub object: SolvedObject,
    pub plate: PlateObject,
}

//tp ReferenceStats
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceStats {
    pub mag_sigma: f64,
    pub pos_sigma: f64,
    pub clipped: bool,
}

//tp SolvedPosition
/// A plate detection's derived equatorial position and magnitude
#[derive(Debug, Clone, Copy)]
pub struct SolvedPosition {
    pub plate: PlateObject,
    pub ra: f64,
    pub dec: f64,
    pub mag: f64,
    pub is_reference: bool,
}

//tp FindMode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindMode {
    First,
    All,
}

//tp SolveResult
pub struct SolveResult {
    pub solutions: Vec<Solution>,
    pub diagnostics: Diagnostics,
}

//tp BackSolveResult
pub struct BackSolveResult {
    pub reference_stats: [ReferenceStats; 4],
    pub positions: Vec<SolvedPosition>,
    pub rounds: usize,
}

//tp Solver
/// Runs the plate solver against a clipped region of a catalog
pub struct Solver<'c> {
    region: &'c ObjectSet<'c>,
    tolerances: Tolerances,
    constraints: Constraints,
}

impl<'c> Solver<'c> {
    pub fn new(region: &'c ObjectSet<'c>, tolerances: Tolerances, constraints: Constraints) -> Self {
        Self {
            region,
            tolerances,
            constraints,
        }
    }

    //mp solve
    /// Search `plate_objects` for matches, cooperatively cancellable via
    /// `cancel`
    pub fn solve(
        &self,
        plate_objects: &[PlateObject],
        mode: FindMode,
        cancel: &AtomicBool,
    ) -> Result<SolveResult> {
        if plate_objects.len() < config::MIN_PLATE_OBJECTS {
            return Err(Error::TooFewPlateObjects {
                have: plate_objects.len(),
                need: config::MIN_PLATE_OBJECTS,
            });
        }

        let haystack = Haystack::build(self.region.objects(), &self.constraints);
        let mut diagnostics = Diagnostics::new();
        let solutions_table: Mutex<Vec<Solution>> = Mutex::new(Vec::new());
        let mut table_full = false;

        'windows: for window in pattern::windows(plate_objects) {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            let pattern = Pattern::build(&window, &self.tolerances);
            let found_any = AtomicBool::new(false);

            let primaries = haystack.objects();
            let per_primary: Vec<Vec<_>> = primaries
                .par_iter()
                .map(|p| {
                    if cancel.load(Ordering::Relaxed) {
                        return vec![];
                    }
                    if mode == FindMode::First && found_any.load(Ordering::Relaxed) {
                        return vec![];
                    }
                    let matches = stages::try_primary(p, &haystack, &pattern, &self.tolerances);
                    if !matches.is_empty() {
                        found_any.store(true, Ordering::Relaxed);
                    }
                    matches
                })
                .collect();

            diagnostics.primaries_tried += primaries.len();

            let mut table = solutions_table.lock().unwrap();
            'matches: for matches in per_primary {
                for (primary, secondaries, rad_per_pixel, flip, divergence) in matches {
                    diagnostics.raw_solutions += 1;
                    if table.len() >= config::MAX_RT_SOLUTIONS {
                        table_full = true;
                        break 'matches;
                    }
                    let solution = Solution {
                        objects: [primary, secondaries[0], secondaries[1], secondaries[2]],
                        plate: [pattern.primary, pattern.secondaries[0], pattern.secondaries[1], pattern.secondaries[2]],
                        rad_per_pixel,
                        flip,
                        divergence,
                    };
                    if !table.iter().any(|s| s.dedup_key() == solution.dedup_key()) {
                        table.push(solution);
                    }
                }
            }
            drop(table);

            if table_full {
                break 'windows;
            }
            if mode == FindMode::First && found_any.load(Ordering::Relaxed) {
                break;
            }
        }

        if table_full {
            return Err(Error::SolutionTableFull);
        }

        let mut solutions = solutions_table.into_inner().unwrap();
        solutions.sort_by(|a, b| a.divergence.total.partial_cmp(&b.divergence.total).unwrap());
        solutions.truncate(config::MAX_RT_SOLUTIONS);

        Ok(SolveResult {
            solutions,
            diagnostics,
        })
    }

    //mp back_solve
    /// Promote `solution`'s four matches to reference objects, sigma-clip
    /// them, and derive a position and magnitude for every plate detection
    pub fn back_solve(&self, solution: &Solution, plate_objects: &[PlateObject]) -> BackSolveResult {
        let refs: Vec<Reference> = (0..4)
            .map(|i| Reference {
                object: solution.objects[i],
                plate: solution.plate[i],
            })
            .collect();

        let (clipped, stats_vec, rounds) = backsolve::sigma_clip(&refs);
        let mut reference_stats = [ReferenceStats::default(); 4];
        reference_stats.copy_from_slice(&stats_vec[..4]);

        let unclipped: Vec<usize> = (0..4).filter(|&i| !clipped[i]).collect();
        let reference_plate_ids: std::collections::HashSet<(i64, i64)> = refs
            .iter()
            .map(|r| (r.plate.x as i64, r.plate.y as i64))
            .collect();

        let mut positions = Vec::with_capacity(plate_objects.len());
        for &plate in plate_objects {
            let is_reference = reference_plate_ids.contains(&(plate.x as i64, plate.y as i64));
            let (ra, dec) = self.average_position(&refs, &unclipped, plate);
            let mag = self.average_magnitude(&refs, &unclipped, plate);
            positions.push(SolvedPosition {
                plate,
                ra,
                dec,
                mag,
                is_reference,
            });
        }

        BackSolveResult {
            reference_stats,
            positions,
            rounds,
        }
    }

    fn average_position(&self, refs: &[Reference], unclipped: &[usize], target: PlateObject) -> (f64, f64) {
        let mut sum_x = 0.0;
        let mut sum_y = 0.0;
        let mut sum_z = 0.0;
        let mut n = 0;
        for a in 0..unclipped.len() {
            for b in 0..unclipped.len() {
                if a == b {
                    continue;
                }
                let r1 = &refs[unclipped[a]];
                let r2 = &refs[unclipped[b]];
                let (ra, dec) = backsolve::posn_plate_to_equ(
                    r1.object.ra,
                    r1.object.dec,
                    r1.plate.xy(),
                    r2.object.ra,
                    r2.object.dec,
                    r2.plate.xy(),
                    target.xy(),
                );
                let v = crate::geometry::unit_vector(ra, dec);
                sum_x += v[0];
                sum_y += v[1];
                sum_z += v[2];
                n += 1;
            }
        }
        if n == 0 {
            return (0.0, 0.0);
        }
        let len = (sum_x * sum_x + sum_y * sum_y + sum_z * sum_z).sqrt();
        let (x, y, z) = (sum_x / len, sum_y / len, sum_z / len);
        let ra = crate::geometry::quadrant_normalize(y.atan2(x));
        let dec = z.clamp(-1.0, 1.0).asin();
        (ra, dec)
    }

    fn average_magnitude(&self, refs: &[Reference], unclipped: &[usize], target: PlateObject) -> f64 {
        if unclipped.is_empty() {
            return 0.0;
        }
        let sum: f64 = unclipped
            .iter()
            .map(|&i| {
                let r = &refs[i];
                r.object.mag + plate_mag_diff(r.plate, target)
            })
            .sum();
        sum / unclipped.len() as f64
    }
}

fn plate_mag_diff(p1: PlateObject, p2: PlateObject) -> f64 {
    -2.5 * (p1.adu_or_one() / p2.adu_or_one()).log10()
}
