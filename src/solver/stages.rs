//! Magnitude, distance and position-angle filter stages run for one
//! candidate primary against one needle pattern

use crate::geometry;
use crate::solver::config::{Tolerances, MAX_ACTUAL_MATCHES, MAX_POTENTIAL_MATCHES};
use crate::solver::haystack::Haystack;
use crate::solver::pattern::Pattern;
use crate::solver::{Divergence, SolvedObject};
use crate::CatalogObject;

struct DistanceCandidate {
    indices: [usize; 3],
    rad_per_pixel: f64,
    divergence: f64,
}

//fp try_primary
/// Try `p` as the pattern's primary; returns every surviving match
/// (candidate secondaries, rotation/flip, and divergence score)
pub fn try_primary(
    p: &CatalogObject,
    haystack: &Haystack,
    pattern: &Pattern,
    tol: &Tolerances,
) -> Vec<(SolvedObject, [SolvedObject; 3], f64, bool, Divergence)> {
    let mut ranges = [(0usize, 0usize); 3];
    for i in 0..3 {
        let lower = p.mag() + pattern.needles[i].mag.pattern_min;
        let upper = p.mag() + pattern.needles[i].mag.pattern_max;
        let range = haystack.mag_range(lower, upper);
        if range.0 == range.1 {
            return vec![];
        }
        ranges[i] = range;
    }

    let mut distance_candidates: Vec<DistanceCandidate> = Vec::new();
    'search: for i in ranges[0].0..ranges[0].1 {
        let o0 = haystack.objects()[i];
        let d1 = geometry::equ_distance(p.vector(), o0.vector());
        let plate_d1 = pattern.needles[0].distance.plate_actual;
        if plate_d1 <= 0.0 {
            continue;
        }
        let rad_per_pixel = d1 / plate_d1;
        let tol_rad = tol.dist * rad_per_pixel;

        for j in ranges[1].0..ranges[1].1 {
            let o1 = haystack.objects()[j];
            let d2 = geometry::equ_distance(p.vector(), o1.vector());
            let expected_d2 = pattern.needles[1].distance.plate_actual * rad_per_pixel;
            let dev2 = (d2 - expected_d2).abs();
            if dev2 > tol_rad {
                continue;
            }

            for k in ranges[2].0..ranges[2].1 {
                let o2 = haystack.objects()[k];
                let d3 = geometry::equ_distance(p.vector(), o2.vector());
                let expected_d3 = pattern.needles[2].distance.plate_actual * rad_per_pixel;
                let dev3 = (d3 - expected_d3).abs();
                if dev3 > tol_rad {
                    continue;
                }

                distance_candidates.push(DistanceCandidate {
                    indices: [i, j, k],
                    rad_per_pixel,
                    divergence: dev2.max(dev3),
                });
                if distance_candidates.len() >= MAX_POTENTIAL_MATCHES {
                    break 'search;
                }
            }
        }
    }

    let mut out = Vec::new();
    for cand in distance_candidates {
        let objs = [
            haystack.objects()[cand.indices[0]],
            haystack.objects()[cand.indices[1]],
            haystack.objects()[cand.indices[2]],
        ];
        let cat_pa: Vec<f64> = objs.iter().map(|o| p.equ_pa(o)).collect();

        let delta = |n: usize| {
            let prev = (n + 2) % 3;
            geometry::quadrant_normalize(cat_pa[n] - cat_pa[prev])
        };
        let non_flipped_dev = |n: usize| {
            let needle = &pattern.needles[n];
            let d = delta(n);
            let ok = d >= needle.pa_min && d <= needle.pa_max;
            ok.then(|| (d - (needle.pa_min + needle.pa_max) / 2.0).abs())
        };
        let flipped_dev = |n: usize| {
            let needle = &pattern.needles[n];
            let d = delta(n);
            let ok = d >= needle.pa_min_flipped && d <= needle.pa_max_flipped;
            ok.then(|| (d - (needle.pa_min_flipped + needle.pa_max_flipped) / 2.0).abs())
        };

        // Needle 0 decides which branch (non-flipped or flipped) the whole
        // pattern must match; needles 1 and 2 are only ever tested in that
        // same branch, so a mixed flip is rejected outright rather than
        // falling through to the other branch.
        let (flip, pa_divergence) = if let Some(dev0) = non_flipped_dev(0) {
            match (non_flipped_dev(1), non_flipped_dev(2)) {
                (Some(dev1), Some(dev2)) => (false, dev0.max(dev1).max(dev2)),
                _ => continue,
            }
        } else if let Some(dev0) = flipped_dev(0) {
            match (flipped_dev(1), flipped_dev(2)) {
                (Some(dev1), Some(dev2)) => (true, dev0.max(dev1).max(dev2)),
                _ => continue,
            }
        } else {
            continue;
        };

        let mag_divergence = (0..3)
            .map(|n| {
                let plate_diff = pattern.needles[n].mag.plate_actual;
                let cat_diff = objs[n].mag() - p.mag();
                (plate_diff - cat_diff).abs()
            })
            .sum::<f64>()
            / 3.0;

        let divergence = Divergence {
            mag: mag_divergence,
            distance: cand.divergence,
            pa: pa_divergence,
            total: 0.5 * mag_divergence + cand.divergence + pa_divergence,
        };

        out.push((
            SolvedObject::from(p),
            [
                SolvedObject::from(objs[0]),
                SolvedObject::from(objs[1]),
                SolvedObject::from(objs[2]),
            ],
            cand.rad_per_pixel,
            flip,
            divergence,
        ));
        if out.len() >= MAX_ACTUAL_MATCHES {
            break;
        }
    }
    out
}
