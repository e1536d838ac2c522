//! Reference-object sigma-clipping and the plate/equatorial coordinate
//! transport used to assign positions and magnitudes to every plate
//! detection once a solution's four reference objects are known

use crate::geometry;
use crate::solver::config::MAX_BACK_SOLVE_ROUNDS;
use crate::solver::{Reference, ReferenceStats};
use crate::PlateXy;

fn plate_mag_diff(p1_adu: f64, p2_adu: f64) -> f64 {
    -2.5 * (p1_adu / p2_adu).log10()
}

//fp sigma_clip
/// Iteratively sigma-clip the reference set on both magnitude and
/// position consistency; returns the final clipped mask and per-reference
/// stats, plus the number of rounds taken
pub fn sigma_clip(refs: &[Reference]) -> (Vec<bool>, Vec<ReferenceStats>, usize) {
    let n = refs.len();
    let mut clipped = vec![false; n];
    let mut stats = vec![ReferenceStats::default(); n];
    let mut rounds = 0;

    loop {
        rounds += 1;
        let mag_sigmas = per_reference_sigma(refs, &clipped, |a, b| {
            let plate = plate_mag_diff(a.plate.adu as f64, b.plate.adu as f64);
            let cat = a.object.mag - b.object.mag;
            plate - cat
        });
        let pos_sigmas = per_reference_sigma(refs, &clipped, |a, b| {
            let plate_dist = geometry::plate_distance(a.plate.xy(), b.plate.xy()).sqrt();
            if plate_dist <= 0.0 {
                return 0.0;
            }
            let cat_dist = geometry::equ_distance(&a.object.vector, &b.object.vector);
            cat_dist / plate_dist
        });

        for i in 0..n {
            stats[i].mag_sigma = mag_sigmas[i];
            stats[i].pos_sigma = pos_sigmas[i];
            stats[i].clipped = clipped[i];
        }

        let (mean_mag, std_mag) = mean_std(&mag_sigmas, &clipped);
        let (mean_pos, std_pos) = mean_std(&pos_sigmas, &clipped);

        let mut changed = false;
        for i in 0..n {
            if clipped[i] {
                continue;
            }
            let bad_mag = mag_sigmas[i] >= mean_mag + std_mag;
            let bad_pos = pos_sigmas[i] >= mean_pos + std_pos;
            if bad_mag || bad_pos {
                clipped[i] = true;
                changed = true;
            }
        }

        if !changed || rounds >= MAX_BACK_SOLVE_ROUNDS {
            break;
        }
    }
    for (i, s) in stats.iter_mut().enumerate() {
        s.clipped = clipped[i];
    }
    (clipped, stats, rounds)
}

fn per_reference_sigma(
    refs: &[Reference],
    clipped: &[bool],
    term: impl Fn(&Reference, &Reference) -> f64,
) -> Vec<f64> {
    let n = refs.len();
    let mut out = vec![0.0; n];
    for i in 0..n {
        if clipped[i] {
            continue;
        }
        let mut terms = Vec::new();
        for j in 0..n {
            if i == j || clipped[j] {
                continue;
            }
            terms.push(term(&refs[i], &refs[j]));
        }
        out[i] = std_dev(&terms);
    }
    out
}

fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn mean_std(values: &[f64], clipped: &[bool]) -> (f64, f64) {
    let active: Vec<f64> = values
        .iter()
        .zip(clipped)
        .filter(|(_, c)| !**c)
        .map(|(v, _)| *v)
        .collect();
    if active.is_empty() {
        return (0.0, 0.0);
    }
    let mean = active.iter().sum::<f64>() / active.len() as f64;
    let std = std_dev(&active);
    (mean, std)
}

//fp posn_plate_to_equ
/// Transport `target`'s plate offset from anchor `(o1, p1)` into
/// equatorial coordinates, using `(o2, p2)` to derive scale and rotation.
/// The midpoint-declination cosine term corrects right-ascension scale
/// only; this is the simpler of two possible formulations and is kept for
/// parity rather than the fully spherical alternative
pub fn posn_plate_to_equ(
    o1_ra: f64,
    o1_dec: f64,
    p1: PlateXy,
    o2_ra: f64,
    o2_dec: f64,
    p2: PlateXy,
    target: PlateXy,
) -> (f64, f64) {
    let plate_dist = geometry::plate_distance(p1, p2).sqrt();
    let cat_dist = geometry::equ_distance(
        &geometry::unit_vector(o1_ra, o1_dec),
        &geometry::unit_vector(o2_ra, o2_dec),
    );
    let scale = if plate_dist > 0.0 {
        cat_dist / plate_dist
    } else {
        0.0
    };
    let plate_bearing = geometry::plate_pa(p2, p1);
    let cat_bearing = geometry::equ_pa(o1_ra, o1_dec, o2_ra, o2_dec);
    let rotation = cat_bearing - plate_bearing;

    let dx = target.0 - p1.0;
    let dy = target.1 - p1.1;
    let d_east = scale * (dx * rotation.cos() - dy * rotation.sin());
    let d_north = scale * (dx * rotation.sin() + dy * rotation.cos());

    let mut new_dec = o1_dec + d_north;
    let mid_dec = (o1_dec + new_dec) / 2.0;
    let cos_mid = mid_dec.cos();
    let mut new_ra = if cos_mid.abs() > 1e-12 {
        o1_ra + d_east / cos_mid
    } else {
        o1_ra
    };

    if new_dec > std::f64::consts::FRAC_PI_2 {
        new_dec = std::f64::consts::PI - new_dec;
        new_ra += std::f64::consts::PI;
    } else if new_dec < -std::f64::consts::FRAC_PI_2 {
        new_dec = -std::f64::consts::PI - new_dec;
        new_ra += std::f64::consts::PI;
    }
    (geometry::quadrant_normalize(new_ra), new_dec)
}

//fp equ_to_plate
/// The inverse of [posn_plate_to_equ]: project a catalog position into
/// the plate's pixel frame given the same two anchors
pub fn equ_to_plate(
    o1_ra: f64,
    o1_dec: f64,
    p1: PlateXy,
    o2_ra: f64,
    o2_dec: f64,
    p2: PlateXy,
    target_ra: f64,
    target_dec: f64,
) -> PlateXy {
    let plate_dist = geometry::plate_distance(p1, p2).sqrt();
    let cat_dist = geometry::equ_distance(
        &geometry::unit_vector(o1_ra, o1_dec),
        &geometry::unit_vector(o2_ra, o2_dec),
    );
    let scale = if cat_dist > 0.0 {
        cat_dist / plate_dist
    } else {
        1.0
    };
    let plate_bearing = geometry::plate_pa(p2, p1);
    let cat_bearing = geometry::equ_pa(o1_ra, o1_dec, o2_ra, o2_dec);
    let rotation = cat_bearing - plate_bearing;

    let mid_dec = (o1_dec + target_dec) / 2.0;
    let d_east = (target_ra - o1_ra) * mid_dec.cos();
    let d_north = target_dec - o1_dec;

    let dx = (d_east * rotation.cos() + d_north * rotation.sin()) / scale;
    let dy = (-d_east * rotation.sin() + d_north * rotation.cos()) / scale;
    (p1.0 + dx, p1.1 + dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plate_to_equ_and_back_is_consistent() {
        let o1 = (0.5, 0.2);
        let o2 = (0.51, 0.205);
        let p1 = (100.0, 100.0);
        let p2 = (150.0, 120.0);
        let target = (130.0, 90.0);

        let (ra, dec) = posn_plate_to_equ(o1.0, o1.1, p1, o2.0, o2.1, p2, target);
        let back = equ_to_plate(o1.0, o1.1, p1, o2.0, o2.1, p2, ra, dec);
        assert!((back.0 - target.0).abs() < 1e-6);
        assert!((back.1 - target.1).abs() < 1e-6);
    }
}
