//! # Geometry kernel
//!
//! Deterministic, side-effect-free spherical and planar geometry used by
//! every other module: the HTM mesh folds the sphere onto an octahedron for
//! fast containment tests, the k-d tree and search/solver code want plain
//! great-circle distances and position angles, and the plate solver wants
//! the planar pixel equivalents.

//a Imports
use geo_nd::{Vector, Vector3};

use crate::{PlateXy, Vec3};

//a Spherical <-> Cartesian
//fp unit_vector
/// The plain Cartesian unit vector of a right ascension / declination pair
pub fn unit_vector(ra: f64, dec: f64) -> Vec3 {
    let vx = ra.cos() * dec.cos();
    let vy = ra.sin() * dec.cos();
    let vz = dec.sin();
    [vx, vy, vz].into()
}

//fp octahedron_fold
/// Map a vector onto the octahedron used by the HTM, preserving sign:
/// `s -> sign(s) * |s|^2`, component-wise
///
/// This bends the faces of the unit sphere flat, so that a trixel's three
/// vertices and the great-circle arcs between them become straight lines
/// and containment reduces to three planar cross products
pub fn octahedron_fold(v: &Vec3) -> Vec3 {
    let f = |s: f64| s * s.abs();
    [f(v[0]), f(v[1]), f(v[2])].into()
}

//fp octahedron_unfold
/// Inverse of [octahedron_fold]: `s -> sign(s) * sqrt(|s|)`
fn octahedron_unfold(v: &Vec3) -> Vec3 {
    let f = |s: f64| s.signum() * s.abs().sqrt();
    [f(v[0]), f(v[1]), f(v[2])].into()
}

//fp fold_unit_vector
/// The HTM's folded unit vector of a right ascension / declination pair
pub fn fold_unit_vector(ra: f64, dec: f64) -> Vec3 {
    octahedron_fold(&unit_vector(ra, dec))
}

//fp spherical_from_octahedron
/// Inverse of [fold_unit_vector]: given a point in octahedron-folded space
/// (not necessarily of unit length), recover `(ra, dec)` with `ra`
/// normalized to `[0, 2*PI)`
pub fn spherical_from_octahedron(v: &Vec3) -> (f64, f64) {
    let u = octahedron_unfold(v).normalize();
    let ra = quadrant_normalize(u[1].atan2(u[0]));
    let dec = u[2].clamp(-1.0, 1.0).asin();
    (ra, dec)
}

//fp midpoint
/// The arithmetic midpoint of two points in octahedron-folded space; the
/// result is *not* renormalized, matching the HTM construction algorithm
/// which only normalizes once the midpoint is converted back to `(ra, dec)`
pub fn midpoint(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        (a[0] + b[0]) * 0.5,
        (a[1] + b[1]) * 0.5,
        (a[2] + b[2]) * 0.5,
    ]
    .into()
}

//fp dot
/// Dot product of two vectors
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a.dot(b)
}

//fp cross
/// Cross product of two vectors
pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    a.cross_product(b)
}

//a Angular distance and bearing
//fp equ_distance
/// Great-circle distance in radians between two points given as plain
/// Cartesian unit vectors, via `atan2(|cross|, dot)`
///
/// This is numerically stable for both very small and near-antipodal
/// separations, unlike a naive `acos(dot)`
pub fn equ_distance(v1: &Vec3, v2: &Vec3) -> f64 {
    let n = cross(v1, v2);
    n.length().atan2(dot(v1, v2))
}

//fp equ_pa
/// Position angle (bearing, radians, measured from north through east) from
/// `(ra1, dec1)` to `(ra2, dec2)`
///
/// `o2` is projected onto the tangent plane at `o1` using the local
/// north/east basis there, and `atan2` of the east/north components gives
/// the bearing directly
pub fn equ_pa(ra1: f64, dec1: f64, ra2: f64, dec2: f64) -> f64 {
    let v2 = unit_vector(ra2, dec2);
    let north: Vec3 = [
        -dec1.sin() * ra1.cos(),
        -dec1.sin() * ra1.sin(),
        dec1.cos(),
    ]
    .into();
    let east: Vec3 = [-ra1.sin(), ra1.cos(), 0.0].into();
    let y = dot(&v2, &north);
    let x = dot(&v2, &east);
    quadrant_normalize(x.atan2(y))
}

//fp quadrant_normalize
/// Wrap an angle in radians to `[0, 2*PI)`
pub fn quadrant_normalize(theta: f64) -> f64 {
    let two_pi = std::f64::consts::TAU;
    let r = theta % two_pi;
    if r < 0.0 {
        r + two_pi
    } else {
        r
    }
}

//a Plate (pixel) geometry
//fp plate_distance
/// Squared Euclidean pixel distance between two plate points
///
/// The solver consistently uses the squared form; callers must not mix
/// this with the (rooted) catalog-space distance
pub fn plate_distance(p1: PlateXy, p2: PlateXy) -> f64 {
    let dx = p1.0 - p2.0;
    let dy = p1.1 - p2.1;
    dx * dx + dy * dy
}

//fp plate_pa
/// Position angle in pixel space from `p2` to `p1`, `atan2(y1-y2, x1-x2)`
pub fn plate_pa(p1: PlateXy, p2: PlateXy) -> f64 {
    quadrant_normalize((p1.1 - p2.1).atan2(p1.0 - p2.0))
}

//a Tests
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_unfold_round_trips() {
        for &(ra, dec) in &[
            (0.3, 0.2),
            (3.0, -0.9),
            (5.9, 0.0),
            (0.0, std::f64::consts::FRAC_PI_2 - 1e-6),
        ] {
            let folded = fold_unit_vector(ra, dec);
            let (ra2, dec2) = spherical_from_octahedron(&folded);
            assert!((ra - ra2).abs() < 1e-9, "ra {ra} vs {ra2}");
            assert!((dec - dec2).abs() < 1e-9, "dec {dec} vs {dec2}");
        }
    }

    #[test]
    fn equ_distance_is_symmetric_and_zero_for_self() {
        let v1 = unit_vector(0.5, 0.3);
        let v2 = unit_vector(1.1, -0.2);
        assert!(equ_distance(&v1, &v1) < 1e-12);
        assert!((equ_distance(&v1, &v2) - equ_distance(&v2, &v1)).abs() < 1e-12);
    }

    #[test]
    fn equ_distance_matches_known_right_angle() {
        let v1 = unit_vector(0.0, 0.0);
        let v2 = unit_vector(std::f64::consts::FRAC_PI_2, 0.0);
        let d = equ_distance(&v1, &v2);
        assert!((d - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn quadrant_normalize_wraps() {
        assert!((quadrant_normalize(-0.1) - (std::f64::consts::TAU - 0.1)).abs() < 1e-12);
        assert!((quadrant_normalize(std::f64::consts::TAU + 0.2) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn plate_pa_matches_atan2_convention() {
        let pa = plate_pa((1.0, 1.0), (0.0, 0.0));
        assert!((pa - std::f64::consts::FRAC_PI_4).abs() < 1e-12);
    }
}
