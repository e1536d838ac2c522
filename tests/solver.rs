//! Integration tests for the asterism plate solver: builds a small
//! synthetic catalog, projects four of its objects onto a plate with a
//! known pixel scale, then checks the solver recovers a matching solution.

use std::sync::atomic::AtomicBool;

use star_catalog_core::solver::{Constraints, FindMode, Solver, Tolerances};
use star_catalog_core::{Catalog, CatalogBuilder, CatalogObject, Htm, PlateObject, Schema};

fn catalog_of(objects: &[(u64, f64, f64, f64)]) -> Catalog {
    let htm = Htm::build(6).unwrap();
    let mut builder = CatalogBuilder::new(htm, Schema::new());
    for &(id, ra, dec, mag) in objects {
        builder.insert_located(CatalogObject::new(id, ra, dec, mag).unwrap()).unwrap();
    }
    builder.build().unwrap()
}

/// Orthographically projects a small field centred on `(ra0, dec0)` at
/// `rad_per_pixel`, matching the scale the solver's distance stage assumes.
fn project(ra0: f64, dec0: f64, ra: f64, dec: f64, rad_per_pixel: f64) -> (f64, f64) {
    let dx = (ra - ra0) * dec0.cos() / rad_per_pixel;
    let dy = (dec - dec0) / rad_per_pixel;
    (dx, dy)
}

#[test]
fn solves_a_clean_synthetic_asterism() {
    let ra0 = 1.0;
    let dec0 = 0.2;
    let rad_per_pixel = 1.0e-5;

    let objects = [
        (1, ra0, dec0, 1.0),
        (2, ra0 + 0.002, dec0 + 0.001, 2.0),
        (3, ra0 - 0.0015, dec0 + 0.0018, 3.0),
        (4, ra0 + 0.0008, dec0 - 0.0021, 4.0),
    ];
    let catalog = catalog_of(&objects);

    let plate_objects: Vec<PlateObject> = objects
        .iter()
        .map(|&(_, ra, dec, mag)| {
            let (x, y) = project(ra0, dec0, ra, dec, rad_per_pixel);
            PlateObject::new(x, y, (1000.0 / mag) as i64)
        })
        .collect();

    let set = catalog
        .clip(ra0, dec0, 10.0_f64.to_radians(), 0, 6)
        .unwrap();

    let tolerances = Tolerances::default().with_dist(3.0).with_mag(0.5).with_pa(0.1);
    let constraints = Constraints::default();
    let solver = Solver::new(&set, tolerances, constraints);
    let cancel = AtomicBool::new(false);
    let result = solver
        .solve(&plate_objects, FindMode::First, &cancel)
        .unwrap();

    assert!(!result.solutions.is_empty(), "expected at least one solution");
    let best = &result.solutions[0];
    let ids: Vec<u64> = best.objects.iter().map(|o| o.id).collect();
    for expected in [1, 2, 3, 4] {
        assert!(ids.contains(&expected), "solution missing object {expected}");
    }
}

#[test]
fn rejects_too_few_plate_objects() {
    let catalog = catalog_of(&[(1, 0.0, 0.0, 1.0)]);
    let set = catalog.clip(0.0, 0.0, std::f64::consts::PI, 0, 6).unwrap();
    let solver = Solver::new(&set, Tolerances::default(), Constraints::default());
    let cancel = AtomicBool::new(false);
    let plate_objects = vec![PlateObject::new(0.0, 0.0, 100), PlateObject::new(1.0, 1.0, 100)];
    let err = solver.solve(&plate_objects, FindMode::First, &cancel);
    assert!(err.is_err());
}

#[test]
fn back_solve_recovers_positions_for_non_reference_detections() {
    let ra0 = 0.5;
    let dec0 = -0.1;
    let rad_per_pixel = 1.0e-5;

    let objects = [
        (1, ra0, dec0, 1.0),
        (2, ra0 + 0.002, dec0 + 0.001, 2.0),
        (3, ra0 - 0.0015, dec0 + 0.0018, 3.0),
        (4, ra0 + 0.0008, dec0 - 0.0021, 4.0),
        (5, ra0 + 0.0003, dec0 + 0.0006, 5.0),
    ];
    let catalog = catalog_of(&objects);

    let plate_objects: Vec<PlateObject> = objects
        .iter()
        .map(|&(_, ra, dec, mag)| {
            let (x, y) = project(ra0, dec0, ra, dec, rad_per_pixel);
            PlateObject::new(x, y, (1000.0 / mag) as i64)
        })
        .collect();

    let set = catalog.clip(ra0, dec0, 10.0_f64.to_radians(), 0, 6).unwrap();
    let tolerances = Tolerances::default().with_dist(3.0).with_mag(0.5).with_pa(0.1);
    let solver = Solver::new(&set, tolerances, Constraints::default());
    let cancel = AtomicBool::new(false);
    let result = solver
        .solve(&plate_objects, FindMode::First, &cancel)
        .unwrap();
    assert!(!result.solutions.is_empty());

    let back = solver.back_solve(&result.solutions[0], &plate_objects);
    assert_eq!(back.positions.len(), plate_objects.len());
    let non_reference = back.positions.iter().find(|p| !p.is_reference).unwrap();
    let (expected_ra, expected_dec) = (objects[4].1, objects[4].2);
    assert!((non_reference.ra - expected_ra).abs() < 1.0e-3);
    assert!((non_reference.dec - expected_dec).abs() < 1.0e-3);
}
