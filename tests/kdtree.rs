//! Integration tests for the k-d tree nearest-neighbour index, exercised
//! through [Catalog] rather than directly, since a tree is only ever built
//! from a catalog's packed object array.

use star_catalog_core::{Catalog, CatalogBuilder, CatalogObject, Htm, Schema};

fn catalog_of(positions: &[(f64, f64, f64)]) -> Catalog {
    let htm = Htm::build(4).unwrap();
    let mut builder = CatalogBuilder::new(htm, Schema::new());
    for (i, &(ra, dec, mag)) in positions.iter().enumerate() {
        builder
            .insert_located(CatalogObject::new(i as u64, ra, dec, mag).unwrap())
            .unwrap();
    }
    builder.build().unwrap()
}

#[test]
fn nearest_on_pos_ignores_magnitude() {
    let cat = catalog_of(&[(0.0, 0.0, 1.0), (0.5, 0.0, 99.0), (3.0, 1.0, 0.1)]);
    // The brightest object (id 2) is far away; nearest must still pick the
    // closest point, not the brightest one.
    let nearest = cat.nearest_on_pos(0.4, 0.0).unwrap();
    assert_eq!(nearest.id(), 1);
}

#[test]
fn nearest_on_object_excludes_self() {
    let cat = catalog_of(&[(0.0, 0.0, 1.0), (0.0001, 0.0, 1.0), (3.0, 1.0, 1.0)]);
    let target = &cat.objects()[0];
    let nearest = cat.nearest_on_object(target).unwrap();
    assert_eq!(nearest.id(), 1);
}

#[test]
fn nearest_on_empty_catalog_is_none() {
    let cat = catalog_of(&[]);
    assert!(cat.nearest_on_pos(0.0, 0.0).is_none());
}

#[test]
fn nearest_handles_antipodal_points() {
    let cat = catalog_of(&[(0.0, 0.0, 1.0), (std::f64::consts::PI, 0.0, 1.0)]);
    let nearest = cat.nearest_on_pos(0.01, 0.0).unwrap();
    assert_eq!(nearest.id(), 0);
}
