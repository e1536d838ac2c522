//! Integration tests for region clipping combined with predicate search
//! against a schema-bearing catalog.

use star_catalog_core::schema::{CType, FieldValue};
use star_catalog_core::{Catalog, CatalogBuilder, CatalogObject, Comparison, ExpressionBuilder, Htm, Schema};

fn named_catalog() -> Catalog {
    let htm = Htm::build(5).unwrap();
    let mut schema = Schema::new();
    schema.add_field("Vmag", "V", CType::Float, "mag");
    schema.add_field("Name", "N", CType::Str, "");
    let mut builder = CatalogBuilder::new(htm, schema);
    let rows = [
        (0.0, 0.0, 1.0, 1.0_f32, "Alpha"),
        (0.01, 0.0, 2.0, 4.5_f32, "Beta"),
        (0.02, 0.0, 3.0, 9.0_f32, "Gamma"),
        (3.0, 1.0, 0.5, 2.0_f32, "Delta"),
    ];
    for (i, &(ra, dec, mag, vmag, name)) in rows.iter().enumerate() {
        let obj = CatalogObject::new(i as u64, ra, dec, mag).unwrap().with_extra(vec![
            FieldValue::Float(vmag),
            FieldValue::Str(name.to_string()),
        ]);
        builder.insert_located(obj).unwrap();
    }
    builder.build().unwrap()
}

#[test]
fn clip_restricts_to_the_requested_region() {
    let cat = named_catalog();
    let set = cat.clip(0.01, 0.0, 0.05, 0, 5).unwrap();
    // Delta sits far from the cluster of the other three.
    assert_eq!(set.object_count(), 3);
}

#[test]
fn clip_whole_sky_finds_everything() {
    let cat = named_catalog();
    let set = cat.clip(0.0, 0.0, std::f64::consts::PI, 0, 5).unwrap();
    assert_eq!(set.object_count(), 4);
}

#[test]
fn predicate_filters_a_clipped_region() {
    let cat = named_catalog();
    let set = cat.clip(0.0, 0.0, std::f64::consts::PI, 0, 5).unwrap();
    let mut b = ExpressionBuilder::new();
    b.push_comparator(cat.schema(), "Vmag", Comparison::Lt, "5.0").unwrap();
    let expr = b.finish().unwrap();
    let (matched, diagnostics) = set.search(&expr);
    let ids: Vec<u64> = matched.iter().map(|o| o.id()).collect();
    assert_eq!(ids, vec![0, 1, 3]);
    assert_eq!(diagnostics.objects_tested, 4);
    assert_eq!(diagnostics.objects_matched, 3);
    assert_eq!(diagnostics.trixels_visited, set.trixel_count());
}

#[test]
fn string_prefix_predicate() {
    let cat = named_catalog();
    let set = cat.clip(0.0, 0.0, std::f64::consts::PI, 0, 5).unwrap();
    let mut b = ExpressionBuilder::new();
    b.push_comparator(cat.schema(), "Name", Comparison::Eq, "Be*").unwrap();
    let expr = b.finish().unwrap();
    let (matched, diagnostics) = set.search(&expr);
    let ids: Vec<u64> = matched.iter().map(|o| o.id()).collect();
    assert_eq!(ids, vec![1]);
    assert_eq!(diagnostics.objects_matched, 1);
}

#[test]
fn unknown_field_is_rejected() {
    let cat = named_catalog();
    let mut b = ExpressionBuilder::new();
    let err = b.push_comparator(cat.schema(), "NoSuchField", Comparison::Eq, "x");
    assert!(err.is_err());
}
