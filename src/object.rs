//a Imports
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geometry;
use crate::schema::FieldValue;
use crate::Vec3;

//a CatalogObject and CatalogObjectSerialized
//tp CatalogObjectSerialized
/// The representation used when a [CatalogObject] is serialized
///
/// This is a tuple, as for the teacher crate's `StarSerialized`, to avoid
/// repeating field names for every object in a large catalog; the derived
/// Cartesian vector is recomputed on load rather than stored
#[derive(Debug, Serialize, Deserialize)]
pub struct CatalogObjectSerialized(
    u64,
    Option<String>,
    f64,
    f64,
    f64,
    Vec<FieldValueSerialized>,
);

/// Serde-friendly mirror of [FieldValue] (an externally tagged enum rather
/// than a derive on the public type, so the public API can evolve the
/// variant names independently of the wire format)
#[derive(Debug, Serialize, Deserialize)]
enum FieldValueSerialized {
    I(i64),
    S(i16),
    F(f32),
    D(f64),
    Str(String),
}

impl From<&FieldValue> for FieldValueSerialized {
    fn from(v: &FieldValue) -> Self {
        match v {
            FieldValue::Int(x) => Self::I(*x),
            FieldValue::Short(x) => Self::S(*x),
            FieldValue::Float(x) => Self::F(*x),
            FieldValue::Double(x) => Self::D(*x),
            FieldValue::Str(x) => Self::Str(x.clone()),
        }
    }
}
impl From<FieldValueSerialized> for FieldValue {
    fn from(v: FieldValueSerialized) -> Self {
        match v {
            FieldValueSerialized::I(x) => Self::Int(x),
            FieldValueSerialized::S(x) => Self::Short(x),
            FieldValueSerialized::F(x) => Self::Float(x),
            FieldValueSerialized::D(x) => Self::Double(x),
            FieldValueSerialized::Str(x) => Self::Str(x),
        }
    }
}

//tp CatalogObject
/// A single record in a catalog
///
/// Required attributes are a numeric id (and optional short designation),
/// an equatorial position in radians, and a sort key interpreted so that
/// smaller is brighter. Any other schema-described fields are carried in
/// `extra`, indexed by [crate::schema::SchemaField::offset]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "CatalogObjectSerialized", into = "CatalogObjectSerialized")]
pub struct CatalogObject {
    id: u64,
    designation: Option<String>,
    ra: f64,
    dec: f64,
    sort_key: f64,
    vector: Vec3,
    extra: Vec<FieldValue>,
}

impl From<CatalogObject> for CatalogObjectSerialized {
    fn from(o: CatalogObject) -> Self {
        let extra = o.extra.iter().map(FieldValueSerialized::from).collect();
        CatalogObjectSerialized(o.id, o.designation, o.ra, o.dec, o.sort_key, extra)
    }
}
impl TryFrom<CatalogObjectSerialized> for CatalogObject {
    type Error = Error;
    fn try_from(s: CatalogObjectSerialized) -> Result<Self> {
        let extra = s.5.into_iter().map(FieldValue::from).collect();
        let mut o = CatalogObject::new(s.0, s.2, s.3, s.4)?;
        o.designation = s.1;
        o.extra = extra;
        Ok(o)
    }
}

//ip CatalogObject
impl CatalogObject {
    //cp new
    /// Create a new object given its id, position and sort key (brightness)
    ///
    /// Returns `Error::InvalidCoordinate` if `ra`/`dec` are out of range, so
    /// malformed catalog input (CSV rows, JSON records) surfaces as a typed
    /// error rather than aborting the process
    ///
    /// # Panics
    /// Panics if `sort_key` is not finite; this is an invariant of the data
    /// model (spec.md section 3), not a recoverable runtime condition for a
    /// value constructed by the importer
    pub fn new(id: u64, ra: f64, dec: f64, sort_key: f64) -> Result<Self> {
        if !(0.0..std::f64::consts::TAU).contains(&ra)
            || !(-std::f64::consts::FRAC_PI_2..=std::f64::consts::FRAC_PI_2).contains(&dec)
        {
            return Err(Error::InvalidCoordinate { ra, dec });
        }
        assert!(sort_key.is_finite(), "sort_key must be finite");
        let vector = geometry::unit_vector(ra, dec);
        Ok(Self {
            id,
            designation: None,
            ra,
            dec,
            sort_key,
            vector,
            extra: vec![],
        })
    }

    //cp with_designation
    pub fn with_designation(mut self, designation: impl Into<String>) -> Self {
        self.designation = Some(designation.into());
        self
    }

    //cp with_extra
    pub fn with_extra(mut self, extra: Vec<FieldValue>) -> Self {
        self.extra = extra;
        self
    }

    //ap accessors
    pub fn id(&self) -> u64 {
        self.id
    }
    pub fn designation(&self) -> Option<&str> {
        self.designation.as_deref()
    }
    pub fn ra(&self) -> f64 {
        self.ra
    }
    pub fn dec(&self) -> f64 {
        self.dec
    }
    /// The sort key (brightness or size); smaller means brighter when used
    /// as a magnitude
    pub fn sort_key(&self) -> f64 {
        self.sort_key
    }
    /// Alias for [Self::sort_key] for the common case of a magnitude-sorted
    /// catalog, used throughout the plate solver
    pub fn mag(&self) -> f64 {
        self.sort_key
    }
    pub fn vector(&self) -> &Vec3 {
        &self.vector
    }
    pub fn extra(&self) -> &[FieldValue] {
        &self.extra
    }
    pub fn extra_field(&self, offset: usize) -> Option<&FieldValue> {
        self.extra.get(offset)
    }

    //mp cos_angle_between
    pub fn cos_angle_between(&self, other: &CatalogObject) -> f64 {
        geometry::dot(&self.vector, &other.vector)
    }

    //mp equ_distance
    pub fn equ_distance(&self, other: &CatalogObject) -> f64 {
        geometry::equ_distance(&self.vector, &other.vector)
    }

    //mp equ_pa
    pub fn equ_pa(&self, other: &CatalogObject) -> f64 {
        geometry::equ_pa(self.ra, self.dec, other.ra, other.dec)
    }

    //mp is_zeroed
    /// True if ra, dec and sort key are all exactly zero
    ///
    /// Used by the solver's haystack preparation as the import-error guard
    /// spec.md section 4.5.2 describes
    pub fn is_zeroed(&self) -> bool {
        self.ra == 0.0 && self.dec == 0.0 && self.sort_key == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_serde() {
        let o = CatalogObject::new(42, 1.0, 0.3, 5.5).unwrap().with_designation("HIP42");
        let s = serde_json::to_string(&o).unwrap();
        let o2: CatalogObject = serde_json::from_str(&s).unwrap();
        assert_eq!(o2.id(), 42);
        assert_eq!(o2.designation(), Some("HIP42"));
        assert!((o2.ra() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_coordinate_is_an_error() {
        assert!(CatalogObject::new(1, -0.1, 0.0, 1.0).is_err());
        assert!(CatalogObject::new(1, 0.0, std::f64::consts::PI, 1.0).is_err());
    }

    #[test]
    fn bad_coordinate_rejected_through_deserialize() {
        let s = r#"[99, null, -0.1, 0.0, 1.0, []]"#;
        let result: std::result::Result<CatalogObject, _> = serde_json::from_str(s);
        assert!(result.is_err());
    }

    #[test]
    fn vector_matches_ra_dec() {
        let o = CatalogObject::new(1, 0.0, 0.0, 1.0).unwrap();
        assert!((o.vector()[0] - 1.0).abs() < 1e-9);
    }
}
