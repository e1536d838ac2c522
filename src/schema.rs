//! # Catalog schema
//!
//! Describes the extra, opaque fields a [crate::CatalogObject] may carry
//! beyond its required designation/position/sort-key, and the type tag the
//! predicate evaluator (`search`) consults to pick a typed comparator.

use serde::{Deserialize, Serialize};

//a CType
//tp CType
/// The type tag of a schema field
///
/// `DoubleAsDegrees` fields are stored internally in radians; only the
/// *string* value a search comparator is built from is in degrees, and is
/// converted to radians once at compile time (see `search::Comparator`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CType {
    Int,
    Short,
    Float,
    Double,
    DoubleAsDegrees,
    Str,
    /// A compound angle piece (e.g. hours/minutes/seconds) parsed only
    /// during import; unsupported as a comparator target
    AnglePiece,
    /// The minor-planet-centre packed date type; unsupported as a
    /// comparator target
    McpDate,
}

impl CType {
    /// A human-readable name, used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            CType::Int => "int",
            CType::Short => "short",
            CType::Float => "float",
            CType::Double => "double",
            CType::DoubleAsDegrees => "double-as-degrees",
            CType::Str => "string",
            CType::AnglePiece => "angle-piece",
            CType::McpDate => "mcp-date",
        }
    }

    /// Whether a comparator can be compiled against a field of this ctype
    pub fn supports_comparator(&self) -> bool {
        !matches!(self, CType::AnglePiece | CType::McpDate)
    }
}

//a FieldValue
//tp FieldValue
/// A single extra field's value on a [crate::CatalogObject]
///
/// `Double` and `DoubleAsDegrees` share this representation: both are
/// stored as radians once imported, the ctype only affects how a
/// *comparator's* literal is parsed (see [CType])
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Short(i16),
    Float(f32),
    Double(f64),
    Str(String),
}

impl FieldValue {
    /// The ctype that produced this value, used to validate a comparator
    /// is being pushed against a field of matching type
    pub fn ctype(&self) -> CType {
        match self {
            FieldValue::Int(_) => CType::Int,
            FieldValue::Short(_) => CType::Short,
            FieldValue::Float(_) => CType::Float,
            FieldValue::Double(_) => CType::Double,
            FieldValue::Str(_) => CType::Str,
        }
    }
}

//a SchemaField
//tp SchemaField
/// One field of a catalog's schema: a name, a short symbol, its index
/// within an object's extra-field array (the schema's "offset" in
/// spec terms; this core stores objects by value rather than packed bytes,
/// so the index into `CatalogObject::extra` stands in for a byte offset),
/// its ctype, and a units string kept as metadata only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub symbol: String,
    pub offset: usize,
    pub ctype: CType,
    pub units: String,
}

impl SchemaField {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        offset: usize,
        ctype: CType,
        units: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            offset,
            ctype,
            units: units.into(),
        }
    }
}

//a Schema
//tp Schema
/// A catalog's schema: the set of extra fields its objects carry, looked
/// up by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    fields: Vec<SchemaField>,
}

impl Schema {
    //cp new
    pub fn new() -> Self {
        Self { fields: vec![] }
    }

    //mp add_field
    /// Add a field to the schema; its `offset` is assigned as the next free
    /// index into every object's extra-field array
    pub fn add_field(
        &mut self,
        name: impl Into<String>,
        symbol: impl Into<String>,
        ctype: CType,
        units: impl Into<String>,
    ) -> usize {
        let offset = self.fields.len();
        self.fields
            .push(SchemaField::new(name, symbol, offset, ctype, units));
        offset
    }

    //mp field
    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    //mp num_fields
    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    //mp fields
    pub fn fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_name() {
        let mut s = Schema::new();
        s.add_field("DEdeg", "DE", CType::DoubleAsDegrees, "deg");
        s.add_field("Vmag", "V", CType::Float, "mag");
        assert_eq!(s.field("Vmag").unwrap().offset, 1);
        assert!(s.field("missing").is_none());
    }
}
