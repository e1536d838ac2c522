//! Minimal generic CSV catalog import
//!
//! This is not a CDS-ReadMe-aware importer; it reads a header row naming
//! columns and expects `id`, `ra_deg`, `dec_deg` and `mag` to be present.
//! Any other header matching a schema field name is parsed per that
//! field's ctype and carried as an extra field, in schema order.

use crate::error::{Error, Result};
use crate::schema::{CType, FieldValue, Schema};
use crate::CatalogObject;

fn field_error(column: &str, value: &str) -> Error {
    Error::ImportFailed(format!("could not parse column {column:?} value {value:?}"))
}

//fp read_objects
/// Parse every record in `reader` into a [CatalogObject], against `schema`
pub fn read_objects<R: std::io::Read>(reader: R, schema: &Schema) -> Result<Vec<CatalogObject>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| Error::ImportFailed(e.to_string()))?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let find = |name: &str| headers.iter().position(|h| h == name);
    let id_col = find("id").ok_or_else(|| Error::ImportFailed("missing column \"id\"".into()))?;
    let ra_col = find("ra_deg").ok_or_else(|| Error::ImportFailed("missing column \"ra_deg\"".into()))?;
    let dec_col = find("dec_deg").ok_or_else(|| Error::ImportFailed("missing column \"dec_deg\"".into()))?;
    let mag_col = find("mag").ok_or_else(|| Error::ImportFailed("missing column \"mag\"".into()))?;

    let extra_cols: Vec<(usize, &crate::schema::SchemaField)> = schema
        .fields()
        .filter_map(|f| find(&f.name).map(|col| (col, f)))
        .collect();

    let mut objects = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| Error::ImportFailed(e.to_string()))?;
        let id: u64 = record
            .get(id_col)
            .ok_or_else(|| field_error("id", ""))?
            .parse()
            .map_err(|_| field_error("id", record.get(id_col).unwrap_or("")))?;
        let ra_deg: f64 = record
            .get(ra_col)
            .ok_or_else(|| field_error("ra_deg", ""))?
            .parse()
            .map_err(|_| field_error("ra_deg", record.get(ra_col).unwrap_or("")))?;
        let dec_deg: f64 = record
            .get(dec_col)
            .ok_or_else(|| field_error("dec_deg", ""))?
            .parse()
            .map_err(|_| field_error("dec_deg", record.get(dec_col).unwrap_or("")))?;
        if !(-90.0..=90.0).contains(&dec_deg) {
            return Err(field_error("dec_deg", record.get(dec_col).unwrap_or("")));
        }
        let mag: f64 = record
            .get(mag_col)
            .ok_or_else(|| field_error("mag", ""))?
            .parse()
            .map_err(|_| field_error("mag", record.get(mag_col).unwrap_or("")))?;

        let ra = ra_deg.rem_euclid(360.0) * std::f64::consts::PI / 180.0;
        let dec = dec_deg * std::f64::consts::PI / 180.0;

        let mut extra = vec![FieldValue::Double(0.0); schema.num_fields()];
        for (col, field) in &extra_cols {
            let raw = record.get(*col).unwrap_or("");
            let value = parse_field(field.ctype, raw).ok_or_else(|| field_error(&field.name, raw))?;
            extra[field.offset] = value;
        }

        objects.push(CatalogObject::new(id, ra, dec, mag)?.with_extra(extra));
    }
    Ok(objects)
}

fn parse_field(ctype: CType, raw: &str) -> Option<FieldValue> {
    match ctype {
        CType::Int => raw.parse().ok().map(FieldValue::Int),
        CType::Short => raw.parse().ok().map(FieldValue::Short),
        CType::Float => raw.parse().ok().map(FieldValue::Float),
        CType::Double => raw.parse().ok().map(FieldValue::Double),
        CType::DoubleAsDegrees => raw
            .parse::<f64>()
            .ok()
            .map(|d| FieldValue::Double(d * std::f64::consts::PI / 180.0)),
        CType::Str => Some(FieldValue::Str(raw.to_string())),
        CType::AnglePiece | CType::McpDate => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_required_columns() {
        let csv = "id,ra_deg,dec_deg,mag\n1,10.0,20.0,5.5\n2,350.0,-10.0,3.0\n";
        let schema = Schema::new();
        let objects = read_objects(csv.as_bytes(), &schema).unwrap();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].id(), 1);
        assert!((objects[1].ra() - 350.0_f64.to_radians()).abs() < 1e-9);
    }

    #[test]
    fn reads_extra_schema_fields() {
        let csv = "id,ra_deg,dec_deg,mag,Name\n1,0.0,0.0,1.0,HD1\n";
        let mut schema = Schema::new();
        schema.add_field("Name", "N", CType::Str, "");
        let objects = read_objects(csv.as_bytes(), &schema).unwrap();
        assert_eq!(objects[0].extra_field(0), Some(&FieldValue::Str("HD1".to_string())));
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let csv = "id,ra_deg,dec_deg\n1,0.0,0.0\n";
        let schema = Schema::new();
        assert!(read_objects(csv.as_bytes(), &schema).is_err());
    }

    #[test]
    fn out_of_range_dec_is_an_error_not_a_panic() {
        let csv = "id,ra_deg,dec_deg,mag\n1,10.0,120.0,5.5\n";
        let schema = Schema::new();
        assert!(read_objects(csv.as_bytes(), &schema).is_err());
    }
}
