//a Imports
use thiserror::Error as ThisError;

//a Error
//tp Error
/// Errors returned by the catalog core
///
/// Empty-result conditions (no clipped trixels, no magnitude/distance/PA
/// survivors, an empty catalog) are *not* represented here: they are
/// reported as zero-count successful outcomes by the callers that can
/// produce them.
#[derive(Debug, ThisError)]
pub enum Error {
    /// A right ascension / declination pair was outside its valid range
    #[error("coordinate out of range: ra={ra}, dec={dec}")]
    InvalidCoordinate { ra: f64, dec: f64 },

    /// A packed trixel id did not decode to a trixel in the mesh
    #[error("invalid trixel id {0:#010x}")]
    InvalidTrixelId(u32),

    /// A search expression named a field not present in the schema
    #[error("unknown field {0:?}")]
    UnknownField(String),

    /// A search expression used an operator unsupported for a field's ctype
    #[error("ctype {ctype} does not support comparators (field {field:?})")]
    UnsupportedCtype { field: String, ctype: &'static str },

    /// A comparator value string could not be parsed for the field's ctype
    #[error("could not parse {value:?} as {ctype} for field {field:?}")]
    BadFieldValue {
        field: String,
        ctype: &'static str,
        value: String,
    },

    /// The plate solver needs at least four detections
    #[error("solver needs at least {need} plate objects, got {have}")]
    TooFewPlateObjects { have: usize, need: usize },

    /// A reverse-Polish search expression left comparators unattached, or
    /// no single root remained
    #[error("unbalanced search expression")]
    UnbalancedExpression,

    /// The solver's global solutions table could not accept another entry
    #[error("solution table is full")]
    SolutionTableFull,

    /// A clipping query overran its trixel buffer
    #[error("clipped-trixel buffer is full")]
    ClippedBufferFull,

    /// Allocation failed while building the mesh or tree
    #[error("allocation failed: {0}")]
    AllocationFailed(&'static str),

    /// A catalog import (CSV, postcard snapshot) could not be decoded
    #[error("import failed: {0}")]
    ImportFailed(String),
}

//tp Result
/// Convenience alias for `Result<T, Error>`
pub type Result<T> = std::result::Result<T, Error>;
