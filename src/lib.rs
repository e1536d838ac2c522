/*!
# star-catalog-core

An in-memory engine for astronomical catalogs: a Hierarchical Triangular
Mesh spatial index over the celestial sphere, a k-d tree for
nearest-neighbour queries, a reverse-Polish predicate evaluator for
region search, and a multi-threaded asterism plate solver that matches
an unlabeled set of plate detections against a catalog.

The crate never touches a filesystem, network, or external catalog
format; [`CatalogBuilder`] takes already-parsed objects and a schema.
 */

pub type Vec3 = geo_nd::FArray<f64, 3>;
pub type Vec4 = geo_nd::FArray<f64, 4>;
pub type Quat = geo_nd::QArray<f64, Vec3, Vec4>;

mod error;
pub use error::{Error, Result};

pub mod geometry;

mod plate;
pub use plate::{PlateObject, PlateXy};

pub mod schema;
pub use schema::{CType, FieldValue, Schema, SchemaField};

mod object;
pub use object::{CatalogObject, CatalogObjectSerialized};

pub mod htm;
pub use htm::{Htm, TrixelId};

mod kdtree;
pub use kdtree::KdTree;

mod objectset;
pub use objectset::ObjectSet;

pub mod search;
pub use search::{BoolOp, Comparison, Expression, ExpressionBuilder};

pub mod solver;

mod catalog;
pub use catalog::{Catalog, CatalogBuilder};

pub mod diag;
pub use diag::Diagnostics;

#[cfg(feature = "csv")]
pub mod import_csv;
