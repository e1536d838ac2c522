//! A clipped region's object handle: the query-time result of running
//! [crate::htm::Htm::clip] against a catalog and flattening the populated
//! trixels into a single iterable span list.

use crate::catalog::Catalog;
use crate::diag::Diagnostics;
use crate::error::Result;
use crate::search::Expression;
use crate::CatalogObject;

//tp TrixelObjects
/// A contiguous run of a catalog's object array belonging to one trixel
#[derive(Debug, Clone, Copy)]
pub struct TrixelObjects {
    pub head: usize,
    pub count: usize,
}

//tp ObjectSet
/// A region of the sky clipped out of a catalog: a centre, field of view,
/// depth bounds, and the (head, count) spans of every non-empty trixel the
/// clip touched
pub struct ObjectSet<'c> {
    catalog: &'c Catalog,
    center_ra: f64,
    center_dec: f64,
    fov: f64,
    min_depth: u8,
    max_depth: u8,
    trixel_count: usize,
    populated: Vec<TrixelObjects>,
}

impl<'c> ObjectSet<'c> {
    //cp new
    pub fn new(
        catalog: &'c Catalog,
        center_ra: f64,
        center_dec: f64,
        fov: f64,
        min_depth: u8,
        max_depth: u8,
    ) -> Result<Self> {
        let clipped = catalog
            .htm()
            .clip(center_ra, center_dec, fov, min_depth, max_depth)?;
        let trixel_count = clipped.len();
        let mut populated = Vec::new();
        for idx in clipped {
            let t = catalog.htm().trixel(idx);
            if t.objects_count > 0 {
                populated.push(TrixelObjects {
                    head: t.objects_head,
                    count: t.objects_count,
                });
            }
        }
        Ok(Self {
            catalog,
            center_ra,
            center_dec,
            fov,
            min_depth,
            max_depth,
            trixel_count,
            populated,
        })
    }

    //ap accessors
    pub fn center(&self) -> (f64, f64) {
        (self.center_ra, self.center_dec)
    }
    pub fn fov(&self) -> f64 {
        self.fov
    }
    pub fn depth_bounds(&self) -> (u8, u8) {
        (self.min_depth, self.max_depth)
    }
    pub fn trixel_count(&self) -> usize {
        self.trixel_count
    }
    pub fn object_count(&self) -> usize {
        self.populated.iter().map(|p| p.count).sum()
    }

    //mp objects
    /// Iterate every object in the clipped region
    pub fn objects(&self) -> impl Iterator<Item = &'c CatalogObject> {
        let catalog = self.catalog;
        self.populated
            .clone()
            .into_iter()
            .flat_map(move |p| catalog.objects()[p.head..p.head + p.count].iter())
    }

    //mp search
    /// Run a compiled predicate over this region, returning the matches
    /// alongside the trixels-visited/objects-tested/objects-matched
    /// counters the predicate evaluator reports
    pub fn search(&self, expr: &Expression) -> (Vec<&'c CatalogObject>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        diagnostics.trixels_visited = self.trixel_count;
        let mut matched = Vec::new();
        for obj in self.objects() {
            diagnostics.objects_tested += 1;
            if expr.matches(obj) {
                diagnostics.objects_matched += 1;
                matched.push(obj);
            }
        }
        (matched, diagnostics)
    }
}
