//! The magnitude-sorted list of candidate catalog objects a pattern is
//! matched against

use crate::solver::config::Constraints;
use crate::CatalogObject;

//tp Haystack
/// Catalog candidates sorted ascending by magnitude (brightest first),
/// with zeroed (import-error) and out-of-bound objects dropped
pub struct Haystack<'c> {
    objects: Vec<&'c CatalogObject>,
}

impl<'c> Haystack<'c> {
    //cp build
    pub fn build(candidates: impl Iterator<Item = &'c CatalogObject>, constraints: &Constraints) -> Self {
        let mut objects: Vec<&CatalogObject> = candidates
            .filter(|o| !o.is_zeroed())
            .filter(|o| o.mag() >= constraints.min_mag && o.mag() <= constraints.max_mag)
            .filter(|o| o.dec() >= constraints.min_dec && o.dec() <= constraints.max_dec)
            .collect();
        objects.sort_by(|a, b| a.mag().partial_cmp(&b.mag()).unwrap());
        Self { objects }
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
    pub fn objects(&self) -> &[&'c CatalogObject] {
        &self.objects
    }

    //mp mag_range
    /// Indices `[start, end)` of objects whose magnitude falls in
    /// `[lower, upper]`
    pub fn mag_range(&self, lower: f64, upper: f64) -> (usize, usize) {
        let start = self.objects.partition_point(|o| o.mag() < lower);
        let end = self.objects.partition_point(|o| o.mag() <= upper);
        (start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_zeroed_and_out_of_range() {
        let objs = vec![
            CatalogObject::new(1, 0.0, 0.0, 0.0).unwrap(),
            CatalogObject::new(2, 0.1, 0.1, 3.0).unwrap(),
            CatalogObject::new(3, 0.2, 0.2, 20.0).unwrap(),
        ];
        let constraints = Constraints::default();
        let hs = Haystack::build(objs.iter(), &constraints);
        assert_eq!(hs.len(), 1);
        assert_eq!(hs.objects()[0].id(), 2);
    }

    #[test]
    fn mag_range_finds_sorted_span() {
        let objs = vec![
            CatalogObject::new(1, 0.0, 0.0, 1.0).unwrap(),
            CatalogObject::new(2, 0.1, 0.1, 3.0).unwrap(),
            CatalogObject::new(3, 0.2, 0.2, 5.0).unwrap(),
        ];
        let constraints = Constraints::default();
        let hs = Haystack::build(objs.iter(), &constraints);
        let (s, e) = hs.mag_range(2.0, 4.0);
        assert_eq!(e - s, 1);
        assert_eq!(hs.objects()[s].id(), 2);
    }
}
