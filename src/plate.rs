//! Plate detections: the unlabeled 2-D input to the solver

use serde::{Deserialize, Serialize};

//tp PlateXy
/// Pixel coordinates, `(x, y)`
pub type PlateXy = (f64, f64);

//tp PlateObject
/// A single detection on a plate: integer pixel coordinates and an
/// intensity ("ADU")
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlateObject {
    pub x: f64,
    pub y: f64,
    pub adu: i64,
}

impl PlateObject {
    pub fn new(x: f64, y: f64, adu: i64) -> Self {
        Self { x, y, adu }
    }

    pub fn xy(&self) -> PlateXy {
        (self.x, self.y)
    }

    /// The ADU used as a denominator in a magnitude-difference calculation,
    /// with zero coerced to 1 to avoid a divergent `log10`
    pub fn adu_or_one(&self) -> f64 {
        if self.adu == 0 {
            1.0
        } else {
            self.adu as f64
        }
    }
}
