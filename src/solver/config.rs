//! Solver tuning: tolerances for the needle-pattern match stages, and
//! constraints that bound the catalog haystack and which plate detections
//! are eligible to seed a pattern

//tp Tolerances
/// Match tolerances for the three needle-pattern stages
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    /// Pixel distance tolerance
    pub dist: f64,
    /// Magnitude-difference tolerance
    pub mag: f64,
    /// Position-angle tolerance, radians
    pub pa: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            dist: 2.0,
            mag: 0.3,
            pa: 0.05,
        }
    }
}

impl Tolerances {
    pub fn with_dist(mut self, dist: f64) -> Self {
        self.dist = dist;
        self
    }
    pub fn with_mag(mut self, mag: f64) -> Self {
        self.mag = mag;
        self
    }
    pub fn with_pa(mut self, pa: f64) -> Self {
        self.pa = pa;
        self
    }
}

//tp Constraints
/// Bounds on the haystack (catalog candidates) and needle window used to
/// keep the search tractable
#[derive(Debug, Clone, Copy)]
pub struct Constraints {
    pub min_mag: f64,
    pub max_mag: f64,
    pub min_fov: f64,
    pub max_fov: f64,
    pub min_dec: f64,
    pub max_dec: f64,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            min_mag: -2.0,
            max_mag: 12.0,
            min_fov: 0.0,
            max_fov: std::f64::consts::PI,
            min_dec: -std::f64::consts::FRAC_PI_2,
            max_dec: std::f64::consts::FRAC_PI_2,
        }
    }
}

impl Constraints {
    pub fn with_mag_range(mut self, min: f64, max: f64) -> Self {
        self.min_mag = min;
        self.max_mag = max;
        self
    }
    pub fn with_fov_range(mut self, min: f64, max: f64) -> Self {
        self.min_fov = min;
        self.max_fov = max;
        self
    }
    pub fn with_dec_range(mut self, min: f64, max: f64) -> Self {
        self.min_dec = min;
        self.max_dec = max;
        self
    }
}

/// Minimum plate detections the solver needs (one primary, three
/// secondaries)
pub const MIN_PLATE_OBJECTS: usize = 4;
/// Cap on (i, j, k) candidate triples examined by the distance stage for a
/// single primary
pub const MAX_POTENTIAL_MATCHES: usize = 256;
/// Cap on position-angle survivors kept per primary
pub const MAX_ACTUAL_MATCHES: usize = 16;
/// Cap on the deduplicated global solutions table
pub const MAX_RT_SOLUTIONS: usize = 32;
/// Cap on back-solve sigma-clip iterations
pub const MAX_BACK_SOLVE_ROUNDS: usize = 10;
