//! Per-call diagnostic counters
//!
//! Unlike the teacher crate's debug prints, these are returned to the
//! caller rather than written to a global; a caller that wants progress
//! output passes `verbose: true` and reads `eprintln!` lines as they go,
//! but the counters themselves are always collected and handed back.

//tp Diagnostics
/// Counters filled in by a search or solve call
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    /// Trixels visited while clipping a region
    pub trixels_visited: usize,
    /// Objects tested against a predicate
    pub objects_tested: usize,
    /// Objects that matched a predicate
    pub objects_matched: usize,
    /// Candidate primaries tried by the solver
    pub primaries_tried: usize,
    /// Candidates surviving the magnitude stage
    pub magnitude_survivors: usize,
    /// Candidates surviving the distance stage
    pub distance_survivors: usize,
    /// Candidates surviving the position-angle stage
    pub pa_survivors: usize,
    /// Solutions recorded before deduplication
    pub raw_solutions: usize,
    /// Rounds the back-solve sigma-clip took to converge
    pub back_solve_rounds: usize,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn note(&mut self, verbose: bool, msg: impl AsRef<str>) {
        if verbose {
            eprintln!("{}", msg.as_ref());
        }
    }
}
