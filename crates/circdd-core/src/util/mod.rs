//! Various utilities

pub use nanorand::Rng as RngExt;
pub use nanorand::WyRand as Rng;

/// Create a random source from `seed`
///
/// All randomized heuristics take such a source explicitly, so a run is
/// reproducible given its seed.
#[inline]
pub fn seeded_rng(seed: u64) -> Rng {
    Rng::new_seed(seed)
}
