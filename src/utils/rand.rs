//! Deterministic random number generation for the scheduler.
//!
//! Every random draw of a run comes from a single seeded generator, so runs
//! with identical inputs and seed produce byte-identical answers.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Creates the run generator for the given seed.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Draws an index proportionally to the given weights.
///
/// Non-positive and non-finite weights are excluded from the draw.
///
/// # Returns
/// `None` when no weight is drawable.
///
/// # Example
/// ```
/// use traffic_sched_core::utils::rand::{seeded_rng, weighted_choice};
/// let mut rng = seeded_rng(42);
/// let picked = weighted_choice(&[0.0, 3.0, 1.0], &mut rng).unwrap();
/// assert!(picked == 1 || picked == 2);
/// ```
pub fn weighted_choice(weights: &[f64], rng: &mut impl Rng) -> Option<usize> {
    let drawable = |w: &f64| w.is_finite() && *w > 0.0;
    let total: f64 = weights.iter().filter(|w| drawable(w)).sum();
    if total <= 0.0 {
        return None;
    }
    let mut remaining = rng.random::<f64>() * total;
    for (index, weight) in weights.iter().enumerate() {
        if !drawable(weight) {
            continue;
        }
        remaining -= weight;
        if remaining <= 0.0 {
            return Some(index);
        }
    }
    // Numeric tail: fall back to the last drawable weight.
    weights.iter().rposition(drawable)
}
