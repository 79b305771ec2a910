// ============================================================
// Layer 4 — Training Subset Sampler
// ============================================================
// Draws a random subset of the training images so a run can
// train on fewer than the full 50 000 samples.
//
// Sampling is without replacement: the items are shuffled with
// a Fisher-Yates shuffle (rand::seq::SliceRandom) and the first
// `n` are kept. The RNG is seeded so a run can be repeated.
//
// Reference: rand crate documentation

use anyhow::{bail, Result};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Keep a uniformly random subset of exactly `n` items.
///
/// Asking for more items than exist is an error, as is asking for
/// none: an empty training set cannot be fitted.
pub fn sample_without_replacement<T>(mut items: Vec<T>, n: usize, seed: u64) -> Result<Vec<T>> {
    if n == 0 {
        bail!("cannot sample 0 training images");
    }
    if n > items.len() {
        bail!(
            "cannot take a sample of {} from {} images without replacement",
            n,
            items.len()
        );
    }

    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items.truncate(n);

    tracing::debug!("Sampled {} items (seed {})", n, seed);
    Ok(items)
}
