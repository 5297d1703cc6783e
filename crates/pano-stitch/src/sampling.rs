//! Bounded uniform subsampling.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Source of random subsamples.
///
/// A fixed seed makes every subsample reproducible; without one the generator
/// is seeded from the thread RNG.
pub struct Sampler {
    rng: ChaCha8Rng,
}

impl Sampler {
    #[must_use]
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };
        Self { rng }
    }

    /// Indices of at most `cap` of `len` items, drawn uniformly without
    /// replacement and returned in ascending order. All indices when
    /// `len <= cap`.
    pub fn indices(&mut self, len: usize, cap: usize) -> Vec<usize> {
        if len <= cap {
            return (0..len).collect();
        }
        let mut picked = rand::seq::index::sample(&mut self.rng, len, cap).into_vec();
        picked.sort_unstable();
        picked
    }

    /// At most `cap` items of `items`, drawn uniformly without replacement.
    pub fn subsample<T: Copy>(&mut self, items: &[T], cap: usize) -> Vec<T> {
        if items.len() <= cap {
            return items.to_vec();
        }
        self.indices(items.len(), cap)
            .into_iter()
            .map(|i| items[i])
            .collect()
    }
}

/// Median of the finite values, `None` if there are none.
///
/// Even-length inputs average the two middle values.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    finite.sort_unstable_by(f64::total_cmp);
    let mid = finite.len() / 2;
    Some(if finite.len() % 2 == 0 {
        (finite[mid - 1] + finite[mid]) * 0.5
    } else {
        finite[mid]
    })
}
