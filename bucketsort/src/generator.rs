//! Random datasets for driving the sort, every value is clamped into `[min, max]`.
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution as Sample, Exp, Normal};

use crate::{
    config::Distribution,
    traits::types::{Error, Key, Result},
};

/// Generate `n` keys in `[min, max]` drawn from `distribution`.
///
/// Normal samples have mean `(min + max) / 2` and standard deviation `(max - min) / 6`.
/// Exponential samples are offset from `min` with scale `(max - min) / 2`, so they too have mean
/// `(min + max) / 2` before clamping. Real valued samples are truncated toward zero before
/// clamping.
///
/// # Arguments
/// * `n` - Number of keys.
/// * `min` - Smallest admissible key.
/// * `max` - Largest admissible key.
/// * `distribution` - Shape of the sample.
/// * `seed` - Seed for reproducible samples, entropy if `None`.
pub fn generate<T: Key>(
    n: usize,
    min: T,
    max: T,
    distribution: Distribution,
    seed: Option<u64>,
) -> Result<Vec<T>> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let (lo, hi) = if min <= max {
        (min.widen(), max.widen())
    } else {
        (max.widen(), min.widen())
    };

    let half_width = (hi as f64 - lo as f64) / 2.0;
    let mid = lo as f64 + half_width;

    let samples: Vec<i128> = match distribution {
        Distribution::Uniform => (0..n).map(|_| rng.gen_range(lo..=hi)).collect(),

        Distribution::Normal => {
            let normal = Normal::new(mid, half_width / 3.0).map_err(|e| {
                Error::Configuration(format!("normal distribution over [{}, {}]: {}", lo, hi, e))
            })?;
            (0..n).map(|_| truncate(normal.sample(&mut rng))).collect()
        }

        Distribution::Exponential => {
            if half_width > 0.0 {
                let exp = Exp::new(1.0 / half_width).map_err(|e| {
                    Error::Configuration(format!(
                        "exponential distribution over [{}, {}]: {}",
                        lo, hi, e
                    ))
                })?;
                (0..n)
                    .map(|_| lo + truncate(exp.sample(&mut rng)))
                    .collect()
            } else {
                vec![lo; n]
            }
        }
    };

    // Both bounds are representable so the clamped value narrows losslessly
    Ok(samples
        .into_iter()
        .map(|value| T::narrow(value.clamp(lo, hi)).unwrap_or(min))
        .collect())
}

fn truncate(x: f64) -> i128 {
    // Saturating cast, non finite samples collapse onto the bounds when clamped
    x.trunc() as i128
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_values_within_bounds() {
        for distribution in [
            Distribution::Uniform,
            Distribution::Normal,
            Distribution::Exponential,
        ] {
            let values = generate(5_000, 0i32, 100_000, distribution, Some(0)).unwrap();
            assert_eq!(values.len(), 5_000);
            assert!(values.iter().all(|&v| (0..=100_000).contains(&v)));
        }

        let values = generate(1_000, -20i8, 20, Distribution::Normal, Some(1)).unwrap();
        assert!(values.iter().all(|&v| (-20..=20).contains(&v)));
    }

    #[test]
    fn test_seeded_reproducibility() {
        let a = generate(100, 0u64, 1_000, Distribution::Exponential, Some(42)).unwrap();
        let b = generate(100, 0u64, 1_000, Distribution::Exponential, Some(42)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_distribution_shapes() {
        let n = 20_000;

        // Normal samples concentrate around the centre of the range
        let normal = generate(n, 0i32, 600, Distribution::Normal, Some(5)).unwrap();
        let central = normal.iter().filter(|&&v| (200..=400).contains(&v)).count();
        assert!(central as f64 > 0.6 * n as f64);

        // Exponential samples are biased toward the lower end
        let exponential = generate(n, 0i32, 600, Distribution::Exponential, Some(5)).unwrap();
        let low = exponential.iter().filter(|&&v| v < 300).count();
        let high = exponential.len() - low;
        assert!(low > high);
    }

    #[test]
    fn test_exponential_below_zero() {
        // The centre of the range is negative, samples still spread from the minimum
        let n = 10_000;
        let values = generate(n, -100i64, 50, Distribution::Exponential, Some(9)).unwrap();
        assert!(values.iter().all(|&v| (-100..=50).contains(&v)));

        let at_min = values.iter().filter(|&&v| v == -100).count();
        assert!(at_min < n / 10);

        let low = values.iter().filter(|&&v| v < -25).count();
        assert!(low > n - low);
    }

    #[test]
    fn test_degenerate_range() {
        let values = generate(10, 7u16, 7, Distribution::Exponential, Some(0)).unwrap();
        assert_eq!(values, vec![7; 10]);
        let values = generate(10, 0u16, 0, Distribution::Exponential, Some(0)).unwrap();
        assert_eq!(values, vec![0; 10]);
        let values = generate(10, -3i32, -3, Distribution::Normal, Some(0)).unwrap();
        assert_eq!(values, vec![-3; 10]);
    }
}
