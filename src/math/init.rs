use rand::prelude::*;
use rand::rngs::StdRng;
use std::f64::consts::PI;

/// Standard deviation of freshly drawn weights and biases.
pub const WEIGHT_STD_DEV: f64 = 0.01;

/// Samples a single value from N(0, 1) using the Box-Muller transform.
/// Both u1 and u2 must be uniform on (0, 1].
pub fn sample_standard_normal(rng: &mut StdRng) -> f64 {
    // Draw two independent uniform samples in (0, 1] to avoid log(0).
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = 1.0 - rng.gen::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// `len` values drawn from N(0, std_dev).
pub fn gaussian_vec(rng: &mut StdRng, len: usize, std_dev: f64) -> Vec<f64> {
    (0..len).map(|_| sample_standard_normal(rng) * std_dev).collect()
}

/// SplitMix64 finalizer. Used to derive independent, reproducible seeds
/// (per layer, per example) from a single run seed.
#[inline]
pub fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

/// Combines two values into one well-mixed seed.
#[inline]
pub fn mix_seed(a: u64, b: u64) -> u64 {
    splitmix64(a ^ splitmix64(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_is_seeded() {
        let a = gaussian_vec(&mut StdRng::seed_from_u64(7), 16, 1.0);
        let b = gaussian_vec(&mut StdRng::seed_from_u64(7), 16, 1.0);
        assert_eq!(a, b);
        assert!(a.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_mix_seed_separates_inputs() {
        assert_ne!(mix_seed(1, 2), mix_seed(2, 1));
        assert_eq!(mix_seed(3, 4), mix_seed(3, 4));
    }
}
