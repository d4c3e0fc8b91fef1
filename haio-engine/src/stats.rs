use haio_core::{HaioError, Result};
use rand::Rng;
use statrs::distribution::{Binomial, DiscreteCDF};

/// The one-sided exact binomial test used by `cta` and its sequential
/// variants: the p-value of observing at least `k` successes in `n`
/// trials under the null `p = quality_requirement`, alternative
/// "greater". A cluster is approved once this drops below the
/// significance level.
///
/// `k == 0` can never reject the null in the "greater" direction, so it
/// is defined as `1.0` directly rather than evaluated through `cdf`,
/// which would need `cdf(-1)`.
pub fn binomial_p_value_greater(k: u64, n: u64, p: f64) -> Result<f64> {
    if n == 0 || k == 0 {
        return Ok(1.0);
    }
    let dist = Binomial::new(p, n).map_err(|err| HaioError::InvalidParameter { reason: err.to_string() })?;
    Ok(1.0 - dist.cdf(k - 1))
}

/// `iteration` draws from `Beta(correct + 1, incorrect + 1)`, the
/// posterior over a cluster's true accuracy given a Beta(1, 1) prior.
///
/// Sampled via the standard two-Gamma construction
/// (`X / (X + Y)` for `X ~ Gamma(a, 1)`, `Y ~ Gamma(b, 1)`) rather than
/// through `statrs::distribution::Beta` directly, since that type
/// exposes a density but not a `rand` sampler.
pub fn beta_draws(correct: u64, incorrect: u64, iteration: usize, rng: &mut impl Rng) -> Result<Vec<f64>> {
    let a = (correct + 1) as f64;
    let b = (incorrect + 1) as f64;
    if a <= 0.0 || b <= 0.0 {
        return Err(HaioError::InvalidParameter { reason: "beta shape parameters must be positive".into() });
    }
    Ok((0..iteration).map(|_| sample_beta(a, b, rng)).collect())
}

fn sample_beta(a: f64, b: f64, rng: &mut impl Rng) -> f64 {
    let x = sample_standard_gamma(a, rng);
    let y = sample_standard_gamma(b, rng);
    if x + y == 0.0 {
        0.5
    } else {
        x / (x + y)
    }
}

/// Marsaglia-Tsang sampling of `Gamma(shape, 1)`, shape > 0.
fn sample_standard_gamma(shape: f64, rng: &mut impl Rng) -> f64 {
    if shape < 1.0 {
        let u: f64 = rng.random_range(0.0..1.0);
        return sample_standard_gamma(shape + 1.0, rng) * u.powf(1.0 / shape);
    }
    let d = shape - 1.0 / 3.0;
    let c = 1.0 / (9.0 * d).sqrt();
    loop {
        let mut x;
        let mut v;
        loop {
            x = sample_standard_normal(rng);
            v = 1.0 + c * x;
            if v > 0.0 {
                break;
            }
        }
        let v3 = v * v * v;
        let u: f64 = rng.random_range(0.0..1.0);
        if u < 1.0 - 0.0331 * x * x * x * x {
            return d * v3;
        }
        if u.ln() < 0.5 * x * x + d * (1.0 - v3 + v3.ln()) {
            return d * v3;
        }
    }
}

fn sample_standard_normal(rng: &mut impl Rng) -> f64 {
    let u1: f64 = rng.random_range(f64::EPSILON..1.0);
    let u2: f64 = rng.random_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

/// The size-weighted mean quality across a candidate cluster plus every
/// already-approved cluster, for one Monte-Carlo iteration: `gta`'s
/// generalisation step.
pub fn weighted_mean(draws_and_sizes: &[(f64, usize)]) -> f64 {
    let numerator: f64 = draws_and_sizes.iter().map(|(draw, size)| draw * *size as f64).sum();
    let denominator: f64 = draws_and_sizes.iter().map(|(_, size)| *size as f64).sum();
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
