//! Random fills.
//!
//! Every stored element (every element of every conserved block) is drawn
//! independently.

use rand::Rng;
use rand::distr::StandardUniform;
use rand_distr::StandardNormal;

use crate::name::EdgeName;
use crate::scalar::{Scalar, c32, c64};
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

/// Trait for types that can be randomly sampled from a uniform distribution.
pub trait RandomUniform: Scalar {
    /// Sample a random value from the uniform distribution [0, 1).
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self;
}

impl RandomUniform for f64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }
}

impl RandomUniform for c64 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        c64::new(rng.sample(StandardUniform), rng.sample(StandardUniform))
    }
}

impl RandomUniform for f32 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardUniform)
    }
}

impl RandomUniform for c32 {
    fn sample_uniform<R: Rng>(rng: &mut R) -> Self {
        c32::new(rng.sample(StandardUniform), rng.sample(StandardUniform))
    }
}

/// Trait for types that can be randomly sampled from a normal distribution.
pub trait RandomNormal: Scalar {
    /// Sample a random value from the standard normal distribution.
    fn sample_normal<R: Rng>(rng: &mut R) -> Self;
}

impl RandomNormal for f64 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardNormal)
    }
}

impl RandomNormal for c64 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        // real and imaginary parts are independent N(0, 1/2), so |z|^2 has mean 1
        let scale = std::f64::consts::FRAC_1_SQRT_2;
        c64::new(
            rng.sample::<f64, _>(StandardNormal) * scale,
            rng.sample::<f64, _>(StandardNormal) * scale,
        )
    }
}

impl RandomNormal for f32 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        rng.sample(StandardNormal)
    }
}

impl RandomNormal for c32 {
    fn sample_normal<R: Rng>(rng: &mut R) -> Self {
        let scale = std::f32::consts::FRAC_1_SQRT_2;
        c32::new(
            rng.sample::<f32, _>(StandardNormal) * scale,
            rng.sample::<f32, _>(StandardNormal) * scale,
        )
    }
}

impl<T: RandomUniform, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Fill with uniform random values in [0, 1).
    ///
    /// # Example
    ///
    /// ```
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    /// use symtensor::{Edge, Tensor, U1};
    ///
    /// let edge = Edge::new([(U1(0), 2), (U1(1), 1)]).unwrap();
    /// let mut t: Tensor<f64, U1> = Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
    /// t.rand(&mut StdRng::seed_from_u64(7));
    /// assert!(t.storage().iter().all(|&v| (0.0..1.0).contains(&v)));
    /// ```
    pub fn rand<R: Rng>(&mut self, rng: &mut R) -> &mut Self {
        self.set(|| T::sample_uniform(rng))
    }
}

impl<T: RandomNormal, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// Fill with standard normal random values.
    pub fn randn<R: Rng>(&mut self, rng: &mut R) -> &mut Self {
        self.set(|| T::sample_normal(rng))
    }
}
