//! Tensor norms.

use crate::name::EdgeName;
use crate::scalar::Scalar;
use crate::symmetry::Symmetry;
use crate::tensor::Tensor;

impl<T: Scalar, S: Symmetry, N: EdgeName> Tensor<T, S, N> {
    /// The `p`-norm of the stored elements.
    ///
    /// `p = ∞` gives the largest modulus and `p = 0` the number of non-zero
    /// elements. Elements outside conserved blocks are zero and do not
    /// contribute.
    ///
    /// # Example
    ///
    /// ```
    /// use symtensor::{Edge, Tensor};
    ///
    /// let mut t: Tensor<f64> = Tensor::new(["i"], [Edge::trivial(2)]).unwrap();
    /// t.storage_mut().copy_from_slice(&[3.0, -4.0]);
    /// assert_eq!(t.norm(2.0), 5.0);
    /// assert_eq!(t.norm(1.0), 7.0);
    /// assert_eq!(t.norm(f64::INFINITY), 4.0);
    /// ```
    pub fn norm(&self, p: f64) -> f64 {
        let moduli = self.storage().iter().map(|x| x.modulus());
        if p == f64::INFINITY {
            moduli.fold(0.0, f64::max)
        } else if p == 0.0 {
            moduli.filter(|&m| m != 0.0).count() as f64
        } else if p == 1.0 {
            moduli.sum()
        } else if p == 2.0 {
            moduli.map(|m| m * m).sum::<f64>().sqrt()
        } else {
            moduli.map(|m| m.powf(p)).sum::<f64>().powf(1.0 / p)
        }
    }

    /// Squared 2-norm.
    pub fn norm_sqr(&self) -> f64 {
        self.storage().iter().map(|x| x.modulus().powi(2)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::scalar::c64;
    use crate::symmetry::U1;
    use approx::assert_relative_eq;

    fn u1_tensor() -> Tensor<f64, U1> {
        let edge = Edge::new([(U1(0), 1), (U1(1), 2)]).unwrap();
        let mut t = Tensor::new(["i", "j"], [edge.clone(), edge.conjugated()]).unwrap();
        t.storage_mut().copy_from_slice(&[1.0, -2.0, 0.0, 2.0, 0.0]);
        t
    }

    #[test]
    fn test_norm_orders() {
        let t = u1_tensor();
        assert_eq!(t.norm(f64::INFINITY), 2.0);
        assert_eq!(t.norm(0.0), 3.0);
        assert_eq!(t.norm(1.0), 5.0);
        assert_relative_eq!(t.norm(2.0), 3.0);
        assert_relative_eq!(t.norm(3.0), 17.0_f64.cbrt());
        assert_relative_eq!(t.norm_sqr(), 9.0);
    }

    #[test]
    fn test_norm_complex() {
        let mut t: Tensor<c64> = Tensor::new(["i"], [Edge::trivial(2)]).unwrap();
        t.storage_mut()
            .copy_from_slice(&[c64::new(3.0, 4.0), c64::new(0.0, 0.0)]);
        assert_relative_eq!(t.norm(2.0), 5.0);
        assert_eq!(t.norm(0.0), 1.0);
    }

    #[test]
    fn test_norm_matches_contract_all_edge() {
        let t = u1_tensor();
        let squared = t.contract_all_edge().unwrap().to_scalar().unwrap();
        assert_relative_eq!(squared, t.norm(2.0).powi(2));
    }
}
