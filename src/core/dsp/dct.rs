//! Orthonormal DCT-II basis

use std::f64::consts::PI;

/// Precomputed truncated DCT-II (orthonormal) for `n_in` inputs, keeping the
/// first `n_out` coefficients
#[derive(Debug, Clone)]
pub struct Dct2 {
    basis: Vec<f64>,
    n_in: usize,
}

impl Dct2 {
    pub fn new(n_in: usize, n_out: usize) -> Self {
        let n = n_in as f64;
        let mut basis = Vec::with_capacity(n_in * n_out);
        for k in 0..n_out {
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            for i in 0..n_in {
                basis.push(scale * (PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n)).cos());
            }
        }
        Self { basis, n_in }
    }

    pub fn transform(&self, input: &[f64]) -> Vec<f64> {
        debug_assert_eq!(input.len(), self.n_in);
        self.basis
            .chunks_exact(self.n_in)
            .map(|row| row.iter().zip(input.iter()).map(|(b, x)| b * x).sum())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_input_only_dc() {
        let dct = Dct2::new(8, 4);
        let out = dct.transform(&[2.0; 8]);
        // DC = sqrt(1/N) * sum = sqrt(1/8) * 16
        assert!((out[0] - 16.0 / 8f64.sqrt()).abs() < 1e-12);
        for c in &out[1..] {
            assert!(c.abs() < 1e-12);
        }
    }

    #[test]
    fn test_full_basis_is_orthonormal() {
        let n = 6;
        let dct = Dct2::new(n, n);
        for a in 0..n {
            for b in 0..n {
                let dot: f64 = (0..n)
                    .map(|i| dct.basis[a * n + i] * dct.basis[b * n + i])
                    .sum();
                let expected = if a == b { 1.0 } else { 0.0 };
                assert!((dot - expected).abs() < 1e-12);
            }
        }
    }
}
