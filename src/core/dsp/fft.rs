//! FFT processing with windowing

use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::windows::WindowFunction;

/// Windowed power spectrum of fixed-size frames.
///
/// The plan and window are built once; `power_spectrum` takes `&self`, so a
/// single processor can be shared across threads.
pub struct FftProcessor {
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    fft_size: usize,
}

impl std::fmt::Debug for FftProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftProcessor")
            .field("fft_size", &self.fft_size)
            .finish()
    }
}

impl FftProcessor {
    pub fn new(fft_size: usize, window: WindowFunction) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(fft_size),
            window: window.generate(fft_size),
            fft_size,
        }
    }

    /// Power spectrum `|X[k]|^2` for `k` in `0..=fft_size / 2`.
    ///
    /// Frames shorter than the FFT size are zero-padded on the right.
    pub fn power_spectrum(&self, frame: &[f64]) -> Vec<f64> {
        let mut buffer: Vec<Complex<f64>> = frame
            .iter()
            .take(self.fft_size)
            .zip(self.window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();

        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer[..self.num_bins()]
            .iter()
            .map(|c| c.norm_sqr())
            .collect()
    }

    /// Number of non-negative frequency bins
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_spectrum_length() {
        let fft = FftProcessor::new(1024, WindowFunction::Hann);
        let spectrum = fft.power_spectrum(&vec![0.1; 1024]);
        assert_eq!(spectrum.len(), 513); // fft_size/2 + 1
    }

    #[test]
    fn test_sine_peak_bin() {
        let fft = FftProcessor::new(1024, WindowFunction::Hann);
        // Exactly bin 64 at 16 kHz: 64 * 16000 / 1024 = 1000 Hz
        let frame: Vec<f64> = (0..1024)
            .map(|i| (2.0 * PI * 1000.0 * i as f64 / 16000.0).sin())
            .collect();

        let spectrum = fft.power_spectrum(&frame);
        let peak = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 64);
    }

    #[test]
    fn test_short_frame_is_zero_padded() {
        let fft = FftProcessor::new(8, WindowFunction::Rectangular);
        let short = fft.power_spectrum(&[1.0, 1.0]);
        let padded = fft.power_spectrum(&[1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(short, padded);
        // DC bin holds the squared sum
        assert!((short[0] - 4.0).abs() < 1e-12);
    }
}
