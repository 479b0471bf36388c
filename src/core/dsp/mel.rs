//! Mel scale and triangular filterbank
//!
//! Uses the Slaney auditory-toolbox scale: linear below 1 kHz, logarithmic
//! above. Each triangle is area-normalized (`2 / bandwidth`), matching
//! librosa's `htk=False, norm='slaney'` defaults.

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert frequency in Hz to mels
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert mels to frequency in Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Dense `n_mels x (n_fft / 2 + 1)` filterbank matrix
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    weights: Vec<f64>,
    n_mels: usize,
    n_bins: usize,
}

impl MelFilterbank {
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize, fmin: f64, fmax: f64) -> Self {
        let n_bins = n_fft / 2 + 1;
        let bin_hz: Vec<f64> = (0..n_bins)
            .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
            .collect();

        // n_mels + 2 band edges evenly spaced in mel
        let mel_min = hz_to_mel(fmin);
        let mel_max = hz_to_mel(fmax);
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f64 / (n_mels + 1) as f64))
            .collect();

        let mut weights = vec![0.0; n_mels * n_bins];
        for m in 0..n_mels {
            let (lo, center, hi) = (edges[m], edges[m + 1], edges[m + 2]);
            let norm = 2.0 / (hi - lo);

            let row = &mut weights[m * n_bins..(m + 1) * n_bins];
            for (w, &f) in row.iter_mut().zip(bin_hz.iter()) {
                let rising = (f - lo) / (center - lo);
                let falling = (hi - f) / (hi - center);
                *w = rising.min(falling).max(0.0) * norm;
            }
        }

        Self {
            weights,
            n_mels,
            n_bins,
        }
    }

    /// Project a power spectrum onto the mel bands
    pub fn apply(&self, power: &[f64]) -> Vec<f64> {
        self.weights
            .chunks_exact(self.n_bins)
            .map(|row| row.iter().zip(power.iter()).map(|(w, p)| w * p).sum())
            .collect()
    }

    /// Bands whose triangle falls between two FFT bins and never fires
    pub fn empty_bands(&self) -> usize {
        self.weights
            .chunks_exact(self.n_bins)
            .filter(|row| row.iter().all(|&w| w == 0.0))
            .count()
    }

    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    #[cfg(test)]
    fn row(&self, band: usize) -> &[f64] {
        &self.weights[band * self.n_bins..(band + 1) * self.n_bins]
    }
}
