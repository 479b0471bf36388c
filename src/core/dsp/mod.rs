//! Digital Signal Processing utilities

mod dct;
mod fft;
mod mel;
mod stats;
mod windows;

pub use dct::Dct2;
pub use fft::FftProcessor;
pub use mel::{hz_to_mel, mel_to_hz, MelFilterbank};
pub use stats::{argmax, mean, population_std, rms, softmax};
pub use windows::WindowFunction;
