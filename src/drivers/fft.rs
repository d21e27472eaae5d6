use std::sync::Arc;
use rustfft::{num_complex::Complex32, Fft, FftPlanner};
/// Magnitude spectrum of one analysis window.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    pub frequencies_hz: Vec<f32>,
    pub magnitudes: Vec<f32>,
    pub peak_hz: f32,
}
/// Computes one-sided spectra over windows of exactly `window_len` samples.
///
/// The window length is one second of data, so bin `k` sits at
/// `k * sample_rate / window_len` Hz.
pub struct SpectrumAnalyzer {
    window_len: usize,
    sample_rate_hz: f32,
    fft: Arc<dyn Fft<f32>>,
}
impl SpectrumAnalyzer {
    pub fn new(sample_rate_hz: f32, window_len: usize) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(window_len.max(1));
        Self {
            window_len,
            sample_rate_hz,
            fft,
        }
    }
    /// Analyzer whose window covers one second at `sample_rate_hz`.
    pub fn one_second(sample_rate_hz: f32) -> Self {
        Self::new(sample_rate_hz, sample_rate_hz.round() as usize)
    }
    pub fn window_len(&self) -> usize {
        self.window_len
    }
    /// Callers must pass exactly `window_len` samples.
    pub fn analyze(&self, window: &[f32]) -> Spectrum {
        debug_assert_eq!(window.len(), self.window_len);
        let n = self.window_len;
        let mean = if window.is_empty() {
            0.0
        } else {
            window.iter().sum::<f32>() / window.len() as f32
        };
        let mut buffer: Vec<Complex32> = window
            .iter()
            .take(n)
            .map(|v| Complex32::new(v - mean, 0.0))
            .collect();
        buffer.resize(n, Complex32::ZERO);
        self.fft.process(&mut buffer);
        let half = n / 2;
        let scale = 2.0 / n as f32;
        let frequencies_hz: Vec<f32> = (0..half)
            .map(|k| k as f32 * (self.sample_rate_hz / n as f32))
            .collect();
        let magnitudes: Vec<f32> = buffer.iter().take(half).map(|c| c.norm() * scale).collect();
        let peak_hz = peak_index(&magnitudes)
            .and_then(|idx| frequencies_hz.get(idx).copied())
            .unwrap_or(0.0);
        Spectrum {
            frequencies_hz,
            magnitudes,
            peak_hz,
        }
    }
}
/// Index of the largest magnitude; ties keep the lowest index.
fn peak_index(magnitudes: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, &mag) in magnitudes.iter().enumerate() {
        match best {
            Some((_, top)) if mag <= top => {}
            _ => best = Some((idx, mag)),
        }
    }
    best.map(|(idx, _)| idx)
}
