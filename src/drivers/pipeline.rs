use crate::drivers::bands::{BandAccumulator, BandSet};
use crate::drivers::fft::{Spectrum, SpectrumAnalyzer};
use crate::drivers::SampleStream;
/// Result of one spectral evaluation.
#[derive(Clone, Debug)]
pub struct Evaluation {
    /// Index one past the last sample of the analysed window.
    pub end_index: usize,
    pub spectrum: Spectrum,
    pub band: Option<usize>,
}
/// Analysis, classification and accumulation shared by live and replayed sessions.
pub struct BandPipeline {
    analyzer: SpectrumAnalyzer,
    bands: BandSet,
    accumulator: BandAccumulator,
    increment_seconds: f64,
}
impl BandPipeline {
    pub fn new(analyzer: SpectrumAnalyzer, bands: BandSet, increment_seconds: f64) -> Self {
        let accumulator = BandAccumulator::new(&bands);
        Self {
            analyzer,
            bands,
            accumulator,
            increment_seconds,
        }
    }
    pub fn window_len(&self) -> usize {
        self.analyzer.window_len()
    }
    pub fn bands(&self) -> &BandSet {
        &self.bands
    }
    pub fn accumulator(&self) -> &BandAccumulator {
        &self.accumulator
    }
    /// Starts a new loading session.
    pub fn reset(&mut self) {
        self.accumulator.clear();
    }
    /// Evaluates one full window. The window must hold exactly `window_len` samples.
    pub fn evaluate(&mut self, window: &[f32]) -> (Spectrum, Option<usize>) {
        let spectrum = self.analyzer.analyze(window);
        let band = self.bands.classify(spectrum.peak_hz);
        self.accumulator.accumulate(band, self.increment_seconds);
        (spectrum, band)
    }
    /// Walks a loaded stream segment by segment: windows ending at
    /// `window_len`, `window_len + step`, ... up to the stream length.
    pub fn evaluate_recording(&mut self, stream: &SampleStream, step: usize) -> Vec<Evaluation> {
        self.reset();
        let n = self.window_len();
        let samples = stream.samples();
        if n == 0 || samples.len() < n {
            return Vec::new();
        }
        let step = step.max(1);
        let mut evaluations = Vec::with_capacity((samples.len() - n) / step + 1);
        let mut end = n;
        while end <= samples.len() {
            let (spectrum, band) = self.evaluate(&samples[end - n..end]);
            evaluations.push(Evaluation {
                end_index: end,
                spectrum,
                band,
            });
            end += step;
        }
        evaluations
    }
}
