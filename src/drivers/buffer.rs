use crate::drivers::AcquisitionError;
/// Append-only sequence of scalar samples taken at a fixed interval.
///
/// Timestamps are implicit: sample `i` sits at `i / sample_rate_hz` seconds,
/// so they stay strictly increasing and evenly spaced by construction.
#[derive(Clone, Debug)]
pub struct SampleStream {
    samples: Vec<f32>,
    sample_rate_hz: f32,
}
impl SampleStream {
    pub fn new(sample_rate_hz: f32) -> Result<Self, AcquisitionError> {
        Self::from_samples(sample_rate_hz, Vec::new())
    }
    pub fn from_samples(sample_rate_hz: f32, samples: Vec<f32>) -> Result<Self, AcquisitionError> {
        if sample_rate_hz <= 0.0 || !sample_rate_hz.is_finite() {
            return Err(AcquisitionError::InvalidSampleRate);
        }
        Ok(Self {
            samples,
            sample_rate_hz,
        })
    }
    pub fn sample_rate_hz(&self) -> f32 {
        self.sample_rate_hz
    }
    /// Duration between two consecutive samples, in seconds.
    pub fn sample_interval(&self) -> f32 {
        1.0 / self.sample_rate_hz
    }
    pub fn push(&mut self, sample: f32) {
        self.samples.push(sample);
    }
    /// Replaces the whole stream, as a file load does.
    pub fn replace(&mut self, samples: Vec<f32>) {
        self.samples = samples;
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }
    pub fn timestamp(&self, index: usize) -> f32 {
        index as f32 / self.sample_rate_hz
    }
    /// The last `count` samples, or `None` while fewer have arrived.
    pub fn trailing(&self, count: usize) -> Option<&[f32]> {
        if count == 0 || self.samples.len() < count {
            return None;
        }
        Some(&self.samples[self.samples.len() - count..])
    }
    /// Up to `count` most recent samples, together with the timestamp of the first one.
    pub fn tail(&self, count: usize) -> (f32, &[f32]) {
        let start = self.samples.len().saturating_sub(count);
        (self.timestamp(start), &self.samples[start..])
    }
    /// Samples covering whole seconds `[from, to)`; `to` is clamped to the stream end.
    pub fn slice_seconds(&self, from: usize, to: usize) -> &[f32] {
        let per_second = self.samples_per_second();
        let start = from.saturating_mul(per_second).min(self.samples.len());
        let end = to.saturating_mul(per_second).min(self.samples.len()).max(start);
        &self.samples[start..end]
    }
    pub fn samples_per_second(&self) -> usize {
        self.sample_rate_hz.round() as usize
    }
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate_hz
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn rejects_non_positive_rate() {
        assert!(matches!(
            SampleStream::new(0.0),
            Err(AcquisitionError::InvalidSampleRate)
        ));
    }
    #[test]
    fn trailing_window_needs_enough_samples() {
        let mut stream = SampleStream::new(50.0).unwrap();
        for i in 0..49 {
            stream.push(i as f32);
        }
        assert!(stream.trailing(50).is_none());
        stream.push(49.0);
        stream.push(50.0);
        let window = stream.trailing(50).unwrap();
        assert_eq!(window.len(), 50);
        assert_eq!(window[0], 1.0);
        assert_eq!(window[49], 50.0);
    }
    #[test]
    fn timestamps_are_evenly_spaced() {
        let stream = SampleStream::from_samples(50.0, vec![0.0; 10]).unwrap();
        assert!((stream.timestamp(1) - 0.02).abs() < 1e-6);
        assert!((stream.timestamp(9) - stream.timestamp(8) - stream.sample_interval()).abs() < 1e-6);
    }
    #[test]
    fn slice_seconds_clamps_to_end() {
        let samples: Vec<f32> = (0..120).map(|v| v as f32).collect();
        let stream = SampleStream::from_samples(50.0, samples).unwrap();
        assert_eq!(stream.slice_seconds(1, 2).len(), 50);
        assert_eq!(stream.slice_seconds(1, 2)[0], 50.0);
        assert_eq!(stream.slice_seconds(2, 9).len(), 20);
        assert!(stream.slice_seconds(5, 9).is_empty());
    }
    #[test]
    fn slice_seconds_saturates_huge_bounds() {
        let stream = SampleStream::from_samples(50.0, vec![0.5; 500]).unwrap();
        assert_eq!(stream.slice_seconds(0, usize::MAX).len(), 500);
        assert_eq!(stream.slice_seconds(0, usize::MAX / 50 + 2).len(), 500);
        assert!(stream.slice_seconds(usize::MAX, usize::MAX).is_empty());
    }
    #[test]
    fn tail_reports_first_timestamp() {
        let stream = SampleStream::from_samples(50.0, vec![1.0; 300]).unwrap();
        let (start, samples) = stream.tail(250);
        assert_eq!(samples.len(), 250);
        assert!((start - 1.0).abs() < 1e-6);
    }
}
