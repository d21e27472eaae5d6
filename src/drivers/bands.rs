use serde::{Deserialize, Serialize};
use crate::drivers::AcquisitionError;
use crate::feedback::FrameRange;
/// Named frequency range `(lower_hz, upper_hz]` with its display color and video sub-range.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BandDefinition {
    pub name: String,
    pub lower_hz: f32,
    pub upper_hz: f32,
    pub color: [u8; 3],
    pub frames: FrameRange,
}
impl BandDefinition {
    pub fn contains(&self, frequency_hz: f32) -> bool {
        self.lower_hz < frequency_hz && frequency_hz <= self.upper_hz
    }
}
/// Ordered, validated set of bands. Immutable once built.
#[derive(Clone, Debug)]
pub struct BandSet {
    bands: Vec<BandDefinition>,
}
impl BandSet {
    pub fn new(bands: Vec<BandDefinition>) -> Result<Self, AcquisitionError> {
        if bands.is_empty() {
            return Err(AcquisitionError::InvalidBands("no bands configured".into()));
        }
        for (idx, band) in bands.iter().enumerate() {
            if !(band.lower_hz < band.upper_hz) {
                return Err(AcquisitionError::InvalidBands(format!(
                    "band {} has lower bound {} not below upper bound {}",
                    band.name, band.lower_hz, band.upper_hz
                )));
            }
            if band.frames.start > band.frames.end {
                return Err(AcquisitionError::InvalidBands(format!(
                    "band {} has frame range {}..={} running backwards",
                    band.name, band.frames.start, band.frames.end
                )));
            }
            if bands[..idx].iter().any(|other| other.name == band.name) {
                return Err(AcquisitionError::InvalidBands(format!(
                    "duplicate band name {}",
                    band.name
                )));
            }
            if let Some(prev) = idx.checked_sub(1).map(|p| &bands[p]) {
                if prev.upper_hz != band.lower_hz {
                    return Err(AcquisitionError::InvalidBands(format!(
                        "band {} must start where {} ends ({} Hz)",
                        band.name, prev.name, prev.upper_hz
                    )));
                }
            }
        }
        Ok(Self { bands })
    }
    /// First band with `lower < f <= upper`.
    ///
    /// A silent or disconnected input resolves to a peak of 0 Hz, which no band
    /// claims, so it comes back as `None`. The same holds above the last band.
    pub fn classify(&self, frequency_hz: f32) -> Option<usize> {
        self.bands.iter().position(|band| band.contains(frequency_hz))
    }
    pub fn get(&self, index: usize) -> Option<&BandDefinition> {
        self.bands.get(index)
    }
    pub fn iter(&self) -> impl Iterator<Item = &BandDefinition> {
        self.bands.iter()
    }
    pub fn len(&self) -> usize {
        self.bands.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
}
#[derive(Clone, Debug, PartialEq)]
pub struct BandTotal {
    pub name: String,
    pub color: [u8; 3],
    pub seconds: f64,
}
/// Seconds spent in each band during the current loading session.
#[derive(Clone, Debug)]
pub struct BandAccumulator {
    totals: Vec<BandTotal>,
}
impl BandAccumulator {
    pub fn new(bands: &BandSet) -> Self {
        Self {
            totals: bands
                .iter()
                .map(|band| BandTotal {
                    name: band.name.clone(),
                    color: band.color,
                    seconds: 0.0,
                })
                .collect(),
        }
    }
    pub fn accumulate(&mut self, classification: Option<usize>, delta_seconds: f64) {
        if let Some(total) = classification.and_then(|idx| self.totals.get_mut(idx)) {
            total.seconds += delta_seconds;
        }
    }
    pub fn clear(&mut self) {
        for total in &mut self.totals {
            total.seconds = 0.0;
        }
    }
    pub fn seconds(&self, name: &str) -> Option<f64> {
        self.totals
            .iter()
            .find(|total| total.name == name)
            .map(|total| total.seconds)
    }
    pub fn totals(&self) -> &[BandTotal] {
        &self.totals
    }
}
#[cfg(test)]
pub(crate) fn standard_bands() -> BandSet {
    let band = |name: &str, lower_hz: f32, upper_hz: f32, start: usize, end: usize| BandDefinition {
        name: name.into(),
        lower_hz,
        upper_hz,
        color: [200, 200, 200],
        frames: FrameRange { start, end },
    };
    BandSet::new(vec![
        band("delta", 0.0, 4.0, 0, 234),
        band("theta", 4.0, 8.0, 235, 469),
        band("alpha", 8.0, 13.0, 470, 704),
        band("beta", 13.0, 30.0, 705, 939),
        band("gamma", 30.0, 100.0, 940, 1174),
    ])
    .unwrap()
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn classifies_inside_ranges() {
        let bands = standard_bands();
        assert_eq!(bands.classify(2.0), Some(0));
        assert_eq!(bands.classify(6.5), Some(1));
        assert_eq!(bands.classify(10.0), Some(2));
        assert_eq!(bands.classify(24.0), Some(3));
        assert_eq!(bands.classify(45.0), Some(4));
    }
    #[test]
    fn upper_bound_is_inclusive_lower_exclusive() {
        let bands = standard_bands();
        assert_eq!(bands.classify(4.0), Some(0));
        assert_eq!(bands.classify(8.0), Some(1));
        assert_eq!(bands.classify(13.0), Some(2));
    }
    #[test]
    fn zero_and_out_of_range_are_unclassified() {
        let bands = standard_bands();
        assert_eq!(bands.classify(0.0), None);
        assert_eq!(bands.classify(100.5), None);
        assert_eq!(bands.classify(-1.0), None);
    }
    #[test]
    fn rejects_gaps_and_duplicates() {
        let mut defs: Vec<BandDefinition> = standard_bands().iter().cloned().collect();
        defs[1].lower_hz = 5.0;
        assert!(matches!(BandSet::new(defs), Err(AcquisitionError::InvalidBands(_))));
        let mut defs: Vec<BandDefinition> = standard_bands().iter().cloned().collect();
        defs[2].name = "delta".into();
        assert!(BandSet::new(defs).is_err());
        assert!(BandSet::new(Vec::new()).is_err());
    }
    #[test]
    fn accumulates_fixed_increments() {
        let bands = standard_bands();
        let mut acc = BandAccumulator::new(&bands);
        for _ in 0..7 {
            acc.accumulate(Some(2), 0.25);
        }
        acc.accumulate(None, 0.25);
        assert_eq!(acc.seconds("alpha"), Some(1.75));
        assert_eq!(acc.seconds("delta"), Some(0.0));
        let mut acc = BandAccumulator::new(&bands);
        for _ in 0..9 {
            acc.accumulate(Some(1), 0.2);
        }
        assert!((acc.seconds("theta").unwrap() - 1.8).abs() < 1e-9);
    }
    #[test]
    fn clear_zeroes_everything() {
        let bands = standard_bands();
        let mut acc = BandAccumulator::new(&bands);
        acc.accumulate(Some(0), 3.0);
        acc.accumulate(Some(4), 1.0);
        acc.clear();
        assert!(acc.totals().iter().all(|t| t.seconds == 0.0));
        assert_eq!(acc.totals().len(), 5);
    }
}
