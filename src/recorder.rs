// src/recorder.rs
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use log::info;
use crate::drivers::AcquisitionError;
const HEADER: &str = "# number";
/// Whole-second range `[from, to)` picked by the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SecondRange {
    pub from: usize,
    pub to: usize,
}
/// Loads a header-prefixed file holding one amplitude per row.
///
/// Rows are trimmed of whitespace and trailing delimiters before parsing and
/// rounded to 4 decimals. Blank rows are skipped.
pub fn load_samples(path: &Path) -> Result<Vec<f32>, AcquisitionError> {
    if !has_csv_extension(path) {
        return Err(AcquisitionError::UnsupportedFileFormat(format!(
            "{} is not a .csv file",
            path.display()
        )));
    }
    let reader = BufReader::new(File::open(path)?);
    let mut samples = Vec::new();
    for (line_no, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let cleaned = line.trim().trim_end_matches(&[',', ';'][..]).trim();
        if cleaned.is_empty() {
            continue;
        }
        let value: f64 = cleaned.parse().map_err(|_| {
            AcquisitionError::UnsupportedFileFormat(format!(
                "line {} is not a number: {cleaned:?}",
                line_no + 1
            ))
        })?;
        samples.push(round4(value) as f32);
    }
    info!("loaded {} samples from {}", samples.len(), path.display());
    Ok(samples)
}
/// Writes samples one per line below a header comment. Returns the path
/// actually written (`.csv` is appended when missing).
pub fn save_samples(path: &Path, samples: &[f32]) -> Result<PathBuf, AcquisitionError> {
    let path = if has_csv_extension(path) {
        path.to_path_buf()
    } else {
        let mut name = path.as_os_str().to_owned();
        name.push(".csv");
        PathBuf::from(name)
    };
    let mut w = BufWriter::new(File::create(&path)?);
    writeln!(w, "{HEADER}")?;
    for value in samples {
        writeln!(w, "{:.4}", value)?;
    }
    w.flush()?;
    info!("saved {} samples to {}", samples.len(), path.display());
    Ok(path)
}
/// Validates user-entered bounds against a stream of `len` samples.
///
/// Both fields empty means "everything" and yields `Ok(None)`.
pub fn parse_range(
    from: &str,
    to: &str,
    samples_per_second: usize,
    len: usize,
) -> Result<Option<SecondRange>, AcquisitionError> {
    let (from, to) = (from.trim(), to.trim());
    if from.is_empty() && to.is_empty() {
        return Ok(None);
    }
    let parse = |label: &str, text: &str| {
        text.parse::<usize>().map_err(|_| {
            AcquisitionError::InvalidRangeInput(format!(
                "{label} must be a whole number of seconds, got {text:?}"
            ))
        })
    };
    let range = SecondRange {
        from: parse("from", from)?,
        to: parse("to", to)?,
    };
    if range.from >= range.to {
        return Err(AcquisitionError::InvalidRangeInput(format!(
            "from ({}) must be less than to ({})",
            range.from, range.to
        )));
    }
    if range.from.saturating_mul(samples_per_second) >= len {
        return Err(AcquisitionError::InvalidRangeInput(format!(
            "from ({}s) is past the end of the recording",
            range.from
        )));
    }
    Ok(Some(range))
}
fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}
fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
