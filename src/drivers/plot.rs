use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::drivers::bands::BandTotal;
use crate::drivers::error::AcquisitionError;
use crate::drivers::fft::Spectrum;
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub trace: RGBColor,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 900,
            height: 400,
            background: RGBColor(10, 10, 10),
            trace: CYAN,
        }
    }
}
/// Amplitude over time; `start_secs` is the timestamp of `samples[0]`.
pub fn render_waveform_png(
    samples: &[f32],
    start_secs: f32,
    sample_rate_hz: f32,
    style: &PlotStyle,
) -> Result<Vec<u8>, AcquisitionError> {
    if samples.is_empty() {
        return Err(AcquisitionError::Plot("waveform has no samples".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let y_min = samples.iter().copied().fold(f32::MAX, f32::min);
        let y_max = samples.iter().copied().fold(f32::MIN, f32::max);
        let y_bounds = if (y_max - y_min).abs() < f32::EPSILON {
            (y_min - 50.0, y_max + 50.0)
        } else {
            (y_min, y_max)
        };
        let dt = 1.0 / sample_rate_hz;
        let end_secs = start_secs + samples.len() as f32 * dt;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Signal", ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(start_secs..end_secs, y_bounds.0..y_bounds.1)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .x_desc("seconds")
            .draw()?;
        let series = samples
            .iter()
            .enumerate()
            .map(|(i, v)| (start_secs + i as f32 * dt, *v));
        chart.draw_series(LineSeries::new(series, &style.trace))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
pub fn render_spectrum_png(
    spectrum: &Spectrum,
    style: &PlotStyle,
) -> Result<Vec<u8>, AcquisitionError> {
    if spectrum.magnitudes.is_empty() {
        return Err(AcquisitionError::Plot("spectrum has no magnitudes".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let caption = format!("FFT Magnitude (peak {:.1} Hz)", spectrum.peak_hz);
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(caption, ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(
                0f32..spectrum.frequencies_hz.last().copied().unwrap_or(0.0).max(1.0),
                0f32..spectrum
                    .magnitudes
                    .iter()
                    .copied()
                    .fold(0.0f32, f32::max)
                    .max(1e-3),
            )?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .x_desc("Hz")
            .draw()?;
        let series = spectrum
            .frequencies_hz
            .iter()
            .copied()
            .zip(spectrum.magnitudes.iter().copied());
        chart.draw_series(LineSeries::new(series, &style.trace))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// One bar per band, height = accumulated seconds, drawn in the band's color.
pub fn render_band_histogram_png(
    totals: &[BandTotal],
    style: &PlotStyle,
) -> Result<Vec<u8>, AcquisitionError> {
    if totals.is_empty() {
        return Err(AcquisitionError::Plot("no bands to draw".into()));
    }
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let y_max = totals
            .iter()
            .map(|t| t.seconds as f32)
            .fold(0.0f32, f32::max)
            .max(1.0);
        let names: Vec<String> = totals.iter().map(|t| t.name.clone()).collect();
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption("Time in band", ("sans-serif", 20).into_font().color(&WHITE))
            .set_label_area_size(LabelAreaPosition::Left, 45)
            .set_label_area_size(LabelAreaPosition::Bottom, 40)
            .build_cartesian_2d(0f32..totals.len() as f32, 0f32..y_max * 1.1)?;
        chart
            .configure_mesh()
            .light_line_style(&WHITE.mix(0.1))
            .disable_x_mesh()
            .x_labels(totals.len() * 2)
            .x_label_formatter(&|x| {
                let idx = x.floor() as usize;
                if (x - idx as f32 - 0.5).abs() < 0.25 {
                    names.get(idx).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .y_desc("seconds")
            .draw()?;
        chart.draw_series(totals.iter().enumerate().map(|(idx, total)| {
            let [r, g, b] = total.color;
            let x0 = idx as f32 + 0.1;
            let x1 = idx as f32 + 0.9;
            Rectangle::new([(x0, 0.0), (x1, total.seconds as f32)], RGBColor(r, g, b).filled())
        }))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AcquisitionError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| AcquisitionError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::fft::SpectrumAnalyzer;
    #[test]
    fn renders_all_three_plots() {
        let samples: Vec<f32> = (0..50).map(|i| (i % 5) as f32).collect();
        let spectrum = SpectrumAnalyzer::one_second(50.0).analyze(&samples);
        let totals = vec![
            BandTotal { name: "delta".into(), color: [10, 20, 30], seconds: 1.2 },
            BandTotal { name: "alpha".into(), color: [200, 20, 30], seconds: 0.0 },
        ];
        let style = PlotStyle::default();
        assert!(!render_waveform_png(&samples, 0.0, 50.0, &style).unwrap().is_empty());
        assert!(!render_spectrum_png(&spectrum, &style).unwrap().is_empty());
        assert!(!render_band_histogram_png(&totals, &style).unwrap().is_empty());
    }
    #[test]
    fn empty_inputs_are_rejected() {
        let style = PlotStyle::default();
        assert!(matches!(
            render_waveform_png(&[], 0.0, 50.0, &style),
            Err(AcquisitionError::Plot(_))
        ));
        assert!(render_band_histogram_png(&[], &style).is_err());
    }
}
