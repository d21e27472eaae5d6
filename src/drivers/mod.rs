// src/drivers/mod.rs
pub mod bands;
pub mod buffer;
pub mod error;
pub mod fft;
pub mod pipeline;
pub mod plot;
pub mod source;
pub use bands::{BandAccumulator, BandDefinition, BandSet, BandTotal};
pub use buffer::SampleStream;
pub use error::AcquisitionError;
pub use fft::{Spectrum, SpectrumAnalyzer};
pub use pipeline::{BandPipeline, Evaluation};
pub use plot::{render_band_histogram_png, render_spectrum_png, render_waveform_png, PlotStyle};
pub use source::{
    available_ports, DeviceConnector, ReplaySource, SampleSource, SerialConnector, SimulatedSource,
};
