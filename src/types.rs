// src/types.rs
use std::path::PathBuf;
use crate::drivers::{BandTotal, Spectrum};
use crate::feedback::{CyclerState, VideoFrame};
/// Where a streaming session draws its samples from.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamOrigin {
    /// Serial device; `None` picks the configured or first enumerated port.
    Serial(Option<String>),
    /// The most recently loaded file, streamed at the polling cadence.
    Replay,
    /// Synthetic signal at the given frequency.
    Simulation(f32),
}
// GUI -> engine
#[derive(Clone, Debug)]
pub enum GuiCommand {
    StartStream(StreamOrigin),
    StopStream,
    LoadFile(PathBuf),
    SaveRange { path: PathBuf, from: String, to: String },
    PreviewRange { from: String, to: String },
    ExportPlots(PathBuf),
}
/// The band the latest evaluation fell into.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveBand {
    pub name: String,
    pub color: [u8; 3],
    pub peak_hz: f32,
}
/// User-visible outcome of an intent or a failure.
#[derive(Clone, Debug, PartialEq)]
pub enum Notice {
    NoDeviceFound,
    DeviceDisconnected,
    ReplayFinished,
    NothingLoaded,
    Busy,
    InvalidRange(String),
    UnsupportedFile(String),
    VideoUnavailable(String),
    Failed(String),
    Loaded { samples: usize },
    Saved(PathBuf),
    Exported(PathBuf),
}
impl Notice {
    pub fn text(&self) -> String {
        match self {
            Notice::NoDeviceFound => "no external device found".into(),
            Notice::DeviceDisconnected => "external device disconnected".into(),
            Notice::ReplayFinished => "replay finished".into(),
            Notice::NothingLoaded => "load a file first".into(),
            Notice::Busy => "stop streaming first".into(),
            Notice::InvalidRange(msg) => format!("from and to values must be numbers: {msg}"),
            Notice::UnsupportedFile(msg) => format!("Error: {msg}"),
            Notice::VideoUnavailable(msg) => format!("feedback video unavailable: {msg}"),
            Notice::Failed(msg) => msg.clone(),
            Notice::Loaded { samples } => format!("data loaded ({samples} samples)"),
            Notice::Saved(path) => format!("data saved to {}", path.display()),
            Notice::Exported(dir) => format!("plots exported to {}", dir.display()),
        }
    }
    pub fn is_error(&self) -> bool {
        !matches!(
            self,
            Notice::ReplayFinished | Notice::Loaded { .. } | Notice::Saved(_) | Notice::Exported(_)
        )
    }
}
// engine -> GUI
#[derive(Clone, Debug)]
pub enum FeedbackMessage {
    Log(String),
    Streaming(bool),
    /// Trailing samples for the waveform view; `start_secs` is the time of `samples[0]`.
    Waveform { start_secs: f32, sample_rate_hz: f32, samples: Vec<f32> },
    Spectrum(Spectrum),
    Classification(Option<ActiveBand>),
    BandTotals(Vec<BandTotal>),
    Preview { from_secs: f32, to_secs: f32 },
    Notice(Notice),
    Cycler(CyclerState),
    VideoFrame(VideoFrame),
    VideoClosed,
}
