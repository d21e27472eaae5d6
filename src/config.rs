// src/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use crate::drivers::{AcquisitionError, BandDefinition, BandSet};
use crate::feedback::FrameRange;
pub const DEFAULT_CONFIG_FILE: &str = "neurofeedback.json";
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: f32,
    /// Cadence of the sample fetch activity.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Cadence of spectral evaluation; also the per-evaluation duration increment.
    #[serde(default = "default_report_interval")]
    pub report_interval_ms: u64,
    /// Segment stride, in samples, when a loaded file is evaluated retrospectively.
    #[serde(default = "default_replay_step")]
    pub replay_step_samples: usize,
    /// Width of the live waveform sent to the renderer.
    #[serde(default = "default_display_seconds")]
    pub display_seconds: f32,
    #[serde(default)]
    pub serial: SerialSettings,
    #[serde(default)]
    pub feedback: FeedbackSettings,
    #[serde(default = "default_bands")]
    pub bands: Vec<BandDefinition>,
}
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Explicit port; `None` picks the first enumerated port.
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_serial_timeout")]
    pub timeout_ms: u64,
}
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedbackSettings {
    /// Directory of numbered frame images making up the feedback video.
    #[serde(default = "default_video_dir")]
    pub video_dir: PathBuf,
    #[serde(default = "default_arm_delay")]
    pub arm_delay_ms: u64,
    #[serde(default = "default_burst_frames")]
    pub burst_frames: usize,
    #[serde(default = "default_frame_delay")]
    pub frame_delay_ms: u64,
}
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: default_sample_rate(),
            poll_interval_ms: default_poll_interval(),
            report_interval_ms: default_report_interval(),
            replay_step_samples: default_replay_step(),
            display_seconds: default_display_seconds(),
            serial: SerialSettings::default(),
            feedback: FeedbackSettings::default(),
            bands: default_bands(),
        }
    }
}
impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: None,
            baud_rate: default_baud_rate(),
            timeout_ms: default_serial_timeout(),
        }
    }
}
impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            video_dir: default_video_dir(),
            arm_delay_ms: default_arm_delay(),
            burst_frames: default_burst_frames(),
            frame_delay_ms: default_frame_delay(),
        }
    }
}
impl AppConfig {
    /// Reads `path` if it exists; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        info!("loaded config from {}", path.display());
        Ok(config)
    }
    pub fn validate(&self) -> Result<BandSet, AcquisitionError> {
        // Below 0.5 Hz a one-second window rounds to zero samples.
        if !self.sample_rate_hz.is_finite() || self.window_len() == 0 {
            return Err(AcquisitionError::InvalidSampleRate);
        }
        if self.poll_interval_ms == 0 {
            return Err(AcquisitionError::InvalidInterval("poll_interval_ms"));
        }
        if self.report_interval_ms == 0 {
            return Err(AcquisitionError::InvalidInterval("report_interval_ms"));
        }
        BandSet::new(self.bands.clone())
    }
    /// Samples per analysis window (one second).
    pub fn window_len(&self) -> usize {
        self.sample_rate_hz.round() as usize
    }
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
    pub fn report_interval(&self) -> Duration {
        Duration::from_millis(self.report_interval_ms)
    }
    pub fn display_samples(&self) -> usize {
        (self.display_seconds * self.sample_rate_hz).ceil() as usize
    }
}
fn default_sample_rate() -> f32 {
    50.0
}
fn default_poll_interval() -> u64 {
    20
}
fn default_report_interval() -> u64 {
    200
}
fn default_replay_step() -> usize {
    10
}
fn default_display_seconds() -> f32 {
    5.0
}
fn default_baud_rate() -> u32 {
    9600
}
fn default_serial_timeout() -> u64 {
    1000
}
fn default_video_dir() -> PathBuf {
    PathBuf::from("feedback_frames")
}
fn default_arm_delay() -> u64 {
    5000
}
fn default_burst_frames() -> usize {
    5
}
fn default_frame_delay() -> u64 {
    40
}
fn default_bands() -> Vec<BandDefinition> {
    let band = |name: &str, lower_hz: f32, upper_hz: f32, color: [u8; 3], start: usize, end: usize| {
        BandDefinition {
            name: name.to_owned(),
            lower_hz,
            upper_hz,
            color,
            frames: FrameRange { start, end },
        }
    };
    vec![
        band("delta", 0.0, 4.0, [98, 114, 164], 0, 234),
        band("theta", 4.0, 8.0, [80, 180, 160], 235, 469),
        band("alpha", 8.0, 13.0, [120, 200, 80], 470, 704),
        band("beta", 13.0, 30.0, [240, 180, 60], 705, 939),
        band("gamma", 30.0, 100.0, [220, 80, 80], 940, 1174),
    ]
}
