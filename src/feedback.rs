// src/feedback.rs
//! Video feedback loop: while a band is active, a bounded slice of the
//! feedback video keyed to that band plays in a seamless loop.
//!
//! The cycler lives on its own thread. The report activity pushes
//! classification changes to it over a channel; the cycler only acts on
//! them at burst boundaries, while a stop request is honoured at the next
//! inter-frame wait.
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use crate::config::FeedbackSettings;
use crate::drivers::{AcquisitionError, BandSet};
/// Inclusive frame-index interval of the feedback video.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: usize,
    pub end: usize,
}
impl FrameRange {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }
}
/// Position inside the active band's frame range; wraps instead of overrunning.
#[derive(Clone, Copy, Debug)]
pub struct PlaybackCursor {
    range: FrameRange,
    position: usize,
}
impl PlaybackCursor {
    pub fn new(range: FrameRange) -> Self {
        Self {
            range,
            position: range.start,
        }
    }
    pub fn position(&self) -> usize {
        self.position
    }
    pub fn range(&self) -> FrameRange {
        self.range
    }
    pub fn advance(&mut self) {
        if self.position >= self.range.end {
            self.position = self.range.start;
        } else {
            self.position += 1;
        }
    }
    pub fn jump_to(&mut self, range: FrameRange) {
        *self = Self::new(range);
    }
}
#[derive(Clone, Debug)]
pub struct VideoFrame {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}
/// Frame-addressable video resource.
pub trait FrameSource: Send {
    fn frame_count(&self) -> usize;
    fn read_frame(&mut self, index: usize) -> Result<VideoFrame, AcquisitionError>;
}
/// Opens a fresh handle on the feedback video each time playback starts.
pub trait VideoOpener: Send {
    fn open(&self) -> Result<Box<dyn FrameSource>, AcquisitionError>;
}
impl<T: VideoOpener + Sync + ?Sized> VideoOpener for std::sync::Arc<T> {
    fn open(&self) -> Result<Box<dyn FrameSource>, AcquisitionError> {
        (**self).open()
    }
}
/// Display surface for decoded frames.
pub trait FrameSink: Send {
    fn show(&mut self, frame: VideoFrame);
    /// Tears the surface down once playback releases the video.
    fn close(&mut self);
}
/// Video stored as a directory of numbered still images, sorted by file name.
pub struct ImageSequence {
    frames: Vec<PathBuf>,
}
impl ImageSequence {
    pub fn open(dir: &Path) -> Result<Self, AcquisitionError> {
        let entries = std::fs::read_dir(dir).map_err(|err| {
            AcquisitionError::VideoUnavailable(format!("{}: {err}", dir.display()))
        })?;
        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame_image(path))
            .collect();
        frames.sort();
        if frames.is_empty() {
            return Err(AcquisitionError::VideoUnavailable(format!(
                "{} holds no frame images",
                dir.display()
            )));
        }
        debug!("opened {} frames from {}", frames.len(), dir.display());
        Ok(Self { frames })
    }
}
fn is_frame_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| matches!(ext.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg"))
        .unwrap_or(false)
}
impl FrameSource for ImageSequence {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }
    fn read_frame(&mut self, index: usize) -> Result<VideoFrame, AcquisitionError> {
        let path = self.frames.get(index).ok_or_else(|| {
            AcquisitionError::VideoUnavailable(format!(
                "frame {index} is past the last frame ({})",
                self.frames.len()
            ))
        })?;
        let image = image::open(path)
            .map_err(|err| AcquisitionError::VideoUnavailable(format!("{}: {err}", path.display())))?
            .to_rgba8();
        Ok(VideoFrame {
            index,
            width: image.width(),
            height: image.height(),
            rgba: image.into_raw(),
        })
    }
}
pub struct ImageSequenceOpener {
    dir: PathBuf,
}
impl ImageSequenceOpener {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}
impl VideoOpener for ImageSequenceOpener {
    fn open(&self) -> Result<Box<dyn FrameSource>, AcquisitionError> {
        Ok(Box::new(ImageSequence::open(&self.dir)?))
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CyclerState {
    Idle,
    Armed,
    Playing,
    Stopped,
}
/// What the cycler reports back to its owner.
#[derive(Clone, Debug)]
pub enum CyclerEvent {
    State(CyclerState),
    Unavailable(String),
}
enum CyclerSignal {
    Classification(Option<usize>),
    Stop,
}
#[derive(Clone, Copy, Debug)]
pub struct CyclerTiming {
    pub arm_delay: Duration,
    pub burst_frames: usize,
    pub frame_delay: Duration,
}
impl From<&FeedbackSettings> for CyclerTiming {
    fn from(settings: &FeedbackSettings) -> Self {
        Self {
            arm_delay: Duration::from_millis(settings.arm_delay_ms),
            burst_frames: settings.burst_frames.max(1),
            frame_delay: Duration::from_millis(settings.frame_delay_ms),
        }
    }
}
/// Handle to the cycler worker thread.
pub struct FeedbackCycler {
    signals: Sender<CyclerSignal>,
    worker: Option<JoinHandle<()>>,
}
/// Sending half used by the report activity.
#[derive(Clone)]
pub struct ClassificationFeed {
    signals: Sender<CyclerSignal>,
}
impl ClassificationFeed {
    pub fn publish(&self, band: Option<usize>) {
        // The worker may already have exited on its own; nothing to deliver then.
        self.signals.send(CyclerSignal::Classification(band)).ok();
    }
}
impl FeedbackCycler {
    /// Spawns the worker in `Armed`; it checks the classification once `arm_delay` elapses.
    pub fn start(
        bands: BandSet,
        timing: CyclerTiming,
        opener: Box<dyn VideoOpener>,
        sink: Box<dyn FrameSink>,
        events: Sender<CyclerEvent>,
    ) -> Result<Self, AcquisitionError> {
        let (signals, rx) = mpsc::channel();
        let worker = CyclerWorker {
            bands,
            timing,
            opener,
            sink,
            events,
            rx,
            current: None,
            state: CyclerState::Idle,
        };
        let handle = thread::Builder::new()
            .name("feedback-cycler".into())
            .spawn(move || worker.run())?;
        Ok(Self {
            signals,
            worker: Some(handle),
        })
    }
    pub fn classification_feed(&self) -> ClassificationFeed {
        ClassificationFeed {
            signals: self.signals.clone(),
        }
    }
    /// Stops playback and waits for the worker to release the video.
    pub fn stop(&mut self) {
        self.signals.send(CyclerSignal::Stop).ok();
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("feedback cycler thread panicked");
            }
        }
    }
}
impl Drop for FeedbackCycler {
    fn drop(&mut self) {
        self.stop();
    }
}
enum PlayExit {
    Absent,
    Cancelled,
}
struct CyclerWorker {
    bands: BandSet,
    timing: CyclerTiming,
    opener: Box<dyn VideoOpener>,
    sink: Box<dyn FrameSink>,
    events: Sender<CyclerEvent>,
    rx: Receiver<CyclerSignal>,
    current: Option<usize>,
    state: CyclerState,
}
impl CyclerWorker {
    fn run(mut self) {
        self.set_state(CyclerState::Armed);
        if !self.wait(self.timing.arm_delay) {
            self.set_state(CyclerState::Stopped);
            return;
        }
        loop {
            if self.current.is_none() {
                self.set_state(CyclerState::Stopped);
                // Re-trigger on the next present classification.
                match self.rx.recv() {
                    Ok(CyclerSignal::Classification(band)) => {
                        self.current = band;
                        continue;
                    }
                    Ok(CyclerSignal::Stop) | Err(_) => return,
                }
            }
            match self.play() {
                PlayExit::Absent => continue,
                PlayExit::Cancelled => {
                    self.set_state(CyclerState::Stopped);
                    return;
                }
            }
        }
    }
    fn play(&mut self) -> PlayExit {
        let Some(mut band) = self.current else {
            return PlayExit::Absent;
        };
        let Some(range) = self.bands.get(band).map(|b| b.frames) else {
            return PlayExit::Absent;
        };
        let mut video = match self.opener.open() {
            Ok(video) => video,
            Err(err) => return self.give_up(err),
        };
        let last_frame = self.bands.iter().map(|b| b.frames.end).max().unwrap_or(0);
        if last_frame >= video.frame_count() {
            let count = video.frame_count();
            drop(video);
            return self.give_up(AcquisitionError::VideoUnavailable(format!(
                "band frames reach {last_frame} but the video has {count} frames"
            )));
        }
        let mut cursor = PlaybackCursor::new(range);
        info!("feedback playing {} frames {}..={}", self.band_name(band), range.start, range.end);
        self.set_state(CyclerState::Playing);
        loop {
            for _ in 0..self.timing.burst_frames {
                match video.read_frame(cursor.position()) {
                    Ok(frame) => self.sink.show(frame),
                    Err(err) => {
                        drop(video);
                        self.sink.close();
                        return self.give_up(err);
                    }
                }
                cursor.advance();
                if !self.wait(self.timing.frame_delay) {
                    drop(video);
                    self.sink.close();
                    return PlayExit::Cancelled;
                }
            }
            match self.current {
                None => {
                    debug!("classification absent, releasing video");
                    drop(video);
                    self.sink.close();
                    return PlayExit::Absent;
                }
                Some(next) if next != band => {
                    if let Some(next_range) = self.bands.get(next).map(|b| b.frames) {
                        debug!("band changed to {}", self.band_name(next));
                        band = next;
                        cursor.jump_to(next_range);
                    }
                }
                Some(_) => {}
            }
        }
    }
    /// Reports an unusable video, then idles until the session stops.
    fn give_up(&mut self, err: AcquisitionError) -> PlayExit {
        warn!("feedback video: {err}");
        self.events.send(CyclerEvent::Unavailable(err.to_string())).ok();
        self.set_state(CyclerState::Stopped);
        loop {
            match self.rx.recv() {
                Ok(CyclerSignal::Classification(band)) => self.current = band,
                Ok(CyclerSignal::Stop) | Err(_) => return PlayExit::Cancelled,
            }
        }
    }
    /// Sleeps for `delay` while tracking the latest classification.
    /// Returns `false` as soon as a stop arrives.
    fn wait(&mut self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return true;
            }
            match self.rx.recv_timeout(remaining) {
                Ok(CyclerSignal::Classification(band)) => self.current = band,
                Ok(CyclerSignal::Stop) | Err(RecvTimeoutError::Disconnected) => return false,
                Err(RecvTimeoutError::Timeout) => return true,
            }
        }
    }
    fn set_state(&mut self, state: CyclerState) {
        if self.state != state {
            self.state = state;
            self.events.send(CyclerEvent::State(state)).ok();
        }
    }
    fn band_name(&self, index: usize) -> &str {
        self.bands.get(index).map(|b| b.name.as_str()).unwrap_or("?")
    }
}
