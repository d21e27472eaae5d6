// src/engine.rs
//! Acquisition orchestrator. Owns the session context and runs on its own
//! thread, turning GUI intents into session lifecycle changes.
//!
//! A streaming session is three concurrent activities: the fetch task
//! (owns the sample source and the live stream), the report task (owns
//! the analyzer, classifier and band accumulator), and the feedback cycler.
//! They talk to each other and to this thread through channels only.
use std::ops::ControlFlow;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use log::{debug, info, warn};
use crate::config::AppConfig;
use crate::drivers::{
    render_band_histogram_png, render_spectrum_png, render_waveform_png,
    AcquisitionError, BandPipeline, BandSet, DeviceConnector, PlotStyle, ReplaySource,
    SampleSource, SampleStream, SerialConnector, SimulatedSource, Spectrum, SpectrumAnalyzer,
};
use crate::feedback::{
    ClassificationFeed, CyclerEvent, CyclerTiming, FeedbackCycler, FrameSink, ImageSequenceOpener,
    VideoFrame, VideoOpener,
};
use crate::recorder;
use crate::scheduler::RecurringTask;
use crate::types::*;
/// Internal notifications from session activities back to the orchestrator.
enum EngineEvent {
    SourceFailed(String),
    SourceFinished,
    Classified(Option<usize>),
}
struct FetchState {
    source: Box<dyn SampleSource>,
    stream: SampleStream,
    window_len: usize,
    display_len: usize,
    windows: Sender<Vec<f32>>,
    tx: Sender<FeedbackMessage>,
    events: Sender<EngineEvent>,
}
struct ReportState {
    pipeline: BandPipeline,
    windows: Receiver<Vec<f32>>,
    latest: Option<Vec<f32>>,
    current: Option<usize>,
    feed: ClassificationFeed,
    tx: Sender<FeedbackMessage>,
    events: Sender<EngineEvent>,
    last_spectrum: Option<Spectrum>,
}
struct Session {
    fetch: RecurringTask<FetchState>,
    report: RecurringTask<ReportState>,
    cycler: FeedbackCycler,
    /// Replays read from the loaded stream and must leave it intact.
    keeps_stream: bool,
}
/// Delivers video frames to the GUI.
struct ChannelSink {
    tx: Sender<FeedbackMessage>,
}
impl FrameSink for ChannelSink {
    fn show(&mut self, frame: VideoFrame) {
        self.tx.send(FeedbackMessage::VideoFrame(frame)).ok();
    }
    fn close(&mut self) {
        self.tx.send(FeedbackMessage::VideoClosed).ok();
    }
}
pub struct Orchestrator {
    config: AppConfig,
    bands: BandSet,
    tx: Sender<FeedbackMessage>,
    connector: Box<dyn DeviceConnector>,
    video: Arc<dyn VideoOpener + Sync>,
    events_tx: Sender<EngineEvent>,
    events_rx: Receiver<EngineEvent>,
    cycler_tx: Sender<CyclerEvent>,
    cycler_rx: Receiver<CyclerEvent>,
    session: Option<Session>,
    /// Loaded file, or the samples recorded by the last session.
    stream: SampleStream,
    pipeline: BandPipeline,
    last_spectrum: Option<Spectrum>,
    classification: Option<usize>,
}
impl Orchestrator {
    pub fn new(
        config: AppConfig,
        bands: BandSet,
        tx: Sender<FeedbackMessage>,
        connector: Box<dyn DeviceConnector>,
        video: Arc<dyn VideoOpener + Sync>,
    ) -> Result<Self, AcquisitionError> {
        let stream = SampleStream::new(config.sample_rate_hz)?;
        let pipeline = new_pipeline(&config, &bands);
        let (events_tx, events_rx) = mpsc::channel();
        let (cycler_tx, cycler_rx) = mpsc::channel();
        Ok(Self {
            config,
            bands,
            tx,
            connector,
            video,
            events_tx,
            events_rx,
            cycler_tx,
            cycler_rx,
            session: None,
            stream,
            pipeline,
            last_spectrum: None,
            classification: None,
        })
    }
    pub fn is_streaming(&self) -> bool {
        self.session.is_some()
    }
    pub fn current_classification(&self) -> Option<usize> {
        self.classification
    }
    /// Session activities whose threads are still running.
    pub fn active_tasks(&self) -> usize {
        self.session.as_ref().map_or(0, |s| {
            usize::from(!s.fetch.is_finished()) + usize::from(!s.report.is_finished())
        })
    }
    pub fn handle_command(&mut self, cmd: GuiCommand) {
        match cmd {
            GuiCommand::StartStream(origin) => self.start(origin),
            GuiCommand::StopStream => self.teardown(None),
            GuiCommand::LoadFile(path) => self.load_file(&path),
            GuiCommand::SaveRange { path, from, to } => self.save_range(&path, &from, &to),
            GuiCommand::PreviewRange { from, to } => self.preview_range(&from, &to),
            GuiCommand::ExportPlots(dir) => self.export_plots(&dir),
        }
    }
    /// Applies everything the session activities reported since the last call.
    pub fn pump_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                EngineEvent::SourceFailed(reason) => {
                    warn!("sample source failed: {reason}");
                    self.teardown(Some(Notice::DeviceDisconnected));
                }
                EngineEvent::SourceFinished => self.teardown(Some(Notice::ReplayFinished)),
                EngineEvent::Classified(band) => self.classification = band,
            }
        }
        while let Ok(event) = self.cycler_rx.try_recv() {
            match event {
                CyclerEvent::State(state) => {
                    debug!("feedback cycler -> {state:?}");
                    self.send(FeedbackMessage::Cycler(state));
                }
                CyclerEvent::Unavailable(msg) => self.notify(Notice::VideoUnavailable(msg)),
            }
        }
    }
    fn start(&mut self, origin: StreamOrigin) {
        if self.is_streaming() {
            self.notify(Notice::Busy);
            return;
        }
        let keeps_stream = origin == StreamOrigin::Replay;
        let source: Box<dyn SampleSource> = match origin {
            StreamOrigin::Serial(port) => match self.connector.connect(port.as_deref()) {
                Ok(source) => source,
                Err(AcquisitionError::DeviceNotFound) => return self.notify(Notice::NoDeviceFound),
                Err(AcquisitionError::DeviceDisconnected(reason)) => {
                    warn!("device dropped while connecting: {reason}");
                    return self.notify(Notice::DeviceDisconnected);
                }
                Err(err) => return self.notify(Notice::Failed(err.to_string())),
            },
            StreamOrigin::Replay => {
                if self.stream.is_empty() {
                    return self.notify(Notice::NothingLoaded);
                }
                Box::new(ReplaySource::new(self.stream.samples().to_vec()))
            }
            StreamOrigin::Simulation(frequency_hz) => Box::new(SimulatedSource::new(
                frequency_hz,
                self.config.sample_rate_hz,
            )),
        };
        self.log(format!("streaming from {}", source.describe()));
        if let Err(err) = self.spawn_session(source, keeps_stream) {
            self.notify(Notice::Failed(err.to_string()));
        }
    }
    fn spawn_session(
        &mut self,
        source: Box<dyn SampleSource>,
        keeps_stream: bool,
    ) -> Result<(), AcquisitionError> {
        let mut pipeline = std::mem::replace(&mut self.pipeline, new_pipeline(&self.config, &self.bands));
        pipeline.reset();
        self.classification = None;
        self.last_spectrum = None;
        self.send(FeedbackMessage::BandTotals(pipeline.accumulator().totals().to_vec()));
        self.send(FeedbackMessage::Classification(None));
        let cycler = FeedbackCycler::start(
            self.bands.clone(),
            CyclerTiming::from(&self.config.feedback),
            Box::new(self.video.clone()),
            Box::new(ChannelSink {
                tx: self.tx.clone(),
            }),
            self.cycler_tx.clone(),
        )?;
        let (windows_tx, windows_rx) = mpsc::channel();
        let fetch_state = FetchState {
            source,
            stream: SampleStream::new(self.config.sample_rate_hz)?,
            window_len: pipeline.window_len(),
            display_len: self.config.display_samples(),
            windows: windows_tx,
            tx: self.tx.clone(),
            events: self.events_tx.clone(),
        };
        let report_state = ReportState {
            pipeline,
            windows: windows_rx,
            latest: None,
            current: None,
            feed: cycler.classification_feed(),
            tx: self.tx.clone(),
            events: self.events_tx.clone(),
            last_spectrum: None,
        };
        let fetch = RecurringTask::spawn("sample-fetch", self.config.poll_interval(), fetch_state, fetch_tick)?;
        let report = match RecurringTask::spawn(
            "spectral-report",
            self.config.report_interval(),
            report_state,
            report_tick,
        ) {
            Ok(report) => report,
            Err(err) => {
                // The cycler stops itself when dropped.
                if let Some(state) = fetch.stop() {
                    if !keeps_stream {
                        self.stream = state.stream;
                    }
                }
                return Err(err.into());
            }
        };
        self.session = Some(Session {
            fetch,
            report,
            cycler,
            keeps_stream,
        });
        self.send(FeedbackMessage::Streaming(true));
        Ok(())
    }
    /// Idempotent: stops whatever is still running and returns to idle.
    fn teardown(&mut self, notice: Option<Notice>) {
        let Some(session) = self.session.take() else {
            return;
        };
        let Session {
            fetch,
            report,
            mut cycler,
            keeps_stream,
        } = session;
        if let Some(mut state) = fetch.stop() {
            state.source.close();
            if !keeps_stream {
                self.stream = state.stream;
            }
        }
        if let Some(state) = report.stop() {
            self.pipeline = state.pipeline;
            self.last_spectrum = state.last_spectrum;
        }
        cycler.stop();
        self.classification = None;
        // Anything still queued belongs to the session that just ended.
        while self.events_rx.try_recv().is_ok() {}
        self.send(FeedbackMessage::Classification(None));
        self.send(FeedbackMessage::Streaming(false));
        self.log(format!("streaming stopped, {} samples recorded", self.stream.len()));
        if let Some(notice) = notice {
            self.notify(notice);
        }
    }
    fn load_file(&mut self, path: &Path) {
        if self.is_streaming() {
            return self.notify(Notice::Busy);
        }
        let samples = match recorder::load_samples(path) {
            Ok(samples) => samples,
            Err(AcquisitionError::UnsupportedFileFormat(msg)) => {
                return self.notify(Notice::UnsupportedFile(msg))
            }
            Err(err) => return self.notify(Notice::Failed(err.to_string())),
        };
        self.stream.replace(samples);
        let evaluations = self
            .pipeline
            .evaluate_recording(&self.stream, self.config.replay_step_samples);
        info!(
            "evaluated {} segments of {}",
            evaluations.len(),
            path.display()
        );
        let last = evaluations.last();
        self.classification = last.and_then(|e| e.band);
        self.last_spectrum = last.map(|e| e.spectrum.clone());
        self.send(FeedbackMessage::Waveform {
            start_secs: 0.0,
            sample_rate_hz: self.stream.sample_rate_hz(),
            samples: self.stream.samples().to_vec(),
        });
        if let Some(spectrum) = &self.last_spectrum {
            self.send(FeedbackMessage::Spectrum(spectrum.clone()));
            self.send(FeedbackMessage::Classification(active_band(
                &self.bands,
                self.classification,
                spectrum.peak_hz,
            )));
        }
        self.send(FeedbackMessage::BandTotals(
            self.pipeline.accumulator().totals().to_vec(),
        ));
        self.notify(Notice::Loaded {
            samples: self.stream.len(),
        });
    }
    fn save_range(&mut self, path: &Path, from: &str, to: &str) {
        if self.is_streaming() {
            return self.notify(Notice::Busy);
        }
        if self.stream.is_empty() {
            return self.notify(Notice::NothingLoaded);
        }
        let parsed = recorder::parse_range(
            from,
            to,
            self.stream.samples_per_second(),
            self.stream.len(),
        );
        let samples = match parsed {
            Ok(Some(range)) => self.stream.slice_seconds(range.from, range.to),
            Ok(None) => self.stream.samples(),
            Err(err) => return self.notify(range_notice(err)),
        };
        match recorder::save_samples(path, samples) {
            Ok(written) => self.notify(Notice::Saved(written)),
            Err(err) => self.notify(Notice::Failed(err.to_string())),
        }
    }
    fn preview_range(&mut self, from: &str, to: &str) {
        let parsed = recorder::parse_range(
            from,
            to,
            self.stream.samples_per_second(),
            self.stream.len(),
        );
        match parsed {
            Ok(Some(range)) => self.send(FeedbackMessage::Preview {
                from_secs: range.from as f32,
                to_secs: range.to as f32,
            }),
            Ok(None) => self.send(FeedbackMessage::Preview {
                from_secs: 0.0,
                to_secs: self.stream.duration_seconds(),
            }),
            Err(err) => self.notify(range_notice(err)),
        }
    }
    fn export_plots(&mut self, dir: &Path) {
        if self.is_streaming() {
            return self.notify(Notice::Busy);
        }
        match self.write_plots(dir) {
            Ok(()) => self.notify(Notice::Exported(dir.to_path_buf())),
            Err(err) => self.notify(Notice::Failed(err.to_string())),
        }
    }
    fn write_plots(&self, dir: &Path) -> Result<(), AcquisitionError> {
        std::fs::create_dir_all(dir)?;
        let style = PlotStyle::default();
        if !self.stream.is_empty() {
            let png = render_waveform_png(
                self.stream.samples(),
                0.0,
                self.stream.sample_rate_hz(),
                &style,
            )?;
            std::fs::write(dir.join("waveform.png"), png)?;
        }
        if let Some(spectrum) = &self.last_spectrum {
            std::fs::write(dir.join("spectrum.png"), render_spectrum_png(spectrum, &style)?)?;
        }
        let png = render_band_histogram_png(self.pipeline.accumulator().totals(), &style)?;
        std::fs::write(dir.join("bands.png"), png)?;
        Ok(())
    }
    fn notify(&self, notice: Notice) {
        if notice.is_error() {
            warn!("{}", notice.text());
        } else {
            info!("{}", notice.text());
        }
        self.send(FeedbackMessage::Notice(notice));
    }
    fn log(&self, msg: String) {
        info!("{msg}");
        self.send(FeedbackMessage::Log(msg));
    }
    fn send(&self, msg: FeedbackMessage) {
        // The GUI may be gone during shutdown.
        self.tx.send(msg).ok();
    }
}
impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.teardown(None);
    }
}
fn new_pipeline(config: &AppConfig, bands: &BandSet) -> BandPipeline {
    BandPipeline::new(
        SpectrumAnalyzer::one_second(config.sample_rate_hz),
        bands.clone(),
        config.report_interval().as_secs_f64(),
    )
}
fn range_notice(err: AcquisitionError) -> Notice {
    match err {
        AcquisitionError::InvalidRangeInput(msg) => Notice::InvalidRange(msg),
        other => Notice::Failed(other.to_string()),
    }
}
fn active_band(bands: &BandSet, band: Option<usize>, peak_hz: f32) -> Option<ActiveBand> {
    let def = bands.get(band?)?;
    Some(ActiveBand {
        name: def.name.clone(),
        color: def.color,
        peak_hz,
    })
}
fn fetch_tick(state: &mut FetchState) -> ControlFlow<()> {
    match state.source.next_sample() {
        Ok(Some(sample)) => {
            state.stream.push(sample);
            if let Some(window) = state.stream.trailing(state.window_len) {
                state.windows.send(window.to_vec()).ok();
            }
            let (start_secs, tail) = state.stream.tail(state.display_len);
            state
                .tx
                .send(FeedbackMessage::Waveform {
                    start_secs,
                    sample_rate_hz: state.stream.sample_rate_hz(),
                    samples: tail.to_vec(),
                })
                .ok();
            ControlFlow::Continue(())
        }
        Ok(None) => {
            info!("{} reached its end", state.source.describe());
            state.events.send(EngineEvent::SourceFinished).ok();
            ControlFlow::Break(())
        }
        Err(err) => {
            state.source.close();
            state.events.send(EngineEvent::SourceFailed(err.to_string())).ok();
            ControlFlow::Break(())
        }
    }
}
fn report_tick(state: &mut ReportState) -> ControlFlow<()> {
    while let Ok(window) = state.windows.try_recv() {
        state.latest = Some(window);
    }
    let Some(window) = state.latest.as_deref() else {
        return ControlFlow::Continue(());
    };
    let (spectrum, band) = state.pipeline.evaluate(window);
    if band != state.current {
        state.current = band;
        state.feed.publish(band);
        state.events.send(EngineEvent::Classified(band)).ok();
        state
            .tx
            .send(FeedbackMessage::Classification(active_band(
                state.pipeline.bands(),
                band,
                spectrum.peak_hz,
            )))
            .ok();
    }
    state.tx.send(FeedbackMessage::Spectrum(spectrum.clone())).ok();
    state.last_spectrum = Some(spectrum);
    state
        .tx
        .send(FeedbackMessage::BandTotals(
            state.pipeline.accumulator().totals().to_vec(),
        ))
        .ok();
    ControlFlow::Continue(())
}
/// Runs the orchestrator on a background thread until the GUI hangs up.
pub fn spawn_thread(
    config: AppConfig,
    bands: BandSet,
    tx: Sender<FeedbackMessage>,
    rx_cmd: Receiver<GuiCommand>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("engine".into()).spawn(move || {
        let connector = Box::new(SerialConnector::new(config.serial.clone()));
        let video = Arc::new(ImageSequenceOpener::new(config.feedback.video_dir.clone()));
        let mut orchestrator = match Orchestrator::new(config, bands, tx.clone(), connector, video) {
            Ok(orchestrator) => orchestrator,
            Err(err) => {
                tx.send(FeedbackMessage::Notice(Notice::Failed(err.to_string()))).ok();
                return;
            }
        };
        tx.send(FeedbackMessage::Log("Engine ready.".to_owned())).ok();
        loop {
            match rx_cmd.recv_timeout(Duration::from_millis(20)) {
                Ok(cmd) => orchestrator.handle_command(cmd),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            orchestrator.pump_events();
        }
        info!("engine shutting down");
    })
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::bands::standard_bands;
    use crate::feedback::{CyclerState, FrameSource};
    use std::f32::consts::PI;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;
    struct FlakySource {
        remaining: usize,
        index: usize,
        closed: Arc<AtomicBool>,
    }
    impl SampleSource for FlakySource {
        fn next_sample(&mut self) -> Result<Option<f32>, AcquisitionError> {
            if self.remaining == 0 {
                return Err(AcquisitionError::DeviceDisconnected("unplugged".into()));
            }
            self.remaining -= 1;
            self.index += 1;
            Ok(Some((2.0 * PI * 10.0 * self.index as f32 / 50.0).sin()))
        }
        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
        fn describe(&self) -> String {
            "flaky test device".into()
        }
    }
    struct FlakyConnector {
        samples: usize,
        closed: Arc<AtomicBool>,
    }
    impl DeviceConnector for FlakyConnector {
        fn connect(&self, _port: Option<&str>) -> Result<Box<dyn SampleSource>, AcquisitionError> {
            Ok(Box::new(FlakySource {
                remaining: self.samples,
                index: 0,
                closed: self.closed.clone(),
            }))
        }
    }
    struct NoDevice;
    impl DeviceConnector for NoDevice {
        fn connect(&self, _port: Option<&str>) -> Result<Box<dyn SampleSource>, AcquisitionError> {
            Err(AcquisitionError::DeviceNotFound)
        }
    }
    struct BlankVideo;
    impl FrameSource for BlankVideo {
        fn frame_count(&self) -> usize {
            2000
        }
        fn read_frame(&mut self, index: usize) -> Result<VideoFrame, AcquisitionError> {
            Ok(VideoFrame {
                index,
                width: 1,
                height: 1,
                rgba: vec![0; 4],
            })
        }
    }
    struct BlankOpener;
    impl VideoOpener for BlankOpener {
        fn open(&self) -> Result<Box<dyn FrameSource>, AcquisitionError> {
            Ok(Box::new(BlankVideo))
        }
    }
    fn fast_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.poll_interval_ms = 1;
        config.report_interval_ms = 5;
        config.feedback.arm_delay_ms = 10;
        config.feedback.frame_delay_ms = 1;
        config
    }
    fn orchestrator(connector: Box<dyn DeviceConnector>) -> (Orchestrator, Receiver<FeedbackMessage>) {
        let (tx, rx) = mpsc::channel();
        let orch = Orchestrator::new(
            fast_config(),
            standard_bands(),
            tx,
            connector,
            Arc::new(BlankOpener),
        )
        .unwrap();
        (orch, rx)
    }
    fn run_until_idle(orch: &mut Orchestrator) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while orch.is_streaming() && Instant::now() < deadline {
            orch.pump_events();
            std::thread::sleep(Duration::from_millis(1));
        }
        orch.pump_events();
    }
    fn notices(rx: &Receiver<FeedbackMessage>) -> Vec<Notice> {
        rx.try_iter()
            .filter_map(|m| match m {
                FeedbackMessage::Notice(n) => Some(n),
                _ => None,
            })
            .collect()
    }
    fn write_tone(dir: &Path, freq_hz: f32, len: usize) -> std::path::PathBuf {
        let samples: Vec<f32> = (0..len)
            .map(|i| (2.0 * PI * freq_hz * i as f32 / 50.0).sin())
            .collect();
        recorder::save_samples(&dir.join("tone.csv"), &samples).unwrap()
    }
    #[test]
    fn disconnect_tears_down_everything_once() {
        let closed = Arc::new(AtomicBool::new(false));
        let (mut orch, rx) = orchestrator(Box::new(FlakyConnector {
            samples: 200,
            closed: closed.clone(),
        }));
        orch.handle_command(GuiCommand::StartStream(StreamOrigin::Serial(None)));
        assert!(orch.is_streaming());
        run_until_idle(&mut orch);
        assert!(!orch.is_streaming());
        assert!(closed.load(Ordering::SeqCst));
        assert_eq!(orch.current_classification(), None);
        assert_eq!(orch.active_tasks(), 0);
        let disconnects = notices(&rx)
            .into_iter()
            .filter(|n| *n == Notice::DeviceDisconnected)
            .count();
        assert_eq!(disconnects, 1);
        assert_eq!(orch.stream.len(), 200);
        // A second stop is harmless.
        orch.handle_command(GuiCommand::StopStream);
        assert!(notices(&rx).is_empty());
    }
    #[test]
    fn missing_device_is_reported_at_start() {
        let (mut orch, rx) = orchestrator(Box::new(NoDevice));
        orch.handle_command(GuiCommand::StartStream(StreamOrigin::Serial(None)));
        assert!(!orch.is_streaming());
        assert_eq!(notices(&rx), vec![Notice::NoDeviceFound]);
    }
    #[test]
    fn live_session_classifies_and_drives_feedback() {
        let closed = Arc::new(AtomicBool::new(false));
        let (mut orch, rx) = orchestrator(Box::new(FlakyConnector {
            samples: 100_000,
            closed,
        }));
        orch.handle_command(GuiCommand::StartStream(StreamOrigin::Serial(Some("COM4".into()))));
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut playing = false;
        let mut frames = 0;
        while Instant::now() < deadline && !(playing && frames > 0) {
            orch.pump_events();
            for msg in rx.try_iter() {
                match msg {
                    FeedbackMessage::Cycler(CyclerState::Playing) => playing = true,
                    FeedbackMessage::VideoFrame(frame) => {
                        assert!((470..=704).contains(&frame.index));
                        frames += 1;
                    }
                    _ => {}
                }
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(playing);
        assert!(frames > 0);
        assert_eq!(orch.current_classification(), Some(2));
        orch.handle_command(GuiCommand::StopStream);
        assert!(!orch.is_streaming());
        assert_eq!(orch.current_classification(), None);
        assert!(orch.pipeline.accumulator().seconds("alpha").unwrap() > 0.0);
        let closed_video = rx.try_iter().any(|m| matches!(m, FeedbackMessage::VideoClosed));
        assert!(closed_video);
    }
    #[test]
    fn loading_a_file_evaluates_every_segment() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), 10.0, 500);
        let (mut orch, rx) = orchestrator(Box::new(NoDevice));
        orch.handle_command(GuiCommand::LoadFile(path));
        let evaluations = (500 - 50) / 10 + 1;
        let alpha = orch.pipeline.accumulator().seconds("alpha").unwrap();
        assert!((alpha - evaluations as f64 * 0.005).abs() < 1e-9);
        assert_eq!(orch.current_classification(), Some(2));
        assert!(notices(&rx).contains(&Notice::Loaded { samples: 500 }));
    }
    #[test]
    fn replay_streams_loaded_file_to_the_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), 6.0, 120);
        let (mut orch, rx) = orchestrator(Box::new(NoDevice));
        orch.handle_command(GuiCommand::StartStream(StreamOrigin::Replay));
        assert_eq!(notices(&rx), vec![Notice::NothingLoaded]);
        orch.handle_command(GuiCommand::LoadFile(path));
        orch.handle_command(GuiCommand::StartStream(StreamOrigin::Replay));
        assert!(orch.is_streaming());
        run_until_idle(&mut orch);
        assert!(notices(&rx).contains(&Notice::ReplayFinished));
        assert_eq!(orch.stream.len(), 120);
    }
    #[test]
    fn stopping_a_replay_keeps_the_loaded_recording() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), 10.0, 500);
        let (mut orch, rx) = orchestrator(Box::new(NoDevice));
        orch.handle_command(GuiCommand::LoadFile(path));
        orch.handle_command(GuiCommand::StartStream(StreamOrigin::Replay));
        assert!(orch.is_streaming());
        std::thread::sleep(Duration::from_millis(30));
        orch.handle_command(GuiCommand::StopStream);
        assert!(!orch.is_streaming());
        assert_eq!(orch.stream.len(), 500);
        rx.try_iter().for_each(drop);
        let out = dir.path().join("all.csv");
        orch.handle_command(GuiCommand::SaveRange {
            path: out.clone(),
            from: String::new(),
            to: String::new(),
        });
        assert_eq!(recorder::load_samples(&out).unwrap().len(), 500);
    }
    #[test]
    fn huge_range_end_saves_the_whole_stream() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), 10.0, 500);
        let (mut orch, rx) = orchestrator(Box::new(NoDevice));
        orch.handle_command(GuiCommand::LoadFile(path));
        rx.try_iter().for_each(drop);
        let out = dir.path().join("huge.csv");
        orch.handle_command(GuiCommand::SaveRange {
            path: out.clone(),
            from: "0".into(),
            to: usize::MAX.to_string(),
        });
        assert!(matches!(notices(&rx).as_slice(), [Notice::Saved(_)]));
        assert_eq!(recorder::load_samples(&out).unwrap().len(), 500);
    }
    #[test]
    fn file_intents_are_refused_while_streaming() {
        let (mut orch, rx) = orchestrator(Box::new(NoDevice));
        orch.handle_command(GuiCommand::StartStream(StreamOrigin::Simulation(10.0)));
        assert!(orch.is_streaming());
        orch.handle_command(GuiCommand::LoadFile("whatever.csv".into()));
        orch.handle_command(GuiCommand::StartStream(StreamOrigin::Simulation(5.0)));
        orch.handle_command(GuiCommand::StopStream);
        assert_eq!(notices(&rx), vec![Notice::Busy, Notice::Busy]);
    }
    #[test]
    fn invalid_range_saves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), 10.0, 500);
        let (mut orch, rx) = orchestrator(Box::new(NoDevice));
        orch.handle_command(GuiCommand::LoadFile(path));
        rx.try_iter().for_each(drop);
        let out = dir.path().join("cut.csv");
        orch.handle_command(GuiCommand::SaveRange {
            path: out.clone(),
            from: "two".into(),
            to: "4".into(),
        });
        assert!(matches!(notices(&rx).as_slice(), [Notice::InvalidRange(_)]));
        assert!(!out.exists());
        orch.handle_command(GuiCommand::SaveRange {
            path: out.clone(),
            from: "2".into(),
            to: "4".into(),
        });
        assert_eq!(recorder::load_samples(&out).unwrap().len(), 100);
    }
    #[test]
    fn preview_reports_requested_seconds() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), 10.0, 500);
        let (mut orch, rx) = orchestrator(Box::new(NoDevice));
        orch.handle_command(GuiCommand::LoadFile(path));
        rx.try_iter().for_each(drop);
        orch.handle_command(GuiCommand::PreviewRange {
            from: "1".into(),
            to: "3".into(),
        });
        let preview = rx.try_iter().find_map(|m| match m {
            FeedbackMessage::Preview { from_secs, to_secs } => Some((from_secs, to_secs)),
            _ => None,
        });
        assert_eq!(preview, Some((1.0, 3.0)));
    }
    #[test]
    fn exports_plots_after_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_tone(dir.path(), 10.0, 200);
        let (mut orch, rx) = orchestrator(Box::new(NoDevice));
        orch.handle_command(GuiCommand::LoadFile(path));
        let out = dir.path().join("plots");
        orch.handle_command(GuiCommand::ExportPlots(out.clone()));
        assert!(notices(&rx).contains(&Notice::Exported(out.clone())));
        assert!(out.join("waveform.png").exists());
        assert!(out.join("spectrum.png").exists());
        assert!(out.join("bands.png").exists());
    }
}
