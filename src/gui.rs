// src/gui.rs
use eframe::egui;
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, Line, Plot, PlotBounds, PlotPoints, VLine};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use crate::drivers::{available_ports, BandTotal, Spectrum};
use crate::feedback::{CyclerState, VideoFrame};
use crate::types::*;
#[derive(Clone, Copy, PartialEq)]
enum OriginChoice {
    Serial,
    Simulation,
    Replay,
}
pub struct FeedbackApp {
    // 通讯管道
    rx: Receiver<FeedbackMessage>,
    tx_cmd: Sender<GuiCommand>,
    is_streaming: bool,
    origin: OriginChoice,
    ports: Vec<String>,
    selected_port: Option<String>,
    sim_frequency: f32,
    // 显示数据
    waveform: Vec<[f64; 2]>,
    spectrum: Option<Spectrum>,
    active_band: Option<ActiveBand>,
    totals: Vec<BandTotal>,
    preview: Option<(f32, f32)>,
    zoom_pending: bool,
    cycler: CyclerState,
    video: Option<egui::TextureHandle>,
    // 文件操作
    load_path: String,
    save_path: String,
    export_dir: String,
    range_from: String,
    range_to: String,
    notice: Option<Notice>,
    log_messages: Vec<String>,
}
impl FeedbackApp {
    pub fn new(rx: Receiver<FeedbackMessage>, tx_cmd: Sender<GuiCommand>) -> Self {
        Self {
            rx,
            tx_cmd,
            is_streaming: false,
            origin: OriginChoice::Serial,
            ports: available_ports(),
            selected_port: None,
            sim_frequency: 10.0,
            waveform: Vec::new(),
            spectrum: None,
            active_band: None,
            totals: Vec::new(),
            preview: None,
            zoom_pending: false,
            cycler: CyclerState::Idle,
            video: None,
            load_path: "session.csv".to_owned(),
            save_path: "session.csv".to_owned(),
            export_dir: "plots".to_owned(),
            range_from: String::new(),
            range_to: String::new(),
            notice: None,
            log_messages: vec!["Neurofeedback ready.".to_owned()],
        }
    }
    fn log(&mut self, msg: &str) {
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 {
            self.log_messages.remove(0);
        }
    }
    fn send(&mut self, cmd: GuiCommand) {
        if self.tx_cmd.send(cmd).is_err() {
            self.log("engine is not running");
        }
    }
    fn handle(&mut self, ctx: &egui::Context, msg: FeedbackMessage) {
        match msg {
            FeedbackMessage::Log(s) => self.log(&s),
            FeedbackMessage::Streaming(b) => self.is_streaming = b,
            FeedbackMessage::Waveform {
                start_secs,
                sample_rate_hz,
                samples,
            } => {
                let dt = 1.0 / sample_rate_hz as f64;
                self.waveform = samples
                    .iter()
                    .enumerate()
                    .map(|(i, v)| [start_secs as f64 + i as f64 * dt, *v as f64])
                    .collect();
            }
            FeedbackMessage::Spectrum(s) => self.spectrum = Some(s),
            FeedbackMessage::Classification(band) => self.active_band = band,
            FeedbackMessage::BandTotals(totals) => self.totals = totals,
            FeedbackMessage::Preview { from_secs, to_secs } => {
                self.preview = Some((from_secs, to_secs));
                self.zoom_pending = true;
            }
            FeedbackMessage::Notice(notice) => {
                self.log(&notice.text());
                self.notice = Some(notice);
            }
            FeedbackMessage::Cycler(state) => self.cycler = state,
            FeedbackMessage::VideoFrame(frame) => self.show_frame(ctx, frame),
            FeedbackMessage::VideoClosed => self.video = None,
        }
    }
    fn show_frame(&mut self, ctx: &egui::Context, frame: VideoFrame) {
        let size = [frame.width as usize, frame.height as usize];
        if frame.rgba.len() != size[0] * size[1] * 4 {
            return;
        }
        let image = egui::ColorImage::from_rgba_unmultiplied(size, &frame.rgba);
        match &mut self.video {
            Some(texture) => texture.set(image, egui::TextureOptions::default()),
            None => {
                self.video =
                    Some(ctx.load_texture("feedback_video", image, egui::TextureOptions::default()))
            }
        }
    }
    fn controls(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.origin, OriginChoice::Serial, "DEVICE");
            ui.selectable_value(&mut self.origin, OriginChoice::Simulation, "SIM");
            ui.selectable_value(&mut self.origin, OriginChoice::Replay, "REPLAY");
        });
        match self.origin {
            OriginChoice::Serial => {
                ui.horizontal(|ui| {
                    let current = self.selected_port.clone().unwrap_or_else(|| "auto".to_owned());
                    egui::ComboBox::from_id_source("port")
                        .selected_text(current)
                        .show_ui(ui, |ui| {
                            ui.selectable_value(&mut self.selected_port, None, "auto");
                            for port in &self.ports {
                                ui.selectable_value(
                                    &mut self.selected_port,
                                    Some(port.clone()),
                                    port.as_str(),
                                );
                            }
                        });
                    if ui.button("Rescan").clicked() {
                        self.ports = available_ports();
                    }
                });
            }
            OriginChoice::Simulation => {
                ui.add(egui::Slider::new(&mut self.sim_frequency, 0.5..=24.0).text("Hz"));
            }
            OriginChoice::Replay => {
                ui.label(RichText::new("Streams the loaded file").small());
            }
        }
        let stream_btn = if self.is_streaming { "STOP STREAM" } else { "START STREAM" };
        if ui.button(stream_btn).clicked() {
            let cmd = if self.is_streaming {
                GuiCommand::StopStream
            } else {
                GuiCommand::StartStream(match self.origin {
                    OriginChoice::Serial => StreamOrigin::Serial(self.selected_port.clone()),
                    OriginChoice::Simulation => StreamOrigin::Simulation(self.sim_frequency),
                    OriginChoice::Replay => StreamOrigin::Replay,
                })
            };
            self.send(cmd);
        }
        ui.add_space(10.0);
        ui.separator();
        ui.label("FILES");
        ui.add_enabled_ui(!self.is_streaming, |ui| {
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.load_path);
                if ui.button("Load").clicked() {
                    let path = PathBuf::from(self.load_path.trim());
                    self.send(GuiCommand::LoadFile(path));
                }
            });
            ui.horizontal(|ui| {
                ui.label("from");
                ui.add(egui::TextEdit::singleline(&mut self.range_from).desired_width(40.0));
                ui.label("to");
                ui.add(egui::TextEdit::singleline(&mut self.range_to).desired_width(40.0));
                if ui.button("Preview").clicked() {
                    self.send(GuiCommand::PreviewRange {
                        from: self.range_from.clone(),
                        to: self.range_to.clone(),
                    });
                }
            });
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.save_path);
                if ui.button("Save").clicked() {
                    self.send(GuiCommand::SaveRange {
                        path: PathBuf::from(self.save_path.trim()),
                        from: self.range_from.clone(),
                        to: self.range_to.clone(),
                    });
                }
            });
            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut self.export_dir);
                if ui.button("Export plots").clicked() {
                    self.send(GuiCommand::ExportPlots(PathBuf::from(self.export_dir.trim())));
                }
            });
        });
        ui.add_space(10.0);
        if let Some(notice) = &self.notice {
            let color = if notice.is_error() { Color32::RED } else { Color32::GREEN };
            ui.label(RichText::new(notice.text()).color(color).small());
        }
        egui::ScrollArea::vertical().max_height(120.0).show(ui, |ui| {
            for m in &self.log_messages {
                ui.monospace(m);
            }
        });
    }
    fn plots(&mut self, ui: &mut egui::Ui) {
        match &self.active_band {
            Some(band) => {
                let [r, g, b] = band.color;
                ui.label(
                    RichText::new(format!("{} ({:.1} Hz)", band.name, band.peak_hz))
                        .strong()
                        .size(22.0)
                        .color(Color32::from_rgb(r, g, b)),
                );
            }
            None => {
                ui.label(RichText::new("no band").size(22.0).color(Color32::GRAY));
            }
        }
        ui.label(format!("feedback: {:?}", self.cycler));
        let height = (ui.available_height() / 3.0 - 10.0).max(80.0);
        let zoom = if self.zoom_pending {
            self.zoom_pending = false;
            self.preview.map(|range| preview_bounds(&self.waveform, range))
        } else {
            None
        };
        Plot::new("waveform")
            .height(height)
            .auto_bounds_x()
            .show(ui, |plot_ui| {
                if let Some(bounds) = zoom {
                    plot_ui.set_plot_bounds(bounds);
                }
                plot_ui.line(
                    Line::new(PlotPoints::new(self.waveform.clone()))
                        .name("amplitude")
                        .color(Color32::from_rgb(0, 255, 255)),
                );
                if let Some((from, to)) = self.preview {
                    plot_ui.vline(VLine::new(from as f64).color(Color32::YELLOW));
                    plot_ui.vline(VLine::new(to as f64).color(Color32::YELLOW));
                }
            });
        Plot::new("spectrum")
            .height(height)
            .include_y(0.0)
            .show(ui, |plot_ui| {
                if let Some(spectrum) = &self.spectrum {
                    let points: Vec<[f64; 2]> = spectrum
                        .frequencies_hz
                        .iter()
                        .zip(&spectrum.magnitudes)
                        .map(|(f, m)| [*f as f64, *m as f64])
                        .collect();
                    plot_ui.line(
                        Line::new(PlotPoints::new(points))
                            .name("magnitude")
                            .color(Color32::YELLOW),
                    );
                }
            });
        Plot::new("bands")
            .height(height)
            .include_y(0.0)
            .show(ui, |plot_ui| {
                let bars: Vec<Bar> = self
                    .totals
                    .iter()
                    .enumerate()
                    .map(|(i, total)| {
                        let [r, g, b] = total.color;
                        Bar::new(i as f64, total.seconds)
                            .name(&total.name)
                            .fill(Color32::from_rgb(r, g, b))
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).name("seconds per band"));
            });
    }
}
/// View onto `[from, to]` seconds, fitted vertically to the samples inside it.
fn preview_bounds(points: &[[f64; 2]], (from, to): (f32, f32)) -> PlotBounds {
    let (from, to) = (from as f64, to as f64);
    let (min_y, max_y) = points
        .iter()
        .filter(|p| p[0] >= from && p[0] <= to)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p[1]), hi.max(p[1]))
        });
    let (min_y, max_y) = if min_y.is_finite() { (min_y, max_y) } else { (-1.0, 1.0) };
    let pad = ((max_y - min_y) * 0.05).max(1e-3);
    PlotBounds::from_min_max([from, min_y - pad], [to, max_y + pad])
}
impl eframe::App for FeedbackApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut msg_count = 0;
        while let Ok(msg) = self.rx.try_recv() {
            msg_count += 1;
            // Under load only keep frames and state changes; plots catch up next repaint.
            if msg_count > 200 && matches!(msg, FeedbackMessage::Waveform { .. }) {
                continue;
            }
            self.handle(ctx, msg);
        }
        if self.is_streaming || self.video.is_some() {
            ctx.request_repaint();
        }
        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);
        egui::SidePanel::left("controls").min_width(300.0).show(ctx, |ui| {
            ui.add_space(10.0);
            ui.heading("Neurofeedback");
            ui.label("Brainwave band trainer");
            ui.separator();
            self.controls(ui);
        });
        egui::CentralPanel::default().show(ctx, |ui| self.plots(ui));
        if let Some(texture) = &self.video {
            egui::Window::new("Feedback").resizable(true).show(ctx, |ui| {
                let size = texture.size_vec2();
                let scale = (ui.available_width() / size.x).min(1.0).max(0.1);
                ui.image((texture.id(), size * scale));
            });
        }
    }
}
