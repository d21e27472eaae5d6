// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod config;
mod drivers;
mod engine;
mod feedback;
mod gui;
mod recorder;
mod scheduler;
mod types;
use std::path::PathBuf;
use std::sync::mpsc::channel;
use anyhow::{anyhow, Context};
use eframe::egui;
use config::{AppConfig, DEFAULT_CONFIG_FILE};
fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let config = AppConfig::load(&config_path)?;
    let bands = config
        .validate()
        .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
    let (tx, rx) = channel();
    let (tx_cmd, rx_cmd) = channel();
    // 启动后台引擎
    let engine = engine::spawn_thread(config, bands, tx, rx_cmd).context("failed to start engine")?;
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1280.0, 860.0])
        .with_min_inner_size([960.0, 640.0])
        .with_title("Neurofeedback");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "Neurofeedback",
        options,
        Box::new(|_cc| Box::new(gui::FeedbackApp::new(rx, tx_cmd))),
    )
    .map_err(|e| anyhow!("{e}"))?;
    // The app (and its command sender) is gone; the engine winds down.
    if engine.join().is_err() {
        log::warn!("engine thread panicked");
    }
    Ok(())
}
