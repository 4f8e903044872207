//! Desktop front-end. Compression and decompression run on worker threads and
//! report back through shared state.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;

use bitpiper::{compress_file_with_progress, decompress_file, Codec, Config, MAX_DEPTH};
use eframe::App;
use tracing::error;

use crate::default_output;

#[derive(Debug, Default)]
struct JobState {
    running: bool,
    progress: f32,
    status: String,
}

fn lock(state: &Mutex<JobState>) -> MutexGuard<'_, JobState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct BitPiperApp {
    input_path: String,
    config: Config,
    compress_job: Arc<Mutex<JobState>>,
    decompress_input: String,
    decompress_output: String,
    decompress_job: Arc<Mutex<JobState>>,
}

impl Default for BitPiperApp {
    fn default() -> Self {
        Self {
            input_path: String::new(),
            config: Config::default(),
            compress_job: Arc::default(),
            decompress_input: String::new(),
            decompress_output: String::new(),
            decompress_job: Arc::default(),
        }
    }
}

impl BitPiperApp {
    fn start_compress(&self, ctx: &egui::Context) {
        let input = PathBuf::from(&self.input_path);
        let output = default_output(&input);
        let config = self.config;
        let job = Arc::clone(&self.compress_job);
        let ctx = ctx.clone();
        {
            let mut state = lock(&job);
            state.running = true;
            state.progress = 0.0;
            state.status.clear();
        }

        thread::spawn(move || {
            let result = compress_file_with_progress(&input, &output, &config, |p| {
                lock(&job).progress = p;
                ctx.request_repaint();
            });
            let mut state = lock(&job);
            state.running = false;
            state.status = match result {
                Ok(report) => format!("Compressed to {}: {report}", output.display()),
                Err(e) => {
                    error!(input = %input.display(), "compression failed: {e}");
                    format!("Compression failed: {e}")
                }
            };
            ctx.request_repaint();
        });
    }

    fn start_decompress(&self, ctx: &egui::Context) {
        let input = PathBuf::from(&self.decompress_input);
        let output = PathBuf::from(&self.decompress_output);
        let job = Arc::clone(&self.decompress_job);
        let ctx = ctx.clone();
        lock(&job).running = true;

        thread::spawn(move || {
            let result = decompress_file(&input, &output);
            let mut state = lock(&job);
            state.running = false;
            state.status = match result {
                Ok(bytes) => format!("Restored {bytes} bytes to {}", output.display()),
                Err(e) => {
                    error!(input = %input.display(), "decompression failed: {e}");
                    format!("Decompression failed: {e}")
                }
            };
            ctx.request_repaint();
        });
    }
}

impl App for BitPiperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("BitPiper File Compressor");
            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Input file:");
                ui.text_edit_singleline(&mut self.input_path);
                if ui.button("Browse").clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_file() {
                        self.input_path = path.display().to_string();
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.label("Codec:");
                ui.radio_value(&mut self.config.codec, Codec::Ctw, "CTW");
                ui.radio_value(&mut self.config.codec, Codec::Huffman, "Huffman");
            });
            ui.add_enabled(
                self.config.codec == Codec::Ctw,
                egui::Slider::new(&mut self.config.depth, 1..=MAX_DEPTH).text("context depth"),
            );

            let (running, progress, status) = {
                let state = lock(&self.compress_job);
                (state.running, state.progress, state.status.clone())
            };
            if running {
                ui.add(egui::ProgressBar::new(progress).show_percentage());
            }
            if ui.button("Compress").clicked() && !running && !self.input_path.is_empty() {
                self.start_compress(ctx);
            }
            if !status.is_empty() {
                ui.label(status);
            }

            ui.separator();
            ui.heading("Decompressor");

            ui.horizontal(|ui| {
                ui.label("Compressed file:");
                ui.text_edit_singleline(&mut self.decompress_input);
                if ui.button("Browse").clicked() {
                    if let Some(path) = rfd::FileDialog::new().pick_file() {
                        self.decompress_input = path.display().to_string();
                    }
                }
            });

            ui.horizontal(|ui| {
                ui.label("Output file:");
                ui.text_edit_singleline(&mut self.decompress_output);
                if ui.button("Browse").clicked() {
                    if let Some(path) = rfd::FileDialog::new().save_file() {
                        self.decompress_output = path.display().to_string();
                    }
                }
            });

            let (running, status) = {
                let state = lock(&self.decompress_job);
                (state.running, state.status.clone())
            };
            if ui.button("Decompress").clicked()
                && !running
                && !self.decompress_input.is_empty()
                && !self.decompress_output.is_empty()
            {
                self.start_decompress(ctx);
            }
            if running {
                ui.spinner();
            }
            if !status.is_empty() {
                ui.label(status);
            }
        });
    }
}

/// Open the window and block until it is closed.
pub fn run() -> anyhow::Result<()> {
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "BitPiper Compressor",
        options,
        Box::new(|_cc| Box::new(BitPiperApp::default())),
    )
    .map_err(|e| anyhow::anyhow!("gui failed: {e}"))
}
