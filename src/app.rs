use crate::client::{AnalyzeClient, AnalyzeError};
use crate::detection::DetectionResult;
use crate::overlay::{self, OverlayStyle};
use crate::preview::{self, LoadedImage, Preview, PreviewError, SelectedFile};
use crate::submit::{Submitter, Ticket, NO_FILE_MESSAGE};
use eframe::egui;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const NO_FILE_LABEL: &str = "No file chosen";

// ── Events ──────────────────────────────────────────────────────────────────

/// Completions of the background work, drained by the UI every frame.
#[derive(Debug)]
pub enum AppEvent {
    PreviewLoaded {
        generation: u64,
        result: Result<LoadedImage, PreviewError>,
    },
    Analyzed {
        ticket: Ticket,
        result: Result<DetectionResult, AnalyzeError>,
    },
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Nothing to export: pick an image and analyze it first")]
    NoImage,
    #[error("Failed to save {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub fn export_path(image_path: &Path) -> PathBuf {
    image_path.with_file_name(format!(
        "{}_detections.png",
        image_path
            .file_stem()
            .unwrap_or_default()
            .to_str()
            .unwrap_or("out")
    ))
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct DetectApp {
    ctx: egui::Context,
    runtime: tokio::runtime::Handle,
    client: AnalyzeClient,
    style: OverlayStyle,

    events_tx: Sender<AppEvent>,
    events_rx: Receiver<AppEvent>,

    // upload label
    selected: Option<SelectedFile>,
    // picked image
    preview_generation: u64,
    preview: Option<Preview>,
    // analyze button
    submitter: Submitter,
    // result label and canvas overlay
    result_label: String,
    result: Option<DetectionResult>,

    alerts: Vec<String>,
}

impl DetectApp {
    pub fn new(
        ctx: egui::Context,
        runtime: tokio::runtime::Handle,
        client: AnalyzeClient,
        style: OverlayStyle,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            ctx,
            runtime,
            client,
            style,
            events_tx,
            events_rx,
            selected: None,
            preview_generation: 0,
            preview: None,
            submitter: Submitter::new(),
            result_label: String::new(),
            result: None,
            alerts: Vec::new(),
        }
    }

    pub fn upload_label(&self) -> &str {
        self.selected
            .as_ref()
            .map(|f| f.file_name.as_str())
            .unwrap_or(NO_FILE_LABEL)
    }

    pub fn analyze_label(&self) -> &'static str {
        self.submitter.button_label()
    }

    pub fn result_label(&self) -> &str {
        &self.result_label
    }

    pub fn result(&self) -> Option<&DetectionResult> {
        self.result.as_ref()
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    /// Alerts raised since the last call.
    pub fn take_alerts(&mut self) -> Vec<String> {
        std::mem::take(&mut self.alerts)
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        let ctx = self.ctx.clone();
        self.runtime.spawn(async move {
            // The receiver only goes away when the window closes.
            let _ = tx.send(task.await);
            ctx.request_repaint();
        });
    }

    pub fn show_picker(&mut self) {
        let picked = rfd::FileDialog::new()
            .add_filter("Images", preview::IMAGE_EXTENSIONS)
            .pick_file();
        if let Some(path) = picked {
            self.select(path);
        }
    }

    /// Make `path` the selection and start loading its preview.
    pub fn select(&mut self, path: PathBuf) {
        let file = SelectedFile::new(path);
        info!(file = %file.path.display(), "file selected");

        self.preview_generation += 1;
        self.preview = None;
        self.result = None;
        self.result_label.clear();
        if self.submitter.is_busy() {
            debug!("abandoning analysis of the previous file");
            self.submitter.abandon();
        }
        self.selected = Some(file.clone());

        let generation = self.preview_generation;
        self.spawn(async move {
            AppEvent::PreviewLoaded {
                generation,
                result: preview::load_preview(file).await,
            }
        });
    }

    pub fn analyze(&mut self) {
        let Some(file) = self.selected.clone() else {
            warn!("analyze requested without a file");
            self.alerts.push(NO_FILE_MESSAGE.to_string());
            return;
        };
        if self.submitter.is_busy() {
            return;
        }

        let ticket = self.submitter.begin();
        info!(file = %file.file_name, endpoint = %self.client.endpoint(), "submitting for analysis");

        let client = self.client.clone();
        self.spawn(async move {
            AppEvent::Analyzed {
                ticket,
                result: client.analyze_file(&file).await,
            }
        });
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::PreviewLoaded { generation, result } => {
                if generation != self.preview_generation {
                    debug!(generation, "dropping stale preview");
                    return;
                }
                match result {
                    Ok(loaded) => {
                        info!(
                            width = loaded.image.width(),
                            height = loaded.image.height(),
                            "preview ready"
                        );
                        self.preview = Some(Preview::new(loaded));
                    }
                    Err(e) => {
                        warn!(error = %e, "preview failed");
                        self.alerts.push(e.to_string());
                    }
                }
            }
            AppEvent::Analyzed { ticket, result } => {
                if !self.submitter.finish(ticket) {
                    debug!(?ticket, "dropping stale analysis");
                    return;
                }
                match result {
                    Ok(result) => {
                        info!(
                            detections = result.detections().count(),
                            background = result.background_count(),
                            "analysis complete"
                        );
                        self.result_label = format!("Result = {}", result.summary());
                        self.result = Some(result);
                    }
                    Err(e) => {
                        warn!(error = %e, "analysis failed");
                        self.alerts.push(e.to_string());
                    }
                }
            }
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_event(event);
        }
    }

    /// Write the image with its boxes burned in next to the source file.
    pub fn export_overlay(&self) -> Result<PathBuf, ExportError> {
        let (Some(preview), Some(result)) = (&self.preview, &self.result) else {
            return Err(ExportError::NoImage);
        };
        let mut img = preview.loaded.image.to_rgba8();
        overlay::burn_boxes(&mut img, result);

        let out_path = export_path(&preview.loaded.file.path);
        img.save(&out_path).map_err(|source| ExportError::Save {
            path: out_path.clone(),
            source,
        })?;
        info!(path = %out_path.display(), "overlay exported");
        Ok(out_path)
    }

    fn save_overlay(&mut self) {
        if let Err(e) = self.export_overlay() {
            warn!(error = %e, "export failed");
            self.alerts.push(e.to_string());
        }
    }

    fn show_alerts(&mut self) {
        for message in self.take_alerts() {
            let _ = rfd::MessageDialog::new()
                .set_level(rfd::MessageLevel::Warning)
                .set_title("detect-view")
                .set_description(message)
                .set_buttons(rfd::MessageButtons::Ok)
                .show();
        }
    }

    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let Some(preview) = self.preview.as_mut() else {
            ui.centered_and_justified(|ui| {
                ui.label("No image selected");
            });
            return;
        };

        let texture_id = preview.texture(ui.ctx()).id();
        let natural = preview.natural_size();
        let rendered = overlay::fit_to(natural, ui.available_size());

        let (response, painter) = ui.allocate_painter(rendered, egui::Sense::hover());
        let boxes = match &self.result {
            Some(result) => overlay::layout_boxes(result, rendered, natural, &self.style),
            None => Vec::new(),
        };
        overlay::paint_canvas(&painter, response.rect, texture_id, &boxes, &self.style);
    }

    fn show_results(&self, ui: &mut egui::Ui) {
        ui.heading("Detections");
        if !self.result_label.is_empty() {
            ui.label(&self.result_label);
        }
        let Some(result) = &self.result else {
            return;
        };
        ui.separator();

        use egui_extras::{Column, TableBuilder};
        TableBuilder::new(ui)
            .striped(true)
            .column(Column::auto())
            .column(Column::auto())
            .column(Column::remainder())
            .header(20.0, |mut header| {
                header.col(|ui| {
                    ui.strong("Class");
                });
                header.col(|ui| {
                    ui.strong("Score");
                });
                header.col(|ui| {
                    ui.strong("Box (top, left, h, w)");
                });
            })
            .body(|mut body| {
                for p in result.detections() {
                    body.row(18.0, |mut row| {
                        row.col(|ui| {
                            ui.label(&p.class_name);
                        });
                        row.col(|ui| {
                            ui.label(format!("{:.2}", p.score));
                        });
                        row.col(|ui| {
                            ui.label(format!(
                                "{:.0}, {:.0}, {:.0}, {:.0}",
                                p.bbox.top, p.bbox.left, p.bbox.height, p.bbox.width
                            ));
                        });
                    });
                }
            });

        let skipped = result.background_count();
        if skipped > 0 {
            ui.label(format!("{} background entries skipped", skipped));
        }
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for DetectApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();

        // Keyboard shortcuts
        let (open, run, save) = ctx.input(|i| {
            (
                i.modifiers.ctrl && i.key_pressed(egui::Key::O),
                i.modifiers.ctrl && i.key_pressed(egui::Key::Enter),
                i.modifiers.ctrl && i.key_pressed(egui::Key::S),
            )
        });
        if open {
            self.show_picker();
        }
        if run && !self.submitter.is_busy() {
            self.analyze();
        }
        if save {
            self.save_overlay();
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Select Image").clicked() {
                    self.show_picker();
                }
                ui.label(self.upload_label());
                ui.separator();
                let analyze = ui.add_enabled(
                    !self.submitter.is_busy(),
                    egui::Button::new(self.analyze_label()),
                );
                if analyze.clicked() {
                    self.analyze();
                }
                if self.submitter.is_busy() {
                    ui.spinner();
                }
                ui.separator();
                let can_save = self.preview.is_some() && self.result.is_some();
                if ui
                    .add_enabled(can_save, egui::Button::new("Save overlay"))
                    .clicked()
                {
                    self.save_overlay();
                }
                ui.separator();
                ui.weak(self.client.endpoint().as_str());
            });
        });

        egui::SidePanel::right("results")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| {
                self.show_results(ui);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.show_canvas(ui);
        });

        self.show_alerts();
    }
}
