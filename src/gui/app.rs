//! Dashboard Main Application
//! Main window with control panel and chart viewer.

use crate::charts::StaticChartRenderer;
use crate::config;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use crate::session::{LoadedSession, Session};
use egui::SidePanel;
use std::sync::mpsc::{channel, Receiver};
use std::thread;

/// Result of a load pass on the worker thread
enum LoadResult {
    Complete(LoadedSession),
    Error(String),
}

/// Main application window.
pub struct DashboardApp {
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,
    session: Option<LoadedSession>,

    // Async store loading
    load_rx: Option<Receiver<LoadResult>>,
}

impl DashboardApp {
    pub fn new(_cc: &eframe::CreationContext<'_>) -> Self {
        Self {
            control_panel: ControlPanel::new(),
            chart_viewer: ChartViewer::new(),
            session: None,
            load_rx: None,
        }
    }

    fn is_loading(&self) -> bool {
        self.load_rx.is_some()
    }

    /// Pick a store file and load it on a worker thread.
    fn handle_upload(&mut self) {
        if self.is_loading() {
            return;
        }

        let Some(path) = rfd::FileDialog::new()
            .add_filter("SQLite database", &config::ACCEPTED_EXTENSIONS)
            .pick_file()
        else {
            return;
        };

        // A new upload replaces the previous session entirely.
        self.chart_viewer.clear();
        self.session = None;
        self.control_panel.store_path = Some(path.clone());
        self.control_panel.set_status("Loading database...");
        self.control_panel.busy = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);

        thread::spawn(move || {
            let result = match Session::load(&path) {
                Ok(session) => LoadResult::Complete(session),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Load failed");
                    LoadResult::Error(e.to_string())
                }
            };
            let _ = tx.send(result);
        });
    }

    /// Check for load results
    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };

        match rx.try_recv() {
            Ok(LoadResult::Complete(session)) => {
                self.control_panel.set_status(&format!(
                    "Loaded {} consultations from {}",
                    session.summary.total_consultations, session.file_name
                ));
                self.chart_viewer.set_summary(session.summary.clone());
                self.session = Some(session);
                self.control_panel.busy = false;
            }
            Ok(LoadResult::Error(error)) => {
                self.control_panel.set_error(&error);
                self.control_panel.busy = false;
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => {
                self.load_rx = Some(rx);
            }
            Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                self.control_panel.set_error("Loader stopped unexpectedly");
                self.control_panel.busy = false;
            }
        }
    }

    /// Handle PNG export - render all charts and write them to a chosen folder
    fn handle_export_png(&mut self) {
        let Some(session) = &self.session else {
            self.control_panel.set_status("No charts to export");
            return;
        };

        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return; // User cancelled
        };

        self.control_panel.set_status("Rendering charts...");
        match StaticChartRenderer::export(&session.summary, &dir) {
            Ok(files) => {
                self.control_panel.set_status(&format!(
                    "Exported {} files to {}",
                    files.len(),
                    dir.display()
                ));
            }
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Export failed");
                self.control_panel.set_error(&e.to_string());
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();

        if self.is_loading() {
            ctx.request_repaint();
        }

        SidePanel::left("control_panel")
            .min_width(280.0)
            .max_width(320.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui, self.session.as_ref());
                    match action {
                        ControlPanelAction::Upload => self.handle_upload(),
                        ControlPanelAction::ExportPng => self.handle_export_png(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui);
        });
    }
}
