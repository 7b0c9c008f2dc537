//! Control Panel Widget
//! Left side panel with upload, load status and export controls.

use crate::config;
use crate::session::LoadedSession;
use egui::{Color32, RichText};
use std::path::PathBuf;

/// Left side control panel.
pub struct ControlPanel {
    pub store_path: Option<PathBuf>,
    pub status: String,
    pub is_error: bool,
    pub busy: bool,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self {
            store_path: None,
            status: "Ready".to_string(),
            is_error: false,
            busy: false,
        }
    }
}

/// Actions triggered from the control panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPanelAction {
    None,
    Upload,
    ExportPng,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.is_error = false;
    }

    pub fn set_error(&mut self, error: &str) {
        self.status = format!("Error: {}", error);
        self.is_error = true;
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui, session: Option<&LoadedSession>) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new(format!("🩺 {}", config::APP_NAME))
                    .size(20.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new(format!("v{}", config::APP_VERSION))
                    .size(11.0)
                    .color(Color32::GRAY),
            );
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source =====
        ui.label(RichText::new("📁 Base de datos").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                let path_text = self
                    .store_path
                    .as_ref()
                    .and_then(|p| p.file_name())
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| "No file selected".to_string());

                let path_color = if self.store_path.is_some() {
                    ui.visuals().text_color()
                } else {
                    Color32::GRAY
                };
                ui.label(RichText::new(&path_text).size(12.0).color(path_color));
                ui.add_space(4.0);
                ui.label(
                    RichText::new(format!(
                        "SQLite ({}), max {} MB",
                        config::ACCEPTED_EXTENSIONS.join(", "),
                        config::MAX_UPLOAD_BYTES / (1024 * 1024)
                    ))
                    .size(10.0)
                    .color(Color32::GRAY),
                );
                ui.add_space(6.0);

                if ui
                    .add_enabled(!self.busy, egui::Button::new("⬆ Upload database"))
                    .clicked()
                {
                    action = ControlPanelAction::Upload;
                }
            });

        ui.add_space(10.0);

        // ===== Summary =====
        if let Some(session) = session {
            let s = &session.summary;
            ui.label(RichText::new("📋 Resumen").size(14.0).strong());
            ui.add_space(5.0);

            egui::Grid::new("load_summary")
                .striped(true)
                .spacing([12.0, 4.0])
                .show(ui, |ui| {
                    ui.label("Consultas");
                    ui.label(s.total_consultations.to_string());
                    ui.end_row();

                    ui.label("Sin usuario");
                    ui.label(s.unmatched_users.to_string());
                    ui.end_row();

                    ui.label("Intensidad sin escala");
                    ui.label(s.unmapped_intensity.to_string());
                    ui.end_row();

                    ui.label("Duración sin escala");
                    ui.label(s.unmapped_duration.to_string());
                    ui.end_row();

                    ui.label("Tamaño");
                    ui.label(format!("{:.1} KB", session.size_bytes as f64 / 1024.0));
                    ui.end_row();
                });

            ui.add_space(10.0);

            if ui
                .add_enabled(
                    !self.busy && !s.is_empty(),
                    egui::Button::new("🖼 Export PNG"),
                )
                .clicked()
            {
                action = ControlPanelAction::ExportPng;
            }
            ui.add_space(10.0);
        }

        ui.separator();

        // ===== Status =====
        ui.horizontal(|ui| {
            if self.busy {
                ui.spinner();
            }
            let status_color = if self.is_error {
                Color32::from_rgb(220, 53, 69)
            } else {
                ui.visuals().text_color()
            };
            ui.label(RichText::new(&self.status).size(12.0).color(status_color));
        });

        action
    }
}
