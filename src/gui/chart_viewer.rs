//! Chart Viewer Widget
//! Scrollable panel laying the five dashboard charts out in responsive columns.

use crate::charts::{ChartKind, ChartPlotter, DashboardSummary};
use egui::{Color32, RichText, ScrollArea};

const CHART_SPACING: f32 = 15.0;
const CHART_HEIGHT: f32 = 320.0;
const CHART_WIDTH: f32 = 620.0;

/// Right side chart display area.
#[derive(Default)]
pub struct ChartViewer {
    pub summary: Option<DashboardSummary>,
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.summary = None;
    }

    pub fn set_summary(&mut self, summary: DashboardSummary) {
        self.summary = Some(summary);
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let Some(summary) = &self.summary else {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("No Data").size(20.0));
            });
            return;
        };

        if summary.is_empty() {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new("La base de datos no contiene consultas").size(18.0));
            });
            return;
        }

        let avail_width = ui.available_width();
        let num_columns = ((avail_width / (CHART_WIDTH + CHART_SPACING)).floor() as usize).max(1);

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for row in ChartKind::ALL.chunks(num_columns) {
                    ui.horizontal(|ui| {
                        for &kind in row {
                            Self::draw_chart_card(ui, kind, summary);
                            ui.add_space(CHART_SPACING);
                        }
                    });
                    ui.add_space(CHART_SPACING);
                }
            });
    }

    fn draw_chart_card(ui: &mut egui::Ui, kind: ChartKind, summary: &DashboardSummary) {
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(1.5, Color32::from_rgb(100, 149, 237)))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.set_width(CHART_WIDTH - 24.0);
                ui.vertical(|ui| {
                    ui.label(RichText::new(kind.title()).size(16.0).strong());
                    ui.add_space(8.0);

                    match kind {
                        ChartKind::PathologyFrequency => {
                            ChartPlotter::draw_pathology_chart(ui, summary, CHART_HEIGHT)
                        }
                        ChartKind::IntensityFrequency => {
                            ChartPlotter::draw_intensity_chart(ui, summary, CHART_HEIGHT)
                        }
                        ChartKind::IntensityVsDuration => {
                            ChartPlotter::draw_intensity_duration_chart(ui, summary, CHART_HEIGHT)
                        }
                        ChartKind::ConsultationsPerUser => {
                            ChartPlotter::draw_user_chart(ui, summary, CHART_HEIGHT)
                        }
                        ChartKind::ConsultationsOverTime => {
                            ChartPlotter::draw_timeline_chart(ui, summary, CHART_HEIGHT)
                        }
                    }
                });
            });
    }
}
