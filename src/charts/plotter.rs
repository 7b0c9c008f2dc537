//! Chart Plotter Module
//! Interactive dashboard panels drawn with egui_plot.

use crate::charts::summary::{CategoryCount, DashboardSummary};
use crate::data::{PainDuration, PainIntensity};
use chrono::{Datelike, NaiveDate};
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

pub const PRIMARY_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue
pub const ACCENT_COLOR: Color32 = Color32::from_rgb(231, 76, 60); // Red

/// One color per intensity score, mild to unbearable.
pub const INTENSITY_PALETTE: [Color32; 6] = [
    Color32::from_rgb(46, 204, 113),  // Green
    Color32::from_rgb(26, 188, 156),  // Teal
    Color32::from_rgb(243, 156, 18),  // Orange
    Color32::from_rgb(255, 87, 34),   // Deep Orange
    Color32::from_rgb(231, 76, 60),   // Red
    Color32::from_rgb(155, 89, 182),  // Purple
];

/// Maximum bars shown on category charts before the tail is cut.
pub const MAX_CATEGORY_BARS: usize = 25;

/// Draws the five dashboard panels.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Color for an intensity score; out-of-range scores get the primary color.
    pub fn intensity_color(score: i32) -> Color32 {
        usize::try_from(score)
            .ok()
            .and_then(|i| INTENSITY_PALETTE.get(i).copied())
            .unwrap_or(PRIMARY_COLOR)
    }

    /// Bubble radius for a point observed `count` times.
    pub fn bubble_radius(count: usize) -> f32 {
        4.0 + 3.0 * (count as f32).sqrt()
    }

    /// Vertical bar chart over labelled categories.
    fn draw_category_bars(
        ui: &mut egui::Ui,
        id: &str,
        counts: &[CategoryCount],
        colors: impl Fn(usize) -> Color32,
        height: f32,
    ) {
        let shown = &counts[..counts.len().min(MAX_CATEGORY_BARS)];
        let labels: Vec<String> = shown.iter().map(|c| c.label.clone()).collect();

        let bars: Vec<Bar> = shown
            .iter()
            .enumerate()
            .map(|(i, c)| {
                Bar::new(i as f64, c.count as f64)
                    .name(&c.label)
                    .fill(colors(i))
                    .width(0.7)
            })
            .collect();

        Plot::new(id)
            .height(height)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .include_y(0.0)
            .y_axis_label("Consultas")
            .x_axis_formatter(move |mark, _range| {
                let idx = mark.value.round();
                if (mark.value - idx).abs() < 1e-6 && idx >= 0.0 {
                    labels.get(idx as usize).cloned().unwrap_or_default()
                } else {
                    String::new()
                }
            })
            .show(ui, |plot_ui| {
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    pub fn draw_pathology_chart(ui: &mut egui::Ui, summary: &DashboardSummary, height: f32) {
        Self::draw_category_bars(
            ui,
            "pathology_frequency",
            &summary.pathology_counts,
            |_| PRIMARY_COLOR,
            height,
        );
    }

    pub fn draw_intensity_chart(ui: &mut egui::Ui, summary: &DashboardSummary, height: f32) {
        Self::draw_category_bars(
            ui,
            "intensity_frequency",
            &summary.intensity_counts,
            |i| Self::intensity_color(i as i32),
            height,
        );
    }

    pub fn draw_user_chart(ui: &mut egui::Ui, summary: &DashboardSummary, height: f32) {
        Self::draw_category_bars(
            ui,
            "consultations_per_user",
            &summary.user_counts,
            |_| ACCENT_COLOR,
            height,
        );
    }

    /// Bubble scatter of intensity score against duration score, with the
    /// mean intensity per duration overlaid.
    pub fn draw_intensity_duration_chart(
        ui: &mut egui::Ui,
        summary: &DashboardSummary,
        height: f32,
    ) {
        Plot::new("intensity_vs_duration")
            .height(height)
            .allow_scroll(false)
            .legend(Legend::default())
            .include_x(0.5)
            .include_x(5.5)
            .include_y(-0.5)
            .include_y(5.5)
            .x_axis_label("Duración")
            .y_axis_label("Intensidad")
            .x_axis_formatter(|mark, _range| {
                PainDuration::from_score(mark.value.round() as i32)
                    .filter(|_| (mark.value - mark.value.round()).abs() < 1e-6)
                    .map(|d| d.label().to_string())
                    .unwrap_or_default()
            })
            .y_axis_formatter(|mark, _range| {
                PainIntensity::from_score(mark.value.round() as i32)
                    .filter(|_| (mark.value - mark.value.round()).abs() < 1e-6)
                    .map(|i| i.label().to_string())
                    .unwrap_or_default()
            })
            .show(ui, |plot_ui| {
                for point in &summary.intensity_vs_duration {
                    plot_ui.points(
                        Points::new(PlotPoints::new(vec![[
                            point.duration as f64,
                            point.intensity as f64,
                        ]]))
                        .radius(Self::bubble_radius(point.count))
                        .color(Self::intensity_color(point.intensity).gamma_multiply(0.6)),
                    );
                }

                if !summary.duration_stats.is_empty() {
                    let means: PlotPoints = summary
                        .duration_stats
                        .iter()
                        .map(|d| [d.duration as f64, d.mean_intensity])
                        .collect();
                    plot_ui.line(
                        Line::new(means)
                            .color(Color32::BLACK)
                            .width(1.5)
                            .name("Intensidad media"),
                    );
                }
            });
    }

    /// Daily consultation counts as a line with markers.
    pub fn draw_timeline_chart(ui: &mut egui::Ui, summary: &DashboardSummary, height: f32) {
        let points: Vec<[f64; 2]> = summary
            .daily_counts
            .iter()
            .map(|d| [d.date.num_days_from_ce() as f64, d.count as f64])
            .collect();

        Plot::new("consultations_over_time")
            .height(height)
            .allow_scroll(false)
            .include_y(0.0)
            .y_axis_label("Consultas")
            .x_axis_formatter(|mark, _range| {
                NaiveDate::from_num_days_from_ce_opt(mark.value.round() as i32)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            })
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from_iter(points.iter().copied()))
                        .color(PRIMARY_COLOR)
                        .width(1.5),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from_iter(points.iter().copied()))
                        .radius(3.0)
                        .color(PRIMARY_COLOR),
                );
            });
    }
}
