//! Static Chart Renderer
//! Renders the five dashboard panels to PNG with plotters.
//!
//! Each chart is drawn into an in-memory RGB buffer and encoded with the
//! `image` crate, so an export never touches disk until the final write.

use crate::charts::summary::{CategoryCount, ChartKind, DashboardSummary};
use crate::data::{PainDuration, PainIntensity};
use chrono::{Datelike, NaiveDate};
use image::{ImageFormat, RgbImage};
use plotters::coord::Shift;
use plotters::prelude::*;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufWriter, Cursor};
use std::ops::Range;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Bitmap buffer does not match {width}x{height}")]
    Buffer { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Summary serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

// Colors
const BAR_BLUE: RGBColor = RGBColor(91, 155, 213);
const BAR_ORANGE: RGBColor = RGBColor(237, 125, 49);
const INTENSITY_COLORS: [RGBColor; 6] = [
    RGBColor(112, 173, 71),
    RGBColor(26, 188, 156),
    RGBColor(243, 156, 18),
    RGBColor(255, 87, 34),
    RGBColor(231, 76, 60),
    RGBColor(155, 89, 182),
];

const FONT: &str = "sans-serif";
pub const EXPORT_WIDTH: u32 = 1200;
pub const EXPORT_HEIGHT: u32 = 800;
pub const SUMMARY_FILE: &str = "summary.json";

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render a single chart to PNG bytes.
    pub fn render_chart_to_bytes(
        kind: ChartKind,
        summary: &DashboardSummary,
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, RenderError> {
        let mut buf = vec![0u8; (width * height * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut buf, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            match kind {
                ChartKind::PathologyFrequency => Self::draw_bars(
                    &root,
                    kind.title(),
                    &summary.pathology_counts,
                    |_| BAR_BLUE,
                )?,
                ChartKind::IntensityFrequency => Self::draw_bars(
                    &root,
                    kind.title(),
                    &summary.intensity_counts,
                    |i| INTENSITY_COLORS[i % INTENSITY_COLORS.len()],
                )?,
                ChartKind::IntensityVsDuration => Self::draw_scatter(&root, summary)?,
                ChartKind::ConsultationsPerUser => Self::draw_bars(
                    &root,
                    kind.title(),
                    &summary.user_counts,
                    |_| BAR_ORANGE,
                )?,
                ChartKind::ConsultationsOverTime => Self::draw_timeline(&root, summary)?,
            }

            root.present().map_err(draw_err)?;
        }

        let img = RgbImage::from_raw(width, height, buf).ok_or(RenderError::Buffer { width, height })?;
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(png)
    }

    /// Render all five charts in parallel, in dashboard order.
    pub fn render_all(
        summary: &DashboardSummary,
        width: u32,
        height: u32,
    ) -> Result<Vec<(ChartKind, Vec<u8>)>, RenderError> {
        ChartKind::ALL
            .par_iter()
            .map(|&kind| {
                Self::render_chart_to_bytes(kind, summary, width, height).map(|png| (kind, png))
            })
            .collect()
    }

    /// Write every chart as `<stem>.png` plus `summary.json` into `dir`.
    pub fn export(summary: &DashboardSummary, dir: &Path) -> Result<Vec<PathBuf>, RenderError> {
        let rendered = Self::render_all(summary, EXPORT_WIDTH, EXPORT_HEIGHT)?;

        let mut written = Vec::with_capacity(rendered.len() + 1);
        for (kind, png) in rendered {
            let path = dir.join(format!("{}.png", kind.file_stem()));
            std::fs::write(&path, png)?;
            written.push(path);
        }

        let summary_path = dir.join(SUMMARY_FILE);
        serde_json::to_writer_pretty(BufWriter::new(File::create(&summary_path)?), summary)?;
        written.push(summary_path);

        tracing::info!(dir = %dir.display(), files = written.len(), "Exported charts");
        Ok(written)
    }

    fn draw_bars<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        title: &str,
        counts: &[CategoryCount],
        color: impl Fn(usize) -> RGBColor,
    ) -> Result<(), RenderError> {
        let n = counts.len().max(1);
        let labels: Vec<&str> = counts.iter().map(|c| c.label.as_str()).collect();
        let y_max = count_ceiling(counts.iter().map(|c| c.count).max().unwrap_or(0));

        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 28))
            .margin(20)
            .x_label_area_size(120)
            .y_label_area_size(60)
            .build_cartesian_2d((0..n).into_segmented(), 0u32..y_max)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => labels.get(*i).map(|s| s.to_string()).unwrap_or_default(),
                _ => String::new(),
            })
            .x_label_style((FONT, 14).into_font().transform(FontTransform::Rotate90))
            .y_desc("Consultas")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(counts.iter().enumerate().map(|(i, c)| {
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(i), 0),
                        (SegmentValue::Exact(i + 1), c.count as u32),
                    ],
                    color(i).filled(),
                );
                bar.set_margin(0, 0, 8, 8);
                bar
            }))
            .map_err(draw_err)?;

        Ok(())
    }

    fn draw_scatter<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        summary: &DashboardSummary,
    ) -> Result<(), RenderError> {
        let mut chart = ChartBuilder::on(root)
            .caption(ChartKind::IntensityVsDuration.title(), (FONT, 28))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(150)
            .build_cartesian_2d(0.5f64..5.5f64, -0.5f64..5.5f64)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_labels(11)
            .y_labels(13)
            .x_label_formatter(&|v| {
                integral(*v)
                    .and_then(PainDuration::from_score)
                    .map(|d| d.label().to_string())
                    .unwrap_or_default()
            })
            .y_label_formatter(&|v| {
                integral(*v)
                    .and_then(PainIntensity::from_score)
                    .map(|i| i.label().to_string())
                    .unwrap_or_default()
            })
            .x_desc("Duración")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(summary.intensity_vs_duration.iter().map(|p| {
                let color = INTENSITY_COLORS
                    .get(p.intensity as usize)
                    .copied()
                    .unwrap_or(BAR_BLUE);
                Circle::new(
                    (p.duration as f64, p.intensity as f64),
                    (6.0 + 4.0 * (p.count as f64).sqrt()) as u32,
                    color.mix(0.6).filled(),
                )
            }))
            .map_err(draw_err)?;

        if !summary.duration_stats.is_empty() {
            chart
                .draw_series(LineSeries::new(
                    summary
                        .duration_stats
                        .iter()
                        .map(|d| (d.duration as f64, d.mean_intensity)),
                    BLACK.stroke_width(2),
                ))
                .map_err(draw_err)?
                .label("Intensidad media")
                .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));

            chart
                .configure_series_labels()
                .background_style(&WHITE.mix(0.8))
                .border_style(&BLACK)
                .draw()
                .map_err(draw_err)?;
        }

        Ok(())
    }

    fn draw_timeline<DB: DrawingBackend>(
        root: &DrawingArea<DB, Shift>,
        summary: &DashboardSummary,
    ) -> Result<(), RenderError> {
        let points: Vec<(i32, u32)> = summary
            .daily_counts
            .iter()
            .map(|d| (d.date.num_days_from_ce(), d.count as u32))
            .collect();
        let days: Vec<i32> = points.iter().map(|(x, _)| *x).collect();
        let y_max = count_ceiling(summary.daily_counts.iter().map(|d| d.count).max().unwrap_or(0));

        let mut chart = ChartBuilder::on(root)
            .caption(ChartKind::ConsultationsOverTime.title(), (FONT, 28))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(60)
            .build_cartesian_2d(day_range(&days), 0u32..y_max)
            .map_err(draw_err)?;

        chart
            .configure_mesh()
            .x_labels(8)
            .x_label_formatter(&|v| {
                NaiveDate::from_num_days_from_ce_opt(*v)
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default()
            })
            .y_desc("Consultas")
            .draw()
            .map_err(draw_err)?;

        chart
            .draw_series(LineSeries::new(points.iter().copied(), BAR_BLUE.stroke_width(2)))
            .map_err(draw_err)?;
        chart
            .draw_series(
                points
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 4u32, BAR_BLUE.filled())),
            )
            .map_err(draw_err)?;

        Ok(())
    }
}

/// Upper bound of a count axis with some headroom above the tallest value.
fn count_ceiling(max: usize) -> u32 {
    let max = max as u32;
    max + (max / 10).max(1)
}

/// Day axis covering every observed day; a single day still gets a width.
fn day_range(days: &[i32]) -> Range<i32> {
    match (days.iter().min(), days.iter().max()) {
        (Some(&lo), Some(&hi)) => (lo - 1)..(hi + 2),
        _ => {
            let today = chrono::Local::now().date_naive().num_days_from_ce();
            (today - 1)..(today + 2)
        }
    }
}

/// The integer a tick value sits on, if it sits on one.
fn integral(v: f64) -> Option<i32> {
    let r = v.round();
    ((v - r).abs() < 1e-6).then_some(r as i32)
}
