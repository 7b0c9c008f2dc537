//! Chart Summary Module
//! Aggregates the enriched table into the five dashboard datasets.

use crate::data::{EnrichedConsultation, EnrichedTable, PainDuration, PainIntensity};
use chrono::NaiveDate;
use serde::Serialize;
use statrs::statistics::Statistics;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

/// Label used for consultations without a pathology.
pub const NO_PATHOLOGY: &str = "(sin patología)";
/// Label used for consultations whose user reference found no user.
pub const NO_USER: &str = "(sin usuario)";

/// The five dashboard panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ChartKind {
    PathologyFrequency,
    IntensityFrequency,
    IntensityVsDuration,
    ConsultationsPerUser,
    ConsultationsOverTime,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::PathologyFrequency,
        ChartKind::IntensityFrequency,
        ChartKind::IntensityVsDuration,
        ChartKind::ConsultationsPerUser,
        ChartKind::ConsultationsOverTime,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ChartKind::PathologyFrequency => "Frecuencia de patologías",
            ChartKind::IntensityFrequency => "Frecuencia de intensidad del dolor",
            ChartKind::IntensityVsDuration => "Intensidad vs. duración",
            ChartKind::ConsultationsPerUser => "Consultas por usuario",
            ChartKind::ConsultationsOverTime => "Consultas a lo largo del tiempo",
        }
    }

    /// File stem used when exporting the chart as an image.
    pub fn file_stem(self) -> &'static str {
        match self {
            ChartKind::PathologyFrequency => "01_pathology_frequency",
            ChartKind::IntensityFrequency => "02_intensity_frequency",
            ChartKind::IntensityVsDuration => "03_intensity_vs_duration",
            ChartKind::ConsultationsPerUser => "04_consultations_per_user",
            ChartKind::ConsultationsOverTime => "05_consultations_over_time",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub label: String,
    pub count: usize,
}

/// Number of consultations at one (duration, intensity) score pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntensityDurationPoint {
    pub duration: i32,
    pub intensity: i32,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationStats {
    pub duration: i32,
    pub label: String,
    pub count: usize,
    pub mean_intensity: f64,
    pub std_intensity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Everything the presentation layer needs, computed once per upload.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub total_consultations: usize,
    pub unmatched_users: usize,
    pub unmapped_intensity: usize,
    pub unmapped_duration: usize,
    pub pathology_counts: Vec<CategoryCount>,
    pub intensity_counts: Vec<CategoryCount>,
    pub intensity_vs_duration: Vec<IntensityDurationPoint>,
    pub duration_stats: Vec<DurationStats>,
    pub user_counts: Vec<CategoryCount>,
    pub daily_counts: Vec<DailyCount>,
}

impl DashboardSummary {
    pub fn from_table(table: &EnrichedTable) -> Self {
        let rows = table.rows();

        let pathology_counts = Self::ranked_counts(
            rows.iter()
                .map(|r| Cow::Borrowed(r.pathology.as_deref().unwrap_or(NO_PATHOLOGY))),
        );
        let user_counts = Self::ranked_counts(rows.iter().map(Self::user_label));

        let intensity_counts = PainIntensity::ALL
            .iter()
            .map(|level| CategoryCount {
                label: level.label().to_string(),
                count: rows
                    .iter()
                    .filter(|r| r.intensity_numeric == Some(level.score()))
                    .count(),
            })
            .collect();

        let mut pairs: BTreeMap<(i32, i32), usize> = BTreeMap::new();
        let mut by_duration: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
        for row in rows {
            if let (Some(d), Some(i)) = (row.duration_numeric, row.intensity_numeric) {
                *pairs.entry((d, i)).or_default() += 1;
                by_duration.entry(d).or_default().push(i as f64);
            }
        }

        let intensity_vs_duration = pairs
            .into_iter()
            .map(|((duration, intensity), count)| IntensityDurationPoint {
                duration,
                intensity,
                count,
            })
            .collect();

        let duration_stats = by_duration
            .into_iter()
            .map(|(duration, values)| {
                let std_intensity = if values.len() > 1 {
                    values.iter().std_dev()
                } else {
                    0.0
                };
                DurationStats {
                    duration,
                    label: PainDuration::from_score(duration)
                        .map(|d| d.label().to_string())
                        .unwrap_or_default(),
                    count: values.len(),
                    mean_intensity: values.iter().mean(),
                    std_intensity,
                }
            })
            .collect();

        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for date in rows.iter().filter_map(|r| r.date_only) {
            *per_day.entry(date).or_default() += 1;
        }
        let daily_counts = per_day
            .into_iter()
            .map(|(date, count)| DailyCount { date, count })
            .collect();

        Self {
            total_consultations: table.len(),
            unmatched_users: table.unmatched_users(),
            unmapped_intensity: table.unmapped_intensity(),
            unmapped_duration: table.unmapped_duration(),
            pathology_counts,
            intensity_counts,
            intensity_vs_duration,
            duration_stats,
            user_counts,
            daily_counts,
        }
    }

    /// Per-user bucket. A matched user without a username is still its own
    /// user, told apart by id.
    fn user_label(row: &EnrichedConsultation) -> Cow<'_, str> {
        match (row.user_matched, row.username.as_deref()) {
            (false, _) => Cow::Borrowed(NO_USER),
            (true, Some(name)) => Cow::Borrowed(name),
            (true, None) => Cow::Owned(format!(
                "(usuario {} sin nombre)",
                row.user_id.as_deref().unwrap_or_default()
            )),
        }
    }

    /// Counts sorted by count descending, then label.
    fn ranked_counts<'a>(labels: impl Iterator<Item = Cow<'a, str>>) -> Vec<CategoryCount> {
        let mut counts: HashMap<Cow<'a, str>, usize> = HashMap::new();
        for label in labels {
            *counts.entry(label).or_default() += 1;
        }

        let mut ranked: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(label, count)| CategoryCount {
                label: label.to_string(),
                count,
            })
            .collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
        ranked
    }

    pub fn is_empty(&self) -> bool {
        self.total_consultations == 0
    }
}
