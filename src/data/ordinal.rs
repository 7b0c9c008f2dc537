//! Ordinal Scales
//! Fixed label-to-score tables for pain intensity and duration.

use serde::Serialize;

/// Pain intensity, ordered from no pain to unbearable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PainIntensity {
    None,
    Mild,
    Moderate,
    Intense,
    VeryIntense,
    Unbearable,
}

impl PainIntensity {
    pub const ALL: [PainIntensity; 6] = [
        PainIntensity::None,
        PainIntensity::Mild,
        PainIntensity::Moderate,
        PainIntensity::Intense,
        PainIntensity::VeryIntense,
        PainIntensity::Unbearable,
    ];

    /// Stored label as written by the consultation form.
    pub fn label(self) -> &'static str {
        match self {
            PainIntensity::None => "Sin Dolor",
            PainIntensity::Mild => "Dolor Leve",
            PainIntensity::Moderate => "Dolor Moderado",
            PainIntensity::Intense => "Dolor Intenso",
            PainIntensity::VeryIntense => "Dolor Muy Intenso",
            PainIntensity::Unbearable => "Dolor Insoportable",
        }
    }

    /// Score on the 0–5 scale.
    pub fn score(self) -> i32 {
        self as i32
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|v| v.label() == label)
    }

    pub fn from_score(score: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.score() == score)
    }
}

/// Pain duration, ordered from very short to very long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PainDuration {
    VeryShort,
    Short,
    Medium,
    Long,
    VeryLong,
}

impl PainDuration {
    pub const ALL: [PainDuration; 5] = [
        PainDuration::VeryShort,
        PainDuration::Short,
        PainDuration::Medium,
        PainDuration::Long,
        PainDuration::VeryLong,
    ];

    pub fn label(self) -> &'static str {
        match self {
            PainDuration::VeryShort => "Muy Corta",
            PainDuration::Short => "Corta",
            PainDuration::Medium => "Media",
            PainDuration::Long => "Larga",
            PainDuration::VeryLong => "Muy Larga",
        }
    }

    /// Score on the 1–5 scale.
    pub fn score(self) -> i32 {
        self as i32 + 1
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|v| v.label() == label)
    }

    pub fn from_score(score: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.score() == score)
    }
}

/// Map an intensity label to its score; unknown labels yield `None`.
pub fn intensity_score(label: Option<&str>) -> Option<i32> {
    label.and_then(PainIntensity::from_label).map(PainIntensity::score)
}

/// Map a duration label to its score; unknown labels yield `None`.
pub fn duration_score(label: Option<&str>) -> Option<i32> {
    label.and_then(PainDuration::from_label).map(PainDuration::score)
}
