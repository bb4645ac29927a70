//! Score-to-category banding.
//!
//! The one place that maps a numeric appropriateness score to its category,
//! display label, and color token. The engine and every display badge go
//! through [`classify`] so the bands cannot drift apart.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowest score on the appropriateness scale.
pub const MIN_SCORE: f64 = 1.0;
/// Highest score on the appropriateness scale.
pub const MAX_SCORE: f64 = 9.0;

/// Coarse appropriateness classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppropriatenessCategory {
    UsuallyAppropriate,
    MayBeAppropriate,
    UsuallyNotAppropriate,
    Uncertain,
}

/// A half-open score interval `[lower, upper)` and its presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryBand {
    pub lower: f64,
    pub upper: f64,
    pub category: AppropriatenessCategory,
    pub label: &'static str,
    pub color_token: &'static str,
}

/// Bands in descending order. The top band is closed at [`MAX_SCORE`].
pub const BANDS: [CategoryBand; 3] = [
    CategoryBand {
        lower: 7.0,
        upper: MAX_SCORE,
        category: AppropriatenessCategory::UsuallyAppropriate,
        label: "Usually Appropriate",
        color_token: "green",
    },
    CategoryBand {
        lower: 4.0,
        upper: 7.0,
        category: AppropriatenessCategory::MayBeAppropriate,
        label: "May Be Appropriate",
        color_token: "amber",
    },
    CategoryBand {
        lower: MIN_SCORE,
        upper: 4.0,
        category: AppropriatenessCategory::UsuallyNotAppropriate,
        label: "Usually Not Appropriate",
        color_token: "red",
    },
];

const UNCERTAIN_LABEL: &str = "Uncertain";
const UNCERTAIN_COLOR: &str = "gray";

/// Find the band a score falls into. Scores off the scale have no band.
pub fn band_for(score: f64) -> Option<&'static CategoryBand> {
    if !score.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&score) {
        return None;
    }
    BANDS
        .iter()
        .find(|b| score >= b.lower && (score < b.upper || b.upper == MAX_SCORE))
}

/// Map a raw score to its category.
pub fn classify(score: f64) -> AppropriatenessCategory {
    band_for(score)
        .map(|b| b.category)
        .unwrap_or(AppropriatenessCategory::Uncertain)
}

impl AppropriatenessCategory {
    pub fn label(&self) -> &'static str {
        BANDS
            .iter()
            .find(|b| b.category == *self)
            .map(|b| b.label)
            .unwrap_or(UNCERTAIN_LABEL)
    }

    pub fn color_token(&self) -> &'static str {
        BANDS
            .iter()
            .find(|b| b.category == *self)
            .map(|b| b.color_token)
            .unwrap_or(UNCERTAIN_COLOR)
    }
}

impl fmt::Display for AppropriatenessCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppropriatenessCategory::UsuallyAppropriate => write!(f, "usually-appropriate"),
            AppropriatenessCategory::MayBeAppropriate => write!(f, "may-be-appropriate"),
            AppropriatenessCategory::UsuallyNotAppropriate => {
                write!(f, "usually-not-appropriate")
            }
            AppropriatenessCategory::Uncertain => write!(f, "uncertain"),
        }
    }
}
