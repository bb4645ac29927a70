//! Core data model types for aiie.
//!
//! These are the value types the whole system passes around: the clinical
//! snapshot that rules are evaluated against, imaging modalities, the scored
//! explanation returned by the engine, and the case metadata consumed by the
//! assessment analytics.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::category::AppropriatenessCategory;
use crate::error::ValidationError;

/// Oldest age accepted as plausible clinical input.
pub const MAX_AGE: i32 = 130;

// ---------------------------------------------------------------------------
// Clinical input
// ---------------------------------------------------------------------------

/// Biological sex as recorded on the case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
    Other,
}

/// How long the presenting complaint has been going on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationClass {
    #[default]
    Acute,
    Subacute,
    Chronic,
}

/// Clinical severity of the presentation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    #[default]
    Moderate,
    Severe,
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sex::Male => write!(f, "male"),
            Sex::Female => write!(f, "female"),
            Sex::Other => write!(f, "other"),
        }
    }
}

impl fmt::Display for DurationClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DurationClass::Acute => write!(f, "acute"),
            DurationClass::Subacute => write!(f, "subacute"),
            DurationClass::Chronic => write!(f, "chronic"),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Mild => write!(f, "mild"),
            Severity::Moderate => write!(f, "moderate"),
            Severity::Severe => write!(f, "severe"),
        }
    }
}

/// Comorbidity flags that commonly change imaging decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comorbidities {
    #[serde(default)]
    pub cancer_history: bool,
    #[serde(default)]
    pub immunocompromised: bool,
    #[serde(default)]
    pub recent_trauma: bool,
}

/// A single laboratory result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabResult {
    /// Lab name (e.g. "d-dimer").
    pub name: String,
    /// Measured value in the lab's native unit.
    pub value: f64,
    /// Whether the value falls outside the reference range.
    #[serde(default)]
    pub abnormal: bool,
}

/// Immutable snapshot of the clinical facts used for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalInput {
    pub age: i32,
    pub sex: Sex,
    /// Free-text chief complaint; rules match on keywords.
    pub chief_complaint: String,
    #[serde(default)]
    pub duration: DurationClass,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub red_flags: BTreeSet<String>,
    #[serde(default)]
    pub comorbidities: Comorbidities,
    /// Modality identifiers already performed for this presentation.
    #[serde(default)]
    pub prior_imaging: Vec<String>,
    #[serde(default)]
    pub labs: Vec<LabResult>,
    #[serde(default)]
    pub exam_findings: BTreeSet<String>,
}

impl ClinicalInput {
    /// Create an acute, moderate presentation with no flags or findings.
    pub fn new(age: i32, sex: Sex, chief_complaint: impl Into<String>) -> Self {
        Self {
            age,
            sex,
            chief_complaint: chief_complaint.into(),
            duration: DurationClass::default(),
            severity: Severity::default(),
            red_flags: BTreeSet::new(),
            comorbidities: Comorbidities::default(),
            prior_imaging: Vec::new(),
            labs: Vec::new(),
            exam_findings: BTreeSet::new(),
        }
    }

    pub fn with_duration(mut self, duration: DurationClass) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_red_flag(mut self, flag: impl Into<String>) -> Self {
        self.red_flags.insert(flag.into());
        self
    }

    pub fn with_comorbidities(mut self, comorbidities: Comorbidities) -> Self {
        self.comorbidities = comorbidities;
        self
    }

    pub fn with_prior_imaging(mut self, modality_id: impl Into<String>) -> Self {
        self.prior_imaging.push(modality_id.into());
        self
    }

    pub fn with_lab(mut self, name: impl Into<String>, value: f64, abnormal: bool) -> Self {
        self.labs.push(LabResult {
            name: name.into(),
            value,
            abnormal,
        });
        self
    }

    pub fn with_exam_finding(mut self, finding: impl Into<String>) -> Self {
        self.exam_findings.insert(finding.into());
        self
    }

    /// Reject malformed input. The engine never repairs input.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0..=MAX_AGE).contains(&self.age) {
            return Err(ValidationError::InvalidAge(self.age));
        }
        if self.chief_complaint.trim().is_empty() {
            return Err(ValidationError::EmptyComplaint);
        }
        if let Some(lab) = self.labs.iter().find(|l| !l.value.is_finite()) {
            return Err(ValidationError::NonFiniteLab(lab.name.clone()));
        }
        Ok(())
    }

    /// Case-insensitive red flag lookup.
    pub fn has_red_flag(&self, flag: &str) -> bool {
        self.red_flags.iter().any(|f| f.eq_ignore_ascii_case(flag))
    }

    /// Case-insensitive physical exam finding lookup.
    pub fn has_exam_finding(&self, finding: &str) -> bool {
        self.exam_findings
            .iter()
            .any(|f| f.eq_ignore_ascii_case(finding))
    }

    /// Case-insensitive keyword match against the chief complaint.
    pub fn complaint_mentions(&self, keyword: &str) -> bool {
        self.chief_complaint
            .to_lowercase()
            .contains(&keyword.to_lowercase())
    }

    pub fn lab(&self, name: &str) -> Option<&LabResult> {
        self.labs.iter().find(|l| l.name.eq_ignore_ascii_case(name))
    }

    pub fn had_prior_imaging(&self, modality_id: &str) -> bool {
        self.prior_imaging.iter().any(|m| m == modality_id)
    }
}

// ---------------------------------------------------------------------------
// Modality
// ---------------------------------------------------------------------------

/// Contrast variant of an imaging study.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Contrast {
    #[default]
    None,
    With,
    WithAndWithout,
}

impl fmt::Display for Contrast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Contrast::None => write!(f, "without contrast"),
            Contrast::With => write!(f, "with contrast"),
            Contrast::WithAndWithout => write!(f, "with and without contrast"),
        }
    }
}

/// An imaging study the engine can score. Treated as an opaque key plus its
/// radiation and cost attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Modality {
    /// Stable identifier (e.g. "ct-head-noncontrast").
    pub id: String,
    /// Display name (e.g. "CT Head").
    pub name: String,
    #[serde(default)]
    pub contrast: Contrast,
    /// Effective radiation dose in millisieverts.
    #[serde(default)]
    pub radiation_msv: f64,
    /// Typical cost in currency units.
    #[serde(default)]
    pub cost: f64,
}

impl Modality {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        contrast: Contrast,
        radiation_msv: f64,
        cost: f64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            contrast,
            radiation_msv,
            cost,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyModalityId);
        }
        if !(self.radiation_msv >= 0.0 && self.radiation_msv.is_finite()) {
            return Err(ValidationError::InvalidRadiation {
                id: self.id.clone(),
                value: self.radiation_msv,
            });
        }
        if !(self.cost >= 0.0 && self.cost.is_finite()) {
            return Err(ValidationError::InvalidCost {
                id: self.id.clone(),
                value: self.cost,
            });
        }
        Ok(())
    }

    /// Name plus contrast variant, e.g. "CT Head without contrast".
    pub fn display_name(&self) -> String {
        format!("{} {}", self.name, self.contrast)
    }
}

// ---------------------------------------------------------------------------
// Scoring output
// ---------------------------------------------------------------------------

/// One rule's effect on a single scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapFactor {
    /// Human-readable rule name.
    pub factor: String,
    /// The clinical value that triggered the rule, for display.
    pub value: String,
    /// Signed adjustment to the score. Never exactly zero.
    pub contribution: f64,
    pub explanation: String,
    pub evidence_citation: String,
}

/// Output of one engine evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    pub modality: Modality,
    pub baseline_score: f64,
    /// Fired factors in rule-evaluation order.
    pub shap_factors: Vec<ShapFactor>,
    /// Always within [1, 9].
    pub final_score: f64,
    pub category: AppropriatenessCategory,
    pub category_label: String,
    #[serde(default)]
    pub alternative_recommendation: Option<String>,
}

impl ScoringResult {
    /// Sum of all factor contributions, before clamping.
    pub fn total_contribution(&self) -> f64 {
        self.shap_factors.iter().map(|f| f.contribution).sum()
    }

    /// Score rounded for an "N/9" badge.
    pub fn display_score(&self) -> u8 {
        self.final_score.round().clamp(1.0, 9.0) as u8
    }

    pub fn badge(&self) -> String {
        format!("{}/9", self.display_score())
    }

    /// Factors sorted by absolute contribution, largest first.
    pub fn factors_by_importance(&self) -> Vec<&ShapFactor> {
        let mut sorted: Vec<_> = self.shap_factors.iter().collect();
        sorted.sort_by(|a, b| b.contribution.abs().total_cmp(&a.contribution.abs()));
        sorted
    }
}

// ---------------------------------------------------------------------------
// Case metadata
// ---------------------------------------------------------------------------

/// Difficulty tier of a teaching case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "beginner" | "easy" => Ok(Difficulty::Beginner),
            "intermediate" | "medium" => Ok(Difficulty::Intermediate),
            "advanced" | "hard" => Ok(Difficulty::Advanced),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// An answer option on a case, backed by an imaging modality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOption {
    pub id: String,
    /// Label shown to the learner.
    pub label: String,
    pub modality: Modality,
}

/// A teaching case as supplied by the case store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicalCase {
    pub id: String,
    pub title: String,
    pub category: String,
    pub difficulty: Difficulty,
    /// Teaching point shown after an attempt.
    #[serde(default)]
    pub explanation: String,
    pub clinical: ClinicalInput,
    #[serde(default)]
    pub options: Vec<CaseOption>,
    /// Option ids that together make the correct answer.
    #[serde(default)]
    pub correct_options: Vec<String>,
}

impl ClinicalCase {
    pub fn option(&self, option_id: &str) -> Option<&CaseOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    /// Display label for an option id, falling back to the raw id.
    pub fn option_label(&self, option_id: &str) -> String {
        self.option(option_id)
            .map(|o| o.label.clone())
            .unwrap_or_else(|| option_id.to_string())
    }

    /// Modalities of all options, in option order.
    pub fn modalities(&self) -> Vec<Modality> {
        self.options.iter().map(|o| o.modality.clone()).collect()
    }
}

/// A collection of teaching cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseBank {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cases: Vec<ClinicalCase>,
}

impl CaseBank {
    pub fn case(&self, case_id: &str) -> Option<&ClinicalCase> {
        self.cases.iter().find(|c| c.id == case_id)
    }
}
