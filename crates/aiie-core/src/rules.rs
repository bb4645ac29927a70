//! Evidence rule base.
//!
//! Rules are data: a condition over the clinical input and modality, a signed
//! contribution, an explanation, and a citation. [`RuleBase::evaluate`] is the
//! single interpreter loop that turns a rule table into SHAP-style factors, so
//! adding a clinical rule is a table change, never a code change.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::RuleBaseError;
use crate::model::{ClinicalInput, Contrast, DurationClass, Modality, Severity, Sex, ShapFactor};

/// Largest absolute contribution a single rule may carry.
pub const MAX_CONTRIBUTION: f64 = 4.0;

/// Predicate over a clinical input and the modality being scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    RedFlag { flag: String },
    NoRedFlags,
    AgeAtLeast { years: i32 },
    AgeBelow { years: i32 },
    Sex { sex: Sex },
    /// Case-insensitive keyword in the chief complaint.
    Complaint { keyword: String },
    Duration { duration: DurationClass },
    SeverityAtLeast { severity: Severity },
    CancerHistory,
    Immunocompromised,
    RecentTrauma,
    PriorImaging { modality: String },
    /// The modality being scored was already performed.
    RepeatStudy,
    LabAbnormal { lab: String },
    /// Lab present and within reference range.
    LabNormal { lab: String },
    ExamFinding { finding: String },
    RadiationAbove { msv: f64 },
    ContrastEnhanced,
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
}

impl Condition {
    pub fn matches(&self, input: &ClinicalInput, modality: &Modality) -> bool {
        match self {
            Condition::RedFlag { flag } => input.has_red_flag(flag),
            Condition::NoRedFlags => input.red_flags.is_empty(),
            Condition::AgeAtLeast { years } => input.age >= *years,
            Condition::AgeBelow { years } => input.age < *years,
            Condition::Sex { sex } => input.sex == *sex,
            Condition::Complaint { keyword } => input.complaint_mentions(keyword),
            Condition::Duration { duration } => input.duration == *duration,
            Condition::SeverityAtLeast { severity } => input.severity >= *severity,
            Condition::CancerHistory => input.comorbidities.cancer_history,
            Condition::Immunocompromised => input.comorbidities.immunocompromised,
            Condition::RecentTrauma => input.comorbidities.recent_trauma,
            Condition::PriorImaging { modality } => input.had_prior_imaging(modality),
            Condition::RepeatStudy => input.had_prior_imaging(&modality.id),
            Condition::LabAbnormal { lab } => input.lab(lab).is_some_and(|l| l.abnormal),
            Condition::LabNormal { lab } => input.lab(lab).is_some_and(|l| !l.abnormal),
            Condition::ExamFinding { finding } => input.has_exam_finding(finding),
            Condition::RadiationAbove { msv } => modality.radiation_msv > *msv,
            Condition::ContrastEnhanced => modality.contrast != Contrast::None,
            Condition::All { conditions } => conditions.iter().all(|c| c.matches(input, modality)),
            Condition::Any { conditions } => conditions.iter().any(|c| c.matches(input, modality)),
            Condition::Not { condition } => !condition.matches(input, modality),
        }
    }

    /// Display form of the clinical value that made this condition true.
    pub fn trigger_value(&self, input: &ClinicalInput, modality: &Modality) -> String {
        match self {
            Condition::RedFlag { flag } => flag.clone(),
            Condition::NoRedFlags => "no red flags".to_string(),
            Condition::AgeAtLeast { .. } | Condition::AgeBelow { .. } => {
                format!("age {}", input.age)
            }
            Condition::Sex { .. } => input.sex.to_string(),
            Condition::Complaint { .. } => input.chief_complaint.clone(),
            Condition::Duration { .. } => input.duration.to_string(),
            Condition::SeverityAtLeast { .. } => input.severity.to_string(),
            Condition::CancerHistory => "cancer history".to_string(),
            Condition::Immunocompromised => "immunocompromised".to_string(),
            Condition::RecentTrauma => "recent trauma".to_string(),
            Condition::PriorImaging { modality } => format!("prior {modality}"),
            Condition::RepeatStudy => format!("prior {}", modality.id),
            Condition::LabAbnormal { lab } | Condition::LabNormal { lab } => input
                .lab(lab)
                .map(|l| {
                    let status = if l.abnormal { "abnormal" } else { "normal" };
                    format!("{} {} ({status})", l.name, l.value)
                })
                .unwrap_or_else(|| lab.clone()),
            Condition::ExamFinding { finding } => finding.clone(),
            Condition::RadiationAbove { .. } => format!("{:.1} mSv", modality.radiation_msv),
            Condition::ContrastEnhanced => modality.contrast.to_string(),
            // Negated parts describe an absence and add noise to the value.
            Condition::All { conditions } => conditions
                .iter()
                .filter(|c| !matches!(c, Condition::Not { .. }))
                .map(|c| c.trigger_value(input, modality))
                .collect::<Vec<_>>()
                .join("; "),
            Condition::Any { conditions } => conditions
                .iter()
                .find(|c| c.matches(input, modality))
                .map(|c| c.trigger_value(input, modality))
                .unwrap_or_default(),
            Condition::Not { condition } => format!("no {}", condition.trigger_value(input, modality)),
        }
    }
}

/// One row of the rule table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRule {
    pub id: String,
    /// Human-readable factor name shown in explanations.
    pub factor: String,
    /// Modality identifiers this rule applies to.
    pub modalities: Vec<String>,
    pub condition: Condition,
    pub contribution: f64,
    pub explanation: String,
    pub citation: String,
}

impl EvidenceRule {
    pub fn applies_to(&self, modality_id: &str) -> bool {
        self.modalities.iter().any(|m| m == modality_id)
    }

    fn fire(&self, input: &ClinicalInput, modality: &Modality) -> ShapFactor {
        ShapFactor {
            factor: self.factor.clone(),
            value: self.condition.trigger_value(input, modality),
            contribution: self.contribution,
            explanation: self.explanation.clone(),
            evidence_citation: self.citation.clone(),
        }
    }
}

/// A validated, immutable rule table with optional per-modality baselines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleBase {
    #[serde(default)]
    baselines: BTreeMap<String, f64>,
    #[serde(default)]
    rules: Vec<EvidenceRule>,
}

impl RuleBase {
    /// Build a rule base, rejecting rules that break the table invariants.
    pub fn new(
        rules: Vec<EvidenceRule>,
        baselines: BTreeMap<String, f64>,
    ) -> Result<Self, RuleBaseError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleBaseError::DuplicateRule(rule.id.clone()));
            }
            if rule.contribution == 0.0 {
                return Err(RuleBaseError::ZeroContribution(rule.id.clone()));
            }
            if !(rule.contribution.abs() <= MAX_CONTRIBUTION) {
                return Err(RuleBaseError::ContributionOutOfRange {
                    id: rule.id.clone(),
                    contribution: rule.contribution,
                    limit: MAX_CONTRIBUTION,
                });
            }
            if rule.modalities.is_empty() {
                return Err(RuleBaseError::NoModalities(rule.id.clone()));
            }
        }
        for (modality, &value) in &baselines {
            if !(1.0..=9.0).contains(&value) {
                return Err(RuleBaseError::BaselineOutOfRange {
                    modality: modality.clone(),
                    value,
                });
            }
        }
        Ok(Self { baselines, rules })
    }

    /// The built-in imaging rule table.
    pub fn builtin() -> &'static RuleBase {
        static BUILTIN: LazyLock<RuleBase> = LazyLock::new(|| RuleBase {
            baselines: BTreeMap::new(),
            rules: builtin_rules(),
        });
        &BUILTIN
    }

    /// Parse a rule base from TOML (`[baselines]` table and `[[rules]]`).
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let parsed: RuleBase = toml::from_str(content).context("failed to parse rule base TOML")?;
        let base = RuleBase::new(parsed.rules, parsed.baselines)?;
        Ok(base)
    }

    pub fn rules(&self) -> &[EvidenceRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules that apply to a modality, in table order.
    pub fn rules_for<'a>(&'a self, modality_id: &'a str) -> impl Iterator<Item = &'a EvidenceRule> {
        self.rules.iter().filter(move |r| r.applies_to(modality_id))
    }

    pub fn baseline_for(&self, modality_id: &str) -> Option<f64> {
        self.baselines.get(modality_id).copied()
    }

    pub fn knows_modality(&self, modality_id: &str) -> bool {
        self.baselines.contains_key(modality_id) || self.rules.iter().any(|r| r.applies_to(modality_id))
    }

    /// Every modality identifier referenced by the table.
    pub fn modality_ids(&self) -> BTreeSet<&str> {
        self.rules
            .iter()
            .flat_map(|r| r.modalities.iter().map(String::as_str))
            .chain(self.baselines.keys().map(String::as_str))
            .collect()
    }

    /// Fire every applicable rule whose condition holds, in table order.
    pub fn evaluate(&self, input: &ClinicalInput, modality: &Modality) -> Vec<ShapFactor> {
        self.rules_for(&modality.id)
            .filter(|rule| rule.contribution != 0.0)
            .filter(|rule| rule.condition.matches(input, modality))
            .map(|rule| rule.fire(input, modality))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Built-in table
// ---------------------------------------------------------------------------

pub mod modality_ids {
    pub const CT_HEAD: &str = "ct-head-noncontrast";
    pub const CTA_HEAD: &str = "cta-head";
    pub const MRI_BRAIN: &str = "mri-brain-noncontrast";
    pub const MRI_BRAIN_CONTRAST: &str = "mri-brain-contrast";
    pub const XR_LUMBAR: &str = "xr-lumbar";
    pub const MRI_LUMBAR: &str = "mri-lumbar-noncontrast";
    pub const MRI_LUMBAR_CONTRAST: &str = "mri-lumbar-contrast";
    pub const CT_ABDOMEN_PELVIS: &str = "ct-abdomen-pelvis-contrast";
    pub const US_ABDOMEN: &str = "us-abdomen";
    pub const XR_CHEST: &str = "xr-chest";
    pub const CTA_CHEST: &str = "cta-chest";
    pub const VQ_SCAN: &str = "vq-scan";

    pub const IONIZING: &[&str] = &[
        CT_HEAD,
        CTA_HEAD,
        XR_LUMBAR,
        CT_ABDOMEN_PELVIS,
        XR_CHEST,
        CTA_CHEST,
        VQ_SCAN,
    ];

    pub const ALL: &[&str] = &[
        CT_HEAD,
        CTA_HEAD,
        MRI_BRAIN,
        MRI_BRAIN_CONTRAST,
        XR_LUMBAR,
        MRI_LUMBAR,
        MRI_LUMBAR_CONTRAST,
        CT_ABDOMEN_PELVIS,
        US_ABDOMEN,
        XR_CHEST,
        CTA_CHEST,
        VQ_SCAN,
    ];
}

const ACR_HEADACHE: &str = "ACR Appropriateness Criteria: Headache (2022)";
const ACR_LBP: &str = "ACR Appropriateness Criteria: Low Back Pain (2021)";
const ACR_RUQ: &str = "ACR Appropriateness Criteria: Right Upper Quadrant Pain (2022)";
const ACR_ABDOMEN: &str = "ACR Appropriateness Criteria: Acute Nonlocalized Abdominal Pain (2018)";
const ACR_PE: &str = "ACR Appropriateness Criteria: Suspected Pulmonary Embolism (2022)";
const ACR_CONTRAST: &str = "ACR Manual on Contrast Media (2023)";
const IMAGE_GENTLY: &str = "Image Gently Alliance: pediatric radiation safety (ALARA)";
const PERRY_SAH: &str = "Perry JJ et al. Ottawa SAH rule, JAMA 2013";
const CHOU_LBP: &str = "Chou R et al. Ann Intern Med 2011;154:181-189";
const KLINE_PERC: &str = "Kline JA et al. J Thromb Haemost 2004 (PERC / D-dimer)";

fn rule(
    id: &str,
    factor: &str,
    modalities: &[&str],
    condition: Condition,
    contribution: f64,
    explanation: &str,
    citation: &str,
) -> EvidenceRule {
    EvidenceRule {
        id: id.to_string(),
        factor: factor.to_string(),
        modalities: modalities.iter().map(|m| m.to_string()).collect(),
        condition,
        contribution,
        explanation: explanation.to_string(),
        citation: citation.to_string(),
    }
}

fn red_flag(flag: &str) -> Condition {
    Condition::RedFlag { flag: flag.into() }
}

fn complaint(keyword: &str) -> Condition {
    Condition::Complaint { keyword: keyword.into() }
}

fn all(conditions: Vec<Condition>) -> Condition {
    Condition::All { conditions }
}

fn any(conditions: Vec<Condition>) -> Condition {
    Condition::Any { conditions }
}

fn not(condition: Condition) -> Condition {
    Condition::Not {
        condition: Box::new(condition),
    }
}

fn lab_abnormal(lab: &str) -> Condition {
    Condition::LabAbnormal { lab: lab.into() }
}

fn chest_complaint() -> Condition {
    any(vec![
        complaint("chest pain"),
        complaint("shortness of breath"),
        complaint("dyspnea"),
    ])
}

fn builtin_rules() -> Vec<EvidenceRule> {
    use modality_ids::*;

    vec![
        // Headache
        rule(
            "sah-thunderclap-ct",
            "Red flag: thunderclap headache",
            &[CT_HEAD],
            red_flag("thunderclap"),
            3.5,
            "Sudden peak-onset headache requires non-contrast CT to exclude subarachnoid hemorrhage; sensitivity is near 100% within 6 hours.",
            PERRY_SAH,
        ),
        rule(
            "sah-thunderclap-cta",
            "Red flag: thunderclap headache",
            &[CTA_HEAD],
            red_flag("thunderclap"),
            2.0,
            "CT angiography identifies aneurysm or reversible vasoconstriction once hemorrhage is suspected.",
            ACR_HEADACHE,
        ),
        rule(
            "sah-thunderclap-mri",
            "Red flag: thunderclap headache",
            &[MRI_BRAIN, MRI_BRAIN_CONTRAST],
            red_flag("thunderclap"),
            -1.0,
            "MRI is slower and less available than CT for the first study in suspected subarachnoid hemorrhage.",
            ACR_HEADACHE,
        ),
        rule(
            "headache-new-over-50",
            "New headache after age 50",
            &[CT_HEAD, MRI_BRAIN, MRI_BRAIN_CONTRAST],
            all(vec![complaint("headache"), Condition::AgeAtLeast { years: 50 }]),
            0.5,
            "New-onset headache after 50 raises the probability of a secondary cause such as mass or arteritis.",
            ACR_HEADACHE,
        ),
        rule(
            "headache-neuro-deficit-mri",
            "Red flag: focal neurologic deficit",
            &[MRI_BRAIN_CONTRAST],
            red_flag("neuro-deficit"),
            2.5,
            "Contrast MRI best characterizes structural lesions producing focal deficits.",
            ACR_HEADACHE,
        ),
        rule(
            "headache-neuro-deficit-ct",
            "Red flag: focal neurologic deficit",
            &[CT_HEAD],
            red_flag("neuro-deficit"),
            1.5,
            "Non-contrast CT rapidly excludes hemorrhage or mass effect when a deficit is present.",
            ACR_HEADACHE,
        ),
        rule(
            "headache-cancer-history",
            "History of malignancy",
            &[MRI_BRAIN_CONTRAST],
            all(vec![complaint("headache"), Condition::CancerHistory]),
            3.0,
            "Headache in a patient with known cancer warrants contrast MRI to detect brain metastases.",
            ACR_HEADACHE,
        ),
        rule(
            "headache-immunocompromised",
            "Immunocompromised host",
            &[MRI_BRAIN_CONTRAST],
            all(vec![complaint("headache"), Condition::Immunocompromised]),
            2.0,
            "Opportunistic infection and lymphoma are best evaluated with contrast MRI.",
            ACR_HEADACHE,
        ),
        rule(
            "headache-head-trauma",
            "Recent head trauma",
            &[CT_HEAD],
            all(vec![complaint("headache"), Condition::RecentTrauma]),
            2.5,
            "Non-contrast CT is the first study for post-traumatic headache to exclude intracranial hemorrhage.",
            ACR_HEADACHE,
        ),
        rule(
            "headache-uncomplicated",
            "Uncomplicated headache without red flags",
            &[CT_HEAD, CTA_HEAD, MRI_BRAIN, MRI_BRAIN_CONTRAST],
            all(vec![
                complaint("headache"),
                Condition::NoRedFlags,
                not(Condition::CancerHistory),
                not(Condition::Immunocompromised),
                not(Condition::RecentTrauma),
            ]),
            -3.0,
            "Primary headache with a normal examination has a very low yield from neuroimaging.",
            ACR_HEADACHE,
        ),
        rule(
            "headache-cta-without-vascular-concern",
            "No suspected vascular cause",
            &[CTA_HEAD],
            all(vec![complaint("headache"), not(red_flag("thunderclap"))]),
            -1.5,
            "CT angiography is reserved for suspected aneurysm, dissection, or vasculopathy.",
            ACR_HEADACHE,
        ),
        // Low back pain
        rule(
            "lbp-uncomplicated-acute",
            "Acute uncomplicated low back pain",
            &[XR_LUMBAR, MRI_LUMBAR, MRI_LUMBAR_CONTRAST],
            all(vec![
                complaint("back pain"),
                Condition::Duration {
                    duration: DurationClass::Acute,
                },
                Condition::NoRedFlags,
                not(Condition::CancerHistory),
                not(Condition::Immunocompromised),
                not(Condition::RecentTrauma),
            ]),
            -3.0,
            "Acute low back pain without red flags resolves with conservative care; early imaging does not improve outcomes.",
            CHOU_LBP,
        ),
        rule(
            "lbp-cauda-equina-mri",
            "Red flag: cauda equina syndrome",
            &[MRI_LUMBAR],
            red_flag("cauda-equina"),
            3.5,
            "Suspected cauda equina compression is a surgical emergency requiring urgent MRI.",
            ACR_LBP,
        ),
        rule(
            "lbp-cauda-equina-xr",
            "Red flag: cauda equina syndrome",
            &[XR_LUMBAR],
            red_flag("cauda-equina"),
            -1.0,
            "Radiographs cannot show neural compression and delay definitive imaging.",
            ACR_LBP,
        ),
        rule(
            "lbp-cancer-contrast",
            "History of malignancy",
            &[MRI_LUMBAR_CONTRAST],
            all(vec![complaint("back pain"), Condition::CancerHistory]),
            3.0,
            "Back pain with known cancer warrants contrast MRI to evaluate for vertebral or epidural metastasis.",
            ACR_LBP,
        ),
        rule(
            "lbp-cancer-noncontrast",
            "History of malignancy",
            &[MRI_LUMBAR],
            all(vec![complaint("back pain"), Condition::CancerHistory]),
            2.0,
            "Non-contrast MRI detects marrow replacement from metastatic disease.",
            ACR_LBP,
        ),
        rule(
            "lbp-infection-risk",
            "Risk factor for spinal infection",
            &[MRI_LUMBAR_CONTRAST],
            all(vec![
                complaint("back pain"),
                any(vec![
                    Condition::Immunocompromised,
                    red_flag("fever"),
                    red_flag("iv-drug-use"),
                ]),
            ]),
            3.0,
            "Discitis and epidural abscess are best shown on contrast-enhanced MRI.",
            ACR_LBP,
        ),
        rule(
            "lbp-persistent-mri",
            "Persistent back pain",
            &[MRI_LUMBAR],
            all(vec![
                complaint("back pain"),
                Condition::Duration {
                    duration: DurationClass::Chronic,
                },
            ]),
            1.5,
            "Pain persisting beyond six weeks of conservative therapy may justify MRI when intervention is considered.",
            ACR_LBP,
        ),
        rule(
            "lbp-persistent-xr",
            "Persistent back pain",
            &[XR_LUMBAR],
            all(vec![
                complaint("back pain"),
                Condition::Duration {
                    duration: DurationClass::Chronic,
                },
            ]),
            1.0,
            "Radiographs are a reasonable initial study for persistent pain to assess alignment and degeneration.",
            ACR_LBP,
        ),
        rule(
            "lbp-elderly-trauma",
            "Trauma in an older patient",
            &[XR_LUMBAR],
            all(vec![
                complaint("back pain"),
                Condition::RecentTrauma,
                Condition::AgeAtLeast { years: 65 },
            ]),
            2.0,
            "Minor trauma in older patients carries a meaningful risk of compression fracture.",
            ACR_LBP,
        ),
        // Abdominal pain
        rule(
            "ruq-ultrasound-first",
            "Right upper quadrant pain",
            &[US_ABDOMEN],
            complaint("right upper quadrant"),
            3.0,
            "Ultrasound is the first-line study for suspected biliary disease, without radiation.",
            ACR_RUQ,
        ),
        rule(
            "ruq-ct-second-line",
            "Right upper quadrant pain",
            &[CT_ABDOMEN_PELVIS],
            complaint("right upper quadrant"),
            -0.5,
            "CT is less sensitive than ultrasound for gallstones and is reserved for equivocal cases.",
            ACR_RUQ,
        ),
        rule(
            "abdomen-leukocytosis",
            "Leukocytosis",
            &[CT_ABDOMEN_PELVIS],
            all(vec![complaint("abdominal pain"), lab_abnormal("wbc")]),
            2.0,
            "Abdominal pain with an elevated white count suggests an inflammatory process best surveyed by CT.",
            ACR_ABDOMEN,
        ),
        rule(
            "abdomen-peritoneal-signs",
            "Peritoneal signs on examination",
            &[CT_ABDOMEN_PELVIS],
            Condition::ExamFinding {
                finding: "peritoneal-signs".into(),
            },
            2.5,
            "Guarding or rebound tenderness raises concern for perforation or abscess requiring CT.",
            ACR_ABDOMEN,
        ),
        rule(
            "abdomen-pregnancy-ultrasound",
            "Pregnancy",
            &[US_ABDOMEN],
            red_flag("pregnancy"),
            1.5,
            "Ultrasound is preferred in pregnancy to avoid fetal radiation exposure.",
            ACR_ABDOMEN,
        ),
        // Suspected pulmonary embolism
        rule(
            "pe-positive-d-dimer-cta",
            "Elevated D-dimer",
            &[CTA_CHEST],
            all(vec![chest_complaint(), lab_abnormal("d-dimer")]),
            3.0,
            "A positive D-dimer with compatible symptoms requires CT pulmonary angiography.",
            ACR_PE,
        ),
        rule(
            "pe-positive-d-dimer-vq",
            "Elevated D-dimer",
            &[VQ_SCAN],
            all(vec![chest_complaint(), lab_abnormal("d-dimer")]),
            1.5,
            "Ventilation-perfusion scanning is an alternative when CT angiography is contraindicated.",
            ACR_PE,
        ),
        rule(
            "pe-normal-d-dimer",
            "Normal D-dimer",
            &[CTA_CHEST, VQ_SCAN],
            all(vec![
                chest_complaint(),
                Condition::LabNormal {
                    lab: "d-dimer".into(),
                },
            ]),
            -3.0,
            "A normal D-dimer in a low pretest probability patient effectively excludes pulmonary embolism.",
            KLINE_PERC,
        ),
        rule(
            "chest-radiograph-first",
            "Chest symptoms",
            &[XR_CHEST],
            chest_complaint(),
            1.0,
            "A chest radiograph identifies alternative diagnoses such as pneumonia or pneumothorax.",
            ACR_PE,
        ),
        rule(
            "pe-renal-impairment-vq",
            "Impaired renal function",
            &[VQ_SCAN],
            all(vec![chest_complaint(), lab_abnormal("creatinine")]),
            1.5,
            "V/Q scanning avoids iodinated contrast when renal function is impaired.",
            ACR_PE,
        ),
        // Cross-cutting safety rules
        rule(
            "contrast-renal-impairment",
            "Impaired renal function",
            &[CT_ABDOMEN_PELVIS, CTA_CHEST, CTA_HEAD, MRI_BRAIN_CONTRAST, MRI_LUMBAR_CONTRAST],
            all(vec![Condition::ContrastEnhanced, lab_abnormal("creatinine")]),
            -1.5,
            "Reduced renal function increases the risk of contrast-associated kidney injury.",
            ACR_CONTRAST,
        ),
        rule(
            "pediatric-radiation",
            "Pediatric radiation exposure",
            IONIZING,
            all(vec![
                Condition::AgeBelow { years: 18 },
                Condition::RadiationAbove { msv: 1.0 },
            ]),
            -1.0,
            "Children are more sensitive to ionizing radiation; prefer non-ionizing studies when diagnostic yield is comparable.",
            IMAGE_GENTLY,
        ),
        rule(
            "pregnancy-radiation",
            "Radiation exposure in pregnancy",
            IONIZING,
            all(vec![red_flag("pregnancy"), Condition::RadiationAbove { msv: 1.0 }]),
            -1.5,
            "Fetal dose should be kept as low as reasonably achievable.",
            IMAGE_GENTLY,
        ),
        rule(
            "repeat-study",
            "Repeat of a prior study",
            ALL,
            Condition::RepeatStudy,
            -1.0,
            "Repeating a study already performed for the same episode rarely changes management.",
            ACR_HEADACHE,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sex;

    fn ct_head() -> Modality {
        Modality::new(modality_ids::CT_HEAD, "CT Head", Contrast::None, 2.0, 400.0)
    }

    #[test]
    fn builtin_table_satisfies_invariants() {
        let builtin = RuleBase::builtin();
        let rebuilt = RuleBase::new(builtin.rules.clone(), builtin.baselines.clone());
        assert!(rebuilt.is_ok(), "builtin rule base invalid: {rebuilt:?}");
        assert!(!builtin.is_empty());
    }

    #[test]
    fn builtin_knows_all_listed_modalities() {
        let builtin = RuleBase::builtin();
        for id in modality_ids::ALL {
            assert!(builtin.knows_modality(id), "{id} unknown");
        }
        assert!(!builtin.knows_modality("pet-ct"));
    }

    #[test]
    fn rejects_zero_contribution() {
        let r = rule("z", "Zero", &["x"], Condition::NoRedFlags, 0.0, "", "");
        assert_eq!(
            RuleBase::new(vec![r], BTreeMap::new()),
            Err(RuleBaseError::ZeroContribution("z".into()))
        );
    }

    #[test]
    fn rejects_oversized_contribution_and_duplicates() {
        let big = rule("big", "Big", &["x"], Condition::NoRedFlags, 4.5, "", "");
        assert!(matches!(
            RuleBase::new(vec![big], BTreeMap::new()),
            Err(RuleBaseError::ContributionOutOfRange { .. })
        ));

        let a = rule("dup", "A", &["x"], Condition::NoRedFlags, 1.0, "", "");
        let b = rule("dup", "B", &["x"], Condition::NoRedFlags, -1.0, "", "");
        assert_eq!(
            RuleBase::new(vec![a, b], BTreeMap::new()),
            Err(RuleBaseError::DuplicateRule("dup".into()))
        );
    }

    #[test]
    fn rejects_baseline_off_scale() {
        let mut baselines = BTreeMap::new();
        baselines.insert("x".to_string(), 0.0);
        assert!(matches!(
            RuleBase::new(vec![], baselines),
            Err(RuleBaseError::BaselineOutOfRange { .. })
        ));
    }

    #[test]
    fn evaluate_preserves_table_order() {
        let input = ClinicalInput::new(60, Sex::Male, "sudden severe headache").with_red_flag("thunderclap");
        let factors = RuleBase::builtin().evaluate(&input, &ct_head());
        let names: Vec<_> = factors.iter().map(|f| f.factor.as_str()).collect();
        assert_eq!(
            names,
            vec!["Red flag: thunderclap headache", "New headache after age 50"]
        );
        assert_eq!(factors[0].value, "thunderclap");
        assert_eq!(factors[1].value, "sudden severe headache; age 60");
    }

    #[test]
    fn negated_conditions_and_any() {
        let m = ct_head();
        let input = ClinicalInput::new(30, Sex::Female, "back pain").with_red_flag("fever");
        let cond = all(vec![
            complaint("back pain"),
            any(vec![Condition::Immunocompromised, red_flag("fever")]),
            not(Condition::CancerHistory),
        ]);
        assert!(cond.matches(&input, &m));
        assert_eq!(cond.trigger_value(&input, &m), "back pain; fever");
    }

    #[test]
    fn lab_conditions() {
        let m = ct_head();
        let input = ClinicalInput::new(45, Sex::Male, "chest pain").with_lab("D-Dimer", 320.0, false);
        assert!(Condition::LabNormal { lab: "d-dimer".into() }.matches(&input, &m));
        assert!(!lab_abnormal("d-dimer").matches(&input, &m));
        assert!(!Condition::LabNormal { lab: "troponin".into() }.matches(&input, &m));
        assert_eq!(
            lab_abnormal("d-dimer").trigger_value(&input, &m),
            "D-Dimer 320 (normal)"
        );
    }

    #[test]
    fn parse_rule_base_toml() {
        let toml = r#"
[baselines]
"ct-head-noncontrast" = 4.5

[[rules]]
id = "custom-thunderclap"
factor = "Thunderclap"
modalities = ["ct-head-noncontrast"]
contribution = 3.0
explanation = "Exclude SAH."
citation = "Local protocol"

[rules.condition]
kind = "red_flag"
flag = "thunderclap"

[[rules]]
id = "custom-young"
factor = "Young adult"
modalities = ["ct-head-noncontrast"]
contribution = -0.5
explanation = "Lower pretest probability."
citation = "Local protocol"

[rules.condition]
kind = "all"
conditions = [
    { kind = "age_below", years = 40 },
    { kind = "not", condition = { kind = "cancer_history" } },
]
"#;
        let base = RuleBase::from_toml_str(toml).unwrap();
        assert_eq!(base.len(), 2);
        assert_eq!(base.baseline_for("ct-head-noncontrast"), Some(4.5));
        assert!(base.knows_modality("ct-head-noncontrast"));

        let input = ClinicalInput::new(30, Sex::Male, "headache").with_red_flag("thunderclap");
        let factors = base.evaluate(&input, &ct_head());
        assert_eq!(factors.len(), 2);
    }

    #[test]
    fn parse_rule_base_rejects_invalid_table() {
        let toml = r#"
[[rules]]
id = "zero"
factor = "Zero"
modalities = ["x"]
contribution = 0.0
explanation = ""
citation = ""

[rules.condition]
kind = "no_red_flags"
"#;
        let err = RuleBase::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("zero contribution"));
    }
}
