//! TOML case-bank parser.
//!
//! Loads teaching cases (clinical facts, answer options backed by modalities,
//! correct options) from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{CaseBank, CaseOption, ClinicalCase, ClinicalInput, Contrast, Difficulty, Modality};
use crate::rules::RuleBase;

/// Intermediate TOML structure for parsing case-bank files.
#[derive(Debug, Deserialize)]
struct TomlCaseFile {
    case_bank: TomlCaseBankHeader,
    #[serde(default)]
    cases: Vec<TomlCase>,
}

#[derive(Debug, Deserialize)]
struct TomlCaseBankHeader {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct TomlCase {
    id: String,
    title: String,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default = "default_difficulty")]
    difficulty: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    correct_options: Vec<String>,
    clinical: ClinicalInput,
    #[serde(default)]
    options: Vec<TomlOption>,
}

fn default_category() -> String {
    "General".to_string()
}

fn default_difficulty() -> String {
    "intermediate".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    id: String,
    label: String,
    /// Modality identifier.
    modality: String,
    /// Modality display name; defaults to the label.
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    contrast: Contrast,
    #[serde(default)]
    radiation_msv: f64,
    #[serde(default)]
    cost: f64,
}

/// Parse a single TOML file into a `CaseBank`.
pub fn parse_case_bank(path: &Path) -> Result<CaseBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read case bank file: {}", path.display()))?;

    parse_case_bank_str(&content, path)
}

/// Parse a TOML string into a `CaseBank` (useful for testing).
pub fn parse_case_bank_str(content: &str, source_path: &Path) -> Result<CaseBank> {
    let parsed: TomlCaseFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let cases = parsed
        .cases
        .into_iter()
        .map(|c| {
            let difficulty: Difficulty = c
                .difficulty
                .parse()
                .map_err(|e: String| anyhow::anyhow!("case '{}': {}", c.id, e))?;

            let options = c
                .options
                .into_iter()
                .map(|o| CaseOption {
                    modality: Modality {
                        id: o.modality,
                        name: o.name.unwrap_or_else(|| o.label.clone()),
                        contrast: o.contrast,
                        radiation_msv: o.radiation_msv,
                        cost: o.cost,
                    },
                    id: o.id,
                    label: o.label,
                })
                .collect();

            Ok(ClinicalCase {
                id: c.id,
                title: c.title,
                category: c.category,
                difficulty,
                explanation: c.explanation,
                clinical: c.clinical,
                options,
                correct_options: c.correct_options,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CaseBank {
        id: parsed.case_bank.id,
        name: parsed.case_bank.name,
        description: parsed.case_bank.description,
        cases,
    })
}

/// Recursively load all `.toml` case-bank files from a directory.
pub fn load_case_directory(dir: &Path) -> Result<Vec<CaseBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    paths.sort();

    for path in paths {
        if path.is_dir() {
            banks.extend(load_case_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_case_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(banks)
}

/// Load a case bank from a file, or merge every bank found in a directory.
pub fn load_cases(path: &Path) -> Result<CaseBank> {
    if !path.is_dir() {
        return parse_case_bank(path);
    }

    let banks = load_case_directory(path)?;
    anyhow::ensure!(!banks.is_empty(), "no case banks found in {}", path.display());

    let mut merged = CaseBank {
        id: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "cases".to_string()),
        name: banks
            .iter()
            .map(|b| b.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        description: String::new(),
        cases: Vec::new(),
    };
    for bank in banks {
        merged.cases.extend(bank.cases);
    }
    Ok(merged)
}

/// Load a custom rule base from a TOML file.
pub fn load_rule_base(path: &Path) -> Result<RuleBase> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rule base file: {}", path.display()))?;
    RuleBase::from_toml_str(&content).with_context(|| format!("invalid rule base: {}", path.display()))
}

/// A warning from case-bank validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    /// The case ID (if applicable).
    pub case_id: Option<String>,
    /// Warning message.
    pub message: String,
}

/// Validate a case bank for common authoring issues.
pub fn validate_case_bank(bank: &CaseBank, rules: &RuleBase) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen_ids = HashSet::new();
    for case in &bank.cases {
        if !seen_ids.insert(&case.id) {
            warnings.push(ValidationWarning {
                case_id: Some(case.id.clone()),
                message: format!("duplicate case ID: {}", case.id),
            });
        }
    }

    for case in &bank.cases {
        let warn = |message: String| ValidationWarning {
            case_id: Some(case.id.clone()),
            message,
        };

        if let Err(e) = case.clinical.validate() {
            warnings.push(warn(format!("invalid clinical input: {e}")));
        }

        if case.options.is_empty() {
            warnings.push(warn("case has no answer options".into()));
        }

        let mut option_ids = HashSet::new();
        for option in &case.options {
            if !option_ids.insert(option.id.as_str()) {
                warnings.push(warn(format!("duplicate option ID: {}", option.id)));
            }
            if let Err(e) = option.modality.validate() {
                warnings.push(warn(format!("option '{}': {e}", option.id)));
            } else if !rules.knows_modality(&option.modality.id) {
                warnings.push(warn(format!(
                    "option '{}' uses modality '{}' unknown to the rule base; it will score at baseline",
                    option.id, option.modality.id
                )));
            }
        }

        if case.correct_options.is_empty() {
            warnings.push(warn("no correct options defined".into()));
        }
        for correct in &case.correct_options {
            if !option_ids.contains(correct.as_str()) {
                warnings.push(warn(format!(
                    "correct option '{correct}' is not one of the case options"
                )));
            }
        }
    }

    warnings
}
