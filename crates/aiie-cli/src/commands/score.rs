//! The `aiie score` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use aiie_core::engine::ScoringEngine;
use aiie_core::model::ClinicalCase;
use aiie_core::ranking::{rank_options, RankedOption};

#[derive(Serialize)]
struct ScoreOutput<'a> {
    case_id: &'a str,
    title: &'a str,
    correct_options: &'a [String],
    ranked: &'a [RankedOption],
}

pub fn execute(
    cases_path: PathBuf,
    case_id: String,
    format: String,
    config_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
) -> Result<()> {
    let config = aiie_core::config::load_config_from(config_path.as_deref())?;
    let rules = super::active_rule_base(rules_path.as_deref())?;
    let bank = aiie_core::parser::load_cases(&cases_path)?;

    let case = bank
        .case(&case_id)
        .with_context(|| format!("case '{case_id}' not found in {}", cases_path.display()))?;

    let engine = ScoringEngine::new(&rules, config.engine.clone());
    let ranked = rank_options(&engine, &case.clinical, &case.modalities())
        .with_context(|| format!("cannot score case '{case_id}'"))?;

    match format.as_str() {
        "json" => {
            let output = ScoreOutput {
                case_id: &case.id,
                title: &case.title,
                correct_options: &case.correct_options,
                ranked: &ranked,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        _ => print_table(case, &ranked),
    }

    Ok(())
}

fn print_table(case: &ClinicalCase, ranked: &[RankedOption]) {
    use comfy_table::{Cell, Table};

    println!("Case: {} [{}]", case.title, case.id);
    println!(
        "Patient: {} y/o {}, {} ({}, {})\n",
        case.clinical.age,
        case.clinical.sex,
        case.clinical.chief_complaint,
        case.clinical.duration,
        case.clinical.severity
    );

    let mut table = Table::new();
    table.set_header(vec!["Rank", "Option", "Modality", "Score", "Category", "Correct"]);

    for r in ranked {
        let option = case.options.get(r.index);
        let label = option.map_or_else(|| r.modality.name.clone(), |o| o.label.clone());
        let correct = option.is_some_and(|o| case.correct_options.contains(&o.id));

        table.add_row(vec![
            Cell::new(r.rank),
            Cell::new(label),
            Cell::new(r.modality.display_name()),
            Cell::new(r.result.badge()),
            Cell::new(&r.result.category_label),
            Cell::new(if correct { "yes" } else { "" }),
        ]);
    }

    println!("{table}");

    for r in ranked {
        let label = case.options.get(r.index).map_or(r.modality.name.as_str(), |o| o.label.as_str());
        println!("\n{} ({:.1})", label, r.result.final_score);
        println!("  {:+5.1}  baseline", r.result.baseline_score);
        for f in r.result.factors_by_importance() {
            println!("  {:+5.1}  {} [{}]", f.contribution, f.factor, f.value);
            println!("         {} ({})", f.explanation, f.evidence_citation);
        }
        if let Some(alt) = &r.result.alternative_recommendation {
            println!("  -> {alt}");
        }
    }
}
