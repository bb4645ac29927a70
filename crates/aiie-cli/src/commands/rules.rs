//! The `aiie rules` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use aiie_core::rules::{EvidenceRule, RuleBase};

pub fn execute(modality: Option<String>, format: String, rules_path: Option<PathBuf>) -> Result<()> {
    let rules = super::active_rule_base(rules_path.as_deref())?;

    if let Some(id) = &modality {
        if !rules.knows_modality(id) {
            println!("Modality '{id}' is not covered by the rule base; it scores at the baseline.");
            return Ok(());
        }
    }

    let selected: Vec<&EvidenceRule> = match &modality {
        Some(id) => rules.rules_for(id).collect(),
        None => rules.rules().iter().collect(),
    };

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&selected)?),
        "toml" => {
            let subset = RuleBase::new(
                selected.into_iter().cloned().collect(),
                Default::default(),
            )?;
            println!(
                "{}",
                toml::to_string_pretty(&subset).context("failed to serialize rule base")?
            );
        }
        _ => print_text(&rules, &selected, modality.as_deref()),
    }

    Ok(())
}

fn print_text(rules: &RuleBase, selected: &[&EvidenceRule], modality: Option<&str>) {
    match modality {
        Some(id) => {
            let baseline = rules
                .baseline_for(id)
                .map(|b| format!("{b:.1}"))
                .unwrap_or_else(|| "engine default".to_string());
            println!("Modality {id} (baseline: {baseline}): {} rule(s)", selected.len());
        }
        None => println!(
            "{} rule(s) across {} modalities",
            selected.len(),
            rules.modality_ids().len()
        ),
    }

    for rule in selected {
        println!("\n  {:+.1}  {} [{}]", rule.contribution, rule.factor, rule.id);
        println!("        applies to: {}", rule.modalities.join(", "));
        println!("        {}", rule.explanation);
        println!("        source: {}", rule.citation);
    }
}
