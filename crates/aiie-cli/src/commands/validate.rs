//! The `aiie validate` command.

use std::path::PathBuf;

use anyhow::Result;

pub fn execute(cases_path: PathBuf, rules_path: Option<PathBuf>) -> Result<()> {
    let rules = super::active_rule_base(rules_path.as_deref())?;
    let banks = if cases_path.is_dir() {
        aiie_core::parser::load_case_directory(&cases_path)?
    } else {
        vec![aiie_core::parser::parse_case_bank(&cases_path)?]
    };

    let mut total_warnings = 0;

    for bank in &banks {
        println!("Case bank: {} ({} cases)", bank.name, bank.cases.len());

        let warnings = aiie_core::parser::validate_case_bank(bank, &rules);
        for w in &warnings {
            let prefix = w
                .case_id
                .as_ref()
                .map(|id| format!("  [{id}]"))
                .unwrap_or_else(|| "  ".to_string());
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All case banks valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
