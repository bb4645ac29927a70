pub mod grade;
pub mod init;
pub mod rules;
pub mod score;
pub mod validate;

use std::path::Path;

use anyhow::Result;

use aiie_core::rules::RuleBase;

/// The rule base named on the command line, or the built-in one.
pub fn active_rule_base(path: Option<&Path>) -> Result<RuleBase> {
    match path {
        Some(path) => {
            let rules = aiie_core::parser::load_rule_base(path)?;
            tracing::info!(path = %path.display(), rules = rules.len(), "loaded custom rule base");
            Ok(rules)
        }
        None => Ok(RuleBase::builtin().clone()),
    }
}
