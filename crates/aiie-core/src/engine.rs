//! Appropriateness scoring engine.
//!
//! Scores one clinical input against one modality: evaluate the rule base,
//! sum contributions onto the baseline in full precision, clamp once, then
//! classify through the shared band table.

use crate::category::{self, MAX_SCORE, MIN_SCORE};
use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::model::{ClinicalInput, Modality, ScoringResult};
use crate::rules::RuleBase;

/// Stateless scorer over a borrowed rule base.
#[derive(Debug, Clone)]
pub struct ScoringEngine<'r> {
    rules: &'r RuleBase,
    config: EngineConfig,
}

impl Default for ScoringEngine<'static> {
    fn default() -> Self {
        Self::new(RuleBase::builtin(), EngineConfig::default())
    }
}

impl<'r> ScoringEngine<'r> {
    pub fn new(rules: &'r RuleBase, config: EngineConfig) -> Self {
        Self { rules, config }
    }

    /// Override the default baseline.
    pub fn with_baseline(mut self, baseline_score: f64) -> Self {
        self.config.baseline_score = baseline_score;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &'r RuleBase {
        self.rules
    }

    /// Baseline used for a modality: its own if the rule base defines one,
    /// otherwise the engine default.
    pub fn baseline_for(&self, modality: &Modality) -> f64 {
        self.rules
            .baseline_for(&modality.id)
            .unwrap_or(self.config.baseline_score)
    }

    /// Reject a default baseline that is off the score scale.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let baseline = self.config.baseline_score;
        if !(MIN_SCORE..=MAX_SCORE).contains(&baseline) {
            return Err(ValidationError::InvalidBaseline(baseline));
        }
        Ok(())
    }

    /// Validate the engine and inputs, then score. Unknown modalities degrade
    /// to the baseline with no factors rather than failing.
    pub fn score(
        &self,
        input: &ClinicalInput,
        modality: &Modality,
    ) -> Result<ScoringResult, ValidationError> {
        self.validate()?;
        input.validate()?;
        modality.validate()?;
        Ok(self.score_validated(input, modality))
    }

    pub(crate) fn score_validated(&self, input: &ClinicalInput, modality: &Modality) -> ScoringResult {
        let baseline_score = self.baseline_for(modality);

        let shap_factors = if self.rules.knows_modality(&modality.id) {
            self.rules.evaluate(input, modality)
        } else {
            tracing::debug!(modality = %modality.id, "unknown modality, scoring at baseline");
            Vec::new()
        };

        let raw: f64 = baseline_score + shap_factors.iter().map(|f| f.contribution).sum::<f64>();
        let final_score = raw.clamp(MIN_SCORE, MAX_SCORE);

        debug_assert!(
            shap_factors.iter().all(|f| f.contribution != 0.0),
            "zero-contribution factor emitted for {}",
            modality.id
        );
        debug_assert!(
            (MIN_SCORE..=MAX_SCORE).contains(&final_score),
            "final score {final_score} out of range for {}",
            modality.id
        );

        let category = category::classify(final_score);

        ScoringResult {
            modality: modality.clone(),
            baseline_score,
            shap_factors,
            final_score,
            category,
            category_label: category.label().to_string(),
            alternative_recommendation: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::AppropriatenessCategory;
    use crate::model::{Contrast, Sex};
    use crate::rules::modality_ids;

    fn ct_head() -> Modality {
        Modality::new(modality_ids::CT_HEAD, "CT Head", Contrast::None, 2.0, 400.0)
    }

    #[test]
    fn thunderclap_over_50_scores_high_for_ct() {
        let engine = ScoringEngine::default();
        let input = ClinicalInput::new(58, Sex::Female, "headache").with_red_flag("thunderclap");
        let result = engine.score(&input, &ct_head()).unwrap();
        assert!(result.final_score >= 8.0, "got {}", result.final_score);
        assert_eq!(result.category, AppropriatenessCategory::UsuallyAppropriate);
        assert!(result
            .shap_factors
            .iter()
            .any(|f| f.factor.to_lowercase().contains("thunderclap")));
    }

    #[test]
    fn unknown_modality_scores_at_baseline() {
        let engine = ScoringEngine::default();
        let input = ClinicalInput::new(40, Sex::Male, "headache");
        let unknown = Modality::new("unknown-modality", "Mystery scan", Contrast::None, 0.0, 0.0);
        let result = engine.score(&input, &unknown).unwrap();
        assert!(result.shap_factors.is_empty());
        assert_eq!(result.final_score, result.baseline_score);
        assert_eq!(result.baseline_score, 5.0);
    }

    #[test]
    fn baseline_override() {
        let engine = ScoringEngine::default().with_baseline(3.0);
        let input = ClinicalInput::new(40, Sex::Male, "ankle sprain");
        let result = engine.score(&input, &ct_head()).unwrap();
        assert_eq!(result.baseline_score, 3.0);
        assert_eq!(result.final_score, 3.0);
        assert_eq!(result.category, AppropriatenessCategory::UsuallyNotAppropriate);
    }

    #[test]
    fn clamps_after_summing() {
        // Uncomplicated headache (-3.0) plus repeat study (-1.0) from 2.0 would
        // reach -2.0 unclamped.
        let engine = ScoringEngine::default().with_baseline(2.0);
        let input = ClinicalInput::new(30, Sex::Female, "headache")
            .with_prior_imaging(modality_ids::CT_HEAD);
        let result = engine.score(&input, &ct_head()).unwrap();
        assert_eq!(result.total_contribution(), -4.0);
        assert_eq!(result.final_score, 1.0);
    }

    #[test]
    fn rejects_invalid_input_before_scoring() {
        let engine = ScoringEngine::default();
        let input = ClinicalInput::new(-5, Sex::Male, "headache");
        assert_eq!(
            engine.score(&input, &ct_head()),
            Err(ValidationError::InvalidAge(-5))
        );

        let ok = ClinicalInput::new(30, Sex::Male, "headache");
        let blank = Modality::new(" ", "Blank", Contrast::None, 0.0, 0.0);
        assert_eq!(
            engine.score(&ok, &blank),
            Err(ValidationError::EmptyModalityId)
        );
    }

    #[test]
    fn rejects_off_scale_baseline() {
        let input = ClinicalInput::new(40, Sex::Male, "headache");
        let unknown = Modality::new("unknown-modality", "Mystery scan", Contrast::None, 0.0, 0.0);

        for bad in [0.0, 9.5, f64::NAN] {
            let engine = ScoringEngine::default().with_baseline(bad);
            assert!(matches!(
                engine.score(&input, &unknown),
                Err(ValidationError::InvalidBaseline(_))
            ));
        }

        let edge = ScoringEngine::default().with_baseline(1.0);
        let result = edge.score(&input, &unknown).unwrap();
        assert_eq!(result.final_score, result.baseline_score);
    }

    #[test]
    fn display_badge() {
        let engine = ScoringEngine::default();
        let input = ClinicalInput::new(58, Sex::Female, "headache").with_red_flag("thunderclap");
        let result = engine.score(&input, &ct_head()).unwrap();
        assert_eq!(result.badge(), "9/9");
        assert_eq!(result.category_label, "Usually Appropriate");
    }
}
