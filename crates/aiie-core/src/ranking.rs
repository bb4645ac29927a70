//! Option ranking across sibling modalities.
//!
//! Scores every candidate modality for a case, fills in alternative
//! recommendations from the sibling scores, and orders the options by final
//! score. Ties keep input order.

use serde::{Deserialize, Serialize};

use crate::engine::ScoringEngine;
use crate::error::ValidationError;
use crate::model::{ClinicalInput, Modality, ScoringResult};

/// A scored option in ranked position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedOption {
    /// 1-based position after sorting.
    pub rank: usize,
    /// Position of the modality in the input slice. Distinguishes options
    /// that share a modality.
    pub index: usize,
    pub modality: Modality,
    pub result: ScoringResult,
}

/// Score and rank all modalities for one clinical input.
///
/// The engine and input are validated once up front; any invalid modality
/// rejects the whole ranking.
pub fn rank_options(
    engine: &ScoringEngine<'_>,
    input: &ClinicalInput,
    modalities: &[Modality],
) -> Result<Vec<RankedOption>, ValidationError> {
    engine.validate()?;
    input.validate()?;
    for modality in modalities {
        modality.validate()?;
    }

    let mut results: Vec<ScoringResult> = modalities
        .iter()
        .map(|m| engine.score_validated(input, m))
        .collect();

    attach_alternatives(&mut results, engine.config().alternative_margin);

    let mut indexed: Vec<(usize, ScoringResult)> = results.into_iter().enumerate().collect();
    // `sort_by` is stable, which keeps equal scores in input order.
    indexed.sort_by(|(_, a), (_, b)| b.final_score.total_cmp(&a.final_score));

    Ok(indexed
        .into_iter()
        .enumerate()
        .map(|(i, (index, result))| RankedOption {
            rank: i + 1,
            index,
            modality: result.modality.clone(),
            result,
        })
        .collect())
}

/// Best sibling that beats `result` by at least `margin`, as a short note.
///
/// Among equally scored siblings the earliest one wins.
pub fn alternative_for(
    result: &ScoringResult,
    siblings: &[ScoringResult],
    margin: f64,
) -> Option<String> {
    let mut best: Option<&ScoringResult> = None;
    for sibling in siblings {
        if sibling.modality.id == result.modality.id {
            continue;
        }
        let gain = sibling.final_score - result.final_score;
        if gain <= 0.0 || gain < margin {
            continue;
        }
        if best.map_or(true, |b| sibling.final_score > b.final_score) {
            best = Some(sibling);
        }
    }

    best.map(|b| {
        format!(
            "Consider {} instead (scores {:.1} vs {:.1})",
            b.modality.display_name(),
            b.final_score,
            result.final_score
        )
    })
}

/// Set `alternative_recommendation` on every result from its siblings.
pub fn attach_alternatives(results: &mut [ScoringResult], margin: f64) {
    let notes: Vec<Option<String>> = results
        .iter()
        .map(|r| alternative_for(r, results, margin))
        .collect();
    for (result, note) in results.iter_mut().zip(notes) {
        result.alternative_recommendation = note;
    }
}
