//! Property checks over a grid of clinical inputs and every built-in modality.
//!
//! Verifies bounds, additivity, determinism, and the absence of zero
//! contributions for every scored pair, plus ranking order guarantees.

use aiie_core::category::{classify, MAX_SCORE, MIN_SCORE};
use aiie_core::engine::ScoringEngine;
use aiie_core::model::{
    ClinicalInput, Comorbidities, Contrast, DurationClass, Modality, Severity, Sex,
};
use aiie_core::ranking::rank_options;
use aiie_core::rules::modality_ids;

fn modalities() -> Vec<Modality> {
    modality_ids::ALL
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let enhanced = id.ends_with("-contrast") && !id.ends_with("noncontrast");
            let contrast = if enhanced || id.starts_with("cta") {
                Contrast::With
            } else {
                Contrast::None
            };
            let radiation = if modality_ids::IONIZING.contains(id) {
                1.5 + i as f64
            } else {
                0.0
            };
            Modality::new(*id, *id, contrast, radiation, 100.0 * (i + 1) as f64)
        })
        .chain(std::iter::once(Modality::new(
            "unknown-modality",
            "Unknown",
            Contrast::None,
            0.0,
            0.0,
        )))
        .collect()
}

fn inputs() -> Vec<ClinicalInput> {
    let complaints = [
        "headache",
        "low back pain",
        "right upper quadrant pain",
        "abdominal pain",
        "chest pain",
        "shortness of breath",
        "knee pain",
    ];
    let flag_sets: [&[&str]; 5] = [
        &[],
        &["thunderclap"],
        &["neuro-deficit", "thunderclap"],
        &["cauda-equina", "fever"],
        &["pregnancy"],
    ];
    let ages = [4, 30, 55, 80];
    let comorbidities = [
        Comorbidities::default(),
        Comorbidities {
            cancer_history: true,
            immunocompromised: true,
            recent_trauma: true,
        },
    ];

    let mut out = Vec::new();
    for complaint in complaints {
        for flags in flag_sets {
            for age in ages {
                for (i, comorbid) in comorbidities.iter().enumerate() {
                    let mut input = ClinicalInput::new(age, Sex::Female, complaint)
                        .with_comorbidities(*comorbid)
                        .with_duration(if i == 0 {
                            DurationClass::Acute
                        } else {
                            DurationClass::Chronic
                        })
                        .with_severity(Severity::Severe);
                    for flag in flags {
                        input = input.with_red_flag(*flag);
                    }
                    if i == 1 {
                        input = input
                            .with_lab("creatinine", 2.4, true)
                            .with_lab("d-dimer", 900.0, true)
                            .with_lab("wbc", 15.2, true)
                            .with_exam_finding("peritoneal-signs")
                            .with_prior_imaging(modality_ids::CT_HEAD);
                    } else {
                        input = input.with_lab("d-dimer", 200.0, false);
                    }
                    out.push(input);
                }
            }
        }
    }
    out
}

#[test]
fn scores_are_bounded_additive_and_nonzero() {
    let engine = ScoringEngine::default();
    let modalities = modalities();

    for input in inputs() {
        for modality in &modalities {
            let result = engine.score(&input, modality).unwrap();

            assert!(
                (MIN_SCORE..=MAX_SCORE).contains(&result.final_score),
                "{} out of bounds for {}",
                result.final_score,
                modality.id
            );

            let expected = (result.baseline_score + result.total_contribution()).clamp(MIN_SCORE, MAX_SCORE);
            assert_eq!(result.final_score, expected, "additivity for {}", modality.id);

            assert!(result.shap_factors.iter().all(|f| f.contribution != 0.0));
            assert_eq!(result.category, classify(result.final_score));
            assert_eq!(result.category_label, result.category.label());
        }
    }
}

#[test]
fn scoring_is_deterministic() {
    let engine = ScoringEngine::default();
    let modalities = modalities();

    for input in inputs().iter().step_by(7) {
        for modality in &modalities {
            let first = engine.score(input, modality).unwrap();
            let second = engine.score(input, modality).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.final_score.to_bits(), second.final_score.to_bits());
        }
    }
}

#[test]
fn unknown_modality_always_scores_baseline() {
    let engine = ScoringEngine::default().with_baseline(6.5);
    let unknown = Modality::new("unknown-modality", "Unknown", Contrast::None, 0.0, 0.0);

    for input in inputs() {
        let result = engine.score(&input, &unknown).unwrap();
        assert!(result.shap_factors.is_empty());
        assert_eq!(result.final_score, 6.5);
    }
}

#[test]
fn ranking_is_sorted_and_stable() {
    let engine = ScoringEngine::default();
    let modalities = modalities();

    for input in inputs().iter().step_by(5) {
        let ranked = rank_options(&engine, input, &modalities).unwrap();
        assert_eq!(ranked.len(), modalities.len());

        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!(a.result.final_score >= b.result.final_score);
            if a.result.final_score == b.result.final_score {
                let pos = |id: &str| modalities.iter().position(|m| m.id == id).unwrap();
                assert!(pos(&a.modality.id) < pos(&b.modality.id));
            }
        }

        for (i, option) in ranked.iter().enumerate() {
            assert_eq!(option.rank, i + 1);
        }
    }
}

#[test]
fn thunderclap_scenario() {
    let engine = ScoringEngine::default();
    let ct = Modality::new(modality_ids::CT_HEAD, "CT Head", Contrast::None, 2.0, 400.0);
    let input = ClinicalInput::new(67, Sex::Male, "sudden severe headache")
        .with_red_flag("thunderclap")
        .with_severity(Severity::Severe);

    let result = engine.score(&input, &ct).unwrap();
    assert!(result.final_score >= 8.0);
    assert!(result
        .shap_factors
        .iter()
        .any(|f| f.factor.to_lowercase().contains("thunderclap")));
    assert!(result
        .shap_factors
        .iter()
        .all(|f| !f.evidence_citation.is_empty()));
}
