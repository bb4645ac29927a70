//! Results aggregation.
//!
//! Category and difficulty breakdowns share one group-and-score routine keyed
//! by an extractor over case metadata. Answers whose case is unknown are left
//! out of every aggregate.

use std::collections::{HashMap, HashSet};
use std::fmt::Display;

use serde::{Deserialize, Serialize};

use aiie_core::model::{ClinicalCase, Difficulty};

use crate::scorer::{percentage, AssessmentAnswer};

/// Correct/total counts for one group of answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketScore<K> {
    pub key: K,
    pub correct: usize,
    /// Always greater than zero.
    pub total: usize,
    pub percentage: u8,
}

pub type CategoryScore = BucketScore<String>;
pub type DifficultyScore = BucketScore<Difficulty>;

/// Derived record for an incorrect answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedQuestion {
    pub case_id: String,
    pub title: String,
    pub category: String,
    pub difficulty: Difficulty,
    /// Labels of the selected options.
    pub user_answer: String,
    /// Labels of the correct options.
    pub correct_answer: String,
    pub explanation: String,
}

/// A suggested practice case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub case_id: String,
    pub title: String,
    pub category: String,
    pub difficulty: Difficulty,
    pub reason: String,
}

fn index_cases(cases: &[ClinicalCase]) -> HashMap<&str, &ClinicalCase> {
    cases.iter().map(|c| (c.id.as_str(), c)).collect()
}

/// Group answers by a case attribute and score each group. Groups appear in
/// the order their first answer appears.
pub fn group_and_score<K, F>(
    answers: &[AssessmentAnswer],
    cases: &[ClinicalCase],
    key_of: F,
) -> Vec<BucketScore<K>>
where
    K: PartialEq,
    F: Fn(&ClinicalCase) -> K,
{
    let index = index_cases(cases);
    let mut buckets: Vec<(K, usize, usize)> = Vec::new();

    for answer in answers {
        let Some(case) = index.get(answer.case_id.as_str()) else {
            tracing::warn!(case_id = %answer.case_id, "answer references unknown case, skipping");
            continue;
        };
        let key = key_of(case);
        let slot = match buckets.iter().position(|(k, _, _)| *k == key) {
            Some(i) => i,
            None => {
                buckets.push((key, 0, 0));
                buckets.len() - 1
            }
        };
        let bucket = &mut buckets[slot];
        bucket.2 += 1;
        if answer.correct {
            bucket.1 += 1;
        }
    }

    buckets
        .into_iter()
        .map(|(key, correct, total)| BucketScore {
            key,
            correct,
            total,
            percentage: percentage(correct, total),
        })
        .collect()
}

pub fn category_breakdown(answers: &[AssessmentAnswer], cases: &[ClinicalCase]) -> Vec<CategoryScore> {
    group_and_score(answers, cases, |c| c.category.clone())
}

pub fn difficulty_breakdown(
    answers: &[AssessmentAnswer],
    cases: &[ClinicalCase],
) -> Vec<DifficultyScore> {
    group_and_score(answers, cases, |c| c.difficulty)
}

fn labels(case: &ClinicalCase, option_ids: &[String]) -> String {
    if option_ids.is_empty() {
        return "(no answer)".to_string();
    }
    option_ids
        .iter()
        .map(|id| case.option_label(id))
        .collect::<Vec<_>>()
        .join(", ")
}

/// One entry per incorrect answer, in answer order.
pub fn missed_questions(answers: &[AssessmentAnswer], cases: &[ClinicalCase]) -> Vec<MissedQuestion> {
    let index = index_cases(cases);

    answers
        .iter()
        .filter(|a| !a.correct)
        .filter_map(|a| {
            let case = index.get(a.case_id.as_str())?;
            Some(MissedQuestion {
                case_id: case.id.clone(),
                title: case.title.clone(),
                category: case.category.clone(),
                difficulty: case.difficulty,
                user_answer: labels(case, &a.selected_options),
                correct_answer: labels(case, &case.correct_options),
                explanation: case.explanation.clone(),
            })
        })
        .collect()
}

fn weak<K>(buckets: &[BucketScore<K>], threshold: u8) -> impl Iterator<Item = &BucketScore<K>> {
    buckets
        .iter()
        .filter(move |b| b.total > 0 && b.percentage < threshold)
}

/// Human-readable labels for every bucket below `threshold` percent:
/// categories first, then difficulties, each in breakdown order.
pub fn identify_weak_areas(
    categories: &[CategoryScore],
    difficulties: &[DifficultyScore],
    threshold: u8,
) -> Vec<String> {
    let category_areas = weak(categories, threshold).map(|b| describe(b, ""));
    let difficulty_areas = weak(difficulties, threshold).map(|b| describe(b, " cases"));
    category_areas.chain(difficulty_areas).collect()
}

fn describe<K: Display>(bucket: &BucketScore<K>, suffix: &str) -> String {
    format!(
        "{}{suffix} ({}% correct, {}/{})",
        bucket.key, bucket.percentage, bucket.correct, bucket.total
    )
}

/// Suggest unattempted cases from each category the learner missed.
///
/// Categories are visited in the order they first appear among the missed
/// questions; within a category, cases keep pool order.
pub fn generate_recommendations(
    missed: &[MissedQuestion],
    answers: &[AssessmentAnswer],
    cases: &[ClinicalCase],
    per_category: usize,
) -> Vec<Recommendation> {
    let attempted: HashSet<&str> = answers.iter().map(|a| a.case_id.as_str()).collect();

    let mut categories: Vec<&str> = Vec::new();
    for m in missed {
        if !categories.contains(&m.category.as_str()) {
            categories.push(&m.category);
        }
    }

    let mut recommendations = Vec::new();
    for category in categories {
        let missed_titles: Vec<String> = missed
            .iter()
            .filter(|m| m.category == category)
            .map(|m| format!("\"{}\"", m.title))
            .collect();
        let reason = format!(
            "Practice {category}: you missed {}",
            missed_titles.join(", ")
        );

        recommendations.extend(
            cases
                .iter()
                .filter(|c| c.category == category && !attempted.contains(c.id.as_str()))
                .take(per_category)
                .map(|c| Recommendation {
                    case_id: c.id.clone(),
                    title: c.title.clone(),
                    category: c.category.clone(),
                    difficulty: c.difficulty,
                    reason: reason.clone(),
                }),
        );
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use aiie_core::model::{CaseOption, ClinicalInput, Contrast, Modality, Sex};

    fn case(id: &str, category: &str, difficulty: Difficulty) -> ClinicalCase {
        ClinicalCase {
            id: id.into(),
            title: format!("Case {id}"),
            category: category.into(),
            difficulty,
            explanation: format!("Explanation for {id}"),
            clinical: ClinicalInput::new(40, Sex::Female, "headache"),
            options: vec![
                CaseOption {
                    id: "a".into(),
                    label: "CT Head".into(),
                    modality: Modality::new("ct-head-noncontrast", "CT Head", Contrast::None, 2.0, 400.0),
                },
                CaseOption {
                    id: "b".into(),
                    label: "MRI Brain".into(),
                    modality: Modality::new("mri-brain-noncontrast", "MRI Brain", Contrast::None, 0.0, 1200.0),
                },
            ],
            correct_options: vec!["a".into()],
        }
    }

    fn answer(case_id: &str, selected: &str, correct: bool) -> AssessmentAnswer {
        AssessmentAnswer {
            case_id: case_id.into(),
            selected_options: vec![selected.into()],
            correct,
            time_spent_secs: 30,
        }
    }

    fn pool() -> Vec<ClinicalCase> {
        vec![
            case("n1", "Neuro", Difficulty::Beginner),
            case("n2", "Neuro", Difficulty::Advanced),
            case("m1", "MSK", Difficulty::Beginner),
            case("n3", "Neuro", Difficulty::Intermediate),
            case("n4", "Neuro", Difficulty::Beginner),
            case("m2", "MSK", Difficulty::Intermediate),
        ]
    }

    #[test]
    fn breakdown_groups_in_first_seen_order() {
        let answers = vec![
            answer("m1", "a", true),
            answer("n1", "b", false),
            answer("n2", "a", true),
        ];
        let categories = category_breakdown(&answers, &pool());
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[0].key, "MSK");
        assert_eq!((categories[0].correct, categories[0].total), (1, 1));
        assert_eq!(categories[1].key, "Neuro");
        assert_eq!((categories[1].correct, categories[1].total), (1, 2));
        assert_eq!(categories[1].percentage, 50);

        let difficulties = difficulty_breakdown(&answers, &pool());
        assert_eq!(difficulties[0].key, Difficulty::Beginner);
        assert_eq!(difficulties[0].total, 2);
        assert_eq!(difficulties[1].key, Difficulty::Advanced);
    }

    #[test]
    fn unknown_cases_are_excluded() {
        let answers = vec![answer("ghost", "a", false), answer("n1", "a", true)];
        let categories = category_breakdown(&answers, &pool());
        let total: usize = categories.iter().map(|c| c.total).sum();
        assert_eq!(total, 1);
        assert!(missed_questions(&answers, &pool()).is_empty());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(category_breakdown(&[], &pool()).is_empty());
        assert!(difficulty_breakdown(&[], &[]).is_empty());
        assert!(missed_questions(&[], &pool()).is_empty());
        assert!(identify_weak_areas(&[], &[], 70).is_empty());
        assert!(generate_recommendations(&[], &[], &pool(), 2).is_empty());
    }

    #[test]
    fn missed_questions_use_option_labels() {
        let answers = vec![answer("n1", "b", false), answer("n2", "a", true)];
        let missed = missed_questions(&answers, &pool());
        assert_eq!(missed.len(), 1);
        assert_eq!(missed[0].case_id, "n1");
        assert_eq!(missed[0].user_answer, "MRI Brain");
        assert_eq!(missed[0].correct_answer, "CT Head");
        assert_eq!(missed[0].explanation, "Explanation for n1");
    }

    #[test]
    fn missed_question_without_selection() {
        let answers = vec![AssessmentAnswer {
            case_id: "n1".into(),
            selected_options: vec![],
            correct: false,
            time_spent_secs: 0,
        }];
        let missed = missed_questions(&answers, &pool());
        assert_eq!(missed[0].user_answer, "(no answer)");
    }

    #[test]
    fn weak_areas_categories_then_difficulties() {
        let answers = vec![
            answer("m1", "a", true),
            answer("n1", "b", false),
            answer("n2", "b", false),
            answer("n3", "a", true),
        ];
        let categories = category_breakdown(&answers, &pool());
        let difficulties = difficulty_breakdown(&answers, &pool());
        let areas = identify_weak_areas(&categories, &difficulties, 70);

        assert_eq!(
            areas,
            vec![
                "Neuro (33% correct, 1/3)".to_string(),
                "beginner cases (50% correct, 1/2)".to_string(),
                "advanced cases (0% correct, 0/1)".to_string(),
            ]
        );
    }

    #[test]
    fn recommendations_skip_attempted_cases() {
        let answers = vec![answer("n1", "b", false), answer("n2", "a", true)];
        let missed = missed_questions(&answers, &pool());
        let recs = generate_recommendations(&missed, &answers, &pool(), 2);

        let ids: Vec<_> = recs.iter().map(|r| r.case_id.as_str()).collect();
        assert_eq!(ids, vec!["n3", "n4"]);
        assert!(recs.iter().all(|r| r.category == "Neuro"));
        assert!(recs[0].reason.contains("\"Case n1\""));
    }

    #[test]
    fn recommendations_respect_limit_and_exhaustion() {
        let answers = vec![
            answer("m1", "b", false),
            answer("m2", "b", false),
            answer("n1", "b", false),
        ];
        let missed = missed_questions(&answers, &pool());
        let recs = generate_recommendations(&missed, &answers, &pool(), 1);

        // Every MSK case was attempted, so only Neuro yields a suggestion.
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].case_id, "n2");
    }
}
