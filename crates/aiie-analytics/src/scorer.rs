//! Assessment scorer.
//!
//! Strict all-or-nothing grading per question: an answer is correct only when
//! the selected option set equals the case's correct option set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use aiie_core::model::{ClinicalCase, ScoringResult};

/// One attempt's response to a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentAnswer {
    pub case_id: String,
    pub selected_options: Vec<String>,
    /// Derived from the case's correct options at grading time.
    pub correct: bool,
    #[serde(default)]
    pub time_spent_secs: u32,
}

impl AssessmentAnswer {
    /// Grade a selection against a case.
    pub fn grade(case: &ClinicalCase, selected_options: Vec<String>, time_spent_secs: u32) -> Self {
        let correct = is_correct(&selected_options, &case.correct_options);
        Self {
            case_id: case.id.clone(),
            selected_options,
            correct,
            time_spent_secs,
        }
    }
}

/// Exact set equality between the selection and the correct options.
///
/// A case without correct options can never be answered correctly.
pub fn is_correct(selected: &[String], correct: &[String]) -> bool {
    let correct: BTreeSet<&str> = correct.iter().map(String::as_str).collect();
    if correct.is_empty() {
        return false;
    }
    let selected: BTreeSet<&str> = selected.iter().map(String::as_str).collect();
    selected == correct
}

/// `round(100 * part / whole)`, capped at 100. Zero when `whole` is zero.
pub fn percentage(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let pct = (100.0 * part as f64 / whole as f64).round();
    pct.min(100.0) as u8
}

/// Percentage of questions answered correctly.
pub fn score(answers: &[AssessmentAnswer], total_questions: usize) -> u8 {
    let correct = answers.iter().filter(|a| a.correct).count();
    percentage(correct, total_questions)
}

pub fn check_passed(score: u8, passing_score: u8) -> bool {
    score >= passing_score
}

/// Display-only partial credit derived from an appropriateness score:
/// `round(final_score / 9 * 100)`. Never used for grading.
pub fn partial_credit(result: &ScoringResult) -> u8 {
    (result.final_score / 9.0 * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn answer(correct: bool) -> AssessmentAnswer {
        AssessmentAnswer {
            case_id: "c".into(),
            selected_options: vec![],
            correct,
            time_spent_secs: 10,
        }
    }

    #[test]
    fn correctness_is_exact_set_equality() {
        assert!(is_correct(&ids(&["a"]), &ids(&["a"])));
        assert!(is_correct(&ids(&["b", "a"]), &ids(&["a", "b"])));
        assert!(is_correct(&ids(&["a", "a"]), &ids(&["a"])));
        assert!(!is_correct(&ids(&["a"]), &ids(&["a", "b"])));
        assert!(!is_correct(&ids(&["a", "b", "c"]), &ids(&["a", "b"])));
        assert!(!is_correct(&ids(&[]), &ids(&["a"])));
        assert!(!is_correct(&ids(&[]), &ids(&[])));
        assert!(!is_correct(&ids(&["a"]), &ids(&[])));
    }

    #[test]
    fn zero_questions_score_zero() {
        assert_eq!(score(&[], 0), 0);
        assert!(!check_passed(0, 70));
    }

    #[test]
    fn score_rounds_to_nearest() {
        let answers = vec![answer(true), answer(true), answer(false)];
        assert_eq!(score(&answers, 3), 67);
        assert_eq!(score(&answers[..1], 3), 33);
        assert_eq!(score(&answers, 2), 100);
    }

    #[test]
    fn score_never_exceeds_100() {
        let answers = vec![answer(true); 5];
        assert_eq!(score(&answers, 3), 100);
    }

    #[test]
    fn pass_threshold_is_inclusive() {
        assert!(check_passed(70, 70));
        assert!(!check_passed(69, 70));
        assert!(check_passed(0, 0));
    }

    #[test]
    fn percentage_halves_round_up() {
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 200), 1);
        assert_eq!(percentage(0, 5), 0);
    }
}
