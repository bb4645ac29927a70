//! Attempt files and assessment reports with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use aiie_core::config::AssessmentConfig;
use aiie_core::model::{CaseBank, ClinicalCase};

use crate::aggregate::{
    category_breakdown, difficulty_breakdown, generate_recommendations, identify_weak_areas,
    missed_questions, CategoryScore, DifficultyScore, MissedQuestion, Recommendation,
};
use crate::scorer::{check_passed, score, AssessmentAnswer};

/// A single response inside an attempt file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResponse {
    pub case_id: String,
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub time_spent_secs: u32,
}

/// A learner's submitted attempt at an assessment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssessmentAttempt {
    pub assessment_id: String,
    /// Questions in the assessment. Defaults to the number of responses.
    #[serde(default)]
    pub total_questions: Option<usize>,
    /// Overrides the configured passing score.
    #[serde(default)]
    pub passing_score: Option<u8>,
    #[serde(default)]
    pub responses: Vec<AttemptResponse>,
}

impl AssessmentAttempt {
    /// Load an attempt from a `.json` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read attempt from {}", path.display()))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        let attempt: Self = if is_toml {
            toml::from_str(&content)
                .with_context(|| format!("failed to parse attempt TOML in {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse attempt JSON in {}", path.display()))?
        };

        attempt
            .validate()
            .with_context(|| format!("invalid attempt in {}", path.display()))?;
        Ok(attempt)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(passing) = self.passing_score {
            anyhow::ensure!(passing <= 100, "passing_score must be at most 100, got {passing}");
        }
        Ok(())
    }

    pub fn total_questions(&self) -> usize {
        self.total_questions.unwrap_or(self.responses.len())
    }

    /// Grade every response against the case pool.
    ///
    /// A response naming an unknown case is kept as an incorrect answer.
    pub fn grade(&self, cases: &[ClinicalCase]) -> Vec<AssessmentAnswer> {
        self.responses
            .iter()
            .map(|response| match cases.iter().find(|c| c.id == response.case_id) {
                Some(case) => {
                    AssessmentAnswer::grade(case, response.selected.clone(), response.time_spent_secs)
                }
                None => {
                    tracing::warn!(
                        case_id = %response.case_id,
                        assessment = %self.assessment_id,
                        "response references unknown case, grading as incorrect"
                    );
                    AssessmentAnswer {
                        case_id: response.case_id.clone(),
                        selected_options: response.selected.clone(),
                        correct: false,
                        time_spent_secs: response.time_spent_secs,
                    }
                }
            })
            .collect()
    }
}

/// Graded attempt with every derived analytic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub assessment_id: String,
    /// Name of the case bank graded against.
    pub case_bank: String,
    pub score: u8,
    pub passed: bool,
    pub passing_score: u8,
    pub total_questions: usize,
    pub answered: usize,
    pub correct_count: usize,
    pub total_time_secs: u64,
    pub average_time_secs: f64,
    pub answers: Vec<AssessmentAnswer>,
    pub category_breakdown: Vec<CategoryScore>,
    pub difficulty_breakdown: Vec<DifficultyScore>,
    pub missed_questions: Vec<MissedQuestion>,
    pub weak_areas: Vec<String>,
    pub recommendations: Vec<Recommendation>,
}

impl AssessmentReport {
    /// Grade an attempt and derive its analytics.
    pub fn build(attempt: &AssessmentAttempt, bank: &CaseBank, config: &AssessmentConfig) -> Self {
        let answers = attempt.grade(&bank.cases);
        let total_questions = attempt.total_questions();
        if total_questions == 0 {
            tracing::warn!(assessment = %attempt.assessment_id, "assessment has no questions");
        }

        let passing_score = attempt.passing_score.unwrap_or(config.passing_score);
        let score = score(&answers, total_questions);
        let correct_count = answers.iter().filter(|a| a.correct).count();
        let total_time_secs: u64 = answers.iter().map(|a| u64::from(a.time_spent_secs)).sum();
        let average_time_secs = if answers.is_empty() {
            0.0
        } else {
            total_time_secs as f64 / answers.len() as f64
        };

        let categories = category_breakdown(&answers, &bank.cases);
        let difficulties = difficulty_breakdown(&answers, &bank.cases);
        let missed = missed_questions(&answers, &bank.cases);
        let weak_areas = identify_weak_areas(&categories, &difficulties, config.weak_area_threshold);
        let recommendations = generate_recommendations(
            &missed,
            &answers,
            &bank.cases,
            config.recommendations_per_category,
        );

        tracing::info!(
            assessment = %attempt.assessment_id,
            score,
            passed = check_passed(score, passing_score),
            "graded attempt"
        );

        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            assessment_id: attempt.assessment_id.clone(),
            case_bank: bank.name.clone(),
            score,
            passed: check_passed(score, passing_score),
            passing_score,
            total_questions,
            answered: answers.len(),
            correct_count,
            total_time_secs,
            average_time_secs,
            answers,
            category_breakdown: categories,
            difficulty_breakdown: difficulties,
            missed_questions: missed,
            weak_areas,
            recommendations,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        serde_json::from_str(&content).context("failed to parse report JSON")
    }

    /// Render the report as Markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("# Assessment Report: {}\n\n", self.assessment_id));
        md.push_str(&format!("- **Case bank**: {}\n", self.case_bank));
        md.push_str(&format!(
            "- **Score**: {}% ({})\n",
            self.score,
            if self.passed { "PASSED" } else { "FAILED" }
        ));
        md.push_str(&format!("- **Passing score**: {}%\n", self.passing_score));
        md.push_str(&format!(
            "- **Correct**: {}/{} ({} answered)\n",
            self.correct_count, self.total_questions, self.answered
        ));
        md.push_str(&format!(
            "- **Time**: {}s total, {:.1}s average\n\n",
            self.total_time_secs, self.average_time_secs
        ));

        if !self.category_breakdown.is_empty() {
            md.push_str("## By Category\n\n");
            md.push_str("| Category | Correct | Total | % |\n");
            md.push_str("|----------|---------|-------|---|\n");
            for c in &self.category_breakdown {
                md.push_str(&format!(
                    "| {} | {} | {} | {}% |\n",
                    c.key, c.correct, c.total, c.percentage
                ));
            }
            md.push('\n');
        }

        if !self.difficulty_breakdown.is_empty() {
            md.push_str("## By Difficulty\n\n");
            md.push_str("| Difficulty | Correct | Total | % |\n");
            md.push_str("|------------|---------|-------|---|\n");
            for d in &self.difficulty_breakdown {
                md.push_str(&format!(
                    "| {} | {} | {} | {}% |\n",
                    d.key, d.correct, d.total, d.percentage
                ));
            }
            md.push('\n');
        }

        if !self.missed_questions.is_empty() {
            md.push_str("## Missed Questions\n\n");
            for m in &self.missed_questions {
                md.push_str(&format!("### {} ({}, {})\n\n", m.title, m.category, m.difficulty));
                md.push_str(&format!("- Your answer: {}\n", m.user_answer));
                md.push_str(&format!("- Correct answer: {}\n", m.correct_answer));
                if !m.explanation.is_empty() {
                    md.push_str(&format!("\n{}\n", m.explanation));
                }
                md.push('\n');
            }
        }

        if !self.weak_areas.is_empty() {
            md.push_str("## Weak Areas\n\n");
            for area in &self.weak_areas {
                md.push_str(&format!("- {area}\n"));
            }
            md.push('\n');
        }

        if !self.recommendations.is_empty() {
            md.push_str("## Recommended Practice\n\n");
            for r in &self.recommendations {
                md.push_str(&format!(
                    "- **{}** [{}] ({}): {}\n",
                    r.title, r.case_id, r.difficulty, r.reason
                ));
            }
        }

        md
    }
}
