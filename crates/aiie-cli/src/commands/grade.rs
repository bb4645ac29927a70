//! The `aiie grade` command.

use std::path::PathBuf;

use anyhow::Result;

use aiie_analytics::report::{AssessmentAttempt, AssessmentReport};

pub fn execute(
    cases_path: PathBuf,
    attempt_path: PathBuf,
    format: String,
    output: Option<PathBuf>,
    fail_on_fail: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = aiie_core::config::load_config_from(config_path.as_deref())?;
    let bank = aiie_core::parser::load_cases(&cases_path)?;
    let attempt = AssessmentAttempt::load(&attempt_path)?;

    let report = AssessmentReport::build(&attempt, &bank, &config.assessment);

    if let Some(path) = &output {
        report.save_json(path)?;
        eprintln!("Report saved to {}", path.display());
    }

    match format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        "markdown" | "md" => println!("{}", report.to_markdown()),
        _ => print_text(&report),
    }

    if fail_on_fail && !report.passed {
        std::process::exit(1);
    }

    Ok(())
}

fn print_text(report: &AssessmentReport) {
    use comfy_table::{Cell, Table};

    println!(
        "Assessment {}: {}% ({}, passing score {}%)",
        report.assessment_id,
        report.score,
        if report.passed { "PASSED" } else { "FAILED" },
        report.passing_score
    );
    println!(
        "Correct: {}/{} | Time: {}s total, {:.1}s average",
        report.correct_count, report.total_questions, report.total_time_secs, report.average_time_secs
    );

    if !report.category_breakdown.is_empty() || !report.difficulty_breakdown.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Group", "Correct", "Total", "%"]);
        for c in &report.category_breakdown {
            table.add_row(vec![
                Cell::new(&c.key),
                Cell::new(c.correct),
                Cell::new(c.total),
                Cell::new(format!("{}%", c.percentage)),
            ]);
        }
        for d in &report.difficulty_breakdown {
            table.add_row(vec![
                Cell::new(d.key),
                Cell::new(d.correct),
                Cell::new(d.total),
                Cell::new(format!("{}%", d.percentage)),
            ]);
        }
        println!("\n{table}");
    }

    if !report.missed_questions.is_empty() {
        println!("\nMissed questions:");
        for m in &report.missed_questions {
            println!("  {} [{}]", m.title, m.case_id);
            println!("    your answer:    {}", m.user_answer);
            println!("    correct answer: {}", m.correct_answer);
        }
    }

    if !report.weak_areas.is_empty() {
        println!("\nWeak areas:");
        for area in &report.weak_areas {
            println!("  - {area}");
        }
    }

    if !report.recommendations.is_empty() {
        println!("\nRecommended practice:");
        for r in &report.recommendations {
            println!("  {} [{}] ({})", r.title, r.case_id, r.difficulty);
        }
    }
}
