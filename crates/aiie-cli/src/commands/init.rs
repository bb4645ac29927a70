//! The `aiie init` command.

use std::path::Path;

use anyhow::{Context, Result};

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("aiie.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("case-banks").context("failed to create case-banks/")?;
    write_if_missing(Path::new("case-banks/sample.toml"), SAMPLE_CASE_BANK)?;

    std::fs::create_dir_all("attempts").context("failed to create attempts/")?;
    write_if_missing(Path::new("attempts/sample.json"), SAMPLE_ATTEMPT)?;

    println!("\nNext steps:");
    println!("  1. Run: aiie validate --cases case-banks/sample.toml");
    println!("  2. Run: aiie score --cases case-banks/sample.toml --case thunderclap-headache");
    println!("  3. Run: aiie grade --cases case-banks/sample.toml --attempt attempts/sample.json");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# aiie configuration

[engine]
baseline_score = 5.0
alternative_margin = 1.0

[assessment]
passing_score = 70
weak_area_threshold = 70
recommendations_per_category = 2
"#;

const SAMPLE_CASE_BANK: &str = r#"[case_bank]
id = "sample"
name = "Sample Imaging Cases"
description = "Starter cases covering headache and low back pain"

[[cases]]
id = "thunderclap-headache"
title = "Sudden severe headache in an older adult"
category = "Neuroradiology"
difficulty = "beginner"
explanation = "Thunderclap headache needs non-contrast CT first to exclude subarachnoid hemorrhage."
correct_options = ["ct"]

[cases.clinical]
age = 67
sex = "male"
chief_complaint = "sudden severe headache"
severity = "severe"
red_flags = ["thunderclap"]

[[cases.options]]
id = "ct"
label = "CT head without contrast"
modality = "ct-head-noncontrast"
name = "CT Head"
radiation_msv = 2.0
cost = 400.0

[[cases.options]]
id = "mri"
label = "MRI brain without contrast"
modality = "mri-brain-noncontrast"
name = "MRI Brain"
cost = 1200.0

[[cases.options]]
id = "cta"
label = "CT angiography of the head"
modality = "cta-head"
name = "CTA Head"
contrast = "with"
radiation_msv = 3.5
cost = 900.0

[[cases]]
id = "tension-headache"
title = "Recurrent bilateral headache, normal exam"
category = "Neuroradiology"
difficulty = "intermediate"
explanation = "Primary headache without red flags does not need imaging."
correct_options = ["none"]

[cases.clinical]
age = 29
sex = "female"
chief_complaint = "recurrent headache"
duration = "chronic"
severity = "mild"

[[cases.options]]
id = "ct"
label = "CT head without contrast"
modality = "ct-head-noncontrast"
name = "CT Head"
radiation_msv = 2.0
cost = 400.0

[[cases.options]]
id = "mri"
label = "MRI brain without contrast"
modality = "mri-brain-noncontrast"
name = "MRI Brain"
cost = 1200.0

[[cases.options]]
id = "none"
label = "No imaging"
modality = "no-imaging"

[[cases]]
id = "cauda-equina"
title = "Back pain with saddle anesthesia"
category = "Musculoskeletal"
difficulty = "intermediate"
explanation = "Suspected cauda equina syndrome requires urgent MRI."
correct_options = ["mri"]

[cases.clinical]
age = 48
sex = "male"
chief_complaint = "low back pain"
severity = "severe"
red_flags = ["cauda-equina"]

[[cases.options]]
id = "xr"
label = "Lumbar spine radiographs"
modality = "xr-lumbar"
name = "XR Lumbar Spine"
radiation_msv = 1.5
cost = 100.0

[[cases.options]]
id = "mri"
label = "MRI lumbar spine without contrast"
modality = "mri-lumbar-noncontrast"
name = "MRI Lumbar Spine"
cost = 1100.0

[[cases]]
id = "acute-back-pain"
title = "Acute mechanical low back pain"
category = "Musculoskeletal"
difficulty = "beginner"
explanation = "Uncomplicated acute low back pain is managed without imaging."
correct_options = ["none"]

[cases.clinical]
age = 35
sex = "female"
chief_complaint = "low back pain"

[[cases.options]]
id = "xr"
label = "Lumbar spine radiographs"
modality = "xr-lumbar"
name = "XR Lumbar Spine"
radiation_msv = 1.5
cost = 100.0

[[cases.options]]
id = "mri"
label = "MRI lumbar spine without contrast"
modality = "mri-lumbar-noncontrast"
name = "MRI Lumbar Spine"
cost = 1100.0

[[cases.options]]
id = "none"
label = "No imaging"
modality = "no-imaging"
"#;

const SAMPLE_ATTEMPT: &str = r#"{
  "assessment_id": "sample-quiz",
  "total_questions": 3,
  "responses": [
    { "case_id": "thunderclap-headache", "selected": ["ct"], "time_spent_secs": 42 },
    { "case_id": "tension-headache", "selected": ["mri"], "time_spent_secs": 65 },
    { "case_id": "acute-back-pain", "selected": ["none"], "time_spent_secs": 30 }
  ]
}
"#;
