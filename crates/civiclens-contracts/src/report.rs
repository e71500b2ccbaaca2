//! Plain-text and markdown report rendering. Reports are the user-facing
//! artifact of an analysis session and are written next to `events.jsonl`.

use std::path::Path;

use anyhow::Context;

use crate::briefs::{MissionBrief, SolutionTemplate};
use crate::classify::Classification;

const RULE_WIDTH: usize = 70;
const ANALYSIS_PREVIEW_CHARS: usize = 500;

pub fn render_image_summary(
    analysis: &str,
    classification: &Classification,
    mission: &MissionBrief,
) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    format!(
        "\n{heavy}\n\
         {}\n\
         {heavy}\n\n\
         VISION ANALYSIS:\n{light}\n{}\n\n\
         CLASSIFICATION:\n{light}\n\
         Category: {}\n\
         Confidence: {}\n\n\
         MISSION STATEMENT:\n{light}\n{}\n\n\
         PROBLEM DEFINITION:\n{}\n\n\
         EXPECTED IMPACT:\n{}\n\n\
         {heavy}\n",
        center("COMMUNITY ISSUE ANALYSIS SUMMARY"),
        preview(analysis),
        classification.category,
        classification.confidence.as_str(),
        placeholder(&mission.mission_statement),
        placeholder(&mission.problem_definition),
        placeholder(&mission.expected_impact),
    )
}

pub fn render_text_summary(
    description: &str,
    classification: &Classification,
    mission: &MissionBrief,
) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);

    let mut summary = format!(
        "\n{heavy}\n\
         {}\n\
         {heavy}\n\n\
         ORIGINAL DESCRIPTION:\n{light}\n{description}\n\n\
         CLASSIFICATION:\n{light}\n\
         Category: {}\n\
         Confidence: {}\n\
         Reasoning: {}\n\n\
         MISSION STATEMENT:\n{light}\n{}\n\n\
         EXPECTED IMPACT:\n{}\n\n\
         ACTION STEPS:\n{light}\n",
        center("PROBLEM ANALYSIS SUMMARY"),
        classification.category,
        classification.confidence.as_str(),
        truncate_chars(&classification.reasoning, 200),
        placeholder(&mission.mission_statement),
        placeholder(&mission.expected_impact),
    );

    for (idx, step) in mission.action_steps.iter().enumerate() {
        summary.push_str(&format!("{}. {step}\n", idx + 1));
    }
    summary.push_str(&format!("\n{heavy}\n"));
    summary
}

pub fn render_template_markdown(template: &SolutionTemplate) -> String {
    let mut doc = format!("# {} Template\n\n## Problem\n{}\n", template.kind.title(), template.problem);

    for (section, rows) in &template.outline {
        doc.push_str(&format!("\n### {section}\n"));
        for row in rows {
            if row.starts_with('-') {
                doc.push_str(&format!("{row}\n"));
            } else {
                doc.push_str(&format!("- {row}\n"));
            }
        }
    }

    if !template.implementation_guide.is_empty() {
        doc.push_str(&format!(
            "\n## Implementation Guide\n{}\n",
            template.implementation_guide
        ));
    }

    if !template.tips.is_empty() {
        doc.push_str("\n## Tips\n");
        for tip in &template.tips {
            doc.push_str(&format!("- {tip}\n"));
        }
    }

    doc
}

pub fn write_report(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

fn center(title: &str) -> String {
    format!("{title:^width$}", width = RULE_WIDTH)
}

fn placeholder(value: &str) -> &str {
    if value.trim().is_empty() {
        "N/A"
    } else {
        value
    }
}

fn preview(analysis: &str) -> String {
    if analysis.chars().count() <= ANALYSIS_PREVIEW_CHARS {
        return analysis.to_string();
    }
    truncate_chars(analysis, ANALYSIS_PREVIEW_CHARS) + "..."
}

fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
