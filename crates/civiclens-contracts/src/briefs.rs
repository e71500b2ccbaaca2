//! Parsed analysis artifacts. Constructors take the raw response text and
//! never fail: absent sections degrade to empty fields, and the raw text is
//! always kept alongside the parsed view.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::prompts::{mission_sections, socratic_sections, template_sections, TemplateKind};
use crate::sections::{extract_block_outline, extract_list_items, extract_sections};

const EXCERPT_FALLBACK_CHARS: usize = 200;
const EXCERPT_LINES: usize = 3;

/// A formalized mission statement derived from a problem description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionBrief {
    pub original_description: String,
    pub mission_statement: String,
    pub problem_definition: String,
    pub goal: String,
    pub expected_impact: String,
    pub action_steps: Vec<String>,
    pub full_response: String,
}

impl MissionBrief {
    pub fn from_response(description: &str, response: &str) -> Self {
        let parsed = extract_sections(response, &mission_sections());
        let field = |key: &str| parsed.get(key).cloned().unwrap_or_default();

        Self {
            original_description: description.to_string(),
            // When the model ignored the requested structure, the whole
            // reply is still a usable statement.
            mission_statement: parsed
                .get("mission_statement")
                .cloned()
                .unwrap_or_else(|| response.trim().to_string()),
            problem_definition: field("problem_definition"),
            goal: field("goal"),
            expected_impact: field("expected_impact"),
            action_steps: parsed
                .get("action_steps")
                .map(|content| extract_list_items(content))
                .unwrap_or_default(),
            full_response: response.to_string(),
        }
    }
}

/// Socratic guidance: questions to sit with, not answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocraticGuidance {
    pub problem: String,
    pub guiding_questions: Vec<String>,
    pub reflection_prompts: Vec<String>,
    pub challenge_points: Vec<String>,
    pub next_steps: Vec<String>,
    pub full_response: String,
}

impl SocraticGuidance {
    pub fn from_response(problem: &str, response: &str) -> Self {
        let parsed = extract_sections(response, &socratic_sections());
        let items = |key: &str| {
            parsed
                .get(key)
                .map(|content| extract_list_items(content))
                .unwrap_or_default()
        };

        Self {
            problem: problem.to_string(),
            guiding_questions: items("questions"),
            reflection_prompts: items("reflections"),
            challenge_points: items("challenges"),
            next_steps: items("next_steps"),
            full_response: response.to_string(),
        }
    }
}

/// A filled-in solution framework plus its usage guide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolutionTemplate {
    pub kind: TemplateKind,
    pub problem: String,
    pub outline: IndexMap<String, Vec<String>>,
    pub implementation_guide: String,
    pub tips: Vec<String>,
    pub full_response: String,
}

impl SolutionTemplate {
    pub fn from_response(kind: TemplateKind, problem: &str, response: &str) -> Self {
        let sections = template_sections();
        let guide_start = sections
            .headers("guide")
            .iter()
            .find_map(|header| response.find(header.as_str()));

        let (body, trailer) = match guide_start {
            Some(idx) => response.split_at(idx),
            None => (response, ""),
        };
        let parsed = extract_sections(trailer, &sections);

        Self {
            kind,
            problem: problem.to_string(),
            outline: extract_block_outline(body),
            implementation_guide: parsed.get("guide").cloned().unwrap_or_default(),
            tips: parsed
                .get("tips")
                .map(|content| extract_list_items(content))
                .unwrap_or_default(),
            full_response: response.to_string(),
        }
    }
}

/// Raw vision analysis of one image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionReport {
    pub analysis: String,
    pub domains_analyzed: Vec<String>,
}

/// Pull a short problem description out of a detection analysis for the
/// mission-generation step: the first few content lines after the
/// `DETECTED ISSUES:` marker, else a leading slice of the whole analysis.
pub fn extract_problem_excerpt(analysis: &str) -> String {
    if let Some(start) = analysis.find("DETECTED ISSUES:") {
        let tail = &analysis[start..];
        let end = tail
            .find("VISUAL EVIDENCE:")
            .or_else(|| tail.find("RECOMMENDATIONS:"))
            .unwrap_or(tail.len());
        let lines: Vec<&str> = tail[..end]
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with("DETECTED"))
            .take(EXCERPT_LINES)
            .collect();
        if !lines.is_empty() {
            return lines.join(" ");
        }
        return leading_chars(analysis, EXCERPT_FALLBACK_CHARS);
    }

    leading_chars(analysis, EXCERPT_FALLBACK_CHARS)
}

fn leading_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MISSION_RESPONSE: &str = "MISSION STATEMENT:\n\
Reduce flooding on Main Street.\n\
PROBLEM DEFINITION:\n\
Poor drainage causes recurring floods.\n\
ACTION STEPS:\n\
1. Survey drains\n\
2. File repair request\n";

    #[test]
    fn mission_brief_parses_structured_response() {
        let brief = MissionBrief::from_response("Main St floods", MISSION_RESPONSE);
        assert_eq!(brief.mission_statement, "Reduce flooding on Main Street.");
        assert_eq!(
            brief.problem_definition,
            "Poor drainage causes recurring floods."
        );
        assert_eq!(
            brief.action_steps,
            vec!["Survey drains", "File repair request"]
        );
        assert_eq!(brief.goal, "");
        assert_eq!(brief.expected_impact, "");
        assert_eq!(brief.full_response, MISSION_RESPONSE);
    }

    #[test]
    fn mission_statement_falls_back_to_full_response() {
        let brief = MissionBrief::from_response("x", "Just do something about the floods.");
        assert_eq!(
            brief.mission_statement,
            "Just do something about the floods."
        );
        assert!(brief.action_steps.is_empty());
    }

    #[test]
    fn socratic_guidance_collects_lists() {
        let response = "GUIDING QUESTIONS:\n- Why here?\n- Why now?\n\
REFLECTION PROMPTS:\n1. What changed?\n\
NEXT STEPS:\n• Walk the street\n";
        let guidance = SocraticGuidance::from_response("floods", response);
        assert_eq!(guidance.guiding_questions, vec!["Why here?", "Why now?"]);
        assert_eq!(guidance.reflection_prompts, vec!["What changed?"]);
        assert!(guidance.challenge_points.is_empty());
        assert_eq!(guidance.next_steps, vec!["Walk the street"]);
    }

    #[test]
    fn solution_template_splits_body_guide_and_tips() {
        let response = "OBJECTIVES:\n- Clear the drains\n\n\
ACTION ITEMS:\n- Survey\n- Repair\n\n\
IMPLEMENTATION GUIDE:\nStart with the survey.\n\n\
PRACTICAL TIPS:\n1. Work with the council\n2. Photograph everything\n";
        let template =
            SolutionTemplate::from_response(TemplateKind::ActionPlan, "drains", response);
        assert_eq!(template.outline["OBJECTIVES"], vec!["- Clear the drains"]);
        assert_eq!(template.outline["ACTION ITEMS"], vec!["- Survey", "- Repair"]);
        assert_eq!(template.implementation_guide, "Start with the survey.");
        assert_eq!(
            template.tips,
            vec!["Work with the council", "Photograph everything"]
        );
    }

    #[test]
    fn solution_template_without_guide_header_keeps_outline() {
        let response = "OBJECTIVES:\nDo the work.\n";
        let template = SolutionTemplate::from_response(TemplateKind::ActionPlan, "x", response);
        assert_eq!(template.outline["OBJECTIVES"], vec!["Do the work."]);
        assert_eq!(template.implementation_guide, "");
        assert!(template.tips.is_empty());
    }

    #[test]
    fn excerpt_prefers_detected_issues_lines() {
        let analysis = "DETECTED ISSUES:\n\
- Blocked drain, Environment, High\n\
- Standing water, Health, Medium\n\
- Litter, Environment, Low\n\
- A fourth issue\n\
VISUAL EVIDENCE:\nMurky water.";
        let excerpt = extract_problem_excerpt(analysis);
        assert_eq!(
            excerpt,
            "- Blocked drain, Environment, High - Standing water, Health, Medium - Litter, Environment, Low"
        );
        assert!(!excerpt.contains("fourth"));
    }

    #[test]
    fn excerpt_falls_back_to_leading_characters() {
        let analysis = "a".repeat(300);
        let excerpt = extract_problem_excerpt(&analysis);
        assert_eq!(excerpt.chars().count(), 200);
    }
}
