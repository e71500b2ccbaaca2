//! Prompt builders. Each builder is a pure function from structured inputs
//! to one prompt string, and each structured prompt has a paired
//! `SectionMap` describing the literal headers it instructs the model to
//! emit. The parser cannot discover headers on its own, so a builder and
//! its map must stay in lockstep: a header typo here silently drops that
//! field downstream.

mod templates;

pub use templates::TemplateKind;

use crate::sections::SectionMap;
use crate::taxonomy::ProblemTaxonomy;

/// How many transcript turns the interactive prompt replays.
const HISTORY_WINDOW: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentorMode {
    CriticalThinking,
    Solution,
}

impl MentorMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MentorMode::CriticalThinking => "critical_thinking",
            MentorMode::Solution => "solution",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical_thinking" | "critical-thinking" | "think" => {
                Some(MentorMode::CriticalThinking)
            }
            "solution" | "solve" => Some(MentorMode::Solution),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Mentor,
}

impl ChatRole {
    pub fn title(&self) -> &'static str {
        match self {
            ChatRole::User => "User",
            ChatRole::Mentor => "Mentor",
        }
    }
}

/// One transcript entry. The transcript itself is an append-only Vec owned
/// by the mentor service; nothing here persists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn mentor(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Mentor,
            content: content.into(),
        }
    }
}

/// Section map for mission-statement responses.
pub fn mission_sections() -> SectionMap {
    SectionMap::new()
        .section("mission_statement", &["MISSION STATEMENT:", "Mission Statement:"])
        .section(
            "problem_definition",
            &["PROBLEM DEFINITION:", "Problem Definition:"],
        )
        .section("goal", &["GOAL:", "Goal:"])
        .section("expected_impact", &["EXPECTED IMPACT:", "Expected Impact:"])
        .section("action_steps", &["ACTION STEPS:", "Action Steps:"])
}

/// Section map for Socratic guidance responses.
pub fn socratic_sections() -> SectionMap {
    SectionMap::new()
        .section("questions", &["GUIDING QUESTIONS:", "Guiding Questions:"])
        .section("reflections", &["REFLECTION PROMPTS:", "Reflection Prompts:"])
        .section("challenges", &["CHALLENGE POINTS:", "Challenge Points:"])
        .section("next_steps", &["NEXT STEPS:", "Next Steps:"])
}

/// Section map for vision detection responses.
pub fn detection_sections() -> SectionMap {
    SectionMap::new()
        .section("detected_issues", &["DETECTED ISSUES:", "Detected Issues:"])
        .section("visual_evidence", &["VISUAL EVIDENCE:", "Visual Evidence:"])
        .section(
            "recommendations",
            &["RECOMMENDATIONS:", "Recommendations:"],
        )
}

/// Section map for the trailing sections of a solution template response.
/// The template body itself is free-form per kind and is parsed with the
/// block-outline heuristic instead.
pub fn template_sections() -> SectionMap {
    SectionMap::new()
        .section("guide", &["IMPLEMENTATION GUIDE:", "Implementation Guide:"])
        .section("tips", &["PRACTICAL TIPS:", "Practical Tips:"])
}

pub fn classification_prompt(
    description: &str,
    taxonomy: &ProblemTaxonomy,
    use_reasoning: bool,
) -> String {
    let mut prompt = format!(
        "You are an expert classifier that categorizes community problems into {} domains: \n\
         {}. You provide accurate classifications with clear reasoning.\n\n\
         Classify the following community problem into ONE of these categories:\n\n\
         Categories and their scope:\n{}\n\n\
         Problem to classify:\n\"{}\"\n\n\
         Provide your response in this format:\n\n\
         PRIMARY CATEGORY: [Choose: {}]\n\
         CONFIDENCE: [High, Medium, or Low]\n",
        taxonomy.categories().len(),
        taxonomy.names().join(", "),
        category_descriptions(taxonomy),
        description,
        taxonomy.names().join(", "),
    );

    if use_reasoning {
        prompt.push_str("REASONING: [Explain why this category is most appropriate]\n");
    }

    prompt.push_str("\nChoose only ONE primary category, even if the problem touches multiple areas.");
    prompt
}

pub fn vision_classification_prompt(vision_analysis: &str, taxonomy: &ProblemTaxonomy) -> String {
    let category_lines = taxonomy
        .names()
        .iter()
        .map(|name| format!("- {name}"))
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        "You are an expert classifier that categorizes community problems into {} domains: \n\
         {}. You provide accurate classifications with clear reasoning.\n\n\
         Based on the following vision analysis of a community problem image, classify the \
         primary problem category:\n\n\
         Vision Analysis:\n{}\n\n\
         Classify the primary issue into one of these categories:\n{}\n\n\
         Provide:\n\
         1. PRIMARY CATEGORY: [Your classification]\n\
         2. CONFIDENCE: [High/Medium/Low]\n\
         3. REASONING: [Why this category fits best]\n\n\
         If multiple categories apply, choose the most dominant one.",
        taxonomy.categories().len(),
        taxonomy.names().join(", "),
        vision_analysis,
        category_lines,
    )
}

pub fn mission_prompt(description: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "You are an expert at converting community problems into actionable, \n\
         inspiring mission statements for learning projects. You create clear, motivating \
         statements that define the problem, the goal, and the expected impact.\n\n\
         Convert the following community problem description into a formalized, \
         project-oriented mission statement:\n\n\
         Problem Description: \"{description}\"\n"
    );

    if let Some(context) = context {
        prompt.push_str(&format!("\nAdditional Context: {context}\n"));
    }

    prompt.push_str(
        "\nPlease provide:\n\n\
         1. MISSION STATEMENT: A clear, inspiring statement (2-3 sentences) that:\n\
            - Defines the core problem\n\
            - States the goal/objective\n\
            - Highlights the expected community impact\n\n\
         2. PROBLEM DEFINITION: A precise definition of the issue (1-2 sentences)\n\n\
         3. GOAL: The specific, measurable outcome we're working toward\n\n\
         4. EXPECTED IMPACT: How this will benefit the community\n\n\
         5. ACTION STEPS: 3-5 key steps to address this problem\n\n\
         Format your response clearly with these headers.",
    );

    prompt
}

pub fn detection_prompt(taxonomy: &ProblemTaxonomy, domains: &[String]) -> String {
    let examples = domains
        .iter()
        .filter_map(|name| taxonomy.get(name))
        .map(|category| format!("- {}: {}, etc.", category.name, category.issue_sample(3)))
        .collect::<Vec<String>>()
        .join("\n");

    format!(
        "You are an AI assistant specialized in identifying community issues in images.\n\n\
         Analyze this image and identify any visible community problems in the following \
         domains:\n{}\n\n\
         For each domain, look for issues such as:\n{}\n\n\
         Please provide:\n\
         1. A list of all visible issues identified in the image\n\
         2. The domain category for each issue ({})\n\
         3. A brief description of each problem\n\
         4. The severity level (Low, Medium, High)\n\
         5. Specific visual evidence you observed\n\n\
         Format your response as:\n\n\
         DETECTED ISSUES:\n\
         [List each issue with its domain, description, and severity]\n\n\
         VISUAL EVIDENCE:\n\
         [Describe what you see that indicates these problems]\n\n\
         RECOMMENDATIONS:\n\
         [Brief suggestions for addressing the issues]\n\n\
         Be specific and objective in your analysis.",
        domains.join(", "),
        examples,
        domains.join(" or "),
    )
}

pub fn critical_thinking_prompt(problem: &str, context: Option<&str>) -> String {
    let mut prompt = format!(
        "You are a Socratic mentor who guides learners through critical thinking and \
         reflection.\n\
         Your role is to ask thought-provoking questions rather than give direct answers.\n\n\
         Problem/Topic: {problem}\n"
    );

    if let Some(context) = context {
        prompt.push_str(&format!("\nContext: {context}\n"));
    }

    prompt.push_str(
        "\nGenerate Socratic guidance in this format:\n\n\
         GUIDING QUESTIONS:\n\
         [3-5 open-ended questions that help the learner explore the problem deeply]\n\n\
         REFLECTION PROMPTS:\n\
         [2-3 prompts that encourage self-reflection and analysis]\n\n\
         CHALLENGE POINTS:\n\
         [2-3 challenging perspectives or assumptions to examine]\n\n\
         NEXT STEPS:\n\
         [Suggested thinking exercises or exploration activities]\n\n\
         Remember: Ask questions, don't provide solutions. Guide discovery through inquiry.",
    );

    prompt
}

pub fn solution_template_prompt(
    problem: &str,
    kind: TemplateKind,
    category: Option<&str>,
) -> String {
    let mut prompt = format!(
        "You are a solution-oriented mentor helping create practical frameworks.\n\n\
         Problem: {problem}\n"
    );

    if let Some(category) = category {
        prompt.push_str(&format!("Category: {category}\n"));
    }

    prompt.push_str(&format!(
        "\nTemplate Type: {}\n\n\
         {}\n\n\
         IMPLEMENTATION GUIDE:\n\
         [Step-by-step guide to use this template]\n\n\
         PRACTICAL TIPS:\n\
         [3-5 actionable tips for success]\n\n\
         Tailor all sections specifically to the problem described above.",
        kind.upper_title(),
        kind.instruction(),
    ));

    prompt
}

/// Transcript-aware prompt for one interactive mentoring turn. Only the
/// last few turns are replayed; the external service is stateless.
pub fn interactive_prompt(history: &[ChatTurn], message: &str, mode: MentorMode) -> String {
    let system_role = match mode {
        MentorMode::CriticalThinking => {
            "You are a Socratic mentor. Continue guiding through questions.\n\
             Ask probing questions, encourage reflection, challenge assumptions."
        }
        MentorMode::Solution => {
            "You are a solution-focused mentor. Provide practical frameworks,\n\
             actionable advice, and concrete next steps."
        }
    };

    let mut history_block = String::new();
    if !history.is_empty() {
        history_block.push_str("\nConversation history:\n");
        let skip = history.len().saturating_sub(HISTORY_WINDOW);
        for turn in &history[skip..] {
            history_block.push_str(&format!("{}: {}\n", turn.role.title(), turn.content));
        }
    }

    format!("{system_role}\n{history_block}\nUser: {message}\n\nMentor response:")
}

fn category_descriptions(taxonomy: &ProblemTaxonomy) -> String {
    taxonomy
        .categories()
        .iter()
        .map(|category| {
            format!(
                "- {}: Issues related to {}, and similar concerns",
                category.name,
                category.issue_sample(3)
            )
        })
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::extract_sections;

    fn taxonomy() -> ProblemTaxonomy {
        ProblemTaxonomy::default()
    }

    /// Every header a section map declares as its canonical (first) variant
    /// must appear literally in the paired prompt.
    fn assert_headers_embedded(prompt: &str, map: &SectionMap) {
        for (key, headers) in map.iter() {
            let canonical = headers.first().map(String::as_str).unwrap_or_default();
            assert!(
                prompt.contains(canonical),
                "prompt is missing header {canonical:?} for section {key:?}"
            );
        }
    }

    #[test]
    fn mission_prompt_headers_match_section_map() {
        let prompt = mission_prompt("Flooding on Main Street", None);
        assert_headers_embedded(&prompt, &mission_sections());
    }

    #[test]
    fn socratic_prompt_headers_match_section_map() {
        let prompt = critical_thinking_prompt("Why do floods recur?", Some("river town"));
        assert_headers_embedded(&prompt, &socratic_sections());
        assert!(prompt.contains("Context: river town"));
    }

    #[test]
    fn detection_prompt_headers_match_section_map() {
        let taxonomy = taxonomy();
        let prompt = detection_prompt(&taxonomy, &taxonomy.names());
        assert_headers_embedded(&prompt, &detection_sections());
        assert!(prompt.contains("littered streets"));
    }

    #[test]
    fn template_prompt_headers_match_section_map() {
        for kind in TemplateKind::ALL {
            let prompt = solution_template_prompt("Fix the park", *kind, Some("Environment"));
            assert_headers_embedded(&prompt, &template_sections());
            assert!(prompt.contains(&kind.upper_title()));
        }
    }

    #[test]
    fn classification_prompt_reasoning_is_optional() {
        let with = classification_prompt("Trash everywhere", &taxonomy(), true);
        let without = classification_prompt("Trash everywhere", &taxonomy(), false);
        assert!(with.contains("REASONING:"));
        assert!(!without.contains("REASONING:"));
        assert!(without.contains("PRIMARY CATEGORY:"));
    }

    #[test]
    fn interactive_prompt_replays_only_recent_turns() {
        let mut history = Vec::new();
        for idx in 0..6 {
            history.push(ChatTurn::user(format!("question {idx}")));
        }
        let prompt = interactive_prompt(&history, "latest", MentorMode::CriticalThinking);
        assert!(!prompt.contains("question 0"));
        assert!(!prompt.contains("question 1"));
        assert!(prompt.contains("question 5"));
        assert!(prompt.ends_with("Mentor response:"));
    }

    #[test]
    fn interactive_prompt_mode_changes_role() {
        let solution = interactive_prompt(&[], "help", MentorMode::Solution);
        assert!(solution.contains("solution-focused"));
        let socratic = interactive_prompt(&[], "help", MentorMode::CriticalThinking);
        assert!(socratic.contains("Socratic"));
    }

    #[test]
    fn mission_prompt_round_trips_through_parser() {
        // The format block in the prompt itself contains the headers, so
        // parsing the prompt must find every declared key. This guards the
        // builder/map contract end to end.
        let prompt = mission_prompt("x", None);
        let parsed = extract_sections(&prompt, &mission_sections());
        assert_eq!(parsed.len(), 5);
    }
}
