use serde::{Deserialize, Serialize};

/// The solution-template frameworks a mentor can be asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    Swot,
    Budget,
    ActionPlan,
    Stakeholder,
    Timeline,
}

impl TemplateKind {
    pub const ALL: &'static [TemplateKind] = &[
        TemplateKind::Swot,
        TemplateKind::Budget,
        TemplateKind::ActionPlan,
        TemplateKind::Stakeholder,
        TemplateKind::Timeline,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Swot => "swot",
            TemplateKind::Budget => "budget",
            TemplateKind::ActionPlan => "action_plan",
            TemplateKind::Stakeholder => "stakeholder",
            TemplateKind::Timeline => "timeline",
        }
    }

    /// Display form, e.g. `ACTION PLAN` for prompts and `Action Plan` for
    /// report titles.
    pub fn upper_title(&self) -> String {
        self.as_str().to_uppercase().replace('_', " ")
    }

    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<String>>()
            .join(" ")
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
    }

    /// Pick the framework that best fits a subject description. Pure keyword
    /// matching; the first group with a hit wins and the default is an
    /// action plan.
    pub fn detect(subject: &str) -> Self {
        let lower = subject.to_lowercase();
        let groups: &[(TemplateKind, &[&str])] = &[
            (
                TemplateKind::Budget,
                &["budget", "cost", "funding", "money", "finance"],
            ),
            (
                TemplateKind::Stakeholder,
                &["stakeholder", "community", "people", "involve"],
            ),
            (
                TemplateKind::Timeline,
                &["timeline", "schedule", "when", "deadline"],
            ),
            (
                TemplateKind::Swot,
                &["strength", "weakness", "opportunity", "threat", "analyze"],
            ),
        ];

        for (kind, keywords) in groups {
            if keywords.iter().any(|keyword| lower.contains(keyword)) {
                return *kind;
            }
        }
        TemplateKind::ActionPlan
    }

    /// The framework body the prompt asks the model to fill in. Section
    /// headers are ALL-CAPS so the downstream outline parser can recover
    /// them.
    pub fn instruction(&self) -> &'static str {
        match self {
            TemplateKind::Swot => {
                "Generate a SWOT Analysis template:\n\n\
                 STRENGTHS:\n[Internal positive factors]\n\n\
                 WEAKNESSES:\n[Internal limitations]\n\n\
                 OPPORTUNITIES:\n[External favorable conditions]\n\n\
                 THREATS:\n[External challenges]\n\n\
                 STRATEGIC INSIGHTS:\n[Key takeaways and recommendations]"
            }
            TemplateKind::Budget => {
                "Generate a Budget Outline template:\n\n\
                 REVENUE/FUNDING SOURCES:\n[Expected income or funding]\n\n\
                 EXPENSES:\n- Personnel\n- Materials\n- Operations\n- Contingency\n\n\
                 BUDGET TIMELINE:\n[Phased allocation]\n\n\
                 COST-SAVING OPPORTUNITIES:\n[Ideas for efficiency]"
            }
            TemplateKind::ActionPlan => {
                "Generate an Action Plan template:\n\n\
                 OBJECTIVES:\n[Clear, measurable goals]\n\n\
                 ACTION ITEMS:\n[Step-by-step tasks with timeline]\n\n\
                 RESPONSIBLE PARTIES:\n[Who does what]\n\n\
                 RESOURCES NEEDED:\n[What's required]\n\n\
                 SUCCESS METRICS:\n[How to measure progress]\n\n\
                 RISK MITIGATION:\n[Potential challenges and solutions]"
            }
            TemplateKind::Stakeholder => {
                "Generate a Stakeholder Analysis template:\n\n\
                 KEY STAKEHOLDERS:\n[List of involved parties]\n\n\
                 STAKEHOLDER INTERESTS:\n[What each stakeholder cares about]\n\n\
                 INFLUENCE LEVEL:\n[High/Medium/Low for each]\n\n\
                 ENGAGEMENT STRATEGY:\n[How to involve each stakeholder]\n\n\
                 COMMUNICATION PLAN:\n[How and when to communicate]"
            }
            TemplateKind::Timeline => {
                "Generate a Project Timeline template:\n\n\
                 PHASES:\n[Major project phases]\n\n\
                 MILESTONES:\n[Key achievement points with dates]\n\n\
                 DEPENDENCIES:\n[What depends on what]\n\n\
                 CRITICAL PATH:\n[Most time-sensitive activities]\n\n\
                 BUFFER TIME:\n[Contingency periods]"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_budget_keywords() {
        assert_eq!(
            TemplateKind::detect("We need funding for the cleanup"),
            TemplateKind::Budget
        );
        assert_eq!(TemplateKind::detect("BUDGET review"), TemplateKind::Budget);
    }

    #[test]
    fn detect_defaults_to_action_plan() {
        assert_eq!(
            TemplateKind::detect("Potholes on the main road"),
            TemplateKind::ActionPlan
        );
    }

    #[test]
    fn detect_group_order_budget_before_stakeholder() {
        // "community funding" hits both groups; budget is checked first.
        assert_eq!(
            TemplateKind::detect("community funding drive"),
            TemplateKind::Budget
        );
    }

    #[test]
    fn parse_accepts_hyphen_and_case_variants() {
        assert_eq!(
            TemplateKind::parse("Action-Plan"),
            Some(TemplateKind::ActionPlan)
        );
        assert_eq!(TemplateKind::parse("swot"), Some(TemplateKind::Swot));
        assert_eq!(TemplateKind::parse("recipe"), None);
    }

    #[test]
    fn titles_render_from_kind_name() {
        assert_eq!(TemplateKind::ActionPlan.upper_title(), "ACTION PLAN");
        assert_eq!(TemplateKind::ActionPlan.title(), "Action Plan");
    }

    #[test]
    fn every_instruction_carries_upper_headers() {
        for kind in TemplateKind::ALL {
            let body = kind.instruction();
            assert!(
                body.lines()
                    .any(|line| line.ends_with(':') && line == line.to_uppercase()),
                "no outline header in {}",
                kind.as_str()
            );
        }
    }
}
