/// One problem category and the example issues prompt builders cite for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySpec {
    pub name: String,
    pub example_issues: Vec<String>,
}

impl CategorySpec {
    pub fn new(name: &str, example_issues: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            example_issues: example_issues
                .iter()
                .map(|issue| (*issue).to_string())
                .collect(),
        }
    }

    /// Short comma-joined sample of this category's issues, used in prompts.
    pub fn issue_sample(&self, limit: usize) -> String {
        self.example_issues
            .iter()
            .take(limit)
            .cloned()
            .collect::<Vec<String>>()
            .join(", ")
    }
}

/// Ordered category list. The first entry doubles as the classification
/// fallback when a response names no known category.
#[derive(Debug, Clone)]
pub struct ProblemTaxonomy {
    categories: Vec<CategorySpec>,
}

impl ProblemTaxonomy {
    pub fn new(categories: Option<Vec<CategorySpec>>) -> Self {
        Self {
            categories: categories.unwrap_or_else(default_categories),
        }
    }

    pub fn categories(&self) -> &[CategorySpec] {
        &self.categories
    }

    pub fn names(&self) -> Vec<String> {
        self.categories
            .iter()
            .map(|category| category.name.clone())
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&CategorySpec> {
        self.categories
            .iter()
            .find(|category| category.name.eq_ignore_ascii_case(name))
    }

    pub fn fallback(&self) -> Option<&str> {
        self.categories
            .first()
            .map(|category| category.name.as_str())
    }
}

impl Default for ProblemTaxonomy {
    fn default() -> Self {
        Self::new(None)
    }
}

fn default_categories() -> Vec<CategorySpec> {
    vec![
        CategorySpec::new(
            "Environment",
            &[
                "littered streets",
                "blocked drainage",
                "deforestation",
                "poor waste disposal",
                "pollution",
                "illegal dumping",
            ],
        ),
        CategorySpec::new(
            "Health",
            &[
                "overcrowded clinics",
                "absence of safety gear",
                "unsanitary public spaces",
                "poor hygiene",
                "medical waste disposal",
                "lack of healthcare facilities",
            ],
        ),
        CategorySpec::new(
            "Education",
            &[
                "overcrowded classrooms",
                "damaged school infrastructure",
                "lack of learning materials",
                "poor facilities",
                "inadequate resources",
                "unsafe school environment",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_taxonomy_order_and_fallback() {
        let taxonomy = ProblemTaxonomy::default();
        assert_eq!(taxonomy.names(), vec!["Environment", "Health", "Education"]);
        assert_eq!(taxonomy.fallback(), Some("Environment"));
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let taxonomy = ProblemTaxonomy::default();
        assert!(taxonomy.get("health").is_some());
        assert!(taxonomy.get("Folklore").is_none());
    }

    #[test]
    fn issue_sample_truncates() {
        let taxonomy = ProblemTaxonomy::default();
        let sample = taxonomy.get("Environment").unwrap().issue_sample(3);
        assert_eq!(sample, "littered streets, blocked drainage, deforestation");
    }
}
