use serde::{Deserialize, Serialize};

/// Keyword groups scanned, in order, to estimate classifier confidence.
const CONFIDENCE_KEYWORDS: &[(Confidence, &[&str])] = &[
    (
        Confidence::High,
        &["high", "very confident", "definitely", "clearly"],
    ),
    (
        Confidence::Medium,
        &["medium", "moderate", "fairly", "somewhat"],
    ),
    (Confidence::Low, &["low", "uncertain", "possibly", "might"]),
];

const REASONING_MARKERS: &[&str] = &["REASONING:", "Reasoning:", "because", "Because"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
    Unknown,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
            Confidence::Low => "Low",
            Confidence::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: String,
    pub confidence: Confidence,
    pub reasoning: String,
}

/// Heuristic classification over unstructured response text. Not a model:
/// category is a substring search, confidence is keyword presence, reasoning
/// is everything from the first reasoning marker onward. Never fails; with
/// no usable signal it falls back to the first known category.
pub fn parse_classification(response: &str, categories: &[String]) -> Classification {
    let response_lower = response.to_lowercase();

    let mut category = categories
        .iter()
        .find(|name| response_lower.contains(&name.to_lowercase()))
        .cloned();

    if category.is_none() {
        for line in response.lines() {
            if !line.to_uppercase().contains("CATEGORY:") {
                continue;
            }
            let line_lower = line.to_lowercase();
            if let Some(found) = categories
                .iter()
                .find(|name| line_lower.contains(&name.to_lowercase()))
            {
                category = Some(found.clone());
                break;
            }
        }
    }

    let category = category
        .or_else(|| categories.first().cloned())
        .unwrap_or_default();

    let confidence = CONFIDENCE_KEYWORDS
        .iter()
        .find(|(_, keywords)| {
            keywords
                .iter()
                .any(|keyword| response_lower.contains(keyword))
        })
        .map(|(level, _)| *level)
        .unwrap_or(Confidence::Unknown);

    let reasoning = REASONING_MARKERS
        .iter()
        .find_map(|marker| {
            response
                .find(marker)
                .map(|idx| response[idx..].trim().to_string())
        })
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| response.to_string());

    Classification {
        category,
        confidence,
        reasoning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories() -> Vec<String> {
        vec![
            "Environment".to_string(),
            "Health".to_string(),
            "Education".to_string(),
        ]
    }

    #[test]
    fn category_found_anywhere_in_response() {
        let parsed = parse_classification(
            "The scene clearly shows an environment problem.",
            &categories(),
        );
        assert_eq!(parsed.category, "Environment");
        assert_eq!(parsed.confidence, Confidence::High);
    }

    #[test]
    fn category_in_structured_line_is_found() {
        let response = "Looking at the photo I lean toward schooling issues.\nPRIMARY CATEGORY: Education";
        let parsed = parse_classification(response, &categories());
        assert_eq!(parsed.category, "Education");
    }

    #[test]
    fn defaults_to_first_category_when_nothing_matches() {
        let parsed = parse_classification("No usable signal here.", &categories());
        assert_eq!(parsed.category, "Environment");
        assert_eq!(parsed.confidence, Confidence::Unknown);
    }

    #[test]
    fn confidence_groups_scan_in_order() {
        let parsed = parse_classification(
            "Education issue. Confidence is moderate, possibly low.",
            &categories(),
        );
        assert_eq!(parsed.confidence, Confidence::Medium);
    }

    #[test]
    fn reasoning_starts_at_first_marker() {
        let response = "PRIMARY CATEGORY: Health\nREASONING: Clinics are overcrowded.";
        let parsed = parse_classification(response, &categories());
        assert_eq!(parsed.reasoning, "REASONING: Clinics are overcrowded.");
    }

    #[test]
    fn reasoning_falls_back_to_full_response() {
        let response = "Health. No structure at all.";
        let parsed = parse_classification(response, &categories());
        assert_eq!(parsed.reasoning, response);
    }
}
