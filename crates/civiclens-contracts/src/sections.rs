use indexmap::IndexMap;

/// Bullet markers stripped from the start of list lines.
const BULLET_MARKERS: &[char] = &['•', '-', '–', '—', '*', '►', '▪', '▫'];

/// The literal headers a parser call expects to find, keyed by section
/// label. Declared once per call; candidate order and section order are
/// both significant, so the map is insertion-ordered.
#[derive(Debug, Clone, Default)]
pub struct SectionMap {
    sections: IndexMap<String, Vec<String>>,
}

impl SectionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a section with its candidate header strings, tried in order.
    pub fn section(mut self, key: &str, headers: &[&str]) -> Self {
        self.sections.insert(
            key.to_string(),
            headers.iter().map(|header| (*header).to_string()).collect(),
        );
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn headers(&self, key: &str) -> &[String] {
        self.sections
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.sections
            .iter()
            .map(|(key, headers)| (key.as_str(), headers.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

pub type ParsedSections = IndexMap<String, String>;

/// Best-effort section extraction from free-form model output.
///
/// For each declared key the candidate headers are tried in order and the
/// first case-sensitive substring match wins. Content runs from the end of
/// the matched header to the earliest occurrence of any OTHER key's header
/// after it, else to end of text. Keys with no matching header are simply
/// absent from the result.
///
/// A header literal that happens to occur inside unrelated body text will
/// truncate the preceding section. The upstream text has no guaranteed
/// structure, so this stays a substring heuristic; callers must treat every
/// key as optional.
pub fn extract_sections(text: &str, map: &SectionMap) -> ParsedSections {
    let mut parsed = ParsedSections::new();

    for (key, headers) in map.iter() {
        let Some((header, start)) = headers
            .iter()
            .find_map(|header| text.find(header.as_str()).map(|idx| (header, idx)))
        else {
            continue;
        };

        let rest = &text[start + header.len()..];
        let mut end = rest.len();
        for (other_key, other_headers) in map.iter() {
            if other_key == key {
                continue;
            }
            for other in other_headers {
                if let Some(idx) = rest.find(other.as_str()) {
                    if idx < end {
                        end = idx;
                    }
                }
            }
        }

        parsed.insert(key.to_string(), rest[..end].trim().to_string());
    }

    parsed
}

/// Split free text into list items: blank lines dropped, leading bullet
/// markers stripped, and a leading `N.` numbering prefix (digit first, `.`
/// within the first three characters) removed. Source order is preserved.
pub fn extract_list_items(text: &str) -> Vec<String> {
    let mut items = Vec::new();

    for raw in text.lines() {
        let mut line = raw.trim();
        if line.is_empty() {
            continue;
        }
        line = line.trim_start_matches(BULLET_MARKERS).trim();

        let numbered = line.chars().next().is_some_and(|ch| ch.is_ascii_digit())
            && line.chars().take(3).any(|ch| ch == '.');
        let item = if numbered {
            line.split_once('.')
                .map(|(_, tail)| tail.trim())
                .unwrap_or(line)
        } else {
            line
        };

        if !item.is_empty() {
            items.push(item.to_string());
        }
    }

    items
}

/// Parse an outline where ALL-CAPS lines ending in a colon open a section
/// and the non-blank lines below accumulate under it. Used for solution
/// template bodies, whose section names vary by template kind.
pub fn extract_block_outline(text: &str) -> IndexMap<String, Vec<String>> {
    let mut outline: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut current: Option<String> = None;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if line.contains(':') && is_upper(line) {
            let key = line.replace(':', "").trim().to_string();
            outline.insert(key.clone(), Vec::new());
            current = Some(key);
        } else if let Some(key) = current.as_ref() {
            if let Some(rows) = outline.get_mut(key) {
                rows.push(line.to_string());
            }
        }
    }

    outline
}

// At least one cased character, none of them lowercase.
fn is_upper(line: &str) -> bool {
    line.chars().any(char::is_alphabetic) && !line.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_section_map() -> SectionMap {
        SectionMap::new()
            .section("goal", &["GOAL:", "Goal:"])
            .section("impact", &["EXPECTED IMPACT:", "Expected Impact:"])
    }

    #[test]
    fn extracts_content_between_headers() {
        let text = "GOAL:\n  Fix the drainage.  \n\nEXPECTED IMPACT:\nFewer floods.";
        let parsed = extract_sections(text, &two_section_map());
        assert_eq!(parsed["goal"], "Fix the drainage.");
        assert_eq!(parsed["impact"], "Fewer floods.");
    }

    #[test]
    fn whitespace_between_header_and_content_is_trimmed() {
        let tight = extract_sections("GOAL:Fix it.EXPECTED IMPACT:Less mess.", &two_section_map());
        let loose = extract_sections(
            "GOAL:\n\n   Fix it.\n\nEXPECTED IMPACT:\n\nLess mess.",
            &two_section_map(),
        );
        assert_eq!(tight["goal"], loose["goal"]);
    }

    #[test]
    fn missing_headers_are_omitted() {
        let parsed = extract_sections("GOAL: Fix it.", &two_section_map());
        assert_eq!(parsed.get("goal").map(String::as_str), Some("Fix it."));
        assert!(!parsed.contains_key("impact"));
    }

    #[test]
    fn no_declared_headers_yields_empty_mapping() {
        let parsed = extract_sections("Nothing structured here at all.", &two_section_map());
        assert!(parsed.is_empty());
    }

    #[test]
    fn header_matching_is_case_sensitive_with_fallback_variants() {
        let parsed = extract_sections("Goal: Title case only.", &two_section_map());
        assert_eq!(parsed["goal"], "Title case only.");
        assert!(extract_sections("goal: lower case.", &two_section_map()).is_empty());
    }

    #[test]
    fn nearest_other_header_wins_even_out_of_declared_order() {
        // Impact appears before goal in the text; goal content still stops
        // at the impact header.
        let text = "EXPECTED IMPACT:\nBig.\nGOAL:\nSmall.";
        let parsed = extract_sections(text, &two_section_map());
        assert_eq!(parsed["impact"], "Big.");
        assert_eq!(parsed["goal"], "Small.");
    }

    #[test]
    fn header_literal_in_body_text_truncates_section() {
        // Documented heuristic limitation, pinned on purpose.
        let text = "GOAL:\nExplain what EXPECTED IMPACT: means to residents.";
        let parsed = extract_sections(text, &two_section_map());
        assert_eq!(parsed["goal"], "Explain what");
    }

    #[test]
    fn list_items_strip_bullets_and_numbering() {
        assert_eq!(extract_list_items("- Do the thing"), vec!["Do the thing"]);
        assert_eq!(extract_list_items("2. Second step"), vec!["Second step"]);
        assert_eq!(extract_list_items("• Bullet"), vec!["Bullet"]);
        assert_eq!(extract_list_items("► Arrow item"), vec!["Arrow item"]);
        assert!(extract_list_items("   ").is_empty());
    }

    #[test]
    fn list_items_preserve_order_and_drop_blanks() {
        let text = "1. Survey drains\n\n2. File repair request\n- Follow up";
        assert_eq!(
            extract_list_items(text),
            vec!["Survey drains", "File repair request", "Follow up"]
        );
    }

    #[test]
    fn numbering_outside_first_three_chars_is_kept() {
        assert_eq!(
            extract_list_items("2024 report. Published."),
            vec!["2024 report. Published."]
        );
    }

    #[test]
    fn list_extraction_is_idempotent() {
        let text = "1. Survey drains\n• File repair request\n—  Follow up\n\n3.Check results";
        let once = extract_list_items(text);
        let twice = extract_list_items(&once.join("\n"));
        assert_eq!(once, twice);
    }

    #[test]
    fn block_outline_groups_lines_under_upper_headers() {
        let text = "STRENGTHS:\n- Local volunteers\n- Town support\n\nWEAKNESSES:\nNo funding yet.\nTrailing note.";
        let outline = extract_block_outline(text);
        assert_eq!(
            outline["STRENGTHS"],
            vec!["- Local volunteers", "- Town support"]
        );
        assert_eq!(outline["WEAKNESSES"], vec!["No funding yet.", "Trailing note."]);
    }

    #[test]
    fn block_outline_ignores_leading_prose() {
        let outline = extract_block_outline("Here is your analysis.\nPHASES:\nPhase one.");
        assert_eq!(outline.len(), 1);
        assert_eq!(outline["PHASES"], vec!["Phase one."]);
    }
}
