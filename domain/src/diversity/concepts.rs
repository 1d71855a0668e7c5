//! Concept extraction for diversity analysis.
//!
//! A response's concepts are the fixed topic categories whose patterns
//! match, plus multi-word capitalized phrases (proper nouns, product names).

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static CATEGORIES: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        (
            "technology",
            r"(?i)\b(software|algorithm|database|server|network|compiler|api|code|programming|hardware)\b",
        ),
        (
            "science",
            r"(?i)\b(experiment|hypothesis|theory|physics|chemistry|biology|molecule|energy|research)\b",
        ),
        (
            "health",
            r"(?i)\b(health|medical|disease|symptom|treatment|doctor|patient|diet|exercise)\b",
        ),
        (
            "finance",
            r"(?i)\b(money|cost|price|budget|invest\w*|market|revenue|profit|tax)\b",
        ),
        (
            "business",
            r"(?i)\b(company|customer|strategy|management|product|team|business|sales)\b",
        ),
        (
            "law",
            r"(?i)\b(law|legal|regulation|contract|court|rights|compliance|liability)\b",
        ),
        (
            "education",
            r"(?i)\b(learn\w*|student|teach\w*|course|study|school|university|curriculum)\b",
        ),
        (
            "security",
            r"(?i)\b(security|encrypt\w*|attack|vulnerab\w*|password|authentication|threat)\b",
        ),
        (
            "risk",
            r"(?i)\b(risk|danger\w*|safety|caution|warning|trade-?offs?)\b",
        ),
        (
            "process",
            r"(?i)\b(step|first|second|finally|procedure|workflow|process)\b",
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("valid regex")))
    .collect()
});

static CAPITALIZED_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][a-zA-Z0-9]+(?:\s+[A-Z][a-zA-Z0-9]+)+\b").expect("valid regex")
});

/// Concept set of a text. Category concepts are prefixed `topic:`, phrase
/// concepts `phrase:` (lowercased).
pub fn extract(text: &str) -> BTreeSet<String> {
    let mut concepts: BTreeSet<String> = CATEGORIES
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| format!("topic:{}", name))
        .collect();

    for m in CAPITALIZED_PHRASE.find_iter(text) {
        concepts.insert(format!("phrase:{}", m.as_str().to_lowercase()));
    }
    concepts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        let c = extract("The compiler catches bugs before the server ships; watch the risk.");
        assert!(c.contains("topic:technology"));
        assert!(c.contains("topic:risk"));
        assert!(!c.contains("topic:health"));
    }

    #[test]
    fn test_capitalized_phrases() {
        let c = extract("Deploy it on Amazon Web Services or Google Cloud.");
        assert!(c.contains("phrase:amazon web services"));
        assert!(c.contains("phrase:google cloud"));
    }

    #[test]
    fn test_plain_text_has_no_concepts() {
        assert!(extract("nothing to see here").is_empty());
    }
}
