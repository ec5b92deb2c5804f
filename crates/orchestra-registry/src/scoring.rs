//! The `recommend` scoring formula.

use orchestra_core::{ToolDefinition, ToolStats};

/// Lowercased, overlapping character trigrams of `text`. Used for the
/// "+3 if query contains any 3-gram of description" rule — character
/// trigrams are robust to punctuation/word-boundary differences between
/// query and description.
fn char_trigrams(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    if chars.len() < 3 {
        return Vec::new();
    }
    chars.windows(3).map(|w| w.iter().collect()).collect()
}

/// Raw (pre success-factor) keyword/name/description match score.
pub fn base_score(def: &ToolDefinition, query_folded: &str) -> i32 {
    let mut score = 0;

    for kw in &def.keyword_tags {
        if query_folded.contains(&kw.to_lowercase()) {
            score += 10;
        }
    }

    if query_folded.contains(&def.name.to_lowercase()) {
        score += 5;
    }

    if char_trigrams(&def.description)
        .iter()
        .any(|tg| query_folded.contains(tg.as_str()))
    {
        score += 3;
    }

    score
}

/// `0.5 + 0.5 * (successes / max(1, successes + failures))`.
pub fn success_factor(stats: &ToolStats) -> f64 {
    0.5 + 0.5 * stats.success_rate()
}

/// Final recommendation score: base score multiplied by the success
/// factor. Zero-score tools are omitted by the caller, not here.
pub fn recommend_score(def: &ToolDefinition, stats: &ToolStats, query_folded: &str) -> f64 {
    base_score(def, query_folded) as f64 * success_factor(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn def(name: &str, keywords: &[&str], description: &str) -> ToolDefinition {
        ToolDefinition {
            id: name.to_string(),
            name: name.to_string(),
            category: None,
            version: "0.1.0".to_string(),
            input_types: vec![],
            output_types: vec![],
            capability_tags: HashSet::new(),
            keyword_tags: keywords.iter().map(|s| s.to_string()).collect(),
            description: description.to_string(),
        }
    }

    #[test]
    fn keyword_match_scores_ten() {
        let d = def("Echo", &["echo"], "repeats the input back");
        assert_eq!(base_score(&d, "please echo hello"), 10);
    }

    #[test]
    fn name_match_scores_five() {
        let d = def("Fetch", &[], "retrieves a URL");
        assert_eq!(base_score(&d, "please fetch this page"), 5);
    }

    #[test]
    fn description_trigram_match_scores_three() {
        let d = def("Weather", &[], "reports current weather conditions");
        assert_eq!(base_score(&d, "what are the weather conditions today"), 3);
    }

    #[test]
    fn zero_score_when_nothing_matches() {
        let d = def("Calculator", &["math"], "performs arithmetic");
        assert_eq!(base_score(&d, "tell me a joke"), 0);
    }

    #[test]
    fn success_factor_is_half_with_no_history() {
        let stats = ToolStats::default();
        assert!((success_factor(&stats) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn success_factor_approaches_one_with_perfect_history() {
        let mut stats = ToolStats::default();
        for _ in 0..10 {
            stats.record(true, 10);
        }
        assert!((success_factor(&stats) - 1.0).abs() < 1e-9);
    }
}
