//! Splits a query into sub-goals when it carries a `compound` marker or
//! looks like multiple imperative clauses.

use orchestra_core::Intent;

const SEPARATORS: [&str; 3] = [" and then ", ";", " then "];

fn looks_compound(query: &str) -> bool {
    let lower = query.to_lowercase();
    SEPARATORS.iter().any(|sep| lower.contains(sep))
}

/// Returns one sub-goal string per clause, or a single sub-goal equal to
/// the whole query when the heuristic does not fire.
pub fn decompose(query: &str, intent: &Intent) -> Vec<String> {
    if !(intent.compound || looks_compound(query)) {
        return vec![query.trim().to_string()];
    }

    let mut parts: Vec<String> = vec![query.to_string()];
    for sep in SEPARATORS {
        parts = parts
            .into_iter()
            .flat_map(|p| split_case_insensitive(&p, sep))
            .collect();
    }

    let parts: Vec<String> = parts
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();

    if parts.is_empty() {
        vec![query.trim().to_string()]
    } else {
        parts
    }
}

fn split_case_insensitive(text: &str, sep: &str) -> Vec<String> {
    let lower_text = text.to_lowercase();
    let lower_sep = sep.to_lowercase();
    if !lower_text.contains(&lower_sep) {
        return vec![text.to_string()];
    }

    let mut out = Vec::new();
    let mut rest = text;
    let mut rest_lower = lower_text.as_str();
    while let Some(idx) = rest_lower.find(&lower_sep) {
        out.push(rest[..idx].to_string());
        rest = &rest[idx + sep.len()..];
        rest_lower = &rest_lower[idx + sep.len()..];
    }
    out.push(rest.to_string());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_clause_query_is_not_split() {
        let goals = decompose("please echo hello", &Intent::unknown());
        assert_eq!(goals, vec!["please echo hello".to_string()]);
    }

    #[test]
    fn and_then_splits_into_two_clauses() {
        let goals = decompose(
            "fetch the front page and then summarize it",
            &Intent::unknown(),
        );
        assert_eq!(
            goals,
            vec![
                "fetch the front page".to_string(),
                "summarize it".to_string()
            ]
        );
    }

    #[test]
    fn compound_intent_flag_forces_split_on_semicolon() {
        let mut intent = Intent::unknown();
        intent.compound = true;
        let goals = decompose("fetch the page; summarize it", &intent);
        assert_eq!(
            goals,
            vec!["fetch the page".to_string(), "summarize it".to_string()]
        );
    }
}
