use std::path::Path;

use anydoor_core::{decode_path, Classification, Classifier, ClassifierRules};

/// Print the verdict the gateway would give `path` and the rule that decided
/// it, plus whether the path would be accepted for generation and trending.
///
/// # Errors
///
/// Returns an error if the rules file cannot be loaded or compiled.
pub(crate) fn run_classify(
    path: &str,
    user_agent: Option<&str>,
    rules_path: Option<&Path>,
) -> anyhow::Result<()> {
    let rules = match rules_path {
        Some(file) => anydoor_core::load_rules(file)?,
        None => ClassifierRules::default(),
    };
    let classifier = Classifier::new(&rules)?;
    let result = classifier.classify_detailed(path, user_agent);

    println!("{}", describe(path, user_agent, result));
    match classifier.path_rules().validate_search_path(path) {
        Ok(()) => println!("{:<12}ok", "VALIDITY"),
        Err(rejection) => println!("{:<12}rejected ({rejection})", "VALIDITY"),
    }
    Ok(())
}

fn describe(path: &str, user_agent: Option<&str>, result: Classification) -> String {
    let verdict = serde_json::to_value(result.verdict)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    format!(
        "{:<12}{}\n{:<12}{}\n{:<12}{}\n{:<12}{}",
        "PATH",
        decode_path(path),
        "USER-AGENT",
        user_agent.unwrap_or("(none)"),
        "VERDICT",
        verdict,
        "REASON",
        result.reason,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_shows_decoded_path_verdict_and_reason() {
        let classifier = Classifier::new(&ClassifierRules::default()).expect("rules compile");
        let path = "/%E7%A7%8B%E5%A4%A9";
        let result = classifier.classify_detailed(path, Some("Googlebot/2.1"));

        let text = describe(path, Some("Googlebot/2.1"), result);
        assert!(text.contains("/秋天"));
        assert!(text.contains("synthetic_landing"));
        assert!(text.contains("search engine crawler"));
    }

    #[test]
    fn describe_marks_missing_user_agent() {
        let classifier = Classifier::new(&ClassifierRules::default()).expect("rules compile");
        let result = classifier.classify_detailed("/music", None);

        let text = describe("/music", None, result);
        assert!(text.contains("(none)"));
        assert!(text.contains("block_forbidden"));
    }
}
