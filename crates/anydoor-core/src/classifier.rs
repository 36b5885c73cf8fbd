//! Traffic classifier: one verdict per `(path, user-agent)` pair.
//!
//! Rules are evaluated in a fixed order and the first match wins:
//!
//! 1. path denylist (whole path or first segment) → [`ClassificationVerdict::BlockNotFound`]
//! 2. blocked file extension on the last segment → [`ClassificationVerdict::BlockNotFound`]
//! 3. missing or blank user-agent → [`ClassificationVerdict::BlockForbidden`]
//! 4. malicious tool signature → [`ClassificationVerdict::BlockForbidden`]
//! 5. generic automation signature → [`ClassificationVerdict::BlockForbidden`]
//! 6. search engine crawler → [`ClassificationVerdict::SyntheticLanding`]
//! 7. social preview crawler → [`ClassificationVerdict::SyntheticLanding`]
//! 8. anything else → [`ClassificationVerdict::Pass`]
//!
//! Classification is pure; callers log denials.

use regex::Regex;
use serde::Serialize;

use crate::rules::ClassifierRules;
use crate::validity::PathRules;
use crate::ClassifierError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationVerdict {
    Pass,
    BlockNotFound,
    BlockForbidden,
    SyntheticLanding,
}

/// The rule that produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    BlacklistedPath,
    BlockedExtension,
    MissingUserAgent,
    MaliciousTool,
    GenericAutomation,
    SearchEngine,
    SocialPreview,
    Allowed,
}

impl std::fmt::Display for MatchReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            MatchReason::BlacklistedPath => "blacklisted path",
            MatchReason::BlockedExtension => "blocked extension",
            MatchReason::MissingUserAgent => "missing user-agent",
            MatchReason::MaliciousTool => "malicious tool",
            MatchReason::GenericAutomation => "generic automation",
            MatchReason::SearchEngine => "search engine crawler",
            MatchReason::SocialPreview => "social preview crawler",
            MatchReason::Allowed => "allowed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub verdict: ClassificationVerdict,
    pub reason: MatchReason,
}

impl Classification {
    fn new(verdict: ClassificationVerdict, reason: MatchReason) -> Self {
        Self { verdict, reason }
    }
}

/// Case-insensitive substring matcher over one signature list.
///
/// An empty list never matches.
#[derive(Debug, Clone)]
struct SignatureSet {
    pattern: Option<Regex>,
}

impl SignatureSet {
    fn compile(category: &'static str, signatures: &[String]) -> Result<Self, ClassifierError> {
        let alternation = signatures
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Ok(Self { pattern: None });
        }
        let pattern = Regex::new(&format!("(?i)(?:{alternation})"))
            .map_err(|source| ClassifierError::InvalidPattern { category, source })?;
        Ok(Self {
            pattern: Some(pattern),
        })
    }

    fn matches(&self, user_agent: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(user_agent))
    }
}

#[derive(Debug, Clone)]
pub struct Classifier {
    paths: PathRules,
    malicious: SignatureSet,
    generic: SignatureSet,
    search_engines: SignatureSet,
    social_previews: SignatureSet,
}

impl Classifier {
    /// Compile the rule lists into a classifier.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::InvalidPattern`] if a signature list cannot
    /// be compiled (for example, one that exceeds the regex size limit).
    pub fn new(rules: &ClassifierRules) -> Result<Self, ClassifierError> {
        Ok(Self {
            paths: PathRules::from_rules(rules),
            malicious: SignatureSet::compile("malicious", &rules.malicious_agents)?,
            generic: SignatureSet::compile("generic", &rules.generic_agents)?,
            search_engines: SignatureSet::compile("search engine", &rules.search_engine_agents)?,
            social_previews: SignatureSet::compile(
                "social preview",
                &rules.social_preview_agents,
            )?,
        })
    }

    /// The path rules this classifier applies in steps 1 and 2.
    #[must_use]
    pub fn path_rules(&self) -> &PathRules {
        &self.paths
    }

    #[must_use]
    pub fn classify(&self, path: &str, user_agent: Option<&str>) -> ClassificationVerdict {
        self.classify_detailed(path, user_agent).verdict
    }

    #[must_use]
    pub fn classify_detailed(&self, path: &str, user_agent: Option<&str>) -> Classification {
        use ClassificationVerdict::{BlockForbidden, BlockNotFound, Pass, SyntheticLanding};

        if self.paths.is_blacklisted(path) {
            return Classification::new(BlockNotFound, MatchReason::BlacklistedPath);
        }
        if self.paths.has_blocked_extension(path) {
            return Classification::new(BlockNotFound, MatchReason::BlockedExtension);
        }

        let user_agent = match user_agent {
            Some(ua) if !ua.trim().is_empty() => ua,
            _ => return Classification::new(BlockForbidden, MatchReason::MissingUserAgent),
        };

        if self.malicious.matches(user_agent) {
            Classification::new(BlockForbidden, MatchReason::MaliciousTool)
        } else if self.generic.matches(user_agent) {
            Classification::new(BlockForbidden, MatchReason::GenericAutomation)
        } else if self.search_engines.matches(user_agent) {
            Classification::new(SyntheticLanding, MatchReason::SearchEngine)
        } else if self.social_previews.matches(user_agent) {
            Classification::new(SyntheticLanding, MatchReason::SocialPreview)
        } else {
            Classification::new(Pass, MatchReason::Allowed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BROWSER_UA: &str =
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

    fn classifier() -> Classifier {
        Classifier::new(&ClassifierRules::default()).expect("default rules compile")
    }

    #[test]
    fn browser_on_ordinary_path_passes() {
        assert_eq!(
            classifier().classify("/travel/japan/tokyo", Some(BROWSER_UA)),
            ClassificationVerdict::Pass
        );
    }

    #[test]
    fn denylisted_paths_are_not_found_for_any_agent() {
        let c = classifier();
        for path in ["/wp-admin", "/WP-Admin/setup.php", "/.ENV", "/phpMyAdmin/index"] {
            for ua in [None, Some(""), Some(BROWSER_UA), Some("Googlebot/2.1")] {
                assert_eq!(
                    c.classify(path, ua),
                    ClassificationVerdict::BlockNotFound,
                    "{path} / {ua:?}"
                );
            }
        }
    }

    #[test]
    fn blocked_extension_is_not_found_even_when_denylist_passes() {
        let c = classifier();
        let result = c.classify_detailed("/recipes/dump.bak", Some(BROWSER_UA));
        assert_eq!(result.verdict, ClassificationVerdict::BlockNotFound);
        assert_eq!(result.reason, MatchReason::BlockedExtension);
    }

    #[test]
    fn missing_or_blank_user_agent_is_forbidden() {
        let c = classifier();
        for ua in [None, Some(""), Some("   ")] {
            let result = c.classify_detailed("/music/jazz", ua);
            assert_eq!(result.verdict, ClassificationVerdict::BlockForbidden);
            assert_eq!(result.reason, MatchReason::MissingUserAgent);
        }
    }

    #[test]
    fn tool_and_automation_agents_are_forbidden() {
        let c = classifier();
        assert_eq!(
            c.classify_detailed("/x", Some("sqlmap/1.7#stable")).reason,
            MatchReason::MaliciousTool
        );
        assert_eq!(
            c.classify_detailed("/x", Some("curl/8.4.0")).reason,
            MatchReason::GenericAutomation
        );
        assert_eq!(
            c.classify_detailed("/x", Some("Mozilla/5.0 HeadlessChrome/120.0")).reason,
            MatchReason::GenericAutomation
        );
    }

    #[test]
    fn crawlers_get_synthetic_landing() {
        let c = classifier();
        let search = c.classify_detailed("/秋天/落叶", Some("Googlebot/2.1"));
        assert_eq!(search.verdict, ClassificationVerdict::SyntheticLanding);
        assert_eq!(search.reason, MatchReason::SearchEngine);

        let social = c.classify_detailed("/x", Some("facebookexternalhit/1.1"));
        assert_eq!(social.verdict, ClassificationVerdict::SyntheticLanding);
        assert_eq!(social.reason, MatchReason::SocialPreview);
    }

    #[test]
    fn signature_matching_ignores_case() {
        assert_eq!(
            classifier().classify("/x", Some("GOOGLEBOT")),
            ClassificationVerdict::SyntheticLanding
        );
    }

    #[test]
    fn malicious_wins_over_search_engine_when_both_match() {
        // Order matters: a scanner spoofing a crawler name is still blocked.
        assert_eq!(
            classifier().classify("/x", Some("Googlebot Nikto/2.5")),
            ClassificationVerdict::BlockForbidden
        );
    }

    #[test]
    fn classification_is_repeatable() {
        let c = classifier();
        let first = c.classify_detailed("/a/b", Some("Bingbot"));
        let _ = c.classify_detailed("/wp-admin", None);
        let second = c.classify_detailed("/a/b", Some("Bingbot"));
        assert_eq!(first, second);
    }

    #[test]
    fn injected_rules_replace_builtins() {
        let rules = ClassifierRules {
            search_engine_agents: vec!["AcmeIndexer".to_string()],
            generic_agents: vec![],
            ..ClassifierRules::default()
        };
        let c = Classifier::new(&rules).expect("compile");
        assert_eq!(
            c.classify("/x", Some("AcmeIndexer/1.0")),
            ClassificationVerdict::SyntheticLanding
        );
        assert_eq!(c.classify("/x", Some("curl/8.0")), ClassificationVerdict::Pass);
        assert_eq!(
            c.classify("/x", Some("Googlebot/2.1")),
            ClassificationVerdict::Pass
        );
    }

    #[test]
    fn regex_metacharacters_in_signatures_are_literal() {
        let rules = ClassifierRules {
            malicious_agents: vec!["evil.bot(v1)".to_string()],
            ..ClassifierRules::default()
        };
        let c = Classifier::new(&rules).expect("compile");
        assert_eq!(
            c.classify("/x", Some("evil.bot(v1)")),
            ClassificationVerdict::BlockForbidden
        );
        assert_eq!(c.classify("/x", Some("evilXbotv1")), ClassificationVerdict::Pass);
    }
}
