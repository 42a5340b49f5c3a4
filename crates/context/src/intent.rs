//! Intent hints - Maps composer text to research panels
//!
//! Keyword rules are matched case-insensitively on word boundaries and
//! reported in rule order.

use paperdesk_common::errors::{AppError, Result};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Suggestion shown next to the composer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentHint {
    /// `{match}-{position}` where position counts matched hints
    pub id: String,

    /// Rule key: dataset, license, gaps or repro
    #[serde(rename = "match")]
    pub match_key: String,

    pub action: String,
    pub description: String,
    pub icon: String,
}

struct IntentRule {
    pattern: Regex,
    match_key: &'static str,
    icon: &'static str,
    action: &'static str,
    description: &'static str,
}

const RULES: &[(&str, &str, &str, &str, &str)] = &[
    (
        r"(?i)\b(dataset|data set|corpus|corpora|data split|split)\b",
        "dataset",
        "Database",
        "Open Facts tab",
        "Inspect datasets, splits, and licenses in Facts.",
    ),
    (
        r"(?i)\b(license|licence|open source|code|repository)\b",
        "license",
        "FileCode",
        "Review license",
        "Check licensing and code links in Facts.",
    ),
    (
        r"(?i)\b(limitation|risk|gap|concern)\b",
        "gaps",
        "TriangleAlert",
        "Open Gaps tab",
        "See grounded and speculative gaps in the Gaps view.",
    ),
    (
        r"(?i)\b(reproduce|reproducibility|baseline|hyperparam|training|hardware)\b",
        "repro",
        "Cpu",
        "Open Repro card",
        "Review hardware, baselines, and hyperparameters.",
    ),
];

/// Keyword-based intent detector
pub struct IntentDetector {
    rules: Vec<IntentRule>,
}

impl IntentDetector {
    /// Compile the built-in keyword rules
    pub fn new() -> Result<Self> {
        let rules = RULES
            .iter()
            .map(|&(pattern, match_key, icon, action, description)| {
                let pattern = Regex::new(pattern).map_err(|e| AppError::Internal {
                    message: format!("invalid intent pattern for {}: {}", match_key, e),
                })?;
                Ok(IntentRule {
                    pattern,
                    match_key,
                    icon,
                    action,
                    description,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Hints whose keywords appear in `prompt`, in rule order
    pub fn detect(&self, prompt: &str) -> Vec<IntentHint> {
        if prompt.trim().is_empty() {
            return Vec::new();
        }

        let mut hints = Vec::new();
        for rule in self.rules.iter().filter(|r| r.pattern.is_match(prompt)) {
            hints.push(IntentHint {
                id: format!("{}-{}", rule.match_key, hints.len()),
                match_key: rule.match_key.to_string(),
                action: rule.action.to_string(),
                description: rule.description.to_string(),
                icon: rule.icon.to_string(),
            });
        }
        hints
    }
}

impl std::fmt::Debug for IntentDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentDetector")
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(hints: &[IntentHint]) -> Vec<&str> {
        hints.iter().map(|h| h.id.as_str()).collect()
    }

    #[test]
    fn test_detects_in_rule_order() {
        let detector = IntentDetector::new().unwrap();
        let hints = detector.detect("Which HARDWARE and dataset did they use?");
        assert_eq!(keys(&hints), vec!["dataset-0", "repro-1"]);
        assert_eq!(hints[0].action, "Open Facts tab");
        assert_eq!(hints[1].icon, "Cpu");
    }

    #[test]
    fn test_word_boundaries() {
        let detector = IntentDetector::new().unwrap();
        // "gaps" and "codes" are not whole-word matches
        assert!(detector.detect("mind the gaps in these codes").is_empty());
        assert_eq!(keys(&detector.detect("any gap? open source?")), vec!["license-0", "gaps-1"]);
    }

    #[test]
    fn test_blank_prompt() {
        let detector = IntentDetector::new().unwrap();
        assert!(detector.detect("").is_empty());
        assert!(detector.detect("   \n").is_empty());
    }

    #[test]
    fn test_hint_wire_shape() {
        let detector = IntentDetector::new().unwrap();
        let hints = detector.detect("licence terms");
        let json = serde_json::to_value(&hints[0]).unwrap();
        assert_eq!(json["id"], "license-0");
        assert_eq!(json["match"], "license");
        assert_eq!(json["icon"], "FileCode");
    }
}
