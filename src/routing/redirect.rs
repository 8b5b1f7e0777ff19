//! Redirect rewriting.
//!
//! Rules fold over the canonical path left-to-right: each rule sees the
//! output of the one before it, so composable normalization rules (case
//! folding plus a directory rewrite, say) work without combined patterns.

use regex::Regex;

use crate::config::RedirectRule;

struct CompiledRule {
    pattern: Regex,
    template: String,
}

/// An ordered list of compiled regex -> template rewrites.
pub struct RedirectEngine {
    rules: Vec<CompiledRule>,
}

impl RedirectEngine {
    /// Compile the configured rules. Patterns are matched against the full
    /// path, anchored at both ends.
    pub fn compile(rules: &[RedirectRule]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(CompiledRule {
                    pattern: Regex::new(&format!("^(?:{})$", rule.from))?,
                    template: rule.to.clone(),
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    /// Fold every rule over `path`. Returns the rewritten path, or `None`
    /// when the fold leaves the path unchanged and no redirect is due.
    pub fn apply(&self, path: &str) -> Option<String> {
        let mut current = path.to_string();
        for rule in &self.rules {
            current = rule
                .pattern
                .replace(&current, rule.template.as_str())
                .into_owned();
        }
        if current == path {
            None
        } else {
            Some(current)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
