// Raw trim/model strings -> canonical report variants.
//
// Every raw value resolves to exactly one variant: the first rule that
// matches, or the lineup's fallback.
use crate::config::{LineupConfig, MatchStrategy, VariantRule, WhitespacePolicy};
use crate::error::{ReportError, Result};

/// Uppercase, trim and apply the whitespace policy.
pub fn normalize_text(raw: &str, policy: WhitespacePolicy) -> String {
    let upper = raw.trim().to_uppercase();
    match policy {
        WhitespacePolicy::Collapse => upper.split_whitespace().collect::<Vec<_>>().join(" "),
        WhitespacePolicy::Strip => upper.chars().filter(|c| !c.is_whitespace()).collect(),
    }
}

/// A rule with its patterns already normalized.
#[derive(Debug, Clone)]
pub struct PreparedRule {
    pub canonical: String,
    pub strategy: MatchStrategy,
    policy: WhitespacePolicy,
    patterns: Vec<String>,
}

impl PreparedRule {
    pub fn new(rule: &VariantRule, policy: WhitespacePolicy) -> Self {
        let patterns = rule
            .patterns
            .iter()
            .map(|p| normalize_text(p, policy))
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            canonical: rule.canonical.clone(),
            strategy: rule.strategy,
            policy,
            patterns,
        }
    }

    /// `input` must already be normalized with the same policy.
    pub fn matches(&self, input: &str) -> bool {
        if self.patterns.is_empty() {
            return false;
        }
        match self.strategy {
            MatchStrategy::Exact => self.patterns.iter().any(|p| p == input),
            MatchStrategy::Substring => self.patterns.iter().any(|p| input.contains(p.as_str())),
            MatchStrategy::Keywords => self.patterns.iter().all(|p| input.contains(p.as_str())),
        }
    }

    /// Representative inputs this rule is meant to catch. Used to detect
    /// rules hidden behind earlier, looser ones.
    pub fn probes(&self) -> Vec<String> {
        match self.strategy {
            MatchStrategy::Exact | MatchStrategy::Substring => self.patterns.clone(),
            MatchStrategy::Keywords => {
                let sep = match self.policy {
                    WhitespacePolicy::Collapse => " ",
                    WhitespacePolicy::Strip => "",
                };
                vec![self.patterns.join(sep)]
            }
        }
    }
}

/// Outcome of resolving one raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution<'a> {
    pub canonical: &'a str,
    /// Column position in the lineup.
    pub index: usize,
    /// Index of the rule that fired; `None` means the fallback was used.
    pub rule: Option<usize>,
}

impl Resolution<'_> {
    pub fn is_fallback(&self) -> bool {
        self.rule.is_none()
    }
}

pub struct Normalizer<'a> {
    config: &'a LineupConfig,
    rules: Vec<(PreparedRule, usize)>,
    fallback: usize,
}

impl<'a> Normalizer<'a> {
    /// Fails if the lineup's fallback is not one of its variants.
    pub fn new(config: &'a LineupConfig) -> Result<Self> {
        let fallback = config.fallback_index().ok_or_else(|| {
            ReportError::ConfigValidation(format!(
                "fallback '{}' is not one of the variants",
                config.fallback
            ))
        })?;
        let rules = config
            .rules
            .iter()
            .filter_map(|r| {
                let idx = config.variant_index(&r.canonical)?;
                Some((PreparedRule::new(r, config.whitespace), idx))
            })
            .collect();
        Ok(Self {
            config,
            rules,
            fallback,
        })
    }

    pub fn resolve(&self, raw: &str) -> Resolution<'a> {
        let config: &'a LineupConfig = self.config;
        let input = normalize_text(raw, config.whitespace);
        if !input.is_empty() {
            for (i, (rule, idx)) in self.rules.iter().enumerate() {
                if rule.matches(&input) {
                    return Resolution {
                        canonical: &config.variants[*idx],
                        index: *idx,
                        rule: Some(i),
                    };
                }
            }
        }
        Resolution {
            canonical: &config.variants[self.fallback],
            index: self.fallback,
            rule: None,
        }
    }

    pub fn normalize(&self, raw: &str) -> &'a str {
        self.resolve(raw).canonical
    }
}
