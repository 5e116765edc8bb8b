use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::normalizer::PreparedRule;

const BUILTIN_LINEUP: &str = include_str!("../lineups/default.toml");

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One vehicle lineup: the report columns and the rules that map raw
/// spreadsheet names onto them.
///
/// Built once at startup and only ever handed out by reference, so several
/// lineups can live side by side (tests do this a lot).
#[derive(Debug, Clone, Deserialize)]
pub struct LineupConfig {
    pub name: String,
    /// Report column order.
    pub variants: Vec<String>,
    /// Variant that absorbs every raw name no rule matches.
    pub fallback: String,
    #[serde(default)]
    pub whitespace: WhitespacePolicy,
    /// Tried in order, first match wins.
    #[serde(default)]
    pub rules: Vec<VariantRule>,
    #[serde(default)]
    pub columns: ColumnKeywords,
    #[serde(default)]
    pub report: ReportSettings,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct VariantRule {
    pub canonical: String,
    pub patterns: Vec<String>,
    #[serde(default, rename = "match")]
    pub strategy: MatchStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Normalized input equals one of the patterns.
    Exact,
    /// One of the patterns occurs somewhere in the normalized input.
    #[default]
    Substring,
    /// Every pattern occurs in the normalized input, in any order.
    Keywords,
}

/// How whitespace is treated before matching. Applied to patterns and raw
/// values alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WhitespacePolicy {
    /// Trim and squeeze runs of whitespace to a single space.
    #[default]
    Collapse,
    /// Drop all whitespace.
    Strip,
}

// ---------------------------------------------------------------------------
// Columns + report settings
// ---------------------------------------------------------------------------

/// Header keywords per column role, matched case-insensitively as substrings.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnKeywords {
    #[serde(default = "default_variant_keywords")]
    pub variant: Vec<String>,
    #[serde(default = "default_quantity_keywords")]
    pub quantity: Vec<String>,
    #[serde(default = "default_date_keywords")]
    pub date: Vec<String>,
}

impl Default for ColumnKeywords {
    fn default() -> Self {
        Self {
            variant: default_variant_keywords(),
            quantity: default_quantity_keywords(),
            date: default_date_keywords(),
        }
    }
}

fn default_variant_keywords() -> Vec<String> {
    vec!["variant".into(), "model".into()]
}

fn default_quantity_keywords() -> Vec<String> {
    vec!["qty".into(), "quantity".into()]
}

fn default_date_keywords() -> Vec<String> {
    vec!["date".into(), "month".into()]
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportSettings {
    #[serde(default)]
    pub closing_mode: ClosingMode,
}

/// What "closing" means for the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosingMode {
    /// Likely closing is its own estimate; achievement is actual / forecast.
    #[default]
    Standalone,
    /// Likely closing adds to actual intake: an "Actual Month Closing" row is
    /// reported and achievement is (actual + likely) / forecast.
    Incremental,
}

impl std::fmt::Display for ClosingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Incremental => write!(f, "incremental"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl LineupConfig {
    /// Parse and validate a lineup from TOML text.
    pub fn from_toml(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| ReportError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        tracing::info!(
            path = %path.display(),
            lineup = %config.name,
            variants = config.variants.len(),
            rules = config.rules.len(),
            "loaded lineup"
        );
        Ok(config)
    }

    /// The lineup shipped with the crate (`lineups/default.toml`).
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_LINEUP)
    }

    /// Column position of a canonical variant.
    pub fn variant_index(&self, canonical: &str) -> Option<usize> {
        self.variants.iter().position(|v| v == canonical)
    }

    /// `None` only for a config that never went through `validate()`.
    pub fn fallback_index(&self) -> Option<usize> {
        self.variant_index(&self.fallback)
    }

    pub fn validate(&self) -> Result<()> {
        if self.variants.is_empty() {
            return Err(ReportError::ConfigValidation(
                "at least one variant is required".into(),
            ));
        }

        let mut seen = HashSet::new();
        for v in &self.variants {
            if v.trim().is_empty() {
                return Err(ReportError::ConfigValidation("blank variant name".into()));
            }
            if !seen.insert(v.as_str()) {
                return Err(ReportError::ConfigValidation(format!(
                    "variant '{v}' is listed more than once"
                )));
            }
        }

        if !seen.contains(self.fallback.as_str()) {
            return Err(ReportError::ConfigValidation(format!(
                "fallback '{}' is not one of the variants",
                self.fallback
            )));
        }

        if self.columns.variant.iter().all(|k| k.trim().is_empty()) {
            return Err(ReportError::ConfigValidation(
                "columns.variant needs at least one keyword".into(),
            ));
        }

        for (i, rule) in self.rules.iter().enumerate() {
            if !seen.contains(rule.canonical.as_str()) {
                return Err(ReportError::ConfigValidation(format!(
                    "rule {} maps to '{}', which is not one of the variants",
                    i + 1,
                    rule.canonical
                )));
            }
            if rule.patterns.iter().all(|p| p.trim().is_empty()) {
                return Err(ReportError::ConfigValidation(format!(
                    "rule {} ('{}') has no patterns",
                    i + 1,
                    rule.canonical
                )));
            }
        }

        self.check_rule_order()
    }

    /// Reject a rule that can never fire for its own patterns because an
    /// earlier rule for a different variant already captures them.
    fn check_rule_order(&self) -> Result<()> {
        let prepared: Vec<PreparedRule> = self
            .rules
            .iter()
            .map(|r| PreparedRule::new(r, self.whitespace))
            .collect();

        for (j, later) in prepared.iter().enumerate() {
            for probe in later.probes() {
                let shadowing = prepared[..j]
                    .iter()
                    .enumerate()
                    .find(|(_, earlier)| earlier.canonical != later.canonical && earlier.matches(&probe));
                if let Some((i, earlier)) = shadowing {
                    return Err(ReportError::ConfigValidation(format!(
                        "rule {} pattern '{}' ({}) is shadowed by rule {} ({}); list the more specific pattern first",
                        j + 1,
                        probe,
                        later.canonical,
                        i + 1,
                        earlier.canonical
                    )));
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
