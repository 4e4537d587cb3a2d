//! Compiled matcher and order rules.
//!
//! Both rule lists are declarative sequences of predicate→effect pairs
//! evaluated first-match-wins. Compilation happens once per run; an invalid
//! pattern is a configuration error and aborts before anything is scanned.

use regex::Regex;

use crate::config::PublishConfig;
use crate::error::PublishError;

/// Resolved upload metadata for one key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Route {
    pub cache_control: Option<String>,
    pub gzip: bool,
}

#[derive(Debug)]
struct CompiledMatcher {
    pattern: Regex,
    route: Route,
}

/// Matcher and order rules from a [`PublishConfig`], compiled for matching
/// against relative keys.
#[derive(Debug)]
pub struct RuleSet {
    matchers: Vec<CompiledMatcher>,
    order: Vec<Regex>,
}

impl RuleSet {
    pub fn compile(config: &PublishConfig) -> Result<Self, PublishError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|source| PublishError::Pattern {
                pattern: pattern.to_string(),
                source,
            })
        };

        let mut matchers = Vec::with_capacity(config.matchers.len());
        for rule in &config.matchers {
            matchers.push(CompiledMatcher {
                pattern: compile(&rule.pattern)?,
                route: Route {
                    cache_control: rule.cache_control.clone(),
                    gzip: rule.gzip,
                },
            });
        }

        let mut order = Vec::with_capacity(config.order.len());
        for pattern in &config.order {
            order.push(compile(pattern)?);
        }

        Ok(Self { matchers, order })
    }

    /// Metadata for a key: the first matching rule's route, or the default
    /// policy (no special caching, no compression) when none match.
    pub fn route(&self, key: &str) -> Route {
        self.matchers
            .iter()
            .find(|m| m.pattern.is_match(key))
            .map(|m| m.route.clone())
            .unwrap_or_default()
    }

    /// Upload ordering group for a key: the index of the first matching
    /// order pattern. Keys matching no pattern sort after every group.
    pub fn order_index(&self, key: &str) -> usize {
        self.order
            .iter()
            .position(|p| p.is_match(key))
            .unwrap_or(self.order.len())
    }
}
