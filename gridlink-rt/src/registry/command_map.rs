//! Command map: default targets for unaddressed commands.
//!
//! Rules pair a wildcard pattern with a target name and a priority. Lookup
//! scans priorities in ascending order and the first matching rule wins.
//! The map is consulted only when a message carries an empty receiver; it
//! never re-routes a concrete address.

// Layer 1: Standard library imports
use std::collections::BTreeMap;

// Layer 2: Third-party crate imports
use globset::{Glob, GlobMatcher};
use thiserror::Error;

// Layer 3: Internal module imports
// (none)

/// Built-in fallback target for every unaddressed command.
pub const DEFAULT_COMMAND_TARGET: &str = "@worker";

/// Invalid wildcard pattern.
#[derive(Debug, Error)]
#[error("Invalid command filter '{pattern}': {source}")]
pub struct CommandMapError {
    pub pattern: String,
    #[source]
    pub source: globset::Error,
}

#[derive(Debug)]
struct Rule {
    matcher: GlobMatcher,
    pattern: String,
    target: String,
}

/// Priority-ordered wildcard routing rules.
#[derive(Debug)]
pub struct CommandMap {
    rules: BTreeMap<i32, Vec<Rule>>,
}

impl CommandMap {
    /// Map with the built-in `*.* -> @worker` rule at the lowest priority.
    pub fn new() -> Self {
        let mut map = Self {
            rules: BTreeMap::new(),
        };
        // The fallback pattern is statically valid.
        let _ = map.register("*.*", DEFAULT_COMMAND_TARGET, i32::MAX);
        map
    }

    /// Add a rule. Lower priority values are scanned first.
    pub fn register(
        &mut self,
        pattern: &str,
        target: impl Into<String>,
        priority: i32,
    ) -> Result<(), CommandMapError> {
        let matcher = Glob::new(pattern)
            .map_err(|source| CommandMapError {
                pattern: pattern.to_owned(),
                source,
            })?
            .compile_matcher();
        self.rules.entry(priority).or_default().push(Rule {
            matcher,
            pattern: pattern.to_owned(),
            target: target.into(),
        });
        Ok(())
    }

    /// First matching target in priority order.
    pub fn find_target(&self, command: &str) -> Option<&str> {
        for rules in self.rules.values() {
            for rule in rules {
                if rule.matcher.is_match(command) {
                    tracing::trace!(command, pattern = %rule.pattern, target = %rule.target,
                        "command map matched");
                    return Some(&rule.target);
                }
            }
        }
        None
    }
}

impl Default for CommandMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn test_fallback_rule_matches_everything() {
        let map = CommandMap::new();
        assert_eq!(map.find_target("other.run"), Some(DEFAULT_COMMAND_TARGET));
        assert_eq!(map.find_target("squeue.init"), Some(DEFAULT_COMMAND_TARGET));
    }

    #[test]
    fn test_priority_order_wins() {
        let mut map = CommandMap::new();
        map.register("job.*", "@jobs", 10).unwrap();
        map.register("job.special", "@vip", 5).unwrap();

        assert_eq!(map.find_target("job.special"), Some("@vip"));
        assert_eq!(map.find_target("job.run"), Some("@jobs"));
        assert_eq!(map.find_target("other.run"), Some(DEFAULT_COMMAND_TARGET));
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let mut map = CommandMap::new();
        let result = map.register("job.[", "@jobs", 1);
        assert!(result.is_err());
    }

    #[test]
    fn test_command_without_dot_misses_fallback() {
        // The fallback rule requires an interface part.
        let map = CommandMap::new();
        assert_eq!(map.find_target("ping"), None);
    }
}
