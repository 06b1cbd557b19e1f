//! Rogue registry: which live server names are accounted for.
//!
//! Every server name seen on an active instance is either backed by a
//! manifest entry (`Legit`) or not (`Rogue`). Names never seen read as
//! `Unseen`. All changes go through [`Classification::transition`]:
//!
//! | from \ event | `Observed` | `Matched` |
//! |--------------|------------|-----------|
//! | `Unseen`     | `Rogue`    | `Legit`   |
//! | `Rogue`      | `Rogue`    | `Legit`   |
//! | `Legit`      | `Legit`    | `Legit`   |
//!
//! `Legit` is terminal.

use std::collections::BTreeMap;

/// Classification of a live server name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// Not observed in this run
    Unseen,
    /// Backs a manifest entry
    Legit,
    /// Observed with no manifest entry so far
    Rogue,
}

/// Something learned about a server name during a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The name was seen on an active instance
    Observed,
    /// The name was seen and matches the entry being reconciled
    Matched,
}

impl Classification {
    /// Next classification after an observation.
    pub fn transition(self, observation: Observation) -> Self {
        match (self, observation) {
            (Classification::Legit, _) | (_, Observation::Matched) => Classification::Legit,
            (Classification::Unseen | Classification::Rogue, Observation::Observed) => {
                Classification::Rogue
            }
        }
    }
}

/// Per-run map from server name to [`Classification`].
#[derive(Debug, Clone, Default)]
pub struct RogueRegistry {
    names: BTreeMap<String, Classification>,
}

impl RogueRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current classification of a name.
    pub fn classification(&self, name: &str) -> Classification {
        self.names
            .get(name)
            .copied()
            .unwrap_or(Classification::Unseen)
    }

    /// Apply an observation to a name and return its new classification.
    pub fn record(&mut self, name: &str, observation: Observation) -> Classification {
        let next = self.classification(name).transition(observation);
        self.names.insert(name.to_string(), next);
        next
    }

    /// Record a name seen on an active instance.
    pub fn observe(&mut self, name: &str) -> Classification {
        self.record(name, Observation::Observed)
    }

    /// Record that a name backs a manifest entry.
    pub fn mark_legit(&mut self, name: &str) -> Classification {
        self.record(name, Observation::Matched)
    }

    /// Names still classified rogue, sorted.
    pub fn rogues(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .filter(|(_, c)| **c == Classification::Rogue)
            .map(|(name, _)| name.as_str())
    }

    /// Number of names classified legit.
    pub fn legit_count(&self) -> usize {
        self.names
            .values()
            .filter(|c| **c == Classification::Legit)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use Classification::*;
        use Observation::*;

        assert_eq!(Unseen.transition(Observed), Rogue);
        assert_eq!(Rogue.transition(Observed), Rogue);
        assert_eq!(Legit.transition(Observed), Legit);
        assert_eq!(Unseen.transition(Matched), Legit);
        assert_eq!(Rogue.transition(Matched), Legit);
        assert_eq!(Legit.transition(Matched), Legit);
    }

    #[test]
    fn test_unseen_is_distinct_from_rogue() {
        let mut registry = RogueRegistry::new();
        assert_eq!(registry.classification("db1"), Classification::Unseen);
        assert_eq!(registry.rogues().count(), 0);

        registry.observe("db1");
        assert_eq!(registry.classification("db1"), Classification::Rogue);
        assert_eq!(registry.classification("db2"), Classification::Unseen);
    }

    #[test]
    fn test_legitimacy_is_sticky() {
        let mut registry = RogueRegistry::new();
        registry.observe("db1");
        registry.mark_legit("db1");
        registry.observe("db1");
        registry.observe("db1");

        assert_eq!(registry.classification("db1"), Classification::Legit);
        assert_eq!(registry.rogues().count(), 0);
        assert_eq!(registry.legit_count(), 1);
    }

    #[test]
    fn test_rogues_are_sorted() {
        let mut registry = RogueRegistry::new();
        for name in ["zeta", "alpha", "mid", "kept"] {
            registry.observe(name);
        }
        registry.mark_legit("kept");

        assert_eq!(registry.rogues().collect::<Vec<_>>(), vec!["alpha", "mid", "zeta"]);
        assert_eq!(registry.legit_count(), 1);
    }
}
