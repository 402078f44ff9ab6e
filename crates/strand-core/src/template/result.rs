//! Search and generate results.

use crate::Addr;
use std::collections::BTreeMap;

/// Every embedding found by a search.
///
/// All rows share one alias table since they share the template shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub aliases: BTreeMap<String, usize>,
    pub rows: Vec<Vec<Addr>>,
    /// The row cap was reached and further matches were dropped.
    pub truncated: bool,
}

impl MatchResult {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Address bound to `alias` in row `row`.
    #[must_use]
    pub fn get(&self, row: usize, alias: &str) -> Option<Addr> {
        let pos = self.aliases.get(alias)?;
        self.rows.get(row)?.get(*pos).copied()
    }
}

/// The single embedding produced by a generate call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResult {
    pub aliases: BTreeMap<String, usize>,
    pub addrs: Vec<Addr>,
}

impl GenerateResult {
    /// Address bound to `alias`.
    #[must_use]
    pub fn get(&self, alias: &str) -> Option<Addr> {
        let pos = self.aliases.get(alias)?;
        self.addrs.get(*pos).copied()
    }
}
