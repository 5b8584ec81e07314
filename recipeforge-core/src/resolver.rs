//! External dependency resolution
//!
//! Resolves an external dependency name to a foreign package name by
//! cascading through static mapping tables, the run-wide resolution cache,
//! and finally the layer index. Lookups are memoized for the lifetime of a
//! run: once a name fails to resolve it stays failed until the cache is
//! replaced for the next run.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::layers::RecipeQuery;
use crate::Result;

/// Outcome of one external lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(String),
    Unresolved,
}

#[derive(Debug, Default)]
struct ResolutionState {
    resolved: HashMap<String, String>,
    unresolved: HashSet<String>,
}

/// Run-wide memoization of external lookups.
///
/// Shared by reference between all packages of a run and guarded by a mutex
/// so parallel generation cannot lose updates. Construct a fresh cache to
/// start an independent run.
#[derive(Debug, Default)]
pub struct ResolutionCache {
    state: Mutex<ResolutionState>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    // The memo stays valid even if a holder panicked mid-run; recover the
    // guard instead of propagating the poison.
    fn guard(&self) -> MutexGuard<'_, ResolutionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lookup(&self, name: &str) -> Option<Resolution> {
        let state = self.guard();
        if let Some(found) = state.resolved.get(name) {
            return Some(Resolution::Resolved(found.clone()));
        }
        if state.unresolved.contains(name) {
            return Some(Resolution::Unresolved);
        }
        None
    }

    fn record_resolved(&self, name: &str, found: &str) {
        let mut state = self.guard();
        state.unresolved.remove(name);
        state.resolved.insert(name.to_string(), found.to_string());
    }

    fn record_unresolved(&self, name: &str) {
        let mut state = self.guard();
        if !state.resolved.contains_key(name) {
            state.unresolved.insert(name.to_string());
        }
    }

    /// Names that failed to resolve so far, sorted.
    pub fn unresolved_names(&self) -> Vec<String> {
        let state = self.guard();
        let mut names: Vec<String> = state.unresolved.iter().cloned().collect();
        names.sort();
        names
    }
}

/// Ordered static mapping tables: dependency name -> ecosystem -> packages.
///
/// Tables are consulted in insertion order; the first table that maps the
/// name for the configured ecosystem wins, and the first listed package is
/// taken.
#[derive(Debug, Default)]
pub struct DependencyMapping {
    ecosystem: String,
    tables: Vec<MappingTable>,
}

type MappingTable = HashMap<String, HashMap<String, Vec<String>>>;

impl DependencyMapping {
    pub fn new(ecosystem: impl Into<String>) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            tables: Vec::new(),
        }
    }

    pub fn push_table(&mut self, table: MappingTable) {
        self.tables.push(table);
    }

    /// Parse a rosdep-style YAML table and append it.
    pub fn push_yaml(&mut self, content: &str) -> Result<()> {
        let table: MappingTable = serde_yaml::from_str(content)?;
        self.push_table(table);
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        for table in &self.tables {
            if let Some(first) = table
                .get(name)
                .and_then(|ecosystems| ecosystems.get(&self.ecosystem))
                .and_then(|packages| packages.first())
            {
                return Some(first.as_str());
            }
        }
        None
    }
}

/// The resolution cascade over mapping tables, cache, and layer index.
pub struct Resolver<'a> {
    mapping: &'a DependencyMapping,
    cache: &'a ResolutionCache,
    query: &'a dyn RecipeQuery,
}

impl<'a> Resolver<'a> {
    pub fn new(
        mapping: &'a DependencyMapping,
        cache: &'a ResolutionCache,
        query: &'a dyn RecipeQuery,
    ) -> Self {
        Self {
            mapping,
            cache,
            query,
        }
    }

    /// Resolve one external dependency name, short-circuiting on the first
    /// cascade step that answers.
    pub fn resolve_external(&self, name: &str) -> Resolution {
        if let Some(found) = self.mapping.lookup(name) {
            debug!("resolved '{}' as '{}' via mapping tables", name, found);
            return Resolution::Resolved(found.to_string());
        }

        match self.cache.lookup(name) {
            Some(Resolution::Resolved(found)) => {
                debug!("resolved '{}' as '{}' (cached)", name, found);
                return Resolution::Resolved(found);
            }
            Some(Resolution::Unresolved) => {
                debug!("failed to resolve '{}' (cached)", name);
                return Resolution::Unresolved;
            }
            None => {}
        }

        match self.query.query_recipe(name) {
            Ok(Some(recipe)) => {
                info!(
                    "resolved '{}' in layer index as '{}' from {}",
                    name, recipe.name, recipe.layer
                );
                self.cache.record_resolved(name, &recipe.name);
                Resolution::Resolved(recipe.name)
            }
            Ok(None) => {
                info!("failed to resolve '{}'", name);
                self.cache.record_unresolved(name);
                Resolution::Unresolved
            }
            Err(e) => {
                warn!("layer index query for '{}' failed: {}", name, e);
                self.cache.record_unresolved(name);
                Resolution::Unresolved
            }
        }
    }
}
