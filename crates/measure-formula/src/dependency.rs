//! Measure dependency tracking and the cyclical-dependency guard

use crate::node::ExpressionNode;
use ahash::{AHashMap, AHashSet};
use measure_formula_core::{ErrorCode, MetadataProvider, ValidationMessage};

/// Dependency graph between measures
///
/// Each measure maps to the measures its formula references. Precedents keep
/// insertion order so cycle paths are stable.
#[derive(Debug, Default, Clone)]
pub struct DependencyGraph {
    precedents: AHashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Create a new empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a dependency: dependent references precedent
    pub fn add_dependency(&mut self, precedent: &str, dependent: &str) {
        let precedents = self.precedents.entry(dependent.to_string()).or_default();
        if !precedents.iter().any(|p| p == precedent) {
            precedents.push(precedent.to_string());
        }
    }

    /// Measures the given measure references
    pub fn get_precedents(&self, measure: &str) -> impl Iterator<Item = &str> + '_ {
        self.precedents
            .get(measure)
            .into_iter()
            .flat_map(|v| v.iter().map(String::as_str))
    }

    /// A reference path from `measure` back to itself, if there is one
    pub fn find_cycle(&self, measure: &str) -> Option<Vec<String>> {
        let mut visited = AHashSet::new();
        let mut path = vec![measure.to_string()];
        if self.detect_cycle(measure, measure, &mut visited, &mut path) {
            Some(path)
        } else {
            None
        }
    }

    fn detect_cycle<'g>(
        &'g self,
        target: &str,
        measure: &'g str,
        visited: &mut AHashSet<&'g str>,
        path: &mut Vec<String>,
    ) -> bool {
        if !visited.insert(measure) {
            return false;
        }
        for precedent in self.get_precedents(measure) {
            path.push(precedent.to_string());
            if precedent == target || self.detect_cycle(target, precedent, visited, path) {
                return true;
            }
            path.pop();
        }
        false
    }
}

/// Check a compiled formula for the measure being edited against the model
///
/// Only the part of the model reachable from the formula's references is
/// loaded; each measure's formula is read at most once.
pub fn check_cyclical_dependency(
    root: &ExpressionNode,
    editing: &str,
    metadata: &dyn MetadataProvider,
) -> Option<ValidationMessage> {
    let editing = metadata
        .resolve_measure(editing)
        .map_or_else(|| editing.to_string(), |m| m.id.clone());

    let mut graph = DependencyGraph::new();
    let mut pending: Vec<String> = Vec::new();
    for member in root.member_references() {
        graph.add_dependency(member.id(), &editing);
        pending.push(member.id().to_string());
    }

    let mut loaded = AHashSet::new();
    while let Some(measure) = pending.pop() {
        if measure == editing || !loaded.insert(measure.clone()) {
            continue;
        }
        for precedent in metadata.dependent_measure_ids(&measure) {
            graph.add_dependency(&precedent, &measure);
            pending.push(precedent);
        }
    }

    let path = graph.find_cycle(&editing)?;
    tracing::debug!(measure = %editing, path = ?path, "cyclical dependency");
    Some(ValidationMessage::new(
        ErrorCode::CyclicalDependency,
        format!(
            "Measure {} depends on itself: {}",
            editing,
            path.iter()
                .rev()
                .map(|m| format!("[{}]", m))
                .collect::<Vec<_>>()
                .join(" -> ")
        ),
    ))
}
