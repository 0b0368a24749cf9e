//! In-memory metadata snapshot

use super::{Backend, Dimension, Measure, MetadataProvider};
use crate::field::{self, FieldKind};
use ahash::AHashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// A resolved view of the model's structure members
///
/// The sorted "all measures" view is computed lazily and dropped whenever the
/// member set changes.
#[derive(Debug, Clone)]
pub struct MetadataSnapshot {
    backend: Backend,
    dimensions: Vec<Arc<Dimension>>,
    measures: Vec<Arc<Measure>>,
    dimension_index: AHashMap<String, usize>,
    measure_index: AHashMap<String, usize>,
    measures_view: OnceCell<Vec<Arc<Measure>>>,
}

impl MetadataSnapshot {
    /// Create an empty snapshot for a backend
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            dimensions: Vec::new(),
            measures: Vec::new(),
            dimension_index: AHashMap::new(),
            measure_index: AHashMap::new(),
            measures_view: OnceCell::new(),
        }
    }

    /// Create a snapshot from complete member lists
    pub fn from_members(
        backend: Backend,
        dimensions: impl IntoIterator<Item = Dimension>,
        measures: impl IntoIterator<Item = Measure>,
    ) -> Self {
        let mut snapshot = Self::new(backend);
        for d in dimensions {
            snapshot.insert_dimension(d);
        }
        for m in measures {
            snapshot.insert_measure(m);
        }
        snapshot
    }

    pub fn with_dimension(mut self, dimension: Dimension) -> Self {
        self.insert_dimension(dimension);
        self
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.insert_measure(measure);
        self
    }

    /// Add or replace a dimension (matched by id)
    pub fn insert_dimension(&mut self, dimension: Dimension) {
        let dimension = Arc::new(dimension);
        match self.dimensions.iter().position(|d| d.id == dimension.id) {
            Some(idx) => self.dimensions[idx] = dimension,
            None => self.dimensions.push(dimension),
        }
        self.dimension_index = index_by_name(&self.dimensions, |d| (&d.id, d.alias.as_deref()));
    }

    /// Add or replace a measure (matched by id)
    pub fn insert_measure(&mut self, measure: Measure) {
        let measure = Arc::new(measure);
        match self.measures.iter().position(|m| m.id == measure.id) {
            Some(idx) => self.measures[idx] = measure,
            None => self.measures.push(measure),
        }
        self.members_changed();
    }

    /// Remove a measure by id
    pub fn remove_measure(&mut self, id: &str) -> Option<Arc<Measure>> {
        let idx = self.measures.iter().position(|m| m.id == id)?;
        let removed = self.measures.remove(idx);
        self.members_changed();
        Some(removed)
    }

    fn members_changed(&mut self) {
        self.measure_index = index_by_name(&self.measures, |m| (&m.id, m.alias.as_deref()));
        self.measures_view.take();
    }
}

fn index_by_name<T>(
    items: &[Arc<T>],
    names: impl Fn(&T) -> (&String, Option<&str>),
) -> AHashMap<String, usize> {
    let mut index = AHashMap::with_capacity(items.len() * 2);
    // Aliases first so that an id always wins over a clashing alias
    for (i, item) in items.iter().enumerate() {
        if let Some(alias) = names(item).1 {
            index.insert(alias.to_string(), i);
        }
    }
    for (i, item) in items.iter().enumerate() {
        index.insert(names(item).0.clone(), i);
    }
    index
}

impl MetadataProvider for MetadataSnapshot {
    fn resolve_dimension(&self, name: &str) -> Option<Arc<Dimension>> {
        self.dimension_index
            .get(name)
            .map(|&i| Arc::clone(&self.dimensions[i]))
    }

    fn resolve_measure(&self, name: &str) -> Option<Arc<Measure>> {
        self.measure_index
            .get(name)
            .map(|&i| Arc::clone(&self.measures[i]))
    }

    fn all_measures(&self) -> Vec<Arc<Measure>> {
        self.measures_view
            .get_or_init(|| {
                let mut view = self.measures.clone();
                view.sort_by(|a, b| a.id.cmp(&b.id));
                view
            })
            .clone()
    }

    fn all_dimensions(&self) -> Vec<Arc<Dimension>> {
        self.dimensions.clone()
    }

    fn dependent_measure_ids(&self, measure_id: &str) -> Vec<String> {
        let Some(formula) = self
            .resolve_measure(measure_id)
            .and_then(|m| m.formula.clone())
        else {
            return Vec::new();
        };

        let mut ids: Vec<String> = Vec::new();
        for reference in field::references(&formula).into_iter().filter_map(|(_, r)| r) {
            if reference.kind != FieldKind::Measure {
                continue;
            }
            let id = self
                .resolve_measure(&reference.id)
                .map(|m| m.id.clone())
                .unwrap_or(reference.id);
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    fn backend(&self) -> Backend {
        self.backend
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn snapshot() -> MetadataSnapshot {
        MetadataSnapshot::new(Backend::Hana)
            .with_dimension(Dimension::new("City").with_alias("Town"))
            .with_measure(Measure::new("Sales"))
            .with_measure(Measure::new("Margin").with_formula("[Sales] - [Cost] + [Sales]"))
            .with_measure(Measure::new("Cost").with_alias("Costs"))
    }

    #[test]
    fn test_resolve_by_id_and_alias() {
        let s = snapshot();
        assert_eq!(s.resolve_dimension("Town").unwrap().id, "City");
        assert_eq!(s.resolve_measure("Costs").unwrap().id, "Cost");
        assert!(s.resolve_measure("Profit").is_none());
    }

    #[test]
    fn test_dependent_ids_are_deduplicated() {
        let s = snapshot();
        assert_eq!(s.dependent_measure_ids("Margin"), vec!["Sales", "Cost"]);
        assert!(s.dependent_measure_ids("Sales").is_empty());
    }

    #[test]
    fn test_measure_view_invalidated_on_change() {
        let mut s = snapshot();
        let ids: Vec<_> = s.all_measures().iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["Cost", "Margin", "Sales"]);

        s.insert_measure(Measure::new("Amount"));
        assert_eq!(s.all_measures().len(), 4);
        assert_eq!(s.all_measures()[0].id, "Amount");

        s.remove_measure("Margin");
        let ids: Vec<_> = s.all_measures().iter().map(|m| m.id.clone()).collect();
        assert_eq!(ids, vec!["Amount", "Cost", "Sales"]);
    }
}
