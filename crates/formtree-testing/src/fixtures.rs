//! Layout builders and row sources shared by the formtree test suites.

use formtree_layout::{LayoutComponentDefinition, RowDescriptor, RowQuery, RowSource};
use std::cell::RefCell;
use std::collections::HashMap;

pub fn input(id: &str, field: &str) -> LayoutComponentDefinition {
    LayoutComponentDefinition::new(id, "Input").with_binding("simpleBinding", field)
}

pub fn header(id: &str) -> LayoutComponentDefinition {
    LayoutComponentDefinition::new(id, "Header")
}

pub fn group(id: &str, children: &[&str]) -> LayoutComponentDefinition {
    LayoutComponentDefinition::new(id, "Group").with_children(children.iter().copied())
}

pub fn repeating(id: &str, binding: &str, children: &[&str]) -> LayoutComponentDefinition {
    LayoutComponentDefinition::new(id, "RepeatingGroup")
        .with_binding("group", binding)
        .with_children(children.iter().copied())
}

/// `Group2` rows holding an `Input` and a nested `Nested` group whose rows
/// hold an `Age` field.
pub fn nested_layout() -> Vec<LayoutComponentDefinition> {
    vec![
        repeating("Group2", "Group2", &["Input", "Nested"]),
        input("Input", "Group2.Input"),
        repeating("Nested", "Group2.Nested", &["Age"]),
        input("Age", "Group2.Nested.Age"),
    ]
}

/// Row source answering with a fixed row count per repeating group.
///
/// Counts are keyed by base component id; groups without an entry get the
/// default count. Every query is recorded for later inspection.
#[derive(Debug, Default)]
pub struct FixedRows {
    default: usize,
    counts: HashMap<String, usize>,
    queries: RefCell<Vec<String>>,
}

impl FixedRows {
    pub fn uniform(count: usize) -> Self {
        Self {
            default: count,
            ..Self::default()
        }
    }

    pub fn with(mut self, base_component_id: &str, count: usize) -> Self {
        self.counts.insert(base_component_id.to_owned(), count);
        self
    }

    pub fn set(&mut self, base_component_id: &str, count: usize) {
        self.counts.insert(base_component_id.to_owned(), count);
    }

    /// NodeIds of the groups asked for rows, in query order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl RowSource for FixedRows {
    fn rows(&self, query: &RowQuery<'_>) -> Vec<RowDescriptor> {
        self.queries.borrow_mut().push(query.node_id.to_owned());
        let count = self
            .counts
            .get(query.base_component_id)
            .copied()
            .unwrap_or(self.default);
        (0..count)
            .map(|index| RowDescriptor::new(index, format!("{}:{index}", query.base_component_id)))
            .collect()
    }
}
