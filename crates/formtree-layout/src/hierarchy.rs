//! Expands a flat page layout into a nested node hierarchy.
//!
//! Groups become containers for the components named in their `children`
//! list. Repeating groups are expanded once per row reported by the
//! [`RowSource`]: each row gets a clone of the group's child subtree with
//! row-suffixed ids and bindings transposed into that row. Nested repeating
//! groups accumulate suffixes (`Age-2-0`).
//!
//! Malformed layouts do not abort the expansion. The problem is recorded as a
//! [`ConfigError`] on the node where it was found and the rest of the page is
//! built normally.

use crate::binding::{transpose, DataModelBindings, RowContext, GROUP_BINDING};
use crate::collections::map::{HashMap, HashSet};
use crate::definition::{ChildRef, LayoutComponentDefinition};
use crate::error::ConfigError;
use crate::form_data::{RowQuery, RowSource};
use crate::NodeId;
use smallvec::SmallVec;
use std::sync::Arc;

/// One enclosing repeating-group row of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowScope {
    /// Base component id of the repeating group.
    pub group: String,
    /// The group binding with indices stripped.
    pub base_binding: String,
    /// The group binding transposed into the group's own enclosing rows.
    pub binding: String,
    pub index: usize,
}

/// The row a node was cloned into, for direct children of a repeating group.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RowRef {
    pub index: usize,
    pub uuid: String,
}

#[derive(Clone, Debug)]
pub struct ExpandedNode {
    pub id: NodeId,
    pub base_component_id: String,
    pub definition: Arc<LayoutComponentDefinition>,
    /// Bindings transposed into every enclosing row, outermost first.
    pub bindings: DataModelBindings,
    pub row: Option<RowRef>,
    pub row_scopes: SmallVec<[RowScope; 2]>,
    pub multi_page_index: Option<usize>,
    pub errors: Vec<ConfigError>,
    pub content: NodeContent,
}

#[derive(Clone, Debug)]
pub enum NodeContent {
    Leaf,
    Group { children: Vec<ExpandedNode> },
    Repeating { rows: Vec<ExpandedRow> },
}

#[derive(Clone, Debug)]
pub struct ExpandedRow {
    pub index: usize,
    pub uuid: String,
    pub items: Vec<ExpandedNode>,
}

impl ExpandedNode {
    pub fn is_group(&self) -> bool {
        !matches!(self.content, NodeContent::Leaf)
    }

    /// Direct children across all rows.
    pub fn children(&self) -> Box<dyn Iterator<Item = &ExpandedNode> + '_> {
        match &self.content {
            NodeContent::Leaf => Box::new(std::iter::empty()),
            NodeContent::Group { children } => Box::new(children.iter()),
            NodeContent::Repeating { rows } => Box::new(rows.iter().flat_map(|row| row.items.iter())),
        }
    }

    /// Number of nodes in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self.children().map(ExpandedNode::subtree_len).sum::<usize>()
    }
}

#[derive(Clone, Default)]
struct ExpandContext {
    scopes: SmallVec<[RowScope; 2]>,
    row: Option<RowRef>,
    multi_page_index: Option<usize>,
}

struct HierarchyBuilder<'a> {
    definitions: HashMap<&'a str, Arc<LayoutComponentDefinition>>,
    duplicates: HashSet<&'a str>,
    /// Child id to the group that owns it.
    owners: HashMap<&'a str, &'a str>,
    rows: &'a dyn RowSource,
}

/// Builds the top-level nodes of one page.
///
/// Components referenced from any group's `children` are not top level; that
/// set is computed up front, before any recursion. A component that is only
/// reachable through a children cycle is expanded as an extra top-level node
/// carrying [`ConfigError::OnlyInCycle`], so it stays visible in the tree.
pub fn build(layout: &[LayoutComponentDefinition], rows: &dyn RowSource) -> Vec<ExpandedNode> {
    let mut definitions = HashMap::default();
    let mut duplicates = HashSet::default();
    for definition in layout {
        if definitions.contains_key(definition.id.as_str()) {
            log::warn!("component id {} is defined more than once", definition.id);
            duplicates.insert(definition.id.as_str());
            continue;
        }
        definitions.insert(definition.id.as_str(), Arc::new(definition.clone()));
    }

    // The first group listing a child owns it.
    let mut owners: HashMap<&str, &str> = HashMap::default();
    let mut listed: HashSet<&str> = HashSet::default();
    for definition in layout {
        if !listed.insert(definition.id.as_str()) {
            continue;
        }
        for child in definition.child_refs() {
            owners.entry(child.id).or_insert(definition.id.as_str());
        }
    }

    let builder = HierarchyBuilder {
        definitions,
        duplicates,
        owners,
        rows,
    };

    let mut seen = HashSet::default();
    let mut ancestors = Vec::new();
    let mut top_level = Vec::new();
    for definition in layout {
        let id = definition.id.as_str();
        if builder.owners.contains_key(id) || !seen.insert(id) {
            continue;
        }
        let shared = Arc::clone(&builder.definitions[id]);
        top_level.push(builder.expand(&shared, &ExpandContext::default(), &mut ancestors));
    }

    let mut reached: HashSet<&str> = HashSet::default();
    for node in &top_level {
        if let Some((id, _)) = builder.definitions.get_key_value(node.base_component_id.as_str()) {
            builder.mark_reached(id, &mut reached);
        }
    }
    for definition in layout {
        let id = definition.id.as_str();
        if reached.contains(id) || !seen.insert(id) {
            continue;
        }
        let shared = Arc::clone(&builder.definitions[id]);
        let mut node = builder.expand(&shared, &ExpandContext::default(), &mut ancestors);
        log::warn!("{id}: {}", ConfigError::OnlyInCycle);
        node.errors.insert(0, ConfigError::OnlyInCycle);
        builder.mark_reached(id, &mut reached);
        top_level.push(node);
    }
    top_level
}

impl<'a> HierarchyBuilder<'a> {
    /// Adds `root` and every definition reachable through children lists.
    fn mark_reached<'s>(&'s self, root: &'s str, reached: &mut HashSet<&'s str>) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !reached.insert(id) {
                continue;
            }
            if let Some(definition) = self.definitions.get(id) {
                stack.extend(definition.child_refs().map(|child| child.id));
            }
        }
    }

    fn expand(
        &self,
        definition: &Arc<LayoutComponentDefinition>,
        ctx: &ExpandContext,
        ancestors: &mut Vec<String>,
    ) -> ExpandedNode {
        let id = NodeId::for_rows(&definition.id, ctx.scopes.iter().map(|scope| scope.index));
        let bindings = transpose_bindings(&definition.data_model_bindings, &ctx.scopes);

        let mut errors = Vec::new();
        if self.duplicates.contains(definition.id.as_str()) {
            errors.push(ConfigError::DuplicateId {
                id: definition.id.clone(),
            });
        }

        let content = if !definition.is_group() {
            NodeContent::Leaf
        } else {
            ancestors.push(definition.id.clone());
            let content = if definition.is_repeating() {
                self.expand_rows(definition, &id, &bindings, ctx, ancestors, &mut errors)
            } else {
                NodeContent::Group {
                    children: self.expand_children(definition, ctx, ancestors, &mut errors),
                }
            };
            ancestors.pop();
            content
        };

        for error in &errors {
            log::warn!("{id}: {error}");
        }

        ExpandedNode {
            id,
            base_component_id: definition.id.clone(),
            definition: Arc::clone(definition),
            bindings,
            row: ctx.row.clone(),
            row_scopes: ctx.scopes.clone(),
            multi_page_index: ctx.multi_page_index,
            errors,
            content,
        }
    }

    fn expand_children(
        &self,
        group: &LayoutComponentDefinition,
        ctx: &ExpandContext,
        ancestors: &mut Vec<String>,
        errors: &mut Vec<ConfigError>,
    ) -> Vec<ExpandedNode> {
        let mut children = Vec::with_capacity(group.children.len());
        for ChildRef { id, page } in group.child_refs() {
            let Some(child) = self.definitions.get(id) else {
                errors.push(ConfigError::MissingChild {
                    child: id.to_owned(),
                });
                continue;
            };
            if ancestors.iter().any(|ancestor| ancestor == id) {
                errors.push(ConfigError::CyclicChild {
                    child: id.to_owned(),
                });
                continue;
            }
            if self.owners.get(id).is_some_and(|owner| *owner != group.id) {
                errors.push(ConfigError::SharedChild {
                    child: id.to_owned(),
                });
                continue;
            }
            let child_ctx = ExpandContext {
                scopes: ctx.scopes.clone(),
                row: ctx.row.clone(),
                multi_page_index: page,
            };
            children.push(self.expand(child, &child_ctx, ancestors));
        }
        children
    }

    fn expand_rows(
        &self,
        group: &LayoutComponentDefinition,
        id: &NodeId,
        bindings: &DataModelBindings,
        ctx: &ExpandContext,
        ancestors: &mut Vec<String>,
        errors: &mut Vec<ConfigError>,
    ) -> NodeContent {
        let (Some(raw), Some(transposed)) = (group.group_binding(), bindings.get(GROUP_BINDING))
        else {
            errors.push(ConfigError::MissingGroupBinding);
            return NodeContent::Repeating { rows: Vec::new() };
        };
        let base_binding = raw.path().without_indices().to_string();

        let query = RowQuery {
            node_id: id.as_str(),
            base_component_id: &group.id,
            binding: Some(&transposed.field),
        };
        let window = group.row_window();
        let rows = self
            .rows
            .rows(&query)
            .into_iter()
            .filter(|row| window.map_or(true, |window| window.contains(row.index)))
            .map(|row| {
                let mut scopes = ctx.scopes.clone();
                scopes.push(RowScope {
                    group: group.id.clone(),
                    base_binding: base_binding.clone(),
                    binding: transposed.field.clone(),
                    index: row.index,
                });
                let row_ctx = ExpandContext {
                    scopes,
                    row: Some(RowRef {
                        index: row.index,
                        uuid: row.row_uuid.clone(),
                    }),
                    multi_page_index: None,
                };
                // Row errors repeat per row; the group keeps one copy.
                let mut row_errors = Vec::new();
                let items = self.expand_children(group, &row_ctx, ancestors, &mut row_errors);
                for error in row_errors {
                    if !errors.contains(&error) {
                        errors.push(error);
                    }
                }
                ExpandedRow {
                    index: row.index,
                    uuid: row.row_uuid,
                    items,
                }
            })
            .collect();

        NodeContent::Repeating { rows }
    }
}

fn transpose_bindings(bindings: &DataModelBindings, scopes: &[RowScope]) -> DataModelBindings {
    if scopes.is_empty() {
        return bindings.clone();
    }
    bindings
        .iter()
        .map(|(name, reference)| {
            let transposed = scopes.iter().fold(reference.clone(), |reference, scope| {
                transpose(
                    &reference,
                    &scope.base_binding,
                    &RowContext {
                        index: scope.index,
                        parent_binding: &scope.binding,
                    },
                )
            });
            (name.clone(), transposed)
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/hierarchy_tests.rs"]
mod tests;
