//! Component-type hooks consulted during hidden-state resolution.

use crate::node_data::NodeData;
use crate::state::NodesState;
use formtree_layout::collections::map::HashMap;
use std::fmt;
use std::rc::Rc;

/// Container-specific visibility of direct children.
pub trait ContainerBehavior {
    /// True when `parent` hides `child` regardless of rules.
    fn is_child_hidden(&self, parent: &NodeData, child: &NodeData, state: &NodesState) -> bool;
}

/// Hides repeating-group rows outside the group's current pagination page.
#[derive(Clone, Copy, Debug, Default)]
pub struct PaginatedRows;

impl ContainerBehavior for PaginatedRows {
    fn is_child_hidden(&self, parent: &NodeData, child: &NodeData, _state: &NodesState) -> bool {
        match (parent.pagination, child.row_index) {
            (Some(pagination), Some(row)) => !pagination.contains_row(row),
            _ => false,
        }
    }
}

/// Behaviors keyed by component type, matched ASCII case-insensitively.
#[derive(Clone)]
pub struct ComponentRegistry {
    behaviors: HashMap<String, Rc<dyn ContainerBehavior>>,
}

impl ComponentRegistry {
    /// Registry without any behavior.
    pub fn empty() -> Self {
        Self {
            behaviors: HashMap::default(),
        }
    }

    /// Registry with the built-in group behaviors.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("Group", PaginatedRows);
        registry.register("RepeatingGroup", PaginatedRows);
        registry
    }

    pub fn register(&mut self, component_type: &str, behavior: impl ContainerBehavior + 'static) {
        self.behaviors
            .insert(component_type.to_ascii_lowercase(), Rc::new(behavior));
    }

    pub fn behavior(&self, component_type: &str) -> Option<&dyn ContainerBehavior> {
        self.behaviors
            .get(&component_type.to_ascii_lowercase())
            .map(|behavior| &**behavior)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&String> = self.behaviors.keys().collect();
        types.sort();
        f.debug_struct("ComponentRegistry")
            .field("types", &types)
            .finish()
    }
}
