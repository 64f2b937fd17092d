//! Flat layout definitions as they arrive from the layout loader.

use crate::binding::{DataModelBindings, DataModelReference, GROUP_BINDING};
use crate::error::LayoutError;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentKind {
    Leaf,
    Group,
    RepeatingGroup,
}

/// One entry of a page's flat component list.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutComponentDefinition {
    pub id: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default, skip_serializing_if = "DataModelBindings::is_empty")]
    pub data_model_bindings: DataModelBindings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edit: Option<GroupEdit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupEdit {
    #[serde(default)]
    pub multi_page: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<RowWindow>,
}

/// Inclusive window of raw row indices to expand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowWindow {
    pub start: usize,
    pub stop: usize,
}

impl RowWindow {
    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.stop
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub rows_per_page: usize,
}

/// A child entry of a group with its optional multi-page prefix removed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildRef<'a> {
    pub id: &'a str,
    pub page: Option<usize>,
}

impl<'a> ChildRef<'a> {
    /// Splits `"2:childId"` into page `2` and id `childId`. Prefixes that are
    /// not a plain number are part of the id.
    pub fn parse(raw: &'a str) -> Self {
        if let Some((prefix, id)) = raw.split_once(':') {
            if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
                if let Ok(page) = prefix.parse() {
                    return Self { id, page: Some(page) };
                }
            }
        }
        Self { id: raw, page: None }
    }
}

impl LayoutComponentDefinition {
    pub fn new(id: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            component_type: component_type.into(),
            data_model_bindings: DataModelBindings::new(),
            children: Vec::new(),
            max_count: None,
            edit: None,
            pagination: None,
            hidden: None,
        }
    }

    pub fn with_binding(mut self, name: &str, field: &str) -> Self {
        self.data_model_bindings
            .insert(name.to_owned(), DataModelReference::new(field));
        self
    }

    pub fn with_children<I, S>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> ComponentKind {
        let ty = self.component_type.as_str();
        if ty.eq_ignore_ascii_case("RepeatingGroup") {
            ComponentKind::RepeatingGroup
        } else if ty.eq_ignore_ascii_case("Group") {
            if self.max_count.is_some_and(|max| max > 1) {
                ComponentKind::RepeatingGroup
            } else {
                ComponentKind::Group
            }
        } else {
            ComponentKind::Leaf
        }
    }

    pub fn is_group(&self) -> bool {
        self.kind() != ComponentKind::Leaf
    }

    pub fn is_repeating(&self) -> bool {
        self.kind() == ComponentKind::RepeatingGroup
    }

    pub fn group_binding(&self) -> Option<&DataModelReference> {
        self.data_model_bindings.get(GROUP_BINDING)
    }

    pub fn row_window(&self) -> Option<RowWindow> {
        self.edit.as_ref().and_then(|edit| edit.filter)
    }

    /// Children with multi-page prefixes stripped. Leaves have none.
    pub fn child_refs(&self) -> impl Iterator<Item = ChildRef<'_>> {
        let children: &[String] = if self.is_group() {
            self.children.as_slice()
        } else {
            &[]
        };
        children.iter().map(|raw| ChildRef::parse(raw))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LayoutFile {
    Components(Vec<LayoutComponentDefinition>),
    Wrapped { data: LayoutData },
}

#[derive(Deserialize)]
struct LayoutData {
    layout: Vec<LayoutComponentDefinition>,
}

/// Parses a page layout. Accepts either a bare component array or the
/// `{ "data": { "layout": [...] } }` file shape.
pub fn parse_layout(json: &str) -> Result<Vec<LayoutComponentDefinition>, LayoutError> {
    let file: LayoutFile = serde_json::from_str(json)?;
    Ok(match file {
        LayoutFile::Components(components) => components,
        LayoutFile::Wrapped { data } => data.layout,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_groups_by_type_and_max_count() {
        let leaf = LayoutComponentDefinition::new("name", "Input");
        let group = LayoutComponentDefinition::new("g", "Group");
        let mut repeating = LayoutComponentDefinition::new("r", "Group");
        repeating.max_count = Some(5);
        let explicit = LayoutComponentDefinition::new("e", "repeatinggroup");

        assert_eq!(leaf.kind(), ComponentKind::Leaf);
        assert_eq!(group.kind(), ComponentKind::Group);
        assert_eq!(repeating.kind(), ComponentKind::RepeatingGroup);
        assert_eq!(explicit.kind(), ComponentKind::RepeatingGroup);
    }

    #[test]
    fn strips_numeric_page_prefixes_only() {
        assert_eq!(
            ChildRef::parse("0:childId"),
            ChildRef {
                id: "childId",
                page: Some(0)
            }
        );
        assert_eq!(ChildRef::parse("12:x").page, Some(12));
        assert_eq!(
            ChildRef::parse("a:b"),
            ChildRef {
                id: "a:b",
                page: None
            }
        );
        assert_eq!(ChildRef::parse(":b").id, ":b");
    }

    #[test]
    fn parses_wrapped_layout_file() {
        let json = r#"{
            "data": { "layout": [
                { "id": "g", "type": "Group", "maxCount": 3,
                  "dataModelBindings": { "group": "People" },
                  "children": ["0:name"],
                  "edit": { "multiPage": true, "filter": { "start": 1, "stop": 2 } } },
                { "id": "name", "type": "Input",
                  "dataModelBindings": { "simpleBinding": "People.Name" } }
            ] }
        }"#;
        let layout = parse_layout(json).unwrap();
        assert_eq!(layout.len(), 2);
        assert!(layout[0].is_repeating());
        assert_eq!(layout[0].row_window(), Some(RowWindow { start: 1, stop: 2 }));
        assert_eq!(layout[0].child_refs().next().unwrap().id, "name");
        assert_eq!(layout[1].data_model_bindings["simpleBinding"].field, "People.Name");
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(parse_layout("{ not json").is_err());
    }
}
