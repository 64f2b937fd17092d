//! Data-model field paths and their transposition into repeating-group rows.
//!
//! A field path is a dot-separated list of segments, each optionally carrying
//! one positional index: `Group2[1].Nested.Age`. Transposition rewrites the
//! un-indexed segments that belong to a repeating group so the path addresses
//! one specific row of that group.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

/// Binding name (`simpleBinding`, `group`, ...) to data-model reference.
pub type DataModelBindings = BTreeMap<String, DataModelReference>;

/// Binding key that points a repeating group at its backing array.
pub const GROUP_BINDING: &str = "group";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PathSegment {
    name: String,
    index: Option<usize>,
}

impl PathSegment {
    pub fn new(name: impl Into<String>, index: Option<usize>) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    fn parse(raw: &str) -> Self {
        if let Some(open) = raw.find('[') {
            if let Some(inner) = raw[open + 1..].strip_suffix(']') {
                if let Ok(index) = inner.parse::<usize>() {
                    return Self::new(&raw[..open], Some(index));
                }
            }
        }
        Self::new(raw, None)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}[{}]", self.name, index),
            None => f.write_str(&self.name),
        }
    }
}

/// Parsed field path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: SmallVec<[PathSegment; 4]>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split('.')
            .filter(|part| !part.is_empty())
            .map(PathSegment::parse)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The same path with every positional index removed.
    pub fn without_indices(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .map(|segment| PathSegment::new(segment.name.clone(), None))
                .collect(),
        }
    }

    /// True when the leading segment names equal every segment name of
    /// `prefix`. Indices are ignored on both sides; partial segment names
    /// never match (`Group` is not a prefix of `Group2`).
    pub fn starts_with_segments(&self, prefix: &FieldPath) -> bool {
        prefix.len() <= self.len()
            && self
                .segments
                .iter()
                .zip(prefix.segments.iter())
                .all(|(ours, theirs)| ours.name == theirs.name)
    }

    fn set_last_index(&mut self, index: usize) {
        if let Some(last) = self.segments.last_mut() {
            last.index = Some(index);
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.segments.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Reference into the data model.
///
/// Layout JSON may spell a binding either as a bare path string or as an
/// object with `field` and an optional `dataType`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawReference")]
pub struct DataModelReference {
    pub field: String,
    #[serde(rename = "dataType", default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawReference {
    Path(String),
    Full {
        field: String,
        #[serde(rename = "dataType", default)]
        data_type: Option<String>,
    },
}

impl From<RawReference> for DataModelReference {
    fn from(raw: RawReference) -> Self {
        match raw {
            RawReference::Path(field) => Self {
                field,
                data_type: None,
            },
            RawReference::Full { field, data_type } => Self { field, data_type },
        }
    }
}

impl DataModelReference {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            data_type: None,
        }
    }

    pub fn path(&self) -> FieldPath {
        FieldPath::parse(&self.field)
    }
}

impl From<&str> for DataModelReference {
    fn from(field: &str) -> Self {
        Self::new(field)
    }
}

/// Row a node is being expanded into.
#[derive(Clone, Copy, Debug)]
pub struct RowContext<'a> {
    /// Raw row index from the row source.
    pub index: usize,
    /// The group's own binding, already transposed into its enclosing rows.
    pub parent_binding: &'a str,
}

/// Rewrites `reference` to address row `row.index` of the repeating group
/// bound to `group_base_binding`.
///
/// References outside the group are returned unchanged. Inside the matched
/// prefix an un-indexed segment takes the row location's index; an explicit
/// index is kept, and when it disagrees with the location the rewrite stops,
/// since the reference deliberately points at another row.
pub fn transpose(
    reference: &DataModelReference,
    group_base_binding: &str,
    row: &RowContext<'_>,
) -> DataModelReference {
    let base = FieldPath::parse(group_base_binding);
    let mut path = reference.path();
    if base.is_empty() || !path.starts_with_segments(&base) {
        return reference.clone();
    }

    let mut location = FieldPath::parse(row.parent_binding);
    location.set_last_index(row.index);

    for (segment, target) in path
        .segments
        .iter_mut()
        .zip(location.segments.iter())
        .take(base.len())
    {
        if segment.name != target.name {
            break;
        }
        match (segment.index, target.index) {
            (None, index) => segment.index = index,
            (Some(existing), Some(index)) if existing != index => break,
            _ => {}
        }
    }

    DataModelReference {
        field: path.to_string(),
        data_type: reference.data_type.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at<'a>(index: usize, parent_binding: &'a str) -> RowContext<'a> {
        RowContext {
            index,
            parent_binding,
        }
    }

    fn field(reference: DataModelReference) -> String {
        reference.field
    }

    #[test]
    fn parses_indexed_segments() {
        let path = FieldPath::parse("Group2[1].Nested.Age");
        assert_eq!(path.len(), 3);
        assert_eq!(path.segments()[0].index(), Some(1));
        assert_eq!(path.segments()[1].index(), None);
        assert_eq!(path.to_string(), "Group2[1].Nested.Age");
        assert_eq!(path.without_indices().to_string(), "Group2.Nested.Age");
    }

    #[test]
    fn malformed_index_stays_part_of_the_name() {
        let path = FieldPath::parse("Group[x].Age");
        assert_eq!(path.segments()[0].name(), "Group[x]");
        assert_eq!(path.segments()[0].index(), None);
    }

    #[test]
    fn transposes_direct_child_binding() {
        let out = transpose(&"Group2.Input".into(), "Group2", &at(3, "Group2"));
        assert_eq!(field(out), "Group2[3].Input");
    }

    #[test]
    fn transposes_nested_group_child() {
        let out = transpose(
            &"Group2.Nested.Age".into(),
            "Group2.Nested",
            &at(2, "Group2[2].Nested"),
        );
        assert_eq!(field(out), "Group2[2].Nested[2].Age");
    }

    #[test]
    fn fully_indexed_path_is_untouched() {
        let reference: DataModelReference = "Group2[1].Nested[1].Age".into();
        let out = transpose(&reference, "Group2.Nested", &at(2, "Group2[2].Nested"));
        assert_eq!(out, reference);
    }

    #[test]
    fn explicit_inner_index_is_preserved() {
        let outer = transpose(&"Group2.Nested[1].Age".into(), "Group2", &at(2, "Group2"));
        assert_eq!(outer.field, "Group2[2].Nested[1].Age");
        let inner = transpose(&outer, "Group2.Nested", &at(2, "Group2[2].Nested"));
        assert_eq!(inner.field, "Group2[2].Nested[1].Age");
    }

    #[test]
    fn partial_segment_names_do_not_match() {
        let reference: DataModelReference = "Group22.Other".into();
        assert_eq!(transpose(&reference, "Group", &at(0, "Group")), reference);
        let reference: DataModelReference = "Group2.Other".into();
        assert_eq!(transpose(&reference, "Group", &at(0, "Group")), reference);
    }

    #[test]
    fn data_type_survives_transposition() {
        let reference = DataModelReference {
            field: "Group.Value".into(),
            data_type: Some("model".into()),
        };
        let out = transpose(&reference, "Group", &at(1, "Group"));
        assert_eq!(out.field, "Group[1].Value");
        assert_eq!(out.data_type.as_deref(), Some("model"));
    }

    #[test]
    fn deserializes_both_binding_spellings() {
        let bindings: DataModelBindings = serde_json::from_str(
            r#"{"simpleBinding":"Group.Name","list":{"field":"Group.List","dataType":"other"}}"#,
        )
        .unwrap();
        assert_eq!(bindings["simpleBinding"], DataModelReference::new("Group.Name"));
        assert_eq!(bindings["list"].data_type.as_deref(), Some("other"));
    }
}
