//! Collaborators that supply live form data to the hierarchy builder.

use crate::binding::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Row-identity field stored on every object inside a repeating array.
pub const ROW_ID_KEY: &str = "altinnRowId";

/// One row of a repeating group as reported by the form data.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowDescriptor {
    /// Zero-based position; changes when rows are inserted ahead of it.
    pub index: usize,
    /// Stable identity across re-expansion.
    pub row_uuid: String,
}

impl RowDescriptor {
    pub fn new(index: usize, row_uuid: impl Into<String>) -> Self {
        Self {
            index,
            row_uuid: row_uuid.into(),
        }
    }
}

/// What the hierarchy builder knows about a repeating group when it asks
/// for its rows.
#[derive(Clone, Copy, Debug)]
pub struct RowQuery<'a> {
    /// Row-scoped id of the group node (`Nested-2` for a nested group in row 2).
    pub node_id: &'a str,
    pub base_component_id: &'a str,
    /// The group binding transposed into its enclosing rows.
    pub binding: Option<&'a str>,
}

pub trait RowSource {
    fn rows(&self, query: &RowQuery<'_>) -> Vec<RowDescriptor>;
}

impl<F> RowSource for F
where
    F: Fn(&RowQuery<'_>) -> Vec<RowDescriptor>,
{
    fn rows(&self, query: &RowQuery<'_>) -> Vec<RowDescriptor> {
        self(query)
    }
}

/// Row source for layouts without repeating groups.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRows;

impl RowSource for NoRows {
    fn rows(&self, _query: &RowQuery<'_>) -> Vec<RowDescriptor> {
        Vec::new()
    }
}

/// Key-path access into the form data model.
pub trait FormDataAccessor {
    fn value(&self, path: &FieldPath) -> Option<&Value>;
}

/// Form data held as one JSON document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonFormData {
    root: Value,
}

impl JsonFormData {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn get(&self, path: &str) -> Option<&Value> {
        self.value(&FieldPath::parse(path))
    }
}

impl FormDataAccessor for JsonFormData {
    fn value(&self, path: &FieldPath) -> Option<&Value> {
        let mut current = &self.root;
        for segment in path.segments() {
            current = current.get(segment.name())?;
            if let Some(index) = segment.index() {
                current = current.get(index)?;
            }
        }
        Some(current)
    }
}

/// Derives repeating-group rows from the length of the array at each
/// group's binding.
pub struct FormDataRowSource<'a, A: ?Sized> {
    data: &'a A,
}

impl<'a, A: FormDataAccessor + ?Sized> FormDataRowSource<'a, A> {
    pub fn new(data: &'a A) -> Self {
        Self { data }
    }
}

impl<A: FormDataAccessor + ?Sized> RowSource for FormDataRowSource<'_, A> {
    fn rows(&self, query: &RowQuery<'_>) -> Vec<RowDescriptor> {
        let Some(binding) = query.binding else {
            return Vec::new();
        };
        let Some(Value::Array(items)) = self.data.value(&FieldPath::parse(binding)) else {
            return Vec::new();
        };
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let uuid = item
                    .get(ROW_ID_KEY)
                    .and_then(Value::as_str)
                    .map(str::to_owned)
                    .unwrap_or_else(|| format!("{binding}[{index}]"));
                RowDescriptor::new(index, uuid)
            })
            .collect()
    }
}
