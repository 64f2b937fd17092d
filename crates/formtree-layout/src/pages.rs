use crate::definition::LayoutComponentDefinition;
use crate::error::NodeError;
use crate::form_data::RowSource;
use crate::hash::fingerprint;
use crate::tree::{LayoutPage, NodeRef};

/// Every page of a form, plus which one is current.
///
/// Component ids are unique per page but may repeat across pages (the same
/// sub-layout rendered twice). Lookups try the current page first and then
/// the remaining pages in registration order.
#[derive(Debug, Default)]
pub struct LayoutPages {
    pages: Vec<LayoutPage>,
    current: Option<usize>,
    layout_fingerprint: u64,
}

impl LayoutPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expands every `(page key, layout)` pair with the same row source.
    /// The first page becomes current.
    pub fn build<'a, I>(layouts: I, rows: &dyn RowSource) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [LayoutComponentDefinition])>,
    {
        let mut pages = Self::new();
        for (key, layout) in layouts {
            pages.add_page(LayoutPage::build(key, layout, rows));
        }
        if !pages.pages.is_empty() {
            pages.current = Some(0);
        }
        pages
    }

    /// Registers a page. Re-registering a key replaces the old page in place.
    pub fn add_page(&mut self, page: LayoutPage) {
        match self.position(page.key()) {
            Some(index) => self.pages[index] = page,
            None => self.pages.push(page),
        }
        let per_page: Vec<(&str, u64)> = self
            .pages
            .iter()
            .map(|page| (page.key(), page.layout_fingerprint()))
            .collect();
        self.layout_fingerprint = fingerprint(&per_page);
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.pages.iter().position(|page| page.key() == key)
    }

    pub fn set_current_page(&mut self, key: &str) -> Result<(), NodeError> {
        let index = self.position(key).ok_or_else(|| NodeError::UnknownPage {
            key: key.to_owned(),
        })?;
        self.current = Some(index);
        Ok(())
    }

    pub fn current_page(&self) -> Option<&LayoutPage> {
        self.current.and_then(|index| self.pages.get(index))
    }

    pub fn page(&self, key: &str) -> Option<&LayoutPage> {
        self.position(key).map(|index| &self.pages[index])
    }

    /// Pages in registration order.
    pub fn pages(&self) -> &[LayoutPage] {
        &self.pages
    }

    /// Hash of the page keys and the layout definitions of every page, in
    /// registration order. Zero for a collection without pages.
    pub fn layout_fingerprint(&self) -> u64 {
        self.layout_fingerprint
    }

    fn search_order(&self) -> impl Iterator<Item = &LayoutPage> + '_ {
        let current = self.current_page();
        current.into_iter().chain(
            self.pages
                .iter()
                .enumerate()
                .filter(move |(index, _)| Some(*index) != self.current)
                .map(|(_, page)| page),
        )
    }

    /// Finds a component on the current page, else on the first other page
    /// that has it. Same id rules as [`LayoutPage::find_by_id`].
    pub fn find_component_by_id(&self, id: &str) -> Option<NodeRef<'_>> {
        self.search_order().find_map(|page| page.find_by_id(id))
    }

    /// Matches from every page, in registration order.
    pub fn find_all_components_by_id(&self, id: &str) -> Vec<NodeRef<'_>> {
        self.pages
            .iter()
            .flat_map(|page| page.find_all_by_id(id))
            .collect()
    }

    /// Every node of every page, page by page in preorder.
    pub fn all_nodes(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.pages.iter().flat_map(LayoutPage::iter)
    }
}
