//! List query composition.
//!
//! A `ListQuery` captures the three independent list inputs (page, free-text
//! search, category filter). It is immutable; changing any input produces a
//! new query.

use url::form_urlencoded;

use gudang_core::CategoryId;

use crate::error::ClientError;
use crate::pagination::validate_page;
use crate::resource::Resource;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    page: u32,
    search: String,
    category: Option<CategoryId>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::first_page()
    }
}

impl ListQuery {
    pub fn first_page() -> Self {
        Self {
            page: 1,
            search: String::new(),
            category: None,
        }
    }

    /// Query for an explicit page; page 0 or below is `InvalidPage`.
    pub fn at_page(page: i64) -> Result<Self, ClientError> {
        Ok(Self::first_page().with_page(validate_page(page)?))
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn category(&self) -> Option<CategoryId> {
        self.category
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }

    /// New search term; goes back to page 1 because the result set changed.
    pub fn with_search(&self, search: impl Into<String>) -> Self {
        Self {
            page: 1,
            search: search.into(),
            ..self.clone()
        }
    }

    /// New category filter; goes back to page 1 because the result set changed.
    pub fn with_category(&self, category: Option<CategoryId>) -> Self {
        Self {
            page: 1,
            category,
            ..self.clone()
        }
    }
}

/// Build the list URL (relative to the API root) for `resource`.
///
/// Parameters appear in a fixed order: `page`, then `search` when the term
/// is non-empty, then the resource's category filter key when a category is
/// selected and the resource supports one. Values use
/// `application/x-www-form-urlencoded` escaping, so a space becomes `+`,
/// which the server decodes like `%20`.
pub fn build_list_url(resource: Resource, query: &ListQuery) -> String {
    let mut params = form_urlencoded::Serializer::new(String::new());
    params.append_pair("page", &query.page.to_string());

    if !query.search.is_empty() {
        params.append_pair("search", &query.search);
    }

    if let (Some(category), Some(key)) = (query.category, resource.category_filter_key()) {
        params.append_pair(key, &category.to_string());
    }

    format!("{}?{}", resource.collection_path(), params.finish())
}
