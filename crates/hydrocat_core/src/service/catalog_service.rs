//! Catalog use-case service.
//!
//! # Responsibility
//! - Apply page-size policy and cursor normalization for callers.
//! - Delegate paging to `fetch_page` over any `CatalogSource`.
//!
//! # Invariants
//! - Blank cursor strings mean "first page"; they never reach the codec.
//! - Service layer holds no per-request state between calls.

use crate::config::PageSettings;
use crate::paging::{fetch_page, CatalogSource, EntityOf, PageResponse, PageResult};

/// Use-case service wrapper around one catalog source.
pub struct CatalogService<S: CatalogSource> {
    source: S,
    settings: PageSettings,
}

impl<S: CatalogSource> CatalogService<S> {
    /// Creates a service using the provided source and page policy.
    pub fn new(source: S, settings: PageSettings) -> Self {
        Self { source, settings }
    }

    /// Creates a service with default page policy.
    pub fn with_default_settings(source: S) -> Self {
        Self::new(source, PageSettings::default())
    }

    /// Returns the wrapped source, e.g. for write helpers.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Lists one catalog page.
    ///
    /// `page_size` falls back to the configured default and is clamped to
    /// the configured maximum; zero or negative values are rejected.
    pub fn list(
        &self,
        filter: &S::Filter,
        cursor: Option<&str>,
        page_size: Option<i64>,
    ) -> PageResult<PageResponse<EntityOf<S>>> {
        let cursor = cursor.map(str::trim).filter(|token| !token.is_empty());
        fetch_page(
            &self.source,
            filter,
            cursor,
            self.settings.resolve(page_size),
        )
    }

    /// Walks every page and returns all entities in catalog order.
    ///
    /// Intended for small catalogs and tooling; each page is a separate
    /// request carrying the previous cursor.
    pub fn list_all(
        &self,
        filter: &S::Filter,
        page_size: Option<i64>,
    ) -> PageResult<Vec<EntityOf<S>>> {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list(filter, cursor.as_deref(), page_size)?;
            items.extend(page.items);
            match page.next_page {
                Some(next) => cursor = Some(next),
                None => return Ok(items),
            }
        }
    }
}
