//! Core data access for the hydrologic catalog.
//! This crate owns cursor paging and grouped catalog assembly.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod paging;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, PageSettings};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::rating_template::{IndependentParameterSpec, LookupMethod, RatingTemplate};
pub use model::ts_group::{AssignedTimeSeries, TimeSeriesCategory, TimeSeriesGroup};
pub use model::ts_profile::{ProfileParameter, TimeSeriesProfile};
pub use paging::{fetch_page, CatalogSource, CursorError, PageError, PageResponse, PageResult};
pub use repo::error::{RepoError, RepoResult};
pub use repo::rating_template_repo::{RatingTemplateFilter, SqliteRatingTemplateCatalog};
pub use repo::ts_group_repo::{SqliteTsGroupCatalog, TsGroupFilter};
pub use repo::ts_profile_repo::{SqliteTsProfileCatalog, TsProfileFilter};
pub use service::catalog_service::CatalogService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
