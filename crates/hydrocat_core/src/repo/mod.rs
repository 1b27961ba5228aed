//! Catalog sources backed by SQLite.
//!
//! # Responsibility
//! - Implement `CatalogSource` count/scan for each catalog relation.
//! - Isolate SQL details from paging and service orchestration.
//!
//! # Invariants
//! - Repositories verify their tables on construction.
//! - Identifiers are validated before persistence; reads reject invalid
//!   persisted state instead of masking it.

pub mod error;
pub mod rating_template_repo;
pub mod schema;
pub mod ts_group_repo;
pub mod ts_profile_repo;
