//! Catalog read models.
//!
//! # Responsibility
//! - Define the grouped entities returned by catalog pages.
//! - Keep serialized field names stable for external callers.
//!
//! # Invariants
//! - Child lists always serialize, as `[]` when a parent has no members.
//! - Child lists deserialize to empty when the field is absent.

pub mod rating_template;
pub mod ts_group;
pub mod ts_profile;
