//! Keyset pagination over grouped catalog joins.
//!
//! # Responsibility
//! - Encode/decode opaque continuation cursors (`cursor`).
//! - Fold flat join rows into grouped entities (`fold`).
//! - Run count + seek scans and assemble pages (`assembler`).
//!
//! # Invariants
//! - No state survives between page requests except what the cursor carries.

pub mod assembler;
pub mod cursor;
pub mod fold;

pub use assembler::{
    fetch_page, CatalogSource, EntityOf, KeyOf, PageError, PageResponse, PageResult,
    RetrievalStage,
};
pub use cursor::{CursorError, DecodedCursor};
pub use fold::{fold_rows, FlatRow, GroupedEntity, SortKey};
