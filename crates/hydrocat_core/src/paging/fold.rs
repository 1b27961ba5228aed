//! Flat join rows to grouped catalog entities.
//!
//! # Responsibility
//! - Fold an ordered stream of parent+child rows into parent entities that
//!   own their ordered child lists.
//!
//! # Invariants
//! - Output order is the first-seen order of parent keys, not key order.
//! - Children keep the order of the rows that carried them.
//! - A row without a complete child projection contributes no child; its
//!   parent still appears with whatever children other rows supplied.
//! - The fold is pure: no I/O, no logging, no errors.

use std::collections::HashMap;
use std::hash::Hash;

/// Ordered, comparable identity of a catalog parent.
///
/// `to_parts`/`from_parts` define how the key travels inside a cursor.
pub trait SortKey: Clone + Eq + Hash {
    fn to_parts(&self) -> Vec<String>;
    fn from_parts(parts: &[String]) -> Option<Self>;
}

/// Entity that collects child projections during a fold.
pub trait GroupedEntity {
    type Child;

    fn push_child(&mut self, child: Self::Child);
}

/// Accessors over one flat join row.
pub trait FlatRow {
    type Key: SortKey;
    type Entity: GroupedEntity;

    /// Composite identity of the row's parent.
    fn parent_key(&self) -> Self::Key;
    /// Parent entity with an empty child list.
    fn parent(&self) -> Self::Entity;
    /// Child projection, or `None` when child columns are null or partial.
    fn child(&self) -> Option<<Self::Entity as GroupedEntity>::Child>;
}

/// Folds rows into grouped entities in first-seen parent order.
pub fn fold_rows<R, I>(rows: I) -> Vec<R::Entity>
where
    R: FlatRow,
    I: IntoIterator<Item = R>,
{
    let mut positions: HashMap<R::Key, usize> = HashMap::new();
    let mut grouped: Vec<R::Entity> = Vec::new();

    for row in rows {
        let index = *positions.entry(row.parent_key()).or_insert_with(|| {
            grouped.push(row.parent());
            grouped.len() - 1
        });

        if let Some(child) = row.child() {
            grouped[index].push_child(child);
        }
    }

    grouped
}
