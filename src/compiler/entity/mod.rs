//! Entities are the things names refer to: variables, parameters,
//! functions and constants.  Each entity lives in the [`EntityTable`] and is
//! referred to by [`EntityId`].

mod entity;
mod scope;

pub use entity::{Entity, EntityId, EntityKind, EntityTable, Storage};
pub use scope::LocalScope;
