//! Values which are filled in by a later pass than the one that created
//! their owner.

use serde::Serialize;

/// A field which is set after its owner is constructed: the concrete type of
/// a structure member, or the storage location of an entity.  Reading the
/// value before it has been resolved means an earlier pass did not do its
/// job, so it is treated as a compiler bug and panics.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Resolution<T> {
    Unresolved,
    Resolved(T),
}

impl<T> Default for Resolution<T> {
    fn default() -> Self {
        Resolution::Unresolved
    }
}

impl<T> Resolution<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Returns the resolved value.
    ///
    /// # Panics
    /// If the value has not been resolved. `what` names the owner in the
    /// panic message.
    pub fn get(&self, what: &str) -> &T {
        match self {
            Resolution::Resolved(v) => v,
            Resolution::Unresolved => panic!("{} read before it was resolved", what),
        }
    }

    /// Resolve this value.  A value is resolved exactly once.
    pub fn resolve(&mut self, value: T, what: &str) {
        if self.is_resolved() {
            panic!("{} resolved twice", what)
        }
        *self = Resolution::Resolved(value);
    }

    pub fn as_option(&self) -> Option<&T> {
        match self {
            Resolution::Resolved(v) => Some(v),
            Resolution::Unresolved => None,
        }
    }
}
