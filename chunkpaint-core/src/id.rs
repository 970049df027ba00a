//! # IDs
//! Every document object that outlives a single edit is referred to by an opaque
//! 128-bit id, implemented here as `Unique<T>` - a v4 UUID namespaced by the
//! marker type T. Ids carry no ordering and no embedded meaning; equality is the
//! only supported question. Ids with different namespaces may never be compared,
//! which the type parameter enforces at compile time.

/// An opaque unique id, namespaced by the marker type `T`.
///
/// Generated ids are unique for all practical purposes (random v4 UUIDs), so
/// they stay valid across save/load and across redo replays - a [`crate::change::Change`]
/// allocates its ids on first apply and reuses them verbatim afterwards.
pub struct Unique<T: ?Sized> {
    id: uuid::Uuid,
    // Namespace marker. `fn() -> T` keeps the phantom Send + Sync regardless of T.
    _phantom: std::marker::PhantomData<fn() -> T>,
}

impl<T: ?Sized> Unique<T> {
    /// Allocate a fresh id, unique within (and beyond) this execution.
    #[must_use]
    pub fn new() -> Self {
        Self::from_uuid(uuid::Uuid::new_v4())
    }
    #[must_use]
    pub const fn from_uuid(id: uuid::Uuid) -> Self {
        Self {
            id,
            _phantom: std::marker::PhantomData,
        }
    }
    /// Get the raw UUID. Ids from differing namespaces may collide numerically -
    /// don't mix them back together!
    #[must_use]
    pub const fn as_uuid(&self) -> uuid::Uuid {
        self.id
    }
}

impl<T: ?Sized> Default for Unique<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: ?Sized> Clone for Unique<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: ?Sized> Copy for Unique<T> {}
impl<T: ?Sized> PartialEq for Unique<T> {
    fn eq(&self, other: &Self) -> bool {
        // Namespace already checked at compile time.
        self.id == other.id
    }
}
impl<T: ?Sized> Eq for Unique<T> {}
impl<T: ?Sized> std::hash::Hash for Unique<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl<T: ?Sized> std::fmt::Display for Unique<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Unwrap here is safe - rsplit always yields at least one element.
        write!(
            f,
            "{}#{}",
            std::any::type_name::<T>().rsplit("::").next().unwrap(),
            self.id.simple()
        )
    }
}
impl<T: ?Sized> std::fmt::Debug for Unique<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        <Self as std::fmt::Display>::fmt(self, f)
    }
}

// Manual serde impls - derive would bound on T, which is only a namespace.
impl<T: ?Sized> serde::Serialize for Unique<T> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u128(self.id.as_u128())
    }
}
impl<'de, T: ?Sized> serde::Deserialize<'de> for Unique<T> {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u128::deserialize(deserializer).map(|raw| Self::from_uuid(uuid::Uuid::from_u128(raw)))
    }
}
