//! Fast hash map and set aliases.
//!
//! All internal maps use `ahash`; none of them are exposed to untrusted keys
//! where HashDoS resistance would matter more than speed.

/// Hasher builder used by all internal maps.
pub type FxBuildHasher = ahash::RandomState;

/// A `hashbrown` map using [`FxBuildHasher`].
pub type FxHashMap<K, V> = hashbrown::HashMap<K, V, FxBuildHasher>;

/// A `hashbrown` set using [`FxBuildHasher`].
pub type FxHashSet<T> = hashbrown::HashSet<T, FxBuildHasher>;
