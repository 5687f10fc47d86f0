//! Fast hash map and hash set type aliases.
//!
//! Keys in this workspace are short strings (culture names, translation keys,
//! package names) and container identities, none of which come from untrusted
//! input, so the Fx hash from the `rustc-hash` crate is used throughout.

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;
