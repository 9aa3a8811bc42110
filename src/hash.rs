//! Hash map and set aliases used by the registry, config validation and the
//! simulated ledger tables.
//!
//! Precedence when several features are enabled: `std-hash`, then
//! `rustc-hash`, then `ahash`. With none of them the std map is used.
//! Only `default()` and `collect()` are portable across the three backends.

#[cfg(all(feature = "rustc-hash", not(feature = "std-hash")))]
pub type FastMap<K, V> = rustc_hash::FxHashMap<K, V>;

#[cfg(all(
    feature = "ahash",
    not(any(feature = "rustc-hash", feature = "std-hash"))
))]
pub type FastMap<K, V> = ahash::AHashMap<K, V>;

#[cfg(any(
    feature = "std-hash",
    not(any(feature = "rustc-hash", feature = "ahash"))
))]
pub type FastMap<K, V> = std::collections::HashMap<K, V>;

#[cfg(all(feature = "rustc-hash", not(feature = "std-hash")))]
pub type FastSet<T> = rustc_hash::FxHashSet<T>;

#[cfg(all(
    feature = "ahash",
    not(any(feature = "rustc-hash", feature = "std-hash"))
))]
pub type FastSet<T> = ahash::AHashSet<T>;

#[cfg(any(
    feature = "std-hash",
    not(any(feature = "rustc-hash", feature = "ahash"))
))]
pub type FastSet<T> = std::collections::HashSet<T>;
