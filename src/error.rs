use thiserror::Error;

/// The key looked up by an indexing operation is not in the map.
///
/// Returned by `try_index` and `try_index_mut`; the `Index` and `IndexMut`
/// implementations panic with its message instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("key not found")]
pub struct KeyError;
