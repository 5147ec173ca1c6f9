//! An ordered map built on a binary search tree and kept balanced with the
//! AVL invariant.
//!
//! [`AvlTreeMap`] rebalances after every insert and remove, so its height
//! stays within about 1.44·log2(n) even for sorted input. [`BstMap`] is the
//! same tree without rebalancing. Both keep parent links, which is what lets
//! [`Cursor`]s step forwards and backwards without a stack.
//!
//! ```
//! use avlbst::AvlTreeMap;
//!
//! let mut map = AvlTreeMap::new();
//! for key in 1..=1000 {
//!     map.insert(key, key.to_string());
//! }
//! assert!(map.height() <= 14);
//! assert_eq!(map[&500], "500");
//!
//! let mut cursor = map.find(&999);
//! cursor.move_next();
//! assert_eq!(cursor.key(), Some(&1000));
//! cursor.move_next();
//! assert_eq!(cursor, map.end());
//! ```

mod bst;
mod error;
mod iter;
mod map;
mod node;
mod tree;

pub use bst::BstMap;
pub use error::KeyError;
pub use iter::{Cursor, IntoIter, Iter, IterMut, Keys, NodeRef, Values, ValuesMut};
pub use map::AvlTreeMap;

#[cfg(test)]
mod tests;
