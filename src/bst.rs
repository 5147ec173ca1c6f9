//! An ordered map on a plain, never rebalanced binary search tree.

use std::borrow::Borrow;
use std::fmt;
use std::iter::FromIterator;
use std::ops::{Index, IndexMut};

use tracing::debug;

use crate::error::KeyError;
use crate::iter::{Cursor, IntoIter, Iter, IterMut, Keys, NodeRef, Values, ValuesMut};
use crate::tree::{Insertion, Tree};

/// An ordered map implemented with an unbalanced binary search tree.
///
/// Shares its node layout, cursors and iterators with [`AvlTreeMap`], but
/// never rotates: the tree takes whatever shape the insertion order gives it.
///
/// [`AvlTreeMap`]: crate::AvlTreeMap
///
/// ```
/// use avlbst::BstMap;
/// let mut map = BstMap::new();
/// for key in 0..8 {
///     map.insert(key, key * 2);
/// }
/// assert_eq!(map[&3], 6);
/// assert_eq!(map.height(), 8);
/// assert!(!map.is_balanced());
/// ```
#[derive(Clone)]
pub struct BstMap<K, V> {
    tree: Tree<K, V>,
}

impl<K, V> BstMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self { tree: Tree::new() }
    }

    /// Returns true if the map contains no entries.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of entries in the map.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Number of nodes on the longest root-to-leaf path, 0 when empty.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Returns true if no node's subtrees differ in height by more than one.
    pub fn is_balanced(&self) -> bool {
        self.tree.balanced_height().is_some()
    }

    /// Removes all entries, releasing the nodes without recursion.
    pub fn clear(&mut self) {
        debug!(len = self.len(), "clearing BST map");
        self.tree.clear();
    }

    /// Returns the root node, for inspecting the tree shape.
    pub fn root(&self) -> Option<NodeRef<'_, K, V>> {
        self.tree.root().map(NodeRef::new)
    }

    /// Cursor at the smallest key, or the end cursor if the map is empty.
    pub fn begin(&self) -> Cursor<'_, K, V> {
        Cursor::new(self.tree.smallest_node())
    }

    /// The end cursor, one past the largest key.
    pub fn end(&self) -> Cursor<'_, K, V> {
        Cursor::new(None)
    }

    /// Returns the entry with the smallest key.
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.begin().key_value()
    }

    /// Returns the entry with the largest key.
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        Cursor::new(self.tree.largest_node()).key_value()
    }

    /// Returns an iterator over the entries, in key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.tree)
    }

    /// Returns an iterator over the entries with mutable values, in key order.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.tree)
    }

    /// Returns an iterator over the keys, in order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { iter: self.iter() }
    }

    /// Returns an iterator over the values, in key order.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { iter: self.iter() }
    }

    /// Returns an iterator over mutable values, in key order.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            iter: self.iter_mut(),
        }
    }
}

impl<K: Ord, V> BstMap<K, V> {
    /// Returns a reference to the value for the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).value()
    }

    /// Returns a mutable reference to the value for the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .find(key)
            .map(|node_ptr| unsafe { &mut (*node_ptr.as_ptr()).value })
    }

    /// Returns the stored key and its value.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).key_value()
    }

    /// Returns true if the map contains a value for the key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.find(key).is_some()
    }

    /// Returns a cursor at the key, or the end cursor if the key is absent.
    pub fn find<Q>(&self, key: &Q) -> Cursor<'_, K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Cursor::new(self.tree.find(key))
    }

    /// Like indexing, but returns `KeyError` instead of panicking.
    pub fn try_index<Q>(&self, key: &Q) -> Result<&V, KeyError>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(KeyError)
    }

    /// Mutable counterpart of `try_index`.
    pub fn try_index_mut<Q>(&mut self, key: &Q) -> Result<&mut V, KeyError>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_mut(key).ok_or(KeyError)
    }

    /// Inserts a key-value pair, returning the old value if the key was present.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.tree.insert(key, value) {
            Insertion::Replaced(old_value) => Some(old_value),
            Insertion::Attached(_) => None,
        }
    }

    /// Removes a key, returning its value if it was present.
    ///
    /// A node with two children first trades places with its in-order
    /// predecessor and is then spliced out.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key)
    }

    /// Asserts parent links, key order and node count, and that every balance factor is zero.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        self.tree.check_consistency(false);
    }
}

impl<K, V> Default for BstMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for BstMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for BstMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for BstMap<K, V> {}

impl<K, Q, V> Index<&Q> for BstMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    fn index(&self, key: &Q) -> &V {
        self.try_index(key).unwrap_or_else(|err| panic!("{err}"))
    }
}

impl<K, Q, V> IndexMut<&Q> for BstMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    fn index_mut(&mut self, key: &Q) -> &mut V {
        self.try_index_mut(key).unwrap_or_else(|err| panic!("{err}"))
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for BstMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for BstMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V> IntoIterator for BstMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.tree)
    }
}

impl<'a, K, V> IntoIterator for &'a BstMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut BstMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
