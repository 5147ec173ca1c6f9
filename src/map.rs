//! An ordered map kept balanced with the AVL invariant.

use std::borrow::Borrow;
use std::fmt;
use std::iter::FromIterator;
use std::ops::{Index, IndexMut};

use tracing::{debug, trace};

use crate::error::KeyError;
use crate::iter::{Cursor, IntoIter, Iter, IterMut, Keys, NodeRef, Values, ValuesMut};
use crate::node::{Node, NodePtr, Side};
use crate::tree::{Insertion, Tree};

/// An ordered map implemented with an AVL tree.
///
/// Every node stores the height difference of its subtrees. After each
/// insert or remove that difference is back in -1..=1 for every node, so the
/// tree height stays logarithmic in the number of entries.
///
/// ```
/// use avlbst::AvlTreeMap;
/// let mut map = AvlTreeMap::new();
/// map.insert(0, "zero");
/// map.insert(1, "one");
/// map.insert(2, "two");
/// assert_eq!(map.get(&1), Some(&"one"));
/// map.remove(&1);
/// assert!(map.get(&1).is_none());
/// assert!(map.is_balanced());
/// ```
#[derive(Clone)]
pub struct AvlTreeMap<K, V> {
    tree: Tree<K, V>,
}

impl<K, V> AvlTreeMap<K, V> {
    /// Creates an empty map.
    /// No memory is allocated until the first item is inserted.
    pub fn new() -> Self {
        Self { tree: Tree::new() }
    }

    /// Returns true if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the number of nodes on the longest path from the root to a leaf.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Checks the AVL condition from the tree structure alone, without
    /// trusting the stored balance factors.
    pub fn is_balanced(&self) -> bool {
        self.tree.balanced_height().is_some()
    }

    /// Clears the map, deallocating all memory.
    pub fn clear(&mut self) {
        debug!(len = self.len(), "clearing AVL map");
        self.tree.clear();
    }

    /// Returns the root node, for inspecting the tree shape.
    pub fn root(&self) -> Option<NodeRef<'_, K, V>> {
        self.tree.root().map(NodeRef::new)
    }

    /// Returns a cursor at the smallest key, or the end cursor if the map is empty.
    pub fn begin(&self) -> Cursor<'_, K, V> {
        Cursor::new(self.tree.smallest_node())
    }

    /// Returns the end cursor.
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

    /// Gets an iterator over the entries of the map, sorted by key.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.tree)
    }

    /// Gets a mutable iterator over the entries of the map, sorted by key.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut::new(&mut self.tree)
    }

    /// Gets an iterator over the keys of the map, in sorted order.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { iter: self.iter() }
    }

    /// Gets an iterator over the values of the map, in order by key.
    pub fn values(&self) -> Values<'_, K, V> {
        Values { iter: self.iter() }
    }

    /// Gets a mutable iterator over the values of the map, in order by key.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            iter: self.iter_mut(),
        }
    }

    // Position swap that keeps each structural slot's balance factor in
    // place: the factors travel opposite to the nodes.
    fn swap_nodes(&mut self, mut n1: NodePtr<K, V>, mut n2: NodePtr<K, V>) {
        self.tree.swap_positions(n1, n2);
        unsafe {
            let balance = n1.as_ref().balance;
            n1.as_mut().balance = n2.as_ref().balance;
            n2.as_mut().balance = balance;
        }
    }

    fn rotate_left(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut right_ptr) = node_ptr.as_ref().right {
                node_ptr.as_mut().right = right_ptr.as_ref().left;
                if let Some(mut right_left_ptr) = right_ptr.as_ref().left {
                    right_left_ptr.as_mut().parent = Some(node_ptr);
                }

                self.tree.replace_in_parent(node_ptr, right_ptr);

                right_ptr.as_mut().left = Some(node_ptr);
                node_ptr.as_mut().parent = Some(right_ptr);
            }
        }
    }

    fn rotate_right(&mut self, mut node_ptr: NodePtr<K, V>) {
        unsafe {
            if let Some(mut left_ptr) = node_ptr.as_ref().left {
                node_ptr.as_mut().left = left_ptr.as_ref().right;
                if let Some(mut left_right_ptr) = left_ptr.as_ref().right {
                    left_right_ptr.as_mut().parent = Some(node_ptr);
                }

                self.tree.replace_in_parent(node_ptr, left_ptr);

                left_ptr.as_mut().right = Some(node_ptr);
                node_ptr.as_mut().parent = Some(left_ptr);
            }
        }
    }

    /// Walks up from a freshly attached leaf, adjusting balance factors.
    /// Stops at the first ancestor whose height did not change, or after the
    /// first rebalance, which always restores the height from before the insert.
    fn rebalance_after_insert(&mut self, node_ptr: NodePtr<K, V>) {
        unsafe {
            let mut child_ptr = node_ptr;
            while let Some(mut parent_ptr) = child_ptr.as_ref().parent {
                parent_ptr.as_mut().balance += match Node::side_in(child_ptr, parent_ptr) {
                    Side::Left => -1,
                    Side::Right => 1,
                };
                match parent_ptr.as_ref().balance {
                    0 => break,
                    -1 | 1 => child_ptr = parent_ptr,
                    _ => {
                        self.rebalance_node(parent_ptr);
                        break;
                    }
                }
            }
        }
    }

    /// Walks up from the parent of a spliced-out node, adjusting balance
    /// factors. `vacated` is that parent and the side the node hung on.
    /// Unlike insertion, the walk may rotate several times on its way to the
    /// root; it ends as soon as a subtree kept its height.
    fn rebalance_after_remove(&mut self, vacated: Option<(NodePtr<K, V>, Side)>) {
        let mut current = vacated;
        unsafe {
            while let Some((mut node_ptr, side)) = current {
                node_ptr.as_mut().balance += match side {
                    Side::Left => 1,
                    Side::Right => -1,
                };
                let shrunk_ptr = match node_ptr.as_ref().balance {
                    -1 | 1 => break,
                    0 => node_ptr,
                    _ => {
                        let subtree_ptr = self.rebalance_node(node_ptr);
                        if subtree_ptr.as_ref().balance != 0 {
                            break;
                        }
                        subtree_ptr
                    }
                };
                current = shrunk_ptr
                    .as_ref()
                    .parent
                    .map(|parent_ptr| (parent_ptr, Node::side_in(shrunk_ptr, parent_ptr)));
            }
        }
    }

    /// Restores the AVL condition at a node with balance factor -2 or +2 and
    /// fixes the factors of the rotated nodes.
    /// Returns the root of the rotated subtree.
    fn rebalance_node(&mut self, mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        unsafe {
            let balance = node_ptr.as_ref().balance;
            debug_assert!(balance == -2 || balance == 2);
            if balance < 0 {
                let Some(mut left_ptr) = node_ptr.as_ref().left else {
                    return node_ptr;
                };
                let left_balance = left_ptr.as_ref().balance;
                if left_balance <= 0 {
                    trace!(left_balance, "left-left rebalance");
                    self.rotate_right(node_ptr);
                    // An evenly balanced left child only occurs while removing
                    let (node_balance, left_balance) = if left_balance == 0 {
                        (-1, 1)
                    } else {
                        (0, 0)
                    };
                    node_ptr.as_mut().balance = node_balance;
                    left_ptr.as_mut().balance = left_balance;
                    left_ptr
                } else {
                    let Some(mut grandchild_ptr) = left_ptr.as_ref().right else {
                        return node_ptr;
                    };
                    let grandchild_balance = grandchild_ptr.as_ref().balance;
                    trace!(grandchild_balance, "left-right rebalance");
                    self.rotate_left(left_ptr);
                    self.rotate_right(node_ptr);
                    let (node_balance, left_balance) = match grandchild_balance {
                        -1 => (1, 0),
                        1 => (0, -1),
                        _ => (0, 0),
                    };
                    node_ptr.as_mut().balance = node_balance;
                    left_ptr.as_mut().balance = left_balance;
                    grandchild_ptr.as_mut().balance = 0;
                    grandchild_ptr
                }
            } else {
                let Some(mut right_ptr) = node_ptr.as_ref().right else {
                    return node_ptr;
                };
                let right_balance = right_ptr.as_ref().balance;
                if right_balance >= 0 {
                    trace!(right_balance, "right-right rebalance");
                    self.rotate_left(node_ptr);
                    let (node_balance, right_balance) = if right_balance == 0 {
                        (1, -1)
                    } else {
                        (0, 0)
                    };
                    node_ptr.as_mut().balance = node_balance;
                    right_ptr.as_mut().balance = right_balance;
                    right_ptr
                } else {
                    let Some(mut grandchild_ptr) = right_ptr.as_ref().left else {
                        return node_ptr;
                    };
                    let grandchild_balance = grandchild_ptr.as_ref().balance;
                    trace!(grandchild_balance, "right-left rebalance");
                    self.rotate_right(right_ptr);
                    self.rotate_left(node_ptr);
                    let (node_balance, right_balance) = match grandchild_balance {
                        1 => (-1, 0),
                        -1 => (0, 1),
                        _ => (0, 0),
                    };
                    node_ptr.as_mut().balance = node_balance;
                    right_ptr.as_mut().balance = right_balance;
                    grandchild_ptr.as_mut().balance = 0;
                    grandchild_ptr
                }
            }
        }
    }
}

impl<K: Ord, V> AvlTreeMap<K, V> {
    /// Returns a reference to the value corresponding to the key.
    ///
    /// The key may be any borrowed form of the map's key type, but the ordering
    /// on the borrowed form *must* match the ordering on the key type.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).value()
    }

    /// Returns a mutable reference to the value corresponding to the key.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree
            .find(key)
            .map(|node_ptr| unsafe { &mut (*node_ptr.as_ptr()).value })
    }

    /// Returns references to the key-value pair corresponding to the key.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).key_value()
    }

    /// Returns true if the map contains a value for the specified key.
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

    /// Returns the value for the key, or `KeyError` if the key is absent.
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

    /// Inserts a key-value pair into the map.
    ///
    /// If the key was already present its value is replaced and the old value
    /// returned; the tree shape does not change in that case.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        match self.tree.insert(key, value) {
            Insertion::Replaced(old_value) => Some(old_value),
            Insertion::Attached(node_ptr) => {
                self.rebalance_after_insert(node_ptr);
                None
            }
        }
    }

    /// Removes a key from the map.
    /// Returns the value at the key if the key was previously in the map.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.remove_entry(key).map(|(_, value)| value)
    }

    /// Removes a key from the map, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node_ptr = self.tree.find(key)?;
        unsafe {
            if node_ptr.as_ref().left.is_some() && node_ptr.as_ref().right.is_some() {
                if let Some(predecessor_ptr) = Tree::predecessor(node_ptr) {
                    self.swap_nodes(node_ptr, predecessor_ptr);
                }
            }
            let vacated = self.tree.detach(node_ptr);
            let entry = Node::destroy(node_ptr);
            self.rebalance_after_remove(vacated);
            Some(entry)
        }
    }

    /// Asserts the structural invariants: parent links, key order, node
    /// count, and that every stored balance factor is the real height
    /// difference and lies in -1..=1.
    #[cfg(any(test, feature = "consistency_check"))]
    pub fn check_consistency(&self) {
        self.tree.check_consistency(true);
    }
}

impl<K, V> Default for AvlTreeMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for AvlTreeMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: PartialEq, V: PartialEq> PartialEq for AvlTreeMap<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<K: Eq, V: Eq> Eq for AvlTreeMap<K, V> {}

impl<K, Q, V> Index<&Q> for AvlTreeMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    type Output = V;

    /// # Panics
    /// Panics if the key is not present in the map.
    fn index(&self, key: &Q) -> &V {
        self.try_index(key).unwrap_or_else(|err| panic!("{err}"))
    }
}

impl<K, Q, V> IndexMut<&Q> for AvlTreeMap<K, V>
where
    K: Ord + Borrow<Q>,
    Q: Ord + ?Sized,
{
    /// # Panics
    /// Panics if the key is not present in the map.
    fn index_mut(&mut self, key: &Q) -> &mut V {
        self.try_index_mut(key).unwrap_or_else(|err| panic!("{err}"))
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTreeMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Ord, V> Extend<(K, V)> for AvlTreeMap<K, V> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<K, V> IntoIterator for AvlTreeMap<K, V> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter::new(self.tree)
    }
}

impl<'a, K, V> IntoIterator for &'a AvlTreeMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V> IntoIterator for &'a mut AvlTreeMap<K, V> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
