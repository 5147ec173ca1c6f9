//! Cursors, iterators and read-only node views shared by both maps.

use std::fmt;
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::ptr;

use crate::node::{Link, Node, NodePtr};
use crate::tree::Tree;

/// A position in a map's in-order sequence, or the end position.
///
/// Cursors borrow the map, so it cannot be modified while a cursor is alive.
/// Two cursors are equal when they point at the same entry, or both at the
/// end.
pub struct Cursor<'a, K, V> {
    node: Link<K, V>,
    marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> Cursor<'a, K, V> {
    pub(crate) fn new(node: Link<K, V>) -> Self {
        Self {
            node,
            marker: PhantomData,
        }
    }

    /// Returns true if the cursor is past the last entry.
    pub fn is_end(&self) -> bool {
        self.node.is_none()
    }

    /// The entry under the cursor, `None` at the end.
    pub fn key_value(&self) -> Option<(&'a K, &'a V)> {
        self.node.map(|node_ptr| {
            let node = unsafe { &*node_ptr.as_ptr() };
            (&node.key, &node.value)
        })
    }

    pub fn key(&self) -> Option<&'a K> {
        self.key_value().map(|(key, _)| key)
    }

    pub fn value(&self) -> Option<&'a V> {
        self.key_value().map(|(_, value)| value)
    }

    /// The node under the cursor.
    pub fn node(&self) -> Option<NodeRef<'a, K, V>> {
        self.node.map(NodeRef::new)
    }

    /// Advances to the next larger key. Moving past the largest key yields
    /// the end cursor, which stays where it is.
    pub fn move_next(&mut self) {
        self.node = self.node.and_then(Tree::successor);
    }

    /// Steps back to the next smaller key. Stepping back from the smallest
    /// key yields the end cursor, which stays where it is.
    pub fn move_prev(&mut self) {
        self.node = self.node.and_then(Tree::predecessor);
    }
}

impl<K, V> Clone for Cursor<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for Cursor<'_, K, V> {}

impl<K, V> PartialEq for Cursor<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl<K, V> Eq for Cursor<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Cursor<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Cursor").field(&self.key_value()).finish()
    }
}

/// Read-only view of a node, for walking the tree shape.
pub struct NodeRef<'a, K, V> {
    node_ptr: NodePtr<K, V>,
    marker: PhantomData<&'a Node<K, V>>,
}

impl<'a, K, V> NodeRef<'a, K, V> {
    pub(crate) fn new(node_ptr: NodePtr<K, V>) -> Self {
        Self {
            node_ptr,
            marker: PhantomData,
        }
    }

    fn node(&self) -> &'a Node<K, V> {
        unsafe { &*self.node_ptr.as_ptr() }
    }

    pub fn key(&self) -> &'a K {
        &self.node().key
    }

    pub fn value(&self) -> &'a V {
        &self.node().value
    }

    pub fn left(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().left.map(NodeRef::new)
    }

    pub fn right(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().right.map(NodeRef::new)
    }

    pub fn parent(&self) -> Option<NodeRef<'a, K, V>> {
        self.node().parent.map(NodeRef::new)
    }

    /// Stored balance factor, height(right) - height(left).
    /// Only `AvlTreeMap` maintains it; in a `BstMap` it is always zero.
    pub fn balance(&self) -> i8 {
        self.node().balance
    }
}

impl<K, V> Clone for NodeRef<'_, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for NodeRef<'_, K, V> {}

impl<K, V> PartialEq for NodeRef<'_, K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.node_ptr == other.node_ptr
    }
}

impl<K, V> Eq for NodeRef<'_, K, V> {}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for NodeRef<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("key", self.key())
            .field("value", self.value())
            .field("balance", &self.balance())
            .finish()
    }
}

/// An iterator over the entries of a map, in key order.
pub struct Iter<'a, K, V> {
    cursor: Cursor<'a, K, V>,
    len: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(tree: &'a Tree<K, V>) -> Self {
        Self {
            cursor: Cursor::new(tree.smallest_node()),
            len: tree.len(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.cursor.key_value()?;
        self.cursor.move_next();
        self.len -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            cursor: self.cursor,
            len: self.len,
        }
    }
}

/// A mutable iterator over the entries of a map, in key order.
pub struct IterMut<'a, K, V> {
    next: Link<K, V>,
    len: usize,
    marker: PhantomData<&'a mut Node<K, V>>,
}

impl<'a, K, V> IterMut<'a, K, V> {
    pub(crate) fn new(tree: &'a mut Tree<K, V>) -> Self {
        Self {
            next: tree.smallest_node(),
            len: tree.len(),
            marker: PhantomData,
        }
    }
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.next?;
        self.next = Tree::successor(node_ptr);
        self.len -= 1;
        // Each node is handed out once. Only the key and value places are
        // borrowed, later successor walks still read the links of this node.
        unsafe {
            let key = &*ptr::addr_of!((*node_ptr.as_ptr()).key);
            let value = &mut *ptr::addr_of_mut!((*node_ptr.as_ptr()).value);
            Some((key, value))
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}

impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An owning iterator over the entries of a map, in key order.
///
/// Each node is released as soon as its entry is handed out.
pub struct IntoIter<K, V> {
    tree: Tree<K, V>,
    front: Link<K, V>,
}

impl<K, V> IntoIter<K, V> {
    pub(crate) fn new(tree: Tree<K, V>) -> Self {
        let front = tree.smallest_node();
        Self { tree, front }
    }
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        let node_ptr = self.front?;
        // `front` is always the smallest remaining node, so it has no left child
        self.front = unsafe {
            match node_ptr.as_ref().right {
                Some(right_ptr) => Some(Tree::min_in(right_ptr)),
                None => node_ptr.as_ref().parent,
            }
        };
        self.tree.detach(node_ptr);
        Some(unsafe { Node::destroy(node_ptr) })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.tree.len(), Some(self.tree.len()))
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}

impl<K, V> FusedIterator for IntoIter<K, V> {}

/// An iterator over the keys of a map, in order.
pub struct Keys<'a, K, V> {
    pub(crate) iter: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}

impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            iter: self.iter.clone(),
        }
    }
}

/// An iterator over the values of a map, in key order.
pub struct Values<'a, K, V> {
    pub(crate) iter: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}

impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            iter: self.iter.clone(),
        }
    }
}

/// A mutable iterator over the values of a map, in key order.
pub struct ValuesMut<'a, K, V> {
    pub(crate) iter: IterMut<'a, K, V>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}

impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}
