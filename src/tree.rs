//! The unbalanced binary search tree both maps are built on.
//!
//! `Tree` owns the nodes and knows how to attach, detach, find and walk them.
//! It never looks at balance factors, except to copy them in `clone`; the AVL
//! layer in `map.rs` adds rotations on top of these structural operations.

use std::borrow::Borrow;
use std::cmp::{self, Ordering};
use std::marker::PhantomData;
use std::mem;

use tracing::trace;

use crate::node::{Link, LinkPtr, Node, NodePtr, Side};

/// Outcome of `Tree::insert`.
pub(crate) enum Insertion<K, V> {
    /// The key was present, its value was replaced.
    Replaced(V),
    /// A new leaf was attached.
    Attached(NodePtr<K, V>),
}

pub(crate) struct Tree<K, V> {
    root: Link<K, V>,
    num_nodes: usize,
    marker: PhantomData<Box<Node<K, V>>>,
}

#[allow(clippy::enum_variant_names)]
enum Direction {
    FromParent,
    FromLeft,
    FromRight,
}

impl<K, V> Tree<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            root: None,
            num_nodes: 0,
            marker: PhantomData,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub(crate) fn len(&self) -> usize {
        self.num_nodes
    }

    pub(crate) fn root(&self) -> Link<K, V> {
        self.root
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub(crate) fn height(&self) -> usize {
        self.fold_heights(|_, _, _| {})
    }

    /// Height of the tree, or `None` if some node's subtrees differ in height
    /// by more than one.
    ///
    /// Works from the structure alone, stored balance factors are ignored.
    pub(crate) fn balanced_height(&self) -> Option<usize> {
        let mut balanced = true;
        let height = self.fold_heights(|_, left_height, right_height| {
            if left_height.abs_diff(right_height) > 1 {
                balanced = false;
            }
        });
        balanced.then_some(height)
    }

    /// Releases every node, children before parents.
    pub(crate) fn clear(&mut self) {
        self.postorder(|node_ptr| unsafe {
            // Unhook from the parent first so no link ever points at freed memory
            if let Some(mut parent_ptr) = node_ptr.as_ref().parent {
                match Node::side_in(node_ptr, parent_ptr) {
                    Side::Left => parent_ptr.as_mut().left = None,
                    Side::Right => parent_ptr.as_mut().right = None,
                }
            }
            drop(Node::destroy(node_ptr));
        });
        self.root = None;
        self.num_nodes = 0;
    }

    pub(crate) fn smallest_node(&self) -> Link<K, V> {
        self.root.map(Self::min_in)
    }

    pub(crate) fn largest_node(&self) -> Link<K, V> {
        self.root.map(Self::max_in)
    }

    /// Leftmost node of the subtree rooted at `node_ptr`.
    pub(crate) fn min_in(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(left_ptr) = unsafe { Node::left_of(node_ptr) } {
            node_ptr = left_ptr;
        }
        node_ptr
    }

    /// Rightmost node of the subtree rooted at `node_ptr`.
    pub(crate) fn max_in(mut node_ptr: NodePtr<K, V>) -> NodePtr<K, V> {
        while let Some(right_ptr) = unsafe { Node::right_of(node_ptr) } {
            node_ptr = right_ptr;
        }
        node_ptr
    }

    /// In-order predecessor of `node_ptr`, `None` for the smallest node.
    pub(crate) fn predecessor(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        unsafe {
            if let Some(left_ptr) = Node::left_of(node_ptr) {
                return Some(Self::max_in(left_ptr));
            }
            let mut current = node_ptr;
            while let Some(parent_ptr) = Node::parent_of(current) {
                if Node::right_of(parent_ptr) == Some(current) {
                    return Some(parent_ptr);
                }
                current = parent_ptr;
            }
            None
        }
    }

    /// In-order successor of `node_ptr`, `None` for the largest node.
    pub(crate) fn successor(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        unsafe {
            if let Some(right_ptr) = Node::right_of(node_ptr) {
                return Some(Self::min_in(right_ptr));
            }
            let mut current = node_ptr;
            while let Some(parent_ptr) = Node::parent_of(current) {
                if Node::left_of(parent_ptr) == Some(current) {
                    return Some(parent_ptr);
                }
                current = parent_ptr;
            }
            None
        }
    }

    /// Splices out a node with at most one child.
    ///
    /// The child, if any, takes over the node's slot. Returns the former
    /// parent together with the side of the slot that got vacated, or `None`
    /// if the node was the root. The caller owns the detached node.
    pub(crate) fn detach(
        &mut self,
        mut node_ptr: NodePtr<K, V>,
    ) -> Option<(NodePtr<K, V>, Side)> {
        unsafe {
            debug_assert!(node_ptr.as_ref().left.is_none() || node_ptr.as_ref().right.is_none());
            let child = node_ptr.as_ref().left.or(node_ptr.as_ref().right);
            let parent = node_ptr.as_ref().parent;
            let vacated =
                parent.map(|parent_ptr| (parent_ptr, Node::side_in(node_ptr, parent_ptr)));

            let slot_ptr = Self::slot_of(self.root_link(), node_ptr);
            *slot_ptr.as_ptr() = child;
            if let Some(mut child_ptr) = child {
                child_ptr.as_mut().parent = parent;
            }

            let node = node_ptr.as_mut();
            node.parent = None;
            node.left = None;
            node.right = None;
            self.num_nodes -= 1;
            vacated
        }
    }

    /// Exchanges the positions of two nodes in the tree.
    ///
    /// Parent links, children, the parents' child links and the root are all
    /// updated; keys, values and balance factors stay with their nodes.
    pub(crate) fn swap_positions(&mut self, n1: NodePtr<K, V>, n2: NodePtr<K, V>) {
        if n1 == n2 {
            return;
        }
        unsafe {
            if n2.as_ref().parent == Some(n1) {
                trace!("swapping parent with its child");
                self.swap_adjacent(n1, n2);
            } else if n1.as_ref().parent == Some(n2) {
                trace!("swapping child with its parent");
                self.swap_adjacent(n2, n1);
            } else {
                trace!("swapping unrelated nodes");
                self.swap_apart(n1, n2);
            }
        }
    }

    // `lower` is a direct child of `upper`.
    unsafe fn swap_adjacent(&mut self, mut upper: NodePtr<K, V>, mut lower: NodePtr<K, V>) {
        let lower_side = Node::side_in(lower, upper);
        let upper_left = upper.as_ref().left;
        let upper_right = upper.as_ref().right;
        let lower_left = lower.as_ref().left;
        let lower_right = lower.as_ref().right;

        self.replace_in_parent(upper, lower);
        match lower_side {
            Side::Left => {
                lower.as_mut().left = Some(upper);
                lower.as_mut().right = upper_right;
                Self::adopt(upper_right, lower);
            }
            Side::Right => {
                lower.as_mut().right = Some(upper);
                lower.as_mut().left = upper_left;
                Self::adopt(upper_left, lower);
            }
        }

        upper.as_mut().parent = Some(lower);
        upper.as_mut().left = lower_left;
        upper.as_mut().right = lower_right;
        Self::adopt(lower_left, upper);
        Self::adopt(lower_right, upper);
    }

    // Neither node is the parent of the other. They may be siblings.
    unsafe fn swap_apart(&mut self, mut n1: NodePtr<K, V>, mut n2: NodePtr<K, V>) {
        // Both slots are resolved before either is written, siblings share a
        // parent. Neither write may go through a fresh borrow of that parent.
        let root = self.root_link();
        let slot1 = Self::slot_of(root, n1);
        let slot2 = Self::slot_of(root, n2);
        *slot1.as_ptr() = Some(n2);
        *slot2.as_ptr() = Some(n1);

        mem::swap(&mut n1.as_mut().parent, &mut n2.as_mut().parent);
        mem::swap(&mut n1.as_mut().left, &mut n2.as_mut().left);
        mem::swap(&mut n1.as_mut().right, &mut n2.as_mut().right);

        Self::adopt(n1.as_ref().left, n1);
        Self::adopt(n1.as_ref().right, n1);
        Self::adopt(n2.as_ref().left, n2);
        Self::adopt(n2.as_ref().right, n2);
    }

    /// Puts `new_ptr` into the slot `old_ptr` occupies and gives it
    /// `old_ptr`'s parent. `old_ptr`'s own links are left alone.
    pub(crate) fn replace_in_parent(&mut self, old_ptr: NodePtr<K, V>, mut new_ptr: NodePtr<K, V>) {
        unsafe {
            let slot_ptr = Self::slot_of(self.root_link(), old_ptr);
            *slot_ptr.as_ptr() = Some(new_ptr);
            new_ptr.as_mut().parent = Node::parent_of(old_ptr);
        }
    }

    fn adopt(child: Link<K, V>, parent_ptr: NodePtr<K, V>) {
        if let Some(mut child_ptr) = child {
            unsafe { child_ptr.as_mut().parent = Some(parent_ptr) };
        }
    }

    fn root_link(&mut self) -> LinkPtr<K, V> {
        LinkPtr::from(&mut self.root)
    }

    // The link that currently points at `node_ptr`: its parent's child link,
    // or `root` if it has no parent.
    unsafe fn slot_of(root: LinkPtr<K, V>, node_ptr: NodePtr<K, V>) -> LinkPtr<K, V> {
        match Node::parent_of(node_ptr) {
            None => root,
            Some(parent_ptr) => Node::child_link(parent_ptr, Node::side_in(node_ptr, parent_ptr)),
        }
    }

    /// Post-order walk that hands each node to `f` together with the heights
    /// of its left and right subtrees. Returns the height of the whole tree.
    ///
    /// Heights are kept on an explicit stack, so skewed trees cannot exhaust
    /// the call stack.
    fn fold_heights<F>(&self, mut f: F) -> usize
    where
        F: FnMut(NodePtr<K, V>, usize, usize),
    {
        let mut heights: Vec<usize> = Vec::new();
        self.postorder(|node_ptr| {
            let (has_left, has_right) =
                unsafe { (node_ptr.as_ref().left.is_some(), node_ptr.as_ref().right.is_some()) };
            let right_height = if has_right { heights.pop().unwrap_or(0) } else { 0 };
            let left_height = if has_left { heights.pop().unwrap_or(0) } else { 0 };
            f(node_ptr, left_height, right_height);
            heights.push(cmp::max(left_height, right_height) + 1);
        });
        heights.pop().unwrap_or(0)
    }

    #[cfg(any(test, feature = "consistency_check"))]
    fn inorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(f, |_| {});
    }

    fn postorder<F: FnMut(NodePtr<K, V>)>(&self, f: F) {
        self.traverse(|_| {}, f);
    }

    fn traverse<In, Post>(&self, mut inorder: In, mut postorder: Post)
    where
        In: FnMut(NodePtr<K, V>),
        Post: FnMut(NodePtr<K, V>),
    {
        if let Some(mut node_ptr) = self.root {
            let mut dir = Direction::FromParent;
            loop {
                match dir {
                    Direction::FromParent => {
                        if let Some(left_ptr) = unsafe { node_ptr.as_ref().left } {
                            node_ptr = left_ptr;
                        } else {
                            dir = Direction::FromLeft;
                        }
                    }
                    Direction::FromLeft => {
                        inorder(node_ptr);
                        if let Some(right_ptr) = unsafe { node_ptr.as_ref().right } {
                            node_ptr = right_ptr;
                            dir = Direction::FromParent;
                        } else {
                            dir = Direction::FromRight;
                        }
                    }
                    Direction::FromRight => {
                        // Post order traversal is used for node deletion,
                        // so make sure not to use node pointer after postorder call.
                        if let Some(parent_ptr) = unsafe { node_ptr.as_ref().parent } {
                            if Some(node_ptr) == unsafe { parent_ptr.as_ref().left } {
                                dir = Direction::FromLeft;
                            } else {
                                dir = Direction::FromRight;
                            }
                            postorder(node_ptr);
                            node_ptr = parent_ptr;
                        } else {
                            postorder(node_ptr);
                            break;
                        }
                    }
                }
            }
        }
    }
}

impl<K: Ord, V> Tree<K, V> {
    pub(crate) fn find<Q>(&self, key: &Q) -> Link<K, V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut current = self.root;
        while let Some(node_ptr) = current {
            current = unsafe {
                match key.cmp(node_ptr.as_ref().key.borrow()) {
                    Ordering::Equal => break,
                    Ordering::Less => node_ptr.as_ref().left,
                    Ordering::Greater => node_ptr.as_ref().right,
                }
            }
        }
        current
    }

    /// Replaces the value of an existing key, or attaches a new leaf for it.
    pub(crate) fn insert(&mut self, key: K, value: V) -> Insertion<K, V> {
        match self.find_insert_pos(&key) {
            Err(mut node_ptr) => {
                let old_value = mem::replace(unsafe { &mut node_ptr.as_mut().value }, value);
                Insertion::Replaced(old_value)
            }
            Ok((parent, mut link_ptr)) => {
                let node_ptr = Node::create(parent, key, value);
                unsafe { *link_ptr.as_mut() = Some(node_ptr) };
                self.num_nodes += 1;
                Insertion::Attached(node_ptr)
            }
        }
    }

    /// Removes a key without any rebalancing.
    ///
    /// A node with two children first trades places with its in-order
    /// predecessor, so the node that gets spliced out has at most one child.
    pub(crate) fn remove<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node_ptr = self.find(key)?;
        unsafe {
            if node_ptr.as_ref().left.is_some() && node_ptr.as_ref().right.is_some() {
                if let Some(predecessor_ptr) = Self::predecessor(node_ptr) {
                    self.swap_positions(node_ptr, predecessor_ptr);
                }
            }
            self.detach(node_ptr);
            Some(Node::destroy(node_ptr))
        }
    }

    // Ok: the parent and the empty link a new node for `key` goes into.
    // Err: the node that already holds `key`.
    fn find_insert_pos(&mut self, key: &K) -> Result<(Link<K, V>, LinkPtr<K, V>), NodePtr<K, V>> {
        let mut parent: Link<K, V> = None;
        let mut link_ptr = LinkPtr::from(&mut self.root);
        unsafe {
            while let Some(mut node_ptr) = *link_ptr.as_ref() {
                link_ptr = match key.cmp(&node_ptr.as_ref().key) {
                    Ordering::Equal => return Err(node_ptr),
                    Ordering::Less => LinkPtr::from(&mut node_ptr.as_mut().left),
                    Ordering::Greater => LinkPtr::from(&mut node_ptr.as_mut().right),
                };
                parent = Some(node_ptr);
            }
        }
        Ok((parent, link_ptr))
    }

    /// Asserts parent links, key order, node count and balance factors.
    ///
    /// With `check_balance` every stored factor must equal the real height
    /// difference and lie in -1..=1, otherwise every factor must be zero.
    #[cfg(any(test, feature = "consistency_check"))]
    pub(crate) fn check_consistency(&self, check_balance: bool) {
        unsafe {
            // Check root link
            if let Some(root_ptr) = self.root {
                assert!(root_ptr.as_ref().parent.is_none());
            }

            // Check tree nodes
            let mut num_nodes = 0;
            self.fold_heights(|node_ptr, left_height, right_height| {
                let node = node_ptr.as_ref();

                // Check link for left child node
                if let Some(left_ptr) = node.left {
                    assert!(left_ptr.as_ref().parent == Some(node_ptr));
                    assert!(left_ptr.as_ref().key < node.key);
                }

                // Check link for right child node
                if let Some(right_ptr) = node.right {
                    assert!(right_ptr.as_ref().parent == Some(node_ptr));
                    assert!(right_ptr.as_ref().key > node.key);
                }

                // Check balance factor
                if check_balance {
                    let real = right_height as isize - left_height as isize;
                    assert_eq!(node.balance as isize, real);
                    assert!((-1..=1).contains(&node.balance));
                } else {
                    assert_eq!(node.balance, 0);
                }

                num_nodes += 1;
            });

            // Check number of nodes
            assert_eq!(num_nodes, self.num_nodes);

            // Check global order
            let mut previous: Link<K, V> = None;
            self.inorder(|node_ptr| {
                if let Some(previous_ptr) = previous {
                    assert!(previous_ptr.as_ref().key < node_ptr.as_ref().key);
                }
                previous = Some(node_ptr);
            });
        }
    }
}

impl<K: Clone, V: Clone> Clone for Tree<K, V> {
    /// Copies the tree node by node, keeping its shape and balance factors.
    fn clone(&self) -> Self {
        let mut tree = Tree::new();
        let Some(mut source_ptr) = self.root else {
            return tree;
        };
        unsafe {
            let mut target_ptr = Self::copy_node(source_ptr, None);
            tree.root = Some(target_ptr);
            loop {
                if let (Some(left_ptr), None) =
                    (source_ptr.as_ref().left, target_ptr.as_ref().left)
                {
                    let copy_ptr = Self::copy_node(left_ptr, Some(target_ptr));
                    target_ptr.as_mut().left = Some(copy_ptr);
                    source_ptr = left_ptr;
                    target_ptr = copy_ptr;
                } else if let (Some(right_ptr), None) =
                    (source_ptr.as_ref().right, target_ptr.as_ref().right)
                {
                    let copy_ptr = Self::copy_node(right_ptr, Some(target_ptr));
                    target_ptr.as_mut().right = Some(copy_ptr);
                    source_ptr = right_ptr;
                    target_ptr = copy_ptr;
                } else if let (Some(source_parent), Some(target_parent)) =
                    (source_ptr.as_ref().parent, target_ptr.as_ref().parent)
                {
                    source_ptr = source_parent;
                    target_ptr = target_parent;
                } else {
                    break;
                }
            }
        }
        tree.num_nodes = self.num_nodes;
        tree
    }
}

impl<K: Clone, V: Clone> Tree<K, V> {
    fn copy_node(source_ptr: NodePtr<K, V>, parent: Link<K, V>) -> NodePtr<K, V> {
        unsafe {
            let source = source_ptr.as_ref();
            let mut copy_ptr = Node::create(parent, source.key.clone(), source.value.clone());
            copy_ptr.as_mut().balance = source.balance;
            copy_ptr
        }
    }
}

impl<K, V> Drop for Tree<K, V> {
    fn drop(&mut self) {
        self.clear();
    }
}
