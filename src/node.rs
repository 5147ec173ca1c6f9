use std::ptr::{self, NonNull};

pub(crate) type NodePtr<K, V> = NonNull<Node<K, V>>;
pub(crate) type Link<K, V> = Option<NodePtr<K, V>>;
pub(crate) type LinkPtr<K, V> = NonNull<Link<K, V>>;

/// A tree node.
///
/// `left` and `right` own their subtrees: only the tree releases nodes, and
/// it does so through these links. `parent` is a back reference for upward
/// walks and never owns anything.
///
/// `balance` is height(right) - height(left). The unbalanced tree leaves it
/// at zero.
pub(crate) struct Node<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) parent: Link<K, V>,
    pub(crate) left: Link<K, V>,
    pub(crate) right: Link<K, V>,
    pub(crate) balance: i8,
}

/// Side of a parent a node hangs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Side {
    Left,
    Right,
}

impl<K, V> Node<K, V> {
    pub(crate) fn create(parent: Link<K, V>, key: K, value: V) -> NodePtr<K, V> {
        let boxed = Box::new(Node {
            key,
            value,
            parent,
            left: None,
            right: None,
            balance: 0,
        });
        // Box::into_raw never returns null
        unsafe { NodePtr::new_unchecked(Box::into_raw(boxed)) }
    }

    /// Releases the node and hands back its entry.
    ///
    /// # Safety
    /// `node_ptr` must come from `create` and must not be reachable from any
    /// tree link afterwards.
    pub(crate) unsafe fn destroy(node_ptr: NodePtr<K, V>) -> (K, V) {
        let boxed = Box::from_raw(node_ptr.as_ptr());
        (boxed.key, boxed.value)
    }

    /// Side of `parent` that `node_ptr` is attached to.
    ///
    /// # Safety
    /// Both pointers must be live and `parent` must be `node_ptr`'s parent.
    pub(crate) unsafe fn side_in(node_ptr: NodePtr<K, V>, parent_ptr: NodePtr<K, V>) -> Side {
        if Self::left_of(parent_ptr) == Some(node_ptr) {
            Side::Left
        } else {
            Side::Right
        }
    }

    // The link accessors below go through raw field places and never create
    // a reference to the whole node. Walks may pass over nodes whose value is
    // mutably borrowed by the caller of `iter_mut`.

    pub(crate) unsafe fn parent_of(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        (*node_ptr.as_ptr()).parent
    }

    pub(crate) unsafe fn left_of(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        (*node_ptr.as_ptr()).left
    }

    pub(crate) unsafe fn right_of(node_ptr: NodePtr<K, V>) -> Link<K, V> {
        (*node_ptr.as_ptr()).right
    }

    /// Pointer to the child link on `side` of the node.
    pub(crate) unsafe fn child_link(node_ptr: NodePtr<K, V>, side: Side) -> LinkPtr<K, V> {
        let link = match side {
            Side::Left => ptr::addr_of_mut!((*node_ptr.as_ptr()).left),
            Side::Right => ptr::addr_of_mut!((*node_ptr.as_ptr()).right),
        };
        LinkPtr::new_unchecked(link)
    }
}
