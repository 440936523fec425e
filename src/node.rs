//! Tree nodes and the arena handles that link them.
//!
//! Nodes never point at each other directly. Parent and child links are
//! [`NodeId`]s into the tree's registry, so a back-reference can never
//! dangle and dropping the registry releases the whole graph.

use std::collections::BTreeMap;

use smallvec::SmallVec;

/// Segments up to this many bytes are stored inline in the node.
const INLINE_SEGMENT_LEN: usize = 16;

pub(crate) type Segment = SmallVec<[u8; INLINE_SEGMENT_LEN]>;

/// Index of a node in the tree's registry.
///
/// Ids are handed out in allocation order; the root is always id 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const ROOT: NodeId = NodeId(0);

    /// # Panics
    /// Panics if the registry has grown past `u32::MAX - 1` nodes.
    pub(crate) fn from_index(idx: usize) -> Self {
        assert!(idx < u32::MAX as usize, "node registry too large");
        Self(idx as u32)
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A live key/value pair terminating at a node.
pub(crate) struct Entry<V> {
    pub(crate) key: Box<[u8]>,
    pub(crate) value: V,
}

impl<V> Entry<V> {
    pub(crate) fn new(key: &[u8], value: V) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// One compressed edge of the tree.
///
/// Every field is guarded by the `Mutex` the registry wraps the node in.
pub(crate) struct Node<V> {
    pub(crate) id: NodeId,
    /// Edge label from the parent. Empty only for the root.
    pub(crate) segment: Segment,
    /// Present iff this node terminates a stored key.
    pub(crate) entry: Option<Entry<V>>,
    pub(crate) parent: Option<NodeId>,
    /// Children keyed by the first byte of their segment.
    pub(crate) children: BTreeMap<u8, NodeId>,
}

impl<V> Node<V> {
    pub(crate) fn root() -> Self {
        Self {
            id: NodeId::ROOT,
            segment: Segment::new(),
            entry: None,
            parent: None,
            children: BTreeMap::new(),
        }
    }

    /// A valueless branch point holding `segment`.
    pub(crate) fn branch(id: NodeId, parent: NodeId, segment: &[u8]) -> Self {
        debug_assert!(!segment.is_empty(), "branch segment must not be empty");
        Self {
            id,
            segment: Segment::from_slice(segment),
            entry: None,
            parent: Some(parent),
            children: BTreeMap::new(),
        }
    }

    /// A terminal node for `key`, labelled with the unmatched `segment`.
    pub(crate) fn leaf(id: NodeId, parent: NodeId, segment: &[u8], key: &[u8], value: V) -> Self {
        let mut node = Self::branch(id, parent, segment);
        node.entry = Some(Entry::new(key, value));
        node
    }

    #[inline]
    pub(crate) fn is_terminal(&self) -> bool {
        self.entry.is_some()
    }

    #[inline]
    pub(crate) fn child(&self, unit: u8) -> Option<NodeId> {
        self.children.get(&unit).copied()
    }

    /// Attach a child under a first byte that is not yet taken.
    pub(crate) fn link_child(&mut self, unit: u8, child: NodeId) {
        let prev = self.children.insert(unit, child);
        debug_assert!(
            prev.is_none(),
            "node {:?} already has a child for {:#04x}",
            self.id,
            unit
        );
    }

    /// Swap the child under `unit` for a new one, as a split does.
    pub(crate) fn replace_child(&mut self, unit: u8, child: NodeId) -> Option<NodeId> {
        let prev = self.children.insert(unit, child);
        debug_assert!(prev.is_some(), "replaced a child that was never linked");
        prev
    }
}

impl<V: Clone> Node<V> {
    pub(crate) fn view(&self) -> NodeView<V> {
        NodeView {
            segment: self.segment.to_vec(),
            full_key: self.entry.as_ref().map(|e| e.key.to_vec()),
            value: self.entry.as_ref().map(|e| e.value.clone()),
            has_children: !self.children.is_empty(),
        }
    }
}

/// Point-in-time copy of a node, as returned by
/// [`RadixTree::longest_prefix_match`](crate::RadixTree::longest_prefix_match).
///
/// The node may be a pure branch point, in which case `full_key` and `value`
/// are both `None`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeView<V> {
    /// Edge label from the node's parent; empty for the root.
    pub segment: Vec<u8>,
    /// The complete key this node stores, if it stores one.
    pub full_key: Option<Vec<u8>>,
    /// The stored value, present exactly when `full_key` is.
    pub value: Option<V>,
    pub has_children: bool,
}

impl<V> NodeView<V> {
    /// Whether the node holds a live entry.
    pub fn is_terminal(&self) -> bool {
        self.value.is_some()
    }
}

/// Number of leading bytes `a` and `b` share.
#[inline]
pub(crate) fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_prefix_len() {
        assert_eq!(common_prefix_len(b"decker", b"deck"), 4);
        assert_eq!(common_prefix_len(b"did", b"deck"), 1);
        assert_eq!(common_prefix_len(b"x", b"deck"), 0);
        assert_eq!(common_prefix_len(b"", b"deck"), 0);
        assert_eq!(common_prefix_len(b"doge", b"doge"), 4);
    }

    #[test]
    fn test_leaf_view() {
        let node: Node<u32> = Node::leaf(NodeId(3), NodeId::ROOT, b"ck", b"deck", 7);
        let view = node.view();
        assert_eq!(view.segment, b"ck");
        assert_eq!(view.full_key.as_deref(), Some(&b"deck"[..]));
        assert_eq!(view.value, Some(7));
        assert!(!view.has_children);
        assert!(view.is_terminal());
    }

    #[test]
    fn test_branch_has_no_entry() {
        let mut node: Node<u32> = Node::branch(NodeId(1), NodeId::ROOT, b"do");
        assert!(!node.is_terminal());
        node.link_child(b'g', NodeId(2));
        node.link_child(b'e', NodeId(3));
        assert_eq!(node.child(b'g'), Some(NodeId(2)));
        assert_eq!(node.child(b'x'), None);
        assert_eq!(node.replace_child(b'g', NodeId(4)), Some(NodeId(2)));

        let view = node.view();
        assert!(view.has_children);
        assert_eq!(view.full_key, None);
        assert_eq!(view.value, None);
    }

    #[test]
    #[should_panic(expected = "node registry too large")]
    fn test_node_id_overflow() {
        let _ = NodeId::from_index(u32::MAX as usize);
    }
}
