//! The concurrent radix tree.
//!
//! ## Locking
//!
//! Each node sits behind its own `Mutex`; the exact-match index, the node
//! registry and the counters sit behind one tree-level `RwLock`.
//!
//! - Node guards are taken root-to-leaf. Descent is hand-over-hand: the
//!   child's guard is acquired before the parent's is released, so nobody
//!   observes a node halfway through a split.
//! - The tree-level guard is always taken last and never held while waiting
//!   on a node guard. Resolving a [`NodeId`] clones the node handle out of
//!   the registry and drops the tree-level guard before locking the node.
//! - A new node is registered, then linked under its locked parent, and only
//!   then published in the index. The index never names an entry that tree
//!   descent cannot reach.

mod debug;

pub use debug::{Dump, NodeSummary};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::{ArcMutexGuard, Mutex, RawMutex, RwLock};
use tracing::{debug, trace};

use crate::config::Config;
use crate::error::InsertError;
use crate::node::{common_prefix_len, Entry, Node, NodeId, NodeView};

type NodeRef<V> = Arc<Mutex<Node<V>>>;
type NodeGuard<V> = ArcMutexGuard<RawMutex, Node<V>>;

/// State behind the tree-level guard.
struct Shared<V> {
    /// Full key -> value for every live entry.
    index: HashMap<Vec<u8>, V>,
    /// Every node ever allocated, indexed by [`NodeId`]. Slot 0 is the root.
    registry: Vec<NodeRef<V>>,
    entries: usize,
    /// Allocated nodes, not counting the root.
    nodes: usize,
}

/// A compressed prefix tree mapping byte-string keys to values.
///
/// All operations take `&self`; the tree can be shared between threads and
/// written to concurrently. Values are cloned out on lookup, so `V` is
/// usually small or a shared handle such as `Arc<T>`.
///
/// Keys are write-once: inserting a key that is already present fails and
/// leaves the stored value untouched. There is no removal.
pub struct RadixTree<V> {
    root: NodeRef<V>,
    shared: RwLock<Shared<V>>,
}

/// Renders bytes for log fields.
fn lossy(bytes: &[u8]) -> std::borrow::Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

impl<V: Clone> RadixTree<V> {
    /// Create an empty tree with the default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create an empty tree sized by `config`.
    pub fn with_config(config: Config) -> Self {
        let root = Arc::new(Mutex::new(Node::root()));
        let mut registry = Vec::with_capacity(config.initial_capacity.saturating_mul(2).max(1));
        registry.push(Arc::clone(&root));
        Self {
            root,
            shared: RwLock::new(Shared {
                index: HashMap::with_capacity(config.initial_capacity),
                registry,
                entries: 0,
                nodes: 0,
            }),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.shared.read().entries
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of allocated nodes, branch points included and the root excluded.
    pub fn node_count(&self) -> usize {
        self.shared.read().nodes
    }

    /// Insert `key` with `value`.
    ///
    /// Returns `true` if a new entry was stored, either in fresh nodes or by
    /// promoting an existing branch point. Returns `false` without touching
    /// the tree if `key` is empty or already present.
    pub fn insert(&self, key: impl AsRef<[u8]>, value: V) -> bool {
        self.try_insert(key, value).is_ok()
    }

    /// Like [`insert`](Self::insert), but reports why nothing was stored.
    pub fn try_insert(&self, key: impl AsRef<[u8]>, value: V) -> Result<(), InsertError> {
        let key = key.as_ref();
        if key.is_empty() {
            return Err(InsertError::EmptyKey);
        }

        let mut parent = self.root.lock_arc();
        let mut pos = 0;
        loop {
            let rest = &key[pos..];
            let Some(child_id) = parent.child(rest[0]) else {
                self.append_leaf(parent, key, pos, value);
                return Ok(());
            };

            let child = self.resolve(child_id).lock_arc();
            let common = common_prefix_len(rest, &child.segment);
            if common < child.segment.len() {
                self.split(parent, child, key, pos + common, common, value);
                return Ok(());
            }

            pos += common;
            if pos == key.len() {
                drop(parent);
                return self.promote(child, key, value);
            }
            parent = child;
        }
    }

    /// Deepest node reached by descending along `key`.
    ///
    /// At each step the child keyed by the next unmatched byte is chosen and
    /// its segment compared against the rest of the query. Descent stops at
    /// the current node when it has no child for the next byte or the query
    /// is used up, and at the chosen child when its segment is not fully
    /// matched. The result may be a branch point with no value, and for an
    /// unmatched query it is the root.
    ///
    /// See [`longest_prefix_entry`](Self::longest_prefix_entry) for the
    /// longest stored key that prefixes the query.
    pub fn longest_prefix_match(&self, key: impl AsRef<[u8]>) -> NodeView<V> {
        let key = key.as_ref();
        let mut current = self.root.lock_arc();
        let mut pos = 0;
        while pos < key.len() {
            let Some(child_id) = current.child(key[pos]) else {
                break;
            };
            let child = self.resolve(child_id).lock_arc();
            let common = common_prefix_len(&key[pos..], &child.segment);
            let diverged = common < child.segment.len();
            pos += common;
            current = child;
            if diverged {
                break;
            }
        }
        current.view()
    }

    /// The longest stored key that is a prefix of `key`, with its value.
    pub fn longest_prefix_entry(&self, key: impl AsRef<[u8]>) -> Option<(Vec<u8>, V)> {
        let key = key.as_ref();
        let mut current = self.root.lock_arc();
        let mut pos = 0;
        let mut best = None;
        while pos < key.len() {
            let Some(child_id) = current.child(key[pos]) else {
                break;
            };
            let child = self.resolve(child_id).lock_arc();
            let common = common_prefix_len(&key[pos..], &child.segment);
            if common < child.segment.len() {
                break;
            }
            if let Some(entry) = &child.entry {
                best = Some((entry.key.to_vec(), entry.value.clone()));
            }
            pos += common;
            current = child;
        }
        best
    }

    /// Exact lookup through the index; never walks the tree.
    ///
    /// Returns the queried key alongside its value, or `None` if absent.
    pub fn perfect_match(&self, key: impl AsRef<[u8]>) -> (Vec<u8>, Option<V>) {
        let key = key.as_ref();
        let value = self.shared.read().index.get(key).cloned();
        (key.to_vec(), value)
    }

    pub fn get(&self, key: impl AsRef<[u8]>) -> Option<V> {
        self.shared.read().index.get(key.as_ref()).cloned()
    }

    pub fn contains_key(&self, key: impl AsRef<[u8]>) -> bool {
        self.shared.read().index.contains_key(key.as_ref())
    }

    fn resolve(&self, id: NodeId) -> NodeRef<V> {
        Arc::clone(&self.shared.read().registry[id.index()])
    }

    /// Register a fresh node and return it locked.
    ///
    /// The node is unreachable until linked, so locking it after the
    /// tree-level guard is dropped cannot block.
    fn allocate(&self, build: impl FnOnce(NodeId) -> Node<V>) -> NodeGuard<V> {
        let node = {
            let mut shared = self.shared.write();
            let id = NodeId::from_index(shared.registry.len());
            let node = Arc::new(Mutex::new(build(id)));
            shared.registry.push(Arc::clone(&node));
            shared.nodes += 1;
            node
        };
        node.lock_arc()
    }

    /// Make a linked entry visible to exact-match lookups.
    fn publish(&self, key: &[u8], value: V) {
        let mut shared = self.shared.write();
        let prev = shared.index.insert(key.to_vec(), value);
        debug_assert!(prev.is_none(), "index already held {:?}", lossy(key));
        shared.entries += 1;
    }

    /// Hang the unmatched tail `key[pos..]` under `parent` as a new leaf.
    fn append_leaf(&self, mut parent: NodeGuard<V>, key: &[u8], pos: usize, value: V) {
        let suffix = &key[pos..];
        let parent_id = parent.id;
        let leaf = self.allocate(|id| Node::leaf(id, parent_id, suffix, key, value.clone()));
        parent.link_child(suffix[0], leaf.id);
        drop(parent);

        debug!(
            leaf = ?leaf.id,
            parent = ?parent_id,
            segment = %lossy(suffix),
            "appended leaf"
        );
        self.publish(key, value);
    }

    /// Attach `key` to a node whose path spells it exactly.
    fn promote(&self, mut node: NodeGuard<V>, key: &[u8], value: V) -> Result<(), InsertError> {
        if node.is_terminal() {
            trace!(key = %lossy(key), "rejected duplicate key");
            return Err(InsertError::DuplicateKey);
        }
        node.entry = Some(Entry::new(key, value.clone()));
        debug!(node = ?node.id, key = %lossy(key), "promoted branch to entry");
        self.publish(key, value);
        Ok(())
    }

    /// Split `child` after its first `common` bytes and store `key` below
    /// the new branch point. `pos` is where `key` leaves the shared prefix.
    fn split(
        &self,
        mut parent: NodeGuard<V>,
        mut child: NodeGuard<V>,
        key: &[u8],
        pos: usize,
        common: usize,
        value: V,
    ) {
        debug_assert!(common > 0 && common < child.segment.len());
        let parent_id = parent.id;
        let mut branch = self.allocate(|id| Node::branch(id, parent_id, &child.segment[..common]));

        child.segment.drain(..common);
        child.parent = Some(branch.id);
        branch.link_child(child.segment[0], child.id);
        parent.replace_child(branch.segment[0], branch.id);

        debug!(
            branch = ?branch.id,
            shared = %lossy(&branch.segment),
            child = ?child.id,
            remainder = %lossy(&child.segment),
            "split node"
        );
        drop(child);
        drop(parent);

        if pos == key.len() {
            branch.entry = Some(Entry::new(key, value.clone()));
            debug!(node = ?branch.id, key = %lossy(key), "branch point holds entry");
            self.publish(key, value);
        } else {
            self.append_leaf(branch, key, pos, value);
        }
    }
}

impl<V: Clone> Default for RadixTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for RadixTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.read();
        f.debug_struct("RadixTree")
            .field("entries", &shared.entries)
            .field("nodes", &shared.nodes)
            .finish()
    }
}
