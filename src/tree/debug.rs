//! Diagnostics: a printable dump of the tree and an integrity checker.

use std::collections::HashSet;
use std::fmt;

use super::{lossy, RadixTree};
use crate::node::NodeId;

/// One registered node as seen by [`RadixTree::dump`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeSummary {
    pub id: NodeId,
    pub parent: Option<NodeId>,
    pub segment: Vec<u8>,
    pub full_key: Option<Vec<u8>>,
    /// First byte of each child's segment, ascending.
    pub children: Vec<u8>,
}

/// Snapshot of a tree: counters, every registered node, every entry.
///
/// Taken node by node, so a dump of a tree under concurrent insertion is not
/// atomic as a whole.
#[derive(Clone, Debug)]
pub struct Dump<V> {
    pub entries: usize,
    pub nodes: usize,
    pub registry: Vec<NodeSummary>,
    /// Indexed entries sorted by key.
    pub index: Vec<(Vec<u8>, V)>,
}

impl<V: Clone> RadixTree<V> {
    /// Snapshot the tree for printing or inspection.
    pub fn dump(&self) -> Dump<V> {
        let (entries, nodes, registry, mut index) = {
            let shared = self.shared.read();
            let index: Vec<(Vec<u8>, V)> = shared
                .index
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            (shared.entries, shared.nodes, shared.registry.clone(), index)
        };
        index.sort_by(|a, b| a.0.cmp(&b.0));

        // Tree-level guard is released; nodes are locked one at a time.
        let registry = registry
            .iter()
            .map(|node| {
                let node = node.lock();
                NodeSummary {
                    id: node.id,
                    parent: node.parent,
                    segment: node.segment.to_vec(),
                    full_key: node.entry.as_ref().map(|e| e.key.to_vec()),
                    children: node.children.keys().copied().collect(),
                }
            })
            .collect();

        Dump {
            entries,
            nodes,
            registry,
            index,
        }
    }

    /// Walk the tree and report every structural problem found.
    ///
    /// An empty result means the tree is consistent. Meant for a quiescent
    /// tree; concurrent inserts can make counters and structure disagree
    /// for a moment.
    pub fn verify_integrity(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let (entries, nodes, registered, index_keys) = {
            let shared = self.shared.read();
            let keys: HashSet<Vec<u8>> = shared.index.keys().cloned().collect();
            (shared.entries, shared.nodes, shared.registry.len(), keys)
        };

        {
            let root = self.root.lock();
            if root.id != NodeId::ROOT {
                issues.push(format!("root has id {:?}", root.id));
            }
            if !root.segment.is_empty() {
                issues.push(format!("root segment {:?} is not empty", lossy(&root.segment)));
            }
            if root.is_terminal() {
                issues.push("root holds an entry".to_string());
            }
        }

        let mut reached_nodes = 0usize;
        let mut terminals = HashSet::new();
        let mut stack = vec![(NodeId::ROOT, Vec::new())];
        while let Some((id, path)) = stack.pop() {
            reached_nodes += 1;
            let node = self.resolve(id);
            let node = node.lock();

            if let Some(entry) = &node.entry {
                if *entry.key != *path {
                    issues.push(format!(
                        "node {:?} stores {:?} but its path spells {:?}",
                        id,
                        lossy(&entry.key),
                        lossy(&path)
                    ));
                }
                if !index_keys.contains(&path) {
                    issues.push(format!("entry {:?} missing from index", lossy(&path)));
                }
                if !terminals.insert(path.clone()) {
                    issues.push(format!("entry {:?} reachable twice", lossy(&path)));
                }
            } else if id != NodeId::ROOT && node.children.len() < 2 {
                issues.push(format!(
                    "branch node {:?} has {} children",
                    id,
                    node.children.len()
                ));
            }

            for (&unit, &child_id) in &node.children {
                let child = self.resolve(child_id);
                let child = child.lock();
                match child.segment.first() {
                    None => issues.push(format!("node {:?} has an empty segment", child_id)),
                    Some(&first) if first != unit => issues.push(format!(
                        "node {:?} linked under {:#04x} but segment starts with {:#04x}",
                        child_id, unit, first
                    )),
                    Some(_) => {}
                }
                if child.parent != Some(id) {
                    issues.push(format!(
                        "node {:?} has parent {:?}, expected {:?}",
                        child_id, child.parent, id
                    ));
                }
                let mut child_path = path.clone();
                child_path.extend_from_slice(&child.segment);
                stack.push((child_id, child_path));
            }
        }

        if terminals.len() != index_keys.len() {
            issues.push(format!(
                "{} reachable entries but {} indexed",
                terminals.len(),
                index_keys.len()
            ));
        }
        if entries != index_keys.len() {
            issues.push(format!(
                "entry counter {} but {} indexed",
                entries,
                index_keys.len()
            ));
        }
        if nodes + 1 != registered {
            issues.push(format!(
                "node counter {} but {} registered besides the root",
                nodes,
                registered.saturating_sub(1)
            ));
        }
        if reached_nodes != registered {
            issues.push(format!(
                "{} nodes reachable but {} registered",
                reached_nodes, registered
            ));
        }
        issues
    }
}

impl<V: fmt::Debug> fmt::Display for Dump<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} entries in {} nodes", self.entries, self.nodes)?;
        for node in &self.registry {
            write!(f, "[{:?}] {:?}", node.id, lossy(&node.segment))?;
            if let Some(key) = &node.full_key {
                write!(f, " = {:?}", lossy(key))?;
            }
            if let Some(parent) = node.parent {
                write!(f, " parent={:?}", parent)?;
            }
            if !node.children.is_empty() {
                let children: String = node.children.iter().map(|&b| b as char).collect();
                write!(f, " children={:?}", children)?;
            }
            writeln!(f)?;
        }
        writeln!(f, "entries:")?;
        for (key, value) in &self.index {
            writeln!(f, "  {}: {:?}", lossy(key), value)?;
        }
        Ok(())
    }
}
