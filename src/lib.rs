//! # radix-rs
//!
//! A concurrent compressed prefix tree (radix tree / PATRICIA trie) over
//! byte-string keys.
//!
//! Chains of single-child nodes are merged into multi-byte segments, and
//! paths are split on the fly when a new key diverges inside a segment.
//! Every operation takes `&self`: each node carries its own lock and
//! descent is hand-over-hand, so inserts and lookups can run from many
//! threads at once.
//!
//! Three lookups are offered:
//!
//! - [`RadixTree::perfect_match`]: exact key, answered from a flat index
//!   without walking the tree.
//! - [`RadixTree::longest_prefix_match`]: the deepest node the query
//!   reaches, which may be a branch point with no value.
//! - [`RadixTree::longest_prefix_entry`]: the longest stored key that is a
//!   prefix of the query.
//!
//! ## Example
//!
//! ```rust
//! use radix_rs::RadixTree;
//!
//! let tree: RadixTree<u32> = RadixTree::new();
//! assert!(tree.insert("dog", 1));
//! assert!(tree.insert("doge", 2));
//! assert!(!tree.insert("dog", 3));
//!
//! assert_eq!(tree.perfect_match("dog"), (b"dog".to_vec(), Some(1)));
//! assert_eq!(tree.perfect_match("do"), (b"do".to_vec(), None));
//!
//! let node = tree.longest_prefix_match("dogex");
//! assert_eq!(node.full_key.as_deref(), Some(&b"doge"[..]));
//! assert_eq!(tree.longest_prefix_entry("dogma"), Some((b"dog".to_vec(), 1)));
//! ```

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

mod config;
mod error;
mod node;
mod tree;

pub use config::Config;
pub use error::InsertError;
pub use node::{NodeId, NodeView};
pub use tree::{Dump, NodeSummary, RadixTree};



#[cfg(test)]
mod proptests;
