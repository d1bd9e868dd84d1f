//! Pagekit DOM - Document Object Model
//!
//! Arena-backed document tree. Page tooling (script loading, visibility
//! tracking) mutates and queries it through `Document`.

mod node;
mod tree;
mod document;
mod geometry;

pub use node::{Node, NodeData, ElementData, Attribute};
pub use tree::{DomTree, Children, Descendants};
pub use document::Document;
pub use geometry::{DomRect, RootMargin, MarginValue};

/// Node identifier (index into arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Document node
    pub const ROOT: NodeId = NodeId(0);
    /// Sentinel for "no node"
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Build an id from a raw arena index
    pub fn from_raw(index: u32) -> Self {
        NodeId(index)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::NONE
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    #[error("node not found")]
    NotFound,

    #[error("hierarchy request error")]
    HierarchyRequest,

    #[error("invalid node type")]
    InvalidNodeType,

    #[error("node is not a child")]
    NotAChild,

    #[error("invalid root margin: {0}")]
    InvalidRootMargin(String),
}
