//! # mosaic_scene - Scene Graph
//!
//! A minimal tree of addressable nodes:
//! - Stable [`NodeId`]s that survive detach/re-insert
//! - Local [`Transform`] per node
//! - A [`SceneGraph`] arena that keeps parent links and children lists in sync
//! - [`NodeTree`], the owned form of a subtree while it is out of the graph
//!
//! ## Example
//!
//! ```ignore
//! use mosaic_scene::prelude::*;
//!
//! let mut scene = SceneGraph::new();
//! let id = scene.insert(Node::mesh("Box", MeshType::Cube).into(), None, None)?;
//! scene.get_mut(id).unwrap().transform.position = [1.0, 0.0, 0.0];
//! ```

mod graph;
mod node;

pub use graph::{SceneError, SceneGraph};
pub use node::{MeshType, Node, NodeId, NodeKind, NodeTree, Transform};

/// Prelude
pub mod prelude {
    pub use crate::{MeshType, Node, NodeId, NodeKind, NodeTree, SceneError, SceneGraph, Transform};
}
