//! Node data: identity, kind and local transform.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable node identifier, unique for the node's whole lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Procedural primitive meshes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshType {
    Cube,
    Sphere,
    Cylinder,
    Torus,
    Plane,
}

impl MeshType {
    pub fn name(&self) -> &'static str {
        match self {
            MeshType::Cube => "Cube",
            MeshType::Sphere => "Sphere",
            MeshType::Cylinder => "Cylinder",
            MeshType::Torus => "Torus",
            MeshType::Plane => "Plane",
        }
    }
}

/// What a node represents. The editor core only cares about identity and
/// transform; the kind is carried through for collaborators.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// Empty grouping node (also the scene root)
    #[default]
    Group,
    /// Procedurally generated primitive
    Mesh { mesh: MeshType, color: [f32; 3] },
    /// Model produced by a loader
    Model { source: String },
    /// Streamed tileset root
    Tileset { url: String },
    /// Visual helper attached to another node
    Helper { target: Option<NodeId> },
}

/// Local transform. Rotation is Euler XYZ in radians.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            rotation: [0.0, 0.0, 0.0],
            scale: [1.0, 1.0, 1.0],
        }
    }

    pub fn with_position(mut self, position: [f32; 3]) -> Self {
        self.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: [f32; 3]) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, scale: [f32; 3]) -> Self {
        self.scale = scale;
        self
    }
}

/// A scene graph element.
///
/// Hierarchy (parent and ordered children) is owned by the
/// [`SceneGraph`](crate::SceneGraph), not by the node itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub uuid: NodeId,
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(NodeId::new(), name)
    }

    pub fn with_id(uuid: NodeId, name: impl Into<String>) -> Self {
        Self {
            uuid,
            name: name.into(),
            kind: NodeKind::Group,
            transform: Transform::new(),
            visible: true,
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn mesh(name: impl Into<String>, mesh: MeshType) -> Self {
        Self::new(name).with_kind(NodeKind::Mesh {
            mesh,
            color: [0.8, 0.8, 0.8],
        })
    }
}

/// An owned, detached subtree.
///
/// This is the form a node takes while it is out of the graph (held by an
/// undo entry) and the form embedded in serialized commands and snapshots.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeTree {
    #[serde(flatten)]
    pub node: Node,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeTree>,
}

impl NodeTree {
    pub fn new(node: Node) -> Self {
        Self {
            node,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: NodeTree) -> Self {
        self.children.push(child);
        self
    }

    pub fn uuid(&self) -> NodeId {
        self.node.uuid
    }

    /// Number of nodes in the subtree, root included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(NodeTree::node_count).sum::<usize>()
    }

    /// Depth-first, pre-order walk over the subtree's nodes.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Node)) {
        visit(&self.node);
        for child in &self.children {
            child.walk(visit);
        }
    }

    /// All identifiers in the subtree, pre-order.
    pub fn ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::with_capacity(self.node_count());
        self.walk(&mut |node| ids.push(node.uuid));
        ids
    }

    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }

    pub fn from_json(value: &serde_json::Value) -> serde_json::Result<Self> {
        NodeTree::deserialize(value)
    }
}

impl From<Node> for NodeTree {
    fn from(node: Node) -> Self {
        NodeTree::new(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_parse_roundtrip() {
        let id = NodeId::new();
        let parsed: NodeId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<NodeId>().is_err());
    }

    #[test]
    fn test_tree_json_shape() {
        let tree = NodeTree::new(Node::mesh("Box", MeshType::Cube))
            .with_child(NodeTree::new(Node::new("Child")));

        let json = tree.to_json().unwrap();
        assert_eq!(json["name"], "Box");
        assert_eq!(json["kind"], "mesh");
        assert_eq!(json["mesh"], "cube");
        assert_eq!(json["children"][0]["name"], "Child");
        assert_eq!(json["uuid"], tree.uuid().to_string());

        let back = NodeTree::from_json(&json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_tree_defaults_when_fields_missing() {
        let id = NodeId::new();
        let json = serde_json::json!({ "uuid": id.to_string(), "name": "Bare", "kind": "group" });
        let tree = NodeTree::from_json(&json).unwrap();

        assert_eq!(tree.node.transform, Transform::new());
        assert!(tree.node.visible);
        assert!(tree.children.is_empty());
    }

    #[test]
    fn test_default_kind_is_group() {
        assert_eq!(NodeKind::default(), NodeKind::Group);
    }

    #[test]
    fn test_tree_ids_preorder() {
        let leaf = NodeTree::new(Node::new("leaf"));
        let mid = NodeTree::new(Node::new("mid")).with_child(leaf.clone());
        let root = NodeTree::new(Node::new("root")).with_child(mid.clone());

        assert_eq!(root.ids(), vec![root.uuid(), mid.uuid(), leaf.uuid()]);
        assert_eq!(root.node_count(), 3);
    }
}
