pub mod node;
pub mod scene;

pub use node::{MeshPayload, Node, NodeId, NodeKind, Transform};
pub use scene::Scene;
