use id_arena::Arena;

use crate::math::Mat4;
use crate::scene_graph::node::{Node, NodeId};

/// Arena-backed node tree. Children are owned by their parent through the
/// graph links; the parent link is a plain back-reference for upward walks.
///
/// `attach` enforces the single-parent invariant by detaching first. It does
/// not detect cycles: callers must not attach a node under its own
/// descendant.
pub struct Scene {
    nodes: Arena<Node>,
    root: NodeId,
}

impl Scene {
    pub fn new() -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::group("Scene"));
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Adds a node to the arena, initially detached.
    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.alloc(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Makes `child` a child of `parent`, detaching it from any current
    /// parent first.
    pub fn attach(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);

        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
            node.transform.mark_dirty();
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.push(child);
        }
    }

    /// Unlinks `child` from its parent. The node and its subtree stay in the
    /// arena; detached trees are simply never visited again.
    pub fn detach(&mut self, child: NodeId) {
        let Some(old_parent) = self.nodes.get(child).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent) = self.nodes.get_mut(old_parent) {
            parent.children.retain(|&id| id != child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = None;
            node.transform.mark_dirty();
        }
    }

    /// Top-down world transform pass. After it returns, every node reachable
    /// from the root has a world matrix consistent with the current local
    /// transforms of itself and all ancestors.
    pub fn update_world_transforms(&mut self) {
        self.update_subtree(self.root, Mat4::IDENTITY, false);
    }

    fn update_subtree(&mut self, id: NodeId, parent_world: Mat4, force: bool) {
        let (world, children, force_children) = match self.nodes.get_mut(id) {
            Some(node) => {
                let recompute = force || node.transform.needs_update();
                if recompute {
                    node.transform.update_world(&parent_world);
                }
                (
                    node.transform.world_matrix(),
                    node.children.clone(),
                    recompute,
                )
            }
            None => return,
        };

        for child in children {
            self.update_subtree(child, world, force_children);
        }
    }

    /// Visits `id` and all descendants in pre-order.
    pub fn traverse(&self, id: NodeId, visitor: &mut impl FnMut(NodeId, &Node)) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        visitor(id, node);
        for &child in &node.children {
            self.traverse(child, visitor);
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Quat, Vec3};

    #[test]
    fn attach_detaches_from_previous_parent() {
        let mut scene = Scene::new();
        let a = scene.alloc(Node::group("a"));
        let b = scene.alloc(Node::group("b"));
        let child = scene.alloc(Node::group("child"));

        scene.attach(a, child);
        scene.attach(b, child);

        assert!(scene.get(a).unwrap().children().is_empty());
        assert_eq!(scene.get(b).unwrap().children(), &[child]);
        assert_eq!(scene.get(child).unwrap().parent(), Some(b));
    }

    #[test]
    fn world_transforms_compose_down_the_chain() {
        let mut scene = Scene::new();
        let parent = scene.alloc(Node::group("parent"));
        let child = scene.alloc(Node::group("child"));
        scene.attach(scene.root(), parent);
        scene.attach(parent, child);

        scene
            .get_mut(parent)
            .unwrap()
            .transform
            .set_position(Vec3::new(1.0, 2.0, 3.0));
        scene
            .get_mut(child)
            .unwrap()
            .transform
            .set_trs(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY, Vec3::splat(2.0));

        scene.update_world_transforms();

        let child_world = scene.get(child).unwrap().transform.world_position();
        assert_eq!(child_world, Vec3::new(2.0, 2.0, 3.0));
    }

    #[test]
    fn parent_change_reaches_descendants_on_next_pass() {
        let mut scene = Scene::new();
        let parent = scene.alloc(Node::group("parent"));
        let child = scene.alloc(Node::group("child"));
        scene.attach(scene.root(), parent);
        scene.attach(parent, child);
        scene.update_world_transforms();

        scene
            .get_mut(parent)
            .unwrap()
            .transform
            .set_position(Vec3::new(0.0, 5.0, 0.0));
        scene.update_world_transforms();

        let child_world = scene.get(child).unwrap().transform.world_position();
        assert_eq!(child_world, Vec3::new(0.0, 5.0, 0.0));
    }

    #[test]
    fn detached_subtree_is_not_traversed() {
        let mut scene = Scene::new();
        let a = scene.alloc(Node::group("a"));
        scene.attach(scene.root(), a);
        scene.detach(a);

        let mut visited = Vec::new();
        scene.traverse(scene.root(), &mut |_, node| visited.push(node.name.clone()));
        assert_eq!(visited, vec!["Scene".to_string()]);
    }
}
