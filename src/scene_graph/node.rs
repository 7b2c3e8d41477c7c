use id_arena::Id;

use crate::geometry::Geometry;
use crate::light::Light;
use crate::material::Material;
use crate::math::{Mat4, Quat, Vec3};

pub type NodeId = Id<Node>;

/// What a node is, beyond its transform and place in the hierarchy.
pub enum NodeKind {
    Group,
    Camera,
    Mesh(MeshPayload),
    Light(Light),
}

pub struct MeshPayload {
    pub geometry: Geometry,
    pub material: Material,
}

pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform::new(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self::new(name, NodeKind::Mesh(MeshPayload { geometry, material }))
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Local TRS plus the cached world matrix. The world matrix is only valid
/// after a `Scene::update_world_transforms` pass.
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    local_override: Option<Mat4>,
    world: Mat4,
    needs_update: bool,
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            local_override: None,
            world: Mat4::IDENTITY,
            needs_update: true,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.needs_update = true;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.needs_update = true;
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.needs_update = true;
    }

    pub fn set_trs(&mut self, position: Vec3, rotation: Quat, scale: Vec3) {
        self.position = position;
        self.rotation = rotation;
        self.scale = scale;
        self.needs_update = true;
    }

    /// Overrides the composed TRS matrix; cleared with `clear_local_matrix`.
    pub fn set_local_matrix(&mut self, matrix: Mat4) {
        self.local_override = Some(matrix);
        self.needs_update = true;
    }

    pub fn clear_local_matrix(&mut self) {
        self.local_override = None;
        self.needs_update = true;
    }

    pub fn local_matrix(&self) -> Mat4 {
        match self.local_override {
            Some(matrix) => matrix,
            None => Mat4::compose(self.position, self.rotation, self.scale),
        }
    }

    pub fn world_matrix(&self) -> Mat4 {
        self.world
    }

    /// World-space position, valid after the last transform pass.
    pub fn world_position(&self) -> Vec3 {
        self.world.col(3)
    }

    pub(crate) fn needs_update(&self) -> bool {
        self.needs_update
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.needs_update = true;
    }

    pub(crate) fn update_world(&mut self, parent_world: &Mat4) {
        self.world = *parent_world * self.local_matrix();
        self.needs_update = false;
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
