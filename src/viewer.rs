use std::sync::mpsc::{self, Receiver, TryRecvError};

use anyhow::Context;

use crate::camera::Camera;
use crate::geometry::GeometryId;
use crate::gltf::fetch::FetchedDocument;
use crate::gltf::{build_model, fetch_document, LoadError};
use crate::light::Light;
use crate::math::{Aabb, Vec3};
use crate::orbit::OrbitControls;
use crate::scene_graph::{Node, NodeId, NodeKind, Scene};

/// Headroom around the fitted object so it does not touch the frame edges.
const CAMERA_FIT_MARGIN: f32 = 1.6;

/// Distance at which an object of `extent` fills the viewport vertically,
/// with fit margin applied. `fov_y` in radians.
pub fn fit_distance(extent: f32, fov_y: f32) -> f32 {
    extent * CAMERA_FIT_MARGIN / (fov_y * 0.5).tan()
}

/// World-space bounding box of every mesh under `root`, positions taken
/// through each mesh's world matrix. Valid after a transform pass.
pub fn world_bounding_box(scene: &Scene, root: NodeId) -> Aabb {
    let mut aabb = Aabb::EMPTY;
    scene.traverse(root, &mut |_, node| {
        let NodeKind::Mesh(payload) = &node.kind else {
            return;
        };
        let Some(position) = payload.geometry.attribute(crate::geometry::ATTRIBUTE_POSITION)
        else {
            return;
        };
        if position.item_size < 3 {
            return;
        }
        let world = node.transform.world_matrix();
        for element in position.data.chunks_exact(position.item_size) {
            aabb.expand_transformed_point(&world, Vec3::new(element[0], element[1], element[2]));
        }
    });
    aabb
}

/// Owns the scene, the persistent camera, default lights and the orbit
/// controls, and drives asynchronous model loads. All scene mutation happens
/// on the frame thread; the load tasks only fetch and decode bytes.
pub struct Viewer {
    pub scene: Scene,
    pub camera: Camera,
    pub controls: OrbitControls,
    camera_node: NodeId,
    model_root: Option<NodeId>,
    runtime: tokio::runtime::Runtime,
    pending: Option<Receiver<Result<FetchedDocument, LoadError>>>,
}

impl Viewer {
    pub fn new() -> anyhow::Result<Viewer> {
        let mut scene = Scene::new();

        let camera_node = scene.alloc(Node::new("Camera", NodeKind::Camera));
        scene.attach(scene.root(), camera_node);

        let ambient = scene.alloc(Node::new(
            "Ambient light",
            NodeKind::Light(Light::ambient(Vec3::ONE, 0.55)),
        ));
        scene.attach(scene.root(), ambient);

        let key_light = scene.alloc(Node::new(
            "Key light",
            NodeKind::Light(Light::directional(Vec3::ONE, 0.9)),
        ));
        scene.attach(scene.root(), key_light);
        if let Some(node) = scene.get_mut(key_light) {
            node.transform.set_position(Vec3::new(2.0, 4.0, 3.0));
        }

        let mut controls = OrbitControls::new();
        let start_position = Vec3::new(0.0, 1.4, 3.0);
        controls.target = Vec3::new(0.0, 1.0, 0.0);
        controls.sync_from_position(start_position);
        if let Some(node) = scene.get_mut(camera_node) {
            node.transform.set_position(start_position);
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .context("Failed to start loader runtime")?;

        Ok(Viewer {
            scene,
            camera: Camera::new(),
            controls,
            camera_node,
            model_root: None,
            runtime,
            pending: None,
        })
    }

    pub fn camera_node(&self) -> NodeId {
        self.camera_node
    }

    pub fn model_root(&self) -> Option<NodeId> {
        self.model_root
    }

    /// Starts fetching a model. A newer call supersedes an unfinished one;
    /// the superseded fetch is not cancelled, its result is just dropped.
    pub fn load_model(&mut self, url: &str) {
        log::info!("loading model from {url}");
        let (tx, rx) = mpsc::channel();
        let url = url.to_string();
        self.runtime.spawn(async move {
            let result = fetch_document(&url).await;
            // The receiver may already be gone if a newer load took over.
            let _ = tx.send(result);
        });
        self.pending = Some(rx);
    }

    /// Polled once per frame. When a fetch has finished, builds and attaches
    /// the scene on this thread and returns the geometry ids of the replaced
    /// model so the renderer can release their GPU buffers.
    pub fn poll_finished_load(&mut self) -> Option<Vec<GeometryId>> {
        let rx = self.pending.as_ref()?;
        let result = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                log::error!("model load task vanished without a result");
                return None;
            }
        };
        self.pending = None;

        let fetched = match result {
            Ok(fetched) => fetched,
            Err(err) => {
                log::error!("model load failed: {err}");
                return None;
            }
        };

        match build_model(&mut self.scene, &fetched.document, &fetched.buffers) {
            Ok(root) => Some(self.replace_model(root)),
            Err(err) => {
                log::error!("model decode failed: {err}");
                None
            }
        }
    }

    /// Swaps the displayed model, returning the old subtree's geometry ids.
    fn replace_model(&mut self, new_root: NodeId) -> Vec<GeometryId> {
        let mut released = Vec::new();
        if let Some(old_root) = self.model_root.take() {
            self.scene.detach(old_root);
            self.scene.traverse(old_root, &mut |_, node| {
                if let NodeKind::Mesh(payload) = &node.kind {
                    released.push(payload.geometry.id());
                }
            });
        }

        self.scene.attach(self.scene.root(), new_root);
        self.model_root = Some(new_root);
        self.scene.update_world_transforms();
        self.fit_camera_to(new_root);
        released
    }

    /// Points the rig at the subtree's world bounding box and backs the
    /// camera off far enough to frame it.
    fn fit_camera_to(&mut self, root: NodeId) {
        let aabb = world_bounding_box(&self.scene, root);
        if aabb.is_empty() {
            return;
        }

        let center = aabb.center();
        let size = aabb.size();
        let distance = fit_distance(size.max_element(), self.camera.fov_y);

        let position = center + Vec3::new(0.0, size.y * 0.25, distance);
        self.controls.target = center;
        self.controls.sync_from_position(position);
        if let Some(node) = self.scene.get_mut(self.camera_node) {
            node.transform.set_position(position);
        }
    }

    /// Per-frame update: apply control deltas to the camera node, then run
    /// the world transform pass.
    pub fn update(&mut self) {
        if let Some(node) = self.scene.get_mut(self.camera_node) {
            self.controls.update(&mut node.transform);
        }
        self.scene.update_world_transforms();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, ATTRIBUTE_POSITION};
    use crate::material::Material;

    #[test]
    fn fit_distance_matches_the_fov_formula() {
        let fov = 45f32.to_radians();
        let expected = 10.0 * 1.6 / (22.5f32.to_radians()).tan();
        assert!((fit_distance(10.0, fov) - expected).abs() < 1e-4);
    }

    #[test]
    fn world_bounding_box_applies_world_transforms() {
        let mut scene = Scene::new();
        let mut geometry = Geometry::new();
        geometry.set_attribute(
            ATTRIBUTE_POSITION,
            vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0, 0.0],
            3,
        );
        let mesh = scene.alloc(Node::mesh("tri", geometry, Material::default()));
        scene.attach(scene.root(), mesh);
        scene
            .get_mut(mesh)
            .unwrap()
            .transform
            .set_position(Vec3::new(10.0, 0.0, 0.0));
        scene.update_world_transforms();

        let aabb = world_bounding_box(&scene, scene.root());
        assert_eq!(aabb.min, Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(12.0, 3.0, 0.0));
    }
}
