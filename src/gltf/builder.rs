use crate::geometry::{Geometry, ATTRIBUTE_COLOR, ATTRIBUTE_NORMAL, ATTRIBUTE_POSITION};
use crate::gltf::accessor::decode_accessor;
use crate::gltf::document::{Document, PrimitiveDesc};
use crate::gltf::LoadError;
use crate::material::Material;
use crate::math::{Mat4, Quat, Vec3};
use crate::scene_graph::{Node, NodeId, Scene};

/// Builds the document's scene into `scene` and returns the subtree root,
/// left detached so the caller decides where (and whether) to attach it.
///
/// Decoding errors abort construction; nothing is ever attached to the live
/// graph on failure. A document whose scene has a single root node collapses
/// to that node instead of a wrapping group, and a single-primitive mesh
/// collapses to one mesh node.
pub fn build_model(
    scene: &mut Scene,
    document: &Document,
    buffers: &[Vec<u8>],
) -> Result<NodeId, LoadError> {
    let scene_index = document.scene.unwrap_or(0);
    let scene_desc = document
        .scenes
        .get(scene_index)
        .ok_or(LoadError::MissingScene(scene_index))?;

    let mut roots = Vec::with_capacity(scene_desc.nodes.len());
    for &node_index in &scene_desc.nodes {
        roots.push(build_node(scene, document, buffers, node_index)?);
    }

    if roots.len() == 1 {
        return Ok(roots[0]);
    }

    let name = scene_desc.name.clone().unwrap_or_else(|| "scene".to_string());
    let group = scene.alloc(Node::group(name));
    for root in roots {
        scene.attach(group, root);
    }
    Ok(group)
}

fn build_node(
    scene: &mut Scene,
    document: &Document,
    buffers: &[Vec<u8>],
    index: usize,
) -> Result<NodeId, LoadError> {
    let desc = document.node(index)?;
    let name = desc.name.clone().unwrap_or_else(|| "Unnamed".to_string());

    let id = match desc.mesh {
        Some(mesh_index) => build_mesh(scene, document, buffers, mesh_index, &name)?,
        None => scene.alloc(Node::group(name)),
    };

    if let Some(node) = scene.get_mut(id) {
        if let Some(matrix) = &desc.matrix {
            let (translation, rotation, scale) = Mat4::from_cols_array(matrix).decompose();
            node.transform.set_trs(translation, rotation, scale);
        } else {
            let translation = desc.translation.map(Vec3::from).unwrap_or(Vec3::ZERO);
            let rotation = desc
                .rotation
                .map(|r| Quat::new(r[0], r[1], r[2], r[3]))
                .unwrap_or(Quat::IDENTITY);
            let scale = desc.scale.map(Vec3::from).unwrap_or(Vec3::ONE);
            node.transform.set_trs(translation, rotation, scale);
        }
    }

    for &child_index in &desc.children {
        let child = build_node(scene, document, buffers, child_index)?;
        scene.attach(id, child);
    }

    Ok(id)
}

/// One renderable node per primitive; a single-primitive mesh is returned
/// directly instead of wrapped in a group.
fn build_mesh(
    scene: &mut Scene,
    document: &Document,
    buffers: &[Vec<u8>],
    mesh_index: usize,
    node_name: &str,
) -> Result<NodeId, LoadError> {
    let mesh = document.mesh(mesh_index)?;

    let mut primitives = Vec::with_capacity(mesh.primitives.len());
    for primitive in &mesh.primitives {
        primitives.push(decode_primitive(document, buffers, primitive)?);
    }

    if primitives.len() == 1 {
        let (geometry, material) = primitives.pop().expect("one primitive");
        return Ok(scene.alloc(Node::mesh(node_name.to_string(), geometry, material)));
    }

    let group = scene.alloc(Node::group(node_name.to_string()));
    for (i, (geometry, material)) in primitives.into_iter().enumerate() {
        let child = scene.alloc(Node::mesh(
            format!("{node_name}_{i}"),
            geometry,
            material,
        ));
        scene.attach(group, child);
    }
    Ok(group)
}

fn decode_primitive(
    document: &Document,
    buffers: &[Vec<u8>],
    primitive: &PrimitiveDesc,
) -> Result<(Geometry, Material), LoadError> {
    let mut geometry = Geometry::new();
    let mut material = Material::default();

    let position_index = *primitive
        .attributes
        .get("POSITION")
        .ok_or(LoadError::MissingPositionAttribute)?;
    let vertex_count =
        decode_attribute(document, buffers, &mut geometry, position_index, ATTRIBUTE_POSITION)?;

    if let Some(&normal_index) = primitive.attributes.get("NORMAL") {
        let count =
            decode_attribute(document, buffers, &mut geometry, normal_index, ATTRIBUTE_NORMAL)?;
        check_count(ATTRIBUTE_NORMAL, vertex_count, count)?;
    }

    if let Some(&color_index) = primitive.attributes.get("COLOR_0") {
        let count =
            decode_attribute(document, buffers, &mut geometry, color_index, ATTRIBUTE_COLOR)?;
        check_count(ATTRIBUTE_COLOR, vertex_count, count)?;
        material.vertex_colors = true;
    }

    if let Some(indices) = primitive.indices {
        let index = decode_accessor(document, buffers, indices)?.into_index_buffer()?;
        geometry.set_index(index);
    }

    Ok((geometry, material))
}

fn decode_attribute(
    document: &Document,
    buffers: &[Vec<u8>],
    geometry: &mut Geometry,
    accessor_index: usize,
    name: &str,
) -> Result<usize, LoadError> {
    let decoded = decode_accessor(document, buffers, accessor_index)?;
    let item_size = decoded.item_size;
    let count = decoded.count;
    let data = decoded
        .into_f32()
        .map_err(|_| LoadError::AttributeNotFloat(name.to_string()))?;
    geometry.set_attribute(name, data, item_size);
    Ok(count)
}

fn check_count(name: &str, expected: usize, actual: usize) -> Result<(), LoadError> {
    if expected != actual {
        return Err(LoadError::AttributeCountMismatch {
            name: name.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_graph::NodeKind;
    use serde_json::json;

    fn float_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Mirrors what the try-on exporter writes: one node, one mesh, one
    /// primitive, positions followed by u16 indices in a single buffer.
    fn minimal_document() -> (Document, Vec<Vec<u8>>) {
        let positions = float_bytes(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let index_bytes: Vec<u8> = [0u16, 1, 2].iter().flat_map(|v| v.to_le_bytes()).collect();
        let mut buffer = positions.clone();
        buffer.extend(&index_bytes);

        let document = serde_json::from_value(json!({
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0, "translation": [1.0, 2.0, 3.0], "name": "garment" }],
            "meshes": [{
                "primitives": [{
                    "attributes": { "POSITION": 0 },
                    "indices": 1,
                }],
            }],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" },
            ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": positions.len() },
                { "buffer": 0, "byteOffset": positions.len(), "byteLength": index_bytes.len() },
            ],
            "buffers": [{ "byteLength": buffer.len() }],
        }))
        .unwrap();

        (document, vec![buffer])
    }

    #[test]
    fn single_node_single_primitive_collapses_to_one_mesh() {
        let (document, buffers) = minimal_document();
        let mut scene = Scene::new();
        let root = build_model(&mut scene, &document, &buffers).unwrap();

        let node = scene.get(root).unwrap();
        assert_eq!(node.name, "garment");
        assert!(node.children().is_empty());
        assert!(matches!(node.kind, NodeKind::Mesh(_)));
    }

    #[test]
    fn end_to_end_minimal_load() {
        let (document, buffers) = minimal_document();
        let mut scene = Scene::new();
        let root = build_model(&mut scene, &document, &buffers).unwrap();
        scene.attach(scene.root(), root);
        scene.update_world_transforms();

        let node = scene.get(root).unwrap();
        assert_eq!(
            node.transform.world_position(),
            Vec3::new(1.0, 2.0, 3.0)
        );

        let NodeKind::Mesh(payload) = &node.kind else {
            panic!("expected a mesh node");
        };
        assert_eq!(payload.geometry.index().unwrap().len(), 3);
        assert_eq!(payload.geometry.vertex_count(), 3);
        assert!(!payload.material.vertex_colors);
    }

    #[test]
    fn matrix_transforms_are_decomposed() {
        // Pure translation matrix, column-major.
        let matrix: [f32; 16] = [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            4.0, 5.0, 6.0, 1.0,
        ];
        let document: Document = serde_json::from_value(json!({
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "matrix": matrix }],
        }))
        .unwrap();

        let mut scene = Scene::new();
        let root = build_model(&mut scene, &document, &[]).unwrap();
        let transform = &scene.get(root).unwrap().transform;
        assert_eq!(transform.position(), Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(transform.rotation(), Quat::IDENTITY);
        assert_eq!(transform.scale(), Vec3::ONE);
    }

    #[test]
    fn multiple_roots_are_wrapped_in_a_group() {
        let document: Document = serde_json::from_value(json!({
            "scenes": [{ "nodes": [0, 1] }],
            "nodes": [{ "name": "a" }, { "name": "b" }],
        }))
        .unwrap();

        let mut scene = Scene::new();
        let root = build_model(&mut scene, &document, &[]).unwrap();
        let node = scene.get(root).unwrap();
        assert!(matches!(node.kind, NodeKind::Group));
        assert_eq!(node.children().len(), 2);
    }

    #[test]
    fn dangling_mesh_reference_is_fatal() {
        let document: Document = serde_json::from_value(json!({
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 7 }],
        }))
        .unwrap();

        let mut scene = Scene::new();
        let result = build_model(&mut scene, &document, &[]);
        assert!(matches!(result, Err(LoadError::MissingMesh(7))));
    }

    #[test]
    fn color_attribute_enables_vertex_colors() {
        let positions = float_bytes(&[0.0; 9]);
        let colors = float_bytes(&[0.5; 9]);
        let mut buffer = positions.clone();
        buffer.extend(&colors);

        let document: Document = serde_json::from_value(json!({
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0 }],
            "meshes": [{
                "primitives": [{
                    "attributes": { "POSITION": 0, "COLOR_0": 1 },
                }],
            }],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3" },
                { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" },
            ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": positions.len() },
                { "buffer": 0, "byteOffset": positions.len(), "byteLength": colors.len() },
            ],
            "buffers": [{ "byteLength": buffer.len() }],
        }))
        .unwrap();

        let mut scene = Scene::new();
        let root = build_model(&mut scene, &document, &[buffer]).unwrap();
        let NodeKind::Mesh(payload) = &scene.get(root).unwrap().kind else {
            panic!("expected a mesh node");
        };
        assert!(payload.material.vertex_colors);
    }
}
