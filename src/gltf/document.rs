use std::collections::HashMap;

use serde::Deserialize;

use crate::gltf::LoadError;

/// Parsed top-level document: the glTF 2.0 subset the try-on pipeline emits.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub scene: Option<usize>,
    #[serde(default)]
    pub scenes: Vec<SceneDesc>,
    #[serde(default)]
    pub nodes: Vec<NodeDesc>,
    #[serde(default)]
    pub meshes: Vec<MeshDesc>,
    #[serde(default)]
    pub accessors: Vec<AccessorDesc>,
    #[serde(default)]
    pub buffer_views: Vec<BufferViewDesc>,
    #[serde(default)]
    pub buffers: Vec<BufferDesc>,
}

impl Document {
    pub fn from_json(bytes: &[u8]) -> Result<Document, LoadError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn accessor(&self, index: usize) -> Result<&AccessorDesc, LoadError> {
        self.accessors
            .get(index)
            .ok_or(LoadError::MissingAccessor(index))
    }

    pub fn buffer_view(&self, index: usize) -> Result<&BufferViewDesc, LoadError> {
        self.buffer_views
            .get(index)
            .ok_or(LoadError::MissingBufferView(index))
    }

    pub fn node(&self, index: usize) -> Result<&NodeDesc, LoadError> {
        self.nodes.get(index).ok_or(LoadError::MissingNode(index))
    }

    pub fn mesh(&self, index: usize) -> Result<&MeshDesc, LoadError> {
        self.meshes.get(index).ok_or(LoadError::MissingMesh(index))
    }
}

#[derive(Debug, Deserialize)]
pub struct SceneDesc {
    #[serde(default)]
    pub nodes: Vec<usize>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NodeDesc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mesh: Option<usize>,
    /// Column-major; mutually exclusive with translation/rotation/scale.
    #[serde(default)]
    pub matrix: Option<[f32; 16]>,
    #[serde(default)]
    pub translation: Option<[f32; 3]>,
    /// xyzw.
    #[serde(default)]
    pub rotation: Option<[f32; 4]>,
    #[serde(default)]
    pub scale: Option<[f32; 3]>,
    #[serde(default)]
    pub children: Vec<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MeshDesc {
    #[serde(default)]
    pub primitives: Vec<PrimitiveDesc>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PrimitiveDesc {
    #[serde(default)]
    pub attributes: HashMap<String, usize>,
    #[serde(default)]
    pub indices: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorDesc {
    #[serde(default)]
    pub buffer_view: Option<usize>,
    #[serde(default)]
    pub byte_offset: usize,
    pub component_type: u32,
    pub count: usize,
    #[serde(rename = "type")]
    pub element_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferViewDesc {
    pub buffer: usize,
    #[serde(default)]
    pub byte_offset: usize,
    pub byte_length: usize,
    /// 0 means tightly packed.
    #[serde(default)]
    pub byte_stride: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferDesc {
    #[serde(default)]
    pub uri: Option<String>,
    pub byte_length: usize,
}
