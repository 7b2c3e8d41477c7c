use std::collections::HashMap;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::geometry::{
    Geometry, GeometryId, IndexBuffer, ATTRIBUTE_COLOR, ATTRIBUTE_NORMAL, ATTRIBUTE_POSITION,
};
use crate::math::Mat4;

/// Per-draw shader inputs, written every frame before the render pass.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ModelUniform {
    pub model: Mat4,
    pub normal: Mat4,
    pub base_color: [f32; 4],
    /// x > 0.5 enables vertex colors; the rest is padding.
    pub params: [f32; 4],
}

/// Device-side buffers for one geometry.
pub struct MeshGpuBuffers {
    pub position: wgpu::Buffer,
    pub normal: wgpu::Buffer,
    pub color: wgpu::Buffer,
    pub index: Option<(wgpu::Buffer, wgpu::IndexFormat, u32)>,
    pub vertex_count: u32,
    pub uniform: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

/// GPU resource arena keyed by geometry identity. Entries are created lazily
/// the first time a geometry is drawn and live until explicitly released.
#[derive(Default)]
pub struct MeshBufferCache {
    entries: HashMap<GeometryId, MeshGpuBuffers>,
}

impl MeshBufferCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up or uploads the buffers for `geometry`. Idempotent for a given
    /// geometry identity.
    pub fn ensure(
        &mut self,
        device: &wgpu::Device,
        model_layout: &wgpu::BindGroupLayout,
        geometry: &Geometry,
    ) {
        self.entries
            .entry(geometry.id())
            .or_insert_with(|| upload_geometry(device, model_layout, geometry));
    }

    pub fn get(&self, id: GeometryId) -> Option<&MeshGpuBuffers> {
        self.entries.get(&id)
    }

    /// Drops the device buffers for a geometry that left the scene for good.
    pub fn release(&mut self, id: GeometryId) {
        self.entries.remove(&id);
    }
}

fn upload_geometry(
    device: &wgpu::Device,
    model_layout: &wgpu::BindGroupLayout,
    geometry: &Geometry,
) -> MeshGpuBuffers {
    let vertex_count = geometry.vertex_count();

    let positions = attribute_as_vec3(geometry, ATTRIBUTE_POSITION, vertex_count, 0.0);
    // Zero normals make the directional term vanish; white is the neutral
    // vertex color. The pipeline layout always binds all three attributes.
    let normals = attribute_as_vec3(geometry, ATTRIBUTE_NORMAL, vertex_count, 0.0);
    let colors = attribute_as_vec3(geometry, ATTRIBUTE_COLOR, vertex_count, 1.0);

    let position = vertex_buffer(device, "Position buffer", &positions);
    let normal = vertex_buffer(device, "Normal buffer", &normals);
    let color = vertex_buffer(device, "Color buffer", &colors);

    let index = geometry.index().map(|index| upload_index(device, index));

    let uniform = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Model uniform buffer"),
        size: std::mem::size_of::<ModelUniform>() as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("model_bind_group"),
        layout: model_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.as_entire_binding(),
        }],
    });

    MeshGpuBuffers {
        position,
        normal,
        color,
        index,
        vertex_count: vertex_count as u32,
        uniform,
        bind_group,
    }
}

/// Extracts an attribute as tightly packed vec3 data, filling with `fill`
/// when absent and dropping a fourth component when present.
fn attribute_as_vec3(
    geometry: &Geometry,
    name: &str,
    vertex_count: usize,
    fill: f32,
) -> Vec<f32> {
    let Some(attribute) = geometry.attribute(name) else {
        return vec![fill; vertex_count * 3];
    };
    if attribute.item_size == 3 {
        return attribute.data.clone();
    }

    let mut out = Vec::with_capacity(vertex_count * 3);
    for element in attribute.data.chunks_exact(attribute.item_size.max(1)) {
        for component in 0..3 {
            out.push(element.get(component).copied().unwrap_or(fill));
        }
    }
    out
}

fn vertex_buffer(device: &wgpu::Device, label: &str, data: &[f32]) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(label),
        contents: bytemuck::cast_slice(data),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

/// wgpu has no 8-bit index format, so u8 indices widen to u16 here. 16- and
/// 32-bit indices upload as-is; WebGPU devices always accept 32-bit indices.
fn upload_index(
    device: &wgpu::Device,
    index: &IndexBuffer,
) -> (wgpu::Buffer, wgpu::IndexFormat, u32) {
    let count = index.len() as u32;
    let (contents, format): (Vec<u8>, wgpu::IndexFormat) = match index {
        IndexBuffer::U8(values) => {
            let widened: Vec<u16> = values.iter().map(|&v| v as u16).collect();
            (
                bytemuck::cast_slice(&widened).to_vec(),
                wgpu::IndexFormat::Uint16,
            )
        }
        IndexBuffer::U16(values) => (
            bytemuck::cast_slice(values).to_vec(),
            wgpu::IndexFormat::Uint16,
        ),
        IndexBuffer::U32(values) => (
            bytemuck::cast_slice(values).to_vec(),
            wgpu::IndexFormat::Uint32,
        ),
    };

    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Index buffer"),
        contents: &contents,
        usage: wgpu::BufferUsages::INDEX,
    });
    (buffer, format, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_attribute_fills_vertex_count_elements() {
        let mut geometry = Geometry::new();
        geometry.set_attribute(ATTRIBUTE_POSITION, vec![0.0; 9], 3);

        let colors = attribute_as_vec3(&geometry, ATTRIBUTE_COLOR, 3, 1.0);
        assert_eq!(colors, vec![1.0; 9]);
    }

    #[test]
    fn vec4_attribute_drops_fourth_component() {
        let mut geometry = Geometry::new();
        geometry.set_attribute(
            ATTRIBUTE_COLOR,
            vec![0.1, 0.2, 0.3, 1.0, 0.4, 0.5, 0.6, 1.0],
            4,
        );

        let colors = attribute_as_vec3(&geometry, ATTRIBUTE_COLOR, 2, 1.0);
        assert_eq!(colors, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]);
    }
}
