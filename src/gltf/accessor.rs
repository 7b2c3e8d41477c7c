use crate::geometry::IndexBuffer;
use crate::gltf::document::Document;
use crate::gltf::LoadError;

/// glTF componentType codes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ComponentType {
    I8,
    U8,
    I16,
    U16,
    U32,
    F32,
}

impl ComponentType {
    pub fn from_code(code: u32) -> Result<ComponentType, LoadError> {
        match code {
            5120 => Ok(ComponentType::I8),
            5121 => Ok(ComponentType::U8),
            5122 => Ok(ComponentType::I16),
            5123 => Ok(ComponentType::U16),
            5125 => Ok(ComponentType::U32),
            5126 => Ok(ComponentType::F32),
            other => Err(LoadError::UnsupportedComponentType(other)),
        }
    }

    pub fn byte_size(self) -> usize {
        match self {
            ComponentType::I8 | ComponentType::U8 => 1,
            ComponentType::I16 | ComponentType::U16 => 2,
            ComponentType::U32 | ComponentType::F32 => 4,
        }
    }
}

fn components_per_element(element_type: &str) -> Result<usize, LoadError> {
    match element_type {
        "SCALAR" => Ok(1),
        "VEC2" => Ok(2),
        "VEC3" => Ok(3),
        "VEC4" => Ok(4),
        "MAT3" => Ok(9),
        "MAT4" => Ok(16),
        other => Err(LoadError::UnsupportedElementType(other.to_string())),
    }
}

/// Component values decoded from an accessor, little-endian.
#[derive(Clone, Debug)]
pub enum ComponentData {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
}

/// A fully decoded accessor: `count` elements of `item_size` components.
#[derive(Clone, Debug)]
pub struct AccessorData {
    pub item_size: usize,
    pub count: usize,
    pub data: ComponentData,
}

impl AccessorData {
    pub fn into_f32(self) -> Result<Vec<f32>, LoadError> {
        match self.data {
            ComponentData::F32(values) => Ok(values),
            _ => Err(LoadError::AttributeNotFloat("<accessor>".to_string())),
        }
    }

    pub fn into_index_buffer(self) -> Result<IndexBuffer, LoadError> {
        match self.data {
            ComponentData::U8(values) => Ok(IndexBuffer::U8(values)),
            ComponentData::U16(values) => Ok(IndexBuffer::U16(values)),
            ComponentData::U32(values) => Ok(IndexBuffer::U32(values)),
            _ => Err(LoadError::InvalidIndexType),
        }
    }
}

struct ElementLayout {
    base: usize,
    stride: usize,
    item_size: usize,
    component_size: usize,
    count: usize,
}

/// Reads every component of every element. The tightly-packed case walks the
/// byte range in one contiguous sweep; interleaved data is copied
/// component-by-component at `element * stride + component * size`.
fn read_components<T>(
    bytes: &[u8],
    layout: &ElementLayout,
    read: impl Fn(&[u8]) -> T,
) -> Vec<T> {
    let element_size = layout.item_size * layout.component_size;
    let mut out = Vec::with_capacity(layout.count * layout.item_size);

    if layout.stride == element_size {
        let end = layout.base + layout.count * element_size;
        for component in bytes[layout.base..end].chunks_exact(layout.component_size) {
            out.push(read(component));
        }
    } else {
        for element in 0..layout.count {
            let element_base = layout.base + element * layout.stride;
            for component in 0..layout.item_size {
                let offset = element_base + component * layout.component_size;
                out.push(read(&bytes[offset..offset + layout.component_size]));
            }
        }
    }
    out
}

/// Decodes accessor `index` against the resolved buffers.
pub fn decode_accessor(
    document: &Document,
    buffers: &[Vec<u8>],
    index: usize,
) -> Result<AccessorData, LoadError> {
    let accessor = document.accessor(index)?;
    let component_type = ComponentType::from_code(accessor.component_type)?;
    let item_size = components_per_element(&accessor.element_type)?;
    let component_size = component_type.byte_size();
    let element_size = item_size * component_size;

    // An accessor without a buffer view reads as zeros, same as a buffer
    // without a URI.
    let Some(view_index) = accessor.buffer_view else {
        let data = match component_type {
            ComponentType::I8 => ComponentData::I8(vec![0; accessor.count * item_size]),
            ComponentType::U8 => ComponentData::U8(vec![0; accessor.count * item_size]),
            ComponentType::I16 => ComponentData::I16(vec![0; accessor.count * item_size]),
            ComponentType::U16 => ComponentData::U16(vec![0; accessor.count * item_size]),
            ComponentType::U32 => ComponentData::U32(vec![0; accessor.count * item_size]),
            ComponentType::F32 => ComponentData::F32(vec![0.0; accessor.count * item_size]),
        };
        return Ok(AccessorData {
            item_size,
            count: accessor.count,
            data,
        });
    };

    let view = document.buffer_view(view_index)?;
    let bytes = buffers
        .get(view.buffer)
        .ok_or(LoadError::MissingBuffer(view.buffer))?;

    let stride = if view.byte_stride == 0 {
        element_size
    } else {
        view.byte_stride
    };
    let base = view.byte_offset + accessor.byte_offset;

    if accessor.count > 0 {
        let last_end = base + (accessor.count - 1) * stride + element_size;
        if last_end > bytes.len() {
            return Err(LoadError::AccessorOutOfBounds(index));
        }
    }

    let layout = ElementLayout {
        base,
        stride,
        item_size,
        component_size,
        count: accessor.count,
    };

    let data = match component_type {
        ComponentType::I8 => {
            ComponentData::I8(read_components(bytes, &layout, |b| b[0] as i8))
        }
        ComponentType::U8 => ComponentData::U8(read_components(bytes, &layout, |b| b[0])),
        ComponentType::I16 => ComponentData::I16(read_components(bytes, &layout, |b| {
            i16::from_le_bytes([b[0], b[1]])
        })),
        ComponentType::U16 => ComponentData::U16(read_components(bytes, &layout, |b| {
            u16::from_le_bytes([b[0], b[1]])
        })),
        ComponentType::U32 => ComponentData::U32(read_components(bytes, &layout, |b| {
            u32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })),
        ComponentType::F32 => ComponentData::F32(read_components(bytes, &layout, |b| {
            f32::from_le_bytes([b[0], b[1], b[2], b[3]])
        })),
    };

    Ok(AccessorData {
        item_size,
        count: accessor.count,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document_with_accessor(
        accessor: serde_json::Value,
        view: serde_json::Value,
    ) -> Document {
        serde_json::from_value(json!({
            "accessors": [accessor],
            "bufferViews": [view],
            "buffers": [{ "byteLength": 0 }],
        }))
        .unwrap()
    }

    fn float_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn packed_floats_decode_byte_for_byte() {
        let values = [1.0f32, -2.5, 3.25, 0.0, 7.5, -0.125];
        let bytes = float_bytes(&values);
        let document = document_with_accessor(
            json!({ "componentType": 5126, "count": 2, "type": "VEC3", "bufferView": 0 }),
            json!({ "buffer": 0, "byteOffset": 0, "byteLength": bytes.len() }),
        );

        let decoded = decode_accessor(&document, &[bytes], 0).unwrap();
        assert_eq!(decoded.count, 2);
        assert_eq!(decoded.item_size, 3);
        assert_eq!(decoded.into_f32().unwrap(), values.to_vec());
    }

    #[test]
    fn interleaved_positions_and_normals_decode() {
        // stride 32: vec3 position + vec3 normal + 8 bytes padding per vertex
        let vertex_count = 3;
        let mut bytes = Vec::new();
        for i in 0..vertex_count {
            let i = i as f32;
            bytes.extend(float_bytes(&[i, i + 0.5, i + 0.25]));
            bytes.extend(float_bytes(&[0.0, 1.0, i]));
            bytes.extend([0u8; 8]);
        }

        let document: Document = serde_json::from_value(json!({
            "accessors": [
                { "componentType": 5126, "count": vertex_count, "type": "VEC3",
                  "bufferView": 0, "byteOffset": 0 },
                { "componentType": 5126, "count": vertex_count, "type": "VEC3",
                  "bufferView": 0, "byteOffset": 12 },
            ],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": bytes.len(), "byteStride": 32 },
            ],
            "buffers": [{ "byteLength": bytes.len() }],
        }))
        .unwrap();
        let buffers = vec![bytes];

        let positions = decode_accessor(&document, &buffers, 0)
            .unwrap()
            .into_f32()
            .unwrap();
        let normals = decode_accessor(&document, &buffers, 1)
            .unwrap()
            .into_f32()
            .unwrap();

        assert_eq!(
            positions,
            vec![0.0, 0.5, 0.25, 1.0, 1.5, 1.25, 2.0, 2.5, 2.25]
        );
        assert_eq!(normals, vec![0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn u16_indices_decode() {
        let bytes: Vec<u8> = [0u16, 1, 2]
            .iter()
            .flat_map(|v| v.to_le_bytes())
            .collect();
        let document = document_with_accessor(
            json!({ "componentType": 5123, "count": 3, "type": "SCALAR", "bufferView": 0 }),
            json!({ "buffer": 0, "byteLength": bytes.len() }),
        );

        let index = decode_accessor(&document, &[bytes], 0)
            .unwrap()
            .into_index_buffer()
            .unwrap();
        match index {
            IndexBuffer::U16(values) => assert_eq!(values, vec![0, 1, 2]),
            other => panic!("expected u16 indices, got {:?}", other),
        }
    }

    #[test]
    fn unknown_component_type_is_an_error() {
        let document = document_with_accessor(
            json!({ "componentType": 5124, "count": 1, "type": "SCALAR", "bufferView": 0 }),
            json!({ "buffer": 0, "byteLength": 4 }),
        );
        let result = decode_accessor(&document, &[vec![0; 4]], 0);
        assert!(matches!(
            result,
            Err(LoadError::UnsupportedComponentType(5124))
        ));
    }

    #[test]
    fn reads_past_buffer_end_are_rejected() {
        let document = document_with_accessor(
            json!({ "componentType": 5126, "count": 4, "type": "VEC3", "bufferView": 0 }),
            json!({ "buffer": 0, "byteLength": 8 }),
        );
        let result = decode_accessor(&document, &[vec![0; 8]], 0);
        assert!(matches!(result, Err(LoadError::AccessorOutOfBounds(0))));
    }
}
