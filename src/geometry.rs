use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::math::{Aabb, Vec3};

pub const ATTRIBUTE_POSITION: &str = "position";
pub const ATTRIBUTE_NORMAL: &str = "normal";
pub const ATTRIBUTE_COLOR: &str = "color";

/// Stable identity for a geometry, used to key GPU-side buffer caches.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct GeometryId(u64);

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(0);

impl GeometryId {
    fn next() -> GeometryId {
        GeometryId(NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One vertex attribute: a flat float buffer read in `item_size` strides.
#[derive(Clone, Debug)]
pub struct Attribute {
    pub data: Vec<f32>,
    pub item_size: usize,
}

impl Attribute {
    pub fn new(data: Vec<f32>, item_size: usize) -> Self {
        Self { data, item_size }
    }

    /// Number of elements (vertices) in the buffer.
    pub fn count(&self) -> usize {
        if self.item_size == 0 {
            0
        } else {
            self.data.len() / self.item_size
        }
    }
}

#[derive(Clone, Debug)]
pub enum IndexBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U8(v) => v.len(),
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Indexed triangle geometry: named attribute buffers plus an optional index
/// buffer. All attributes on one geometry must agree on element count.
#[derive(Debug)]
pub struct Geometry {
    id: GeometryId,
    attributes: HashMap<String, Attribute>,
    index: Option<IndexBuffer>,
}

impl Geometry {
    pub fn new() -> Self {
        Self {
            id: GeometryId::next(),
            attributes: HashMap::new(),
            index: None,
        }
    }

    pub fn id(&self) -> GeometryId {
        self.id
    }

    pub fn set_attribute(&mut self, name: impl Into<String>, data: Vec<f32>, item_size: usize) {
        self.attributes
            .insert(name.into(), Attribute::new(data, item_size));
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn set_index(&mut self, index: IndexBuffer) {
        self.index = Some(index);
    }

    pub fn index(&self) -> Option<&IndexBuffer> {
        self.index.as_ref()
    }

    /// Vertex count, taken from the position attribute.
    pub fn vertex_count(&self) -> usize {
        self.attribute(ATTRIBUTE_POSITION)
            .map(|a| a.count())
            .unwrap_or(0)
    }

    /// Walks the position attribute expanding a running min/max. A missing or
    /// empty position attribute yields a zero-sized box at the origin.
    pub fn compute_bounding_box(&self) -> Aabb {
        let Some(position) = self.attribute(ATTRIBUTE_POSITION) else {
            return Aabb::ZERO;
        };
        if position.data.is_empty() || position.item_size < 3 {
            return Aabb::ZERO;
        }

        let mut aabb = Aabb::EMPTY;
        for element in position.data.chunks_exact(position.item_size) {
            aabb.expand_point(Vec3::new(element[0], element[1], element[2]));
        }
        aabb
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_of_known_triangle() {
        let mut geometry = Geometry::new();
        geometry.set_attribute(
            ATTRIBUTE_POSITION,
            vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 3.0, 0.0],
            3,
        );

        let aabb = geometry.compute_bounding_box();
        assert_eq!(aabb.min, Vec3::new(0.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(2.0, 3.0, 0.0));
    }

    #[test]
    fn bounding_box_without_positions_is_zero_at_origin() {
        let geometry = Geometry::new();
        assert_eq!(geometry.compute_bounding_box(), Aabb::ZERO);
    }

    #[test]
    fn geometry_ids_are_unique() {
        assert_ne!(Geometry::new().id(), Geometry::new().id());
    }
}
