//! Renderable geometry assembled from interleaved vertex buffers.
//!
//! Attributes are typed views over one shared [`ByteBuffer`]. Stride and offset
//! are expressed in elements of the attribute's component type, not in bytes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::{Vector3, Vector4};

use super::buffer::ByteBuffer;
use super::document::{ComponentType, IndexType, VertexUsage};

static NEXT_GEOMETRY_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Debug)]
pub struct IndexBuffer {
    pub buffer: ByteBuffer,
    pub index_type: IndexType,
}

impl IndexBuffer {
    pub fn len(&self) -> usize {
        self.buffer.len() / self.index_type.byte_width()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<u32> {
        match self.index_type {
            IndexType::U16 => self.buffer.view::<u16>().get(i).map(|v| u32::from(*v)),
            IndexType::U32 => self.buffer.view::<u32>().get(i).copied(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.len()).filter_map(|i| self.get(i))
    }
}

/// A strided view of one vertex attribute.
#[derive(Clone, Debug)]
pub struct InterleavedAttribute {
    pub buffer: ByteBuffer,
    pub component_type: ComponentType,
    pub item_size: usize,
    pub stride: usize,
    pub offset: usize,
    pub normalized: bool,
}

impl InterleavedAttribute {
    pub fn count(&self) -> usize {
        let total = self.buffer.len() / self.component_type.byte_width() as usize;
        if self.stride == 0 || total < self.offset + self.item_size {
            return 0;
        }
        (total - self.offset - self.item_size) / self.stride + 1
    }

    /// Component `component` of vertex `vertex`, as the renderer sees it.
    /// Normalized unsigned values map to `[0, 1]`, signed to `[-1, 1]`.
    pub fn component(&self, vertex: usize, component: usize) -> f32 {
        let i = vertex * self.stride + self.offset + component;
        let n = self.normalized;
        match self.component_type {
            ComponentType::F32 => self.buffer.view::<f32>().get(i).copied().unwrap_or(0.0),
            ComponentType::U8 => read_unsigned(self.buffer.view::<u8>().get(i).map(|v| f32::from(*v)), u8::MAX as f32, n),
            ComponentType::U16 => read_unsigned(self.buffer.view::<u16>().get(i).map(|v| f32::from(*v)), u16::MAX as f32, n),
            ComponentType::U32 => read_unsigned(self.buffer.view::<u32>().get(i).map(|v| *v as f32), u32::MAX as f32, n),
            ComponentType::I8 => read_signed(self.buffer.view::<i8>().get(i).map(|v| f32::from(*v)), i8::MAX as f32, n),
            ComponentType::I16 => read_signed(self.buffer.view::<i16>().get(i).map(|v| f32::from(*v)), i16::MAX as f32, n),
            ComponentType::I32 => read_signed(self.buffer.view::<i32>().get(i).map(|v| *v as f32), i32::MAX as f32, n),
        }
    }

    /// Up to four components of one vertex, missing ones padded with `fill`.
    pub fn vec4(&self, vertex: usize, fill: Vector4<f32>) -> Vector4<f32> {
        let mut out = fill;
        for c in 0..self.item_size.min(4) {
            out[c] = self.component(vertex, c);
        }
        out
    }
}

fn read_unsigned(value: Option<f32>, max: f32, normalized: bool) -> f32 {
    let value = value.unwrap_or(0.0);
    if normalized { value / max } else { value }
}

fn read_signed(value: Option<f32>, max: f32, normalized: bool) -> f32 {
    let value = value.unwrap_or(0.0);
    if normalized { (value / max).max(-1.0) } else { value }
}

/// Axis-aligned bounds in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vector3<f32>,
    pub max: Vector3<f32>,
}

impl Aabb {
    pub fn empty() -> Self {
        Self {
            min: Vector3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Vector3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn expand(&mut self, p: Vector3<f32>) {
        self.min = Vector3::new(self.min.x.min(p.x), self.min.y.min(p.y), self.min.z.min(p.z));
        self.max = Vector3::new(self.max.x.max(p.x), self.max.y.max(p.y), self.max.z.max(p.z));
    }

    pub fn union(&mut self, other: &Aabb) {
        if !other.is_empty() {
            self.expand(other.min);
            self.expand(other.max);
        }
    }

    pub fn translated(&self, by: Vector3<f32>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        Aabb {
            min: self.min + by,
            max: self.max + by,
        }
    }

    pub fn center(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::new(0.0, 0.0, 0.0);
        }
        self.max - self.min
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Topology {
    Triangles,
    Lines,
}

#[derive(Debug)]
pub struct Geometry {
    id: u64,
    pub attributes: HashMap<VertexUsage, InterleavedAttribute>,
    pub index: Option<IndexBuffer>,
    pub topology: Topology,
}

impl Geometry {
    pub fn new(topology: Topology) -> Self {
        Self {
            id: NEXT_GEOMETRY_ID.fetch_add(1, Ordering::Relaxed),
            attributes: HashMap::new(),
            index: None,
            topology,
        }
    }

    /// Builds geometry from owned float data, one packed buffer per attribute.
    pub fn from_arrays(
        topology: Topology,
        positions: &[[f32; 3]],
        normals: Option<&[[f32; 3]]>,
        colors: Option<&[[f32; 3]]>,
        uvs: Option<&[[f32; 2]]>,
        indices: Option<&[u32]>,
    ) -> Self {
        let mut geometry = Self::new(topology);
        geometry.set_float_attribute(VertexUsage::Position, bytemuck::cast_slice(positions), 3);
        if let Some(normals) = normals {
            geometry.set_float_attribute(VertexUsage::Normal, bytemuck::cast_slice(normals), 3);
        }
        if let Some(colors) = colors {
            geometry.set_float_attribute(VertexUsage::Color, bytemuck::cast_slice(colors), 3);
        }
        if let Some(uvs) = uvs {
            geometry.set_float_attribute(VertexUsage::Uv, bytemuck::cast_slice(uvs), 2);
        }
        geometry.index = indices.map(|indices| IndexBuffer {
            buffer: ByteBuffer::from_values(indices),
            index_type: IndexType::U32,
        });
        geometry
    }

    fn set_float_attribute(&mut self, usage: VertexUsage, data: &[f32], item_size: usize) {
        self.attributes.insert(
            usage,
            InterleavedAttribute {
                buffer: ByteBuffer::from_values(data),
                component_type: ComponentType::F32,
                item_size,
                stride: item_size,
                offset: 0,
                normalized: false,
            },
        );
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn attribute(&self, usage: VertexUsage) -> Option<&InterleavedAttribute> {
        self.attributes.get(&usage)
    }

    pub fn vertex_count(&self) -> usize {
        self.attribute(VertexUsage::Position)
            .map(InterleavedAttribute::count)
            .unwrap_or(0)
    }

    pub fn position(&self, vertex: usize) -> Option<Vector3<f32>> {
        let attr = self.attribute(VertexUsage::Position)?;
        if vertex >= attr.count() {
            return None;
        }
        Some(Vector3::new(
            attr.component(vertex, 0),
            attr.component(vertex, 1),
            attr.component(vertex, 2),
        ))
    }

    pub fn positions(&self) -> Vec<Vector3<f32>> {
        (0..self.vertex_count()).filter_map(|v| self.position(v)).collect()
    }

    pub fn bounding_box(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for p in self.positions() {
            bounds.expand(p);
        }
        bounds
    }

    /// Vertex indices of each triangle, resolving non-indexed geometry in order.
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        if self.topology != Topology::Triangles {
            return Vec::new();
        }
        let indices: Vec<u32> = match &self.index {
            Some(index) => index.iter().collect(),
            None => (0..self.vertex_count() as u32).collect(),
        };
        indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_integers_map_to_unit_range() {
        let attr = InterleavedAttribute {
            buffer: ByteBuffer::from_bytes(&[255, 0, 128, 0x81]),
            component_type: ComponentType::U8,
            item_size: 4,
            stride: 4,
            offset: 0,
            normalized: true,
        };
        assert_eq!(attr.component(0, 0), 1.0);
        assert_eq!(attr.component(0, 1), 0.0);
        let signed = InterleavedAttribute {
            component_type: ComponentType::I8,
            ..attr
        };
        // 0x81 is -127 as i8, and -128 would clamp to -1
        assert_eq!(signed.component(0, 3), -1.0);
    }

    #[test]
    fn strided_count() {
        let attr = InterleavedAttribute {
            buffer: ByteBuffer::from_values(&[0f32; 10]),
            component_type: ComponentType::F32,
            item_size: 3,
            stride: 5,
            offset: 2,
            normalized: false,
        };
        assert_eq!(attr.count(), 2);
    }
}
