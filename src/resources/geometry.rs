//! Builds renderable geometry from a decoded mesh record.

use crate::data_structures::{
    document::MeshRecord,
    geometry::{Geometry, IndexBuffer, InterleavedAttribute, Topology},
};

/// Creates typed views over the mesh's shared vertex buffer.
///
/// Returns `None` when the mesh cannot be drawn (no vertex data, no stride or no
/// position attribute); the caller skips such meshes.
pub fn build_geometry(mesh: &MeshRecord) -> Option<Geometry> {
    if mesh.vertex_buffer.is_empty() || mesh.vertex_format.vertex_size == 0 {
        log::warn!("Mesh has an empty vertex buffer or vertex format");
        return None;
    }

    let mut geometry = Geometry::new(Topology::Triangles);
    geometry.index = Some(IndexBuffer {
        buffer: mesh.index_buffer.clone(),
        index_type: mesh.index_type,
    });

    let vertex_size = mesh.vertex_format.vertex_size;
    for element in &mesh.vertex_format.elements {
        if element.index != 0 {
            continue;
        }
        let width = element.component_type.byte_width();
        if vertex_size % width != 0 || element.offset % width != 0 {
            log::warn!(
                "Vertex element {:?} at offset {} is not aligned to its {}-byte components",
                element.usage,
                element.offset,
                width
            );
            continue;
        }
        geometry.attributes.insert(
            element.usage,
            InterleavedAttribute {
                buffer: mesh.vertex_buffer.clone(),
                component_type: element.component_type,
                item_size: element.count as usize,
                stride: (vertex_size / width) as usize,
                offset: (element.offset / width) as usize,
                normalized: element.normalized,
            },
        );
    }

    if geometry.vertex_count() == 0 {
        log::warn!("Mesh has no usable position attribute");
        return None;
    }
    Some(geometry)
}
