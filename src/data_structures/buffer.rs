//! Shared, aligned byte storage with typed views.
//!
//! Vertex and index buffers come out of the scene container as byte runs with
//! no alignment guarantee. They are copied once into word-aligned storage so
//! every later access is a reinterpretation of the same bytes (`bytemuck`)
//! instead of a per-value conversion.

use std::rc::Rc;

use bytemuck::Pod;

/// Immutable, reference-counted, 4-byte aligned byte buffer.
#[derive(Clone)]
pub struct ByteBuffer {
    words: Rc<[u32]>,
    len: usize,
}

impl ByteBuffer {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut words = vec![0u32; bytes.len().div_ceil(4)];
        bytemuck::cast_slice_mut::<u32, u8>(&mut words)[..bytes.len()].copy_from_slice(bytes);
        Self {
            words: words.into(),
            len: bytes.len(),
        }
    }

    /// Packs owned values into a new buffer.
    pub fn from_values<T: Pod>(values: &[T]) -> Self {
        Self::from_bytes(bytemuck::cast_slice(values))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<u32, u8>(&self.words)[..self.len]
    }

    /// Reinterprets the buffer as a slice of `T`, dropping a trailing partial element.
    ///
    /// Returns an empty slice for types wider than the 4-byte alignment the storage
    /// guarantees.
    pub fn view<T: Pod>(&self) -> &[T] {
        let width = std::mem::size_of::<T>();
        if width == 0 {
            return &[];
        }
        let whole = self.len - self.len % width;
        bytemuck::try_cast_slice(&self.bytes()[..whole]).unwrap_or(&[])
    }

    pub fn ptr_eq(&self, other: &ByteBuffer) -> bool {
        Rc::ptr_eq(&self.words, &other.words)
    }
}

impl std::fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteBuffer").field("len", &self.len).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_floor_to_whole_elements() {
        let buffer = ByteBuffer::from_bytes(&[1, 0, 2, 0, 3]);
        assert_eq!(buffer.view::<u16>(), &[1, 2]);
        assert_eq!(buffer.view::<u8>().len(), 5);
        assert!(buffer.view::<u32>().len() == 1);
    }

    #[test]
    fn float_view_shares_storage() {
        let buffer = ByteBuffer::from_values(&[1.5f32, -2.0]);
        let copy = buffer.clone();
        assert!(buffer.ptr_eq(&copy));
        assert_eq!(copy.view::<f32>(), &[1.5, -2.0]);
    }
}
