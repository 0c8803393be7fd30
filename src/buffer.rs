//! Fixed-length per-particle attribute columns.
//!
//! Each field stores its particles as parallel columns (position, size,
//! phase, color). A column never changes length after construction; the
//! only way to change a particle count is to build a new field.
//!
//! Columns carry a version counter next to the version last uploaded. The
//! renderer calls [`Attribute::take_dirty`] and re-uploads only when the
//! column has moved on.

use bytemuck::Pod;

/// A fixed-length, index-addressed column of per-particle values.
#[derive(Debug, Clone)]
pub struct Attribute<T: Pod> {
    data: Vec<T>,
    version: u64,
    synced: u64,
}

impl<T: Pod> Attribute<T> {
    /// Build a column from initial values. New columns start dirty so the
    /// first frame always uploads them.
    pub fn from_vec(data: Vec<T>) -> Self {
        Self {
            data,
            version: 1,
            synced: 0,
        }
    }

    /// Build a column of `len` copies of `value`.
    pub fn filled(len: usize, value: T) -> Self {
        Self::from_vec(vec![value; len])
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only view of the values.
    pub fn values(&self) -> &[T] {
        &self.data
    }

    /// Mutable view of the values. The slice cannot grow or shrink.
    ///
    /// Writers must call [`mark_dirty`](Self::mark_dirty) once they are done.
    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Record that the contents changed since the last upload.
    pub fn mark_dirty(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Monotonic change counter.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_dirty(&self) -> bool {
        self.version != self.synced
    }

    /// Returns `true` once per change and records the column as uploaded.
    pub fn take_dirty(&mut self) -> bool {
        let dirty = self.is_dirty();
        self.synced = self.version;
        dirty
    }

    /// Raw bytes for GPU upload.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

impl<T: Pod> std::ops::Index<usize> for Attribute<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.data[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_new_attribute_starts_dirty() {
        let attr = Attribute::filled(4, 1.0f32);
        assert!(attr.is_dirty());
        assert_eq!(attr.len(), 4);
    }

    #[test]
    fn test_take_dirty_clears_until_next_mark() {
        let mut attr = Attribute::filled(3, Vec3::ZERO);
        assert!(attr.take_dirty());
        assert!(!attr.take_dirty());

        attr.values_mut()[1] = Vec3::ONE;
        attr.mark_dirty();
        assert!(attr.is_dirty());
        assert!(attr.take_dirty());
        assert!(!attr.is_dirty());
    }

    #[test]
    fn test_version_increments_per_mark() {
        let mut attr = Attribute::filled(1, 0u32);
        let v = attr.version();
        attr.mark_dirty();
        attr.mark_dirty();
        assert_eq!(attr.version(), v + 2);
    }

    #[test]
    fn test_as_bytes_matches_layout() {
        let attr = Attribute::from_vec(vec![Vec3::new(1.0, 2.0, 3.0); 2]);
        assert_eq!(attr.as_bytes().len(), 2 * 12);
        assert_eq!(attr[1], Vec3::new(1.0, 2.0, 3.0));
    }
}
