use glam::Vec3;

/// A strided view of the position attribute inside an interleaved `f32` vertex buffer. Offset and stride are in bytes
/// and must be multiples of 4, as positions are 3 tightly packed `f32`.
#[derive(Copy, Clone, Debug)]
pub struct VertexPositions<'a> {
	data: &'a [f32],
	offset: usize,
	stride: usize,
	len: usize,
}

impl<'a> VertexPositions<'a> {
	pub fn new(data: &'a [f32], position_offset_bytes: usize, stride_bytes: usize) -> Self {
		assert!(!data.is_empty(), "vertex buffer must not be empty");
		assert!(stride_bytes > 0, "vertex stride must be positive");
		assert_eq!(stride_bytes % 4, 0, "vertex stride must be a multiple of 4 bytes");
		assert_eq!(position_offset_bytes % 4, 0, "position offset must be a multiple of 4 bytes");
		assert!(
			position_offset_bytes + 12 <= stride_bytes,
			"position at offset {} does not fit into stride {}",
			position_offset_bytes,
			stride_bytes
		);
		Self {
			data,
			offset: position_offset_bytes / 4,
			stride: stride_bytes / 4,
			len: data.len() * 4 / stride_bytes,
		}
	}

	/// tightly packed positions
	pub fn from_vec3(positions: &'a [Vec3]) -> Self {
		Self::new(bytemuck::cast_slice(positions), 0, size_of::<Vec3>())
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.len
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	#[inline]
	pub fn position(&self, index: usize) -> Vec3 {
		assert!(
			index < self.len,
			"vertex index out of bounds: the len is {} but the index is {}",
			self.len,
			index
		);
		let start = index * self.stride + self.offset;
		Vec3::from_slice(&self.data[start..start + 3])
	}

	pub fn iter(&self) -> impl Iterator<Item = Vec3> + '_ {
		(0..self.len).map(|i| self.position(i))
	}
}

/// Widens a 16-bit index buffer to the 32-bit indices every operation in this crate expects.
pub fn widen_indices(indices: &[u16]) -> Vec<u32> {
	indices.iter().copied().map(u32::from).collect()
}
