use bytemuck_derive::{Pod, Zeroable};
use static_assertions::const_assert_eq;

pub mod bounds;
pub mod builder;

#[cfg(test)]
mod tests;

pub const MESHLET_MAX_VERTICES: u32 = 128;
pub const MESHLET_MAX_TRIANGLES: u32 = 128;
pub const MESHLET_CONE_WEIGHT: f32 = 0.5;

/// Local vertex ids are stored as bytes, so a meshlet can never reference more vertices than this.
pub const MESHLET_VERTICES_LIMIT: u32 = 256;
pub const MESHLET_TRIANGLES_LIMIT: u32 = 512;

/// A cluster of triangles, referencing a run of the shared vertex remap array and a run of the shared local index
/// array. The local index run is padded to 4 bytes, see [`triangle_indices_padded_len`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Zeroable, Pod)]
pub struct Meshlet {
	pub vertex_offset: u32,
	pub triangle_offset: u32,
	pub vertex_count: u32,
	pub triangle_count: u32,
}
const_assert_eq!(size_of::<Meshlet>(), 16);

/// length of the local index run of a meshlet with `triangle_count` triangles, rounded up to whole `u32` words
#[inline]
pub fn triangle_indices_padded_len(triangle_count: usize) -> usize {
	(triangle_count * 3 + 3) & !3
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MeshletGenerationParams {
	pub max_vertices: usize,
	pub max_triangles: usize,
	/// 0 packs purely by locality and capacity, higher values favor clusters with similar triangle normals
	pub cone_weight: f32,
}

impl Default for MeshletGenerationParams {
	fn default() -> Self {
		Self {
			max_vertices: MESHLET_MAX_VERTICES as usize,
			max_triangles: MESHLET_MAX_TRIANGLES as usize,
			cone_weight: MESHLET_CONE_WEIGHT,
		}
	}
}

impl MeshletGenerationParams {
	pub fn assert_valid(&self) {
		assert!(
			(3..=MESHLET_VERTICES_LIMIT as usize).contains(&self.max_vertices),
			"max_vertices must be in 3..={} but is {}",
			MESHLET_VERTICES_LIMIT,
			self.max_vertices
		);
		assert!(
			(1..=MESHLET_TRIANGLES_LIMIT as usize).contains(&self.max_triangles),
			"max_triangles must be in 1..={} but is {}",
			MESHLET_TRIANGLES_LIMIT,
			self.max_triangles
		);
		assert!(
			(0. ..=1.).contains(&self.cone_weight),
			"cone_weight must be in 0..=1 but is {}",
			self.cone_weight
		);
	}
}

/// Upper bound of meshlets [`builder::build_meshlets`] may emit for `index_count` indices.
pub fn build_meshlets_bound(index_count: usize, max_vertices: usize, max_triangles: usize) -> usize {
	assert_eq!(index_count % 3, 0, "index count must be a multiple of 3");
	assert!(max_vertices >= 3, "max_vertices must be at least 3");
	assert!(max_triangles >= 1, "max_triangles must be at least 1");

	// meshlet construction is limited by max vertices and max triangles per meshlet
	// the worst case is that the input is an unindexed stream since this equally stresses both limits
	// note that we assume that in the worst case, we leave 2 vertices unpacked in each meshlet - if we have space for
	// 3 we can pack any triangle
	let max_vertices_conservative = max_vertices - 2;
	let meshlet_limit_vertices = index_count.div_ceil(max_vertices_conservative);
	let meshlet_limit_triangles = (index_count / 3).div_ceil(max_triangles);
	meshlet_limit_vertices.max(meshlet_limit_triangles)
}

/// The owned output of [`builder::build_meshlets`].
#[derive(Clone, Debug, Default)]
pub struct MeshletBuildResults {
	pub meshlets: Vec<Meshlet>,
	/// local to global vertex remap, indexed by [`Meshlet::vertex_offset`]
	pub vertices: Vec<u32>,
	/// local triangle corners, indexed by [`Meshlet::triangle_offset`]
	pub indices: Vec<u8>,
}

impl MeshletBuildResults {
	#[inline]
	pub fn len(&self) -> usize {
		self.meshlets.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.meshlets.is_empty()
	}

	pub fn meshlet(&self, index: usize) -> MeshletView<'_> {
		let meshlet = self.meshlets[index];
		let vertices = meshlet.vertex_offset as usize..(meshlet.vertex_offset + meshlet.vertex_count) as usize;
		let indices = meshlet.triangle_offset as usize..(meshlet.triangle_offset + meshlet.triangle_count * 3) as usize;
		MeshletView {
			vertices: &self.vertices[vertices],
			indices: &self.indices[indices],
		}
	}

	pub fn iter(&self) -> impl ExactSizeIterator<Item = MeshletView<'_>> + '_ {
		(0..self.len()).map(|i| self.meshlet(i))
	}

	pub fn triangle_count(&self) -> usize {
		self.meshlets.iter().map(|m| m.triangle_count as usize).sum()
	}

	/// every triangle of every meshlet in global vertex ids
	pub fn global_indices(&self) -> Vec<u32> {
		let mut out = Vec::with_capacity(self.triangle_count() * 3);
		for meshlet in self.iter() {
			out.extend(meshlet.global_triangles().flatten());
		}
		out
	}

	/// Appends all meshlets of `other`, rebasing their offsets into the arrays of `self`.
	pub fn append(&mut self, other: &MeshletBuildResults) {
		let vertex_base = self.vertices.len() as u32;
		let index_base = self.indices.len() as u32;
		self.meshlets.extend(other.meshlets.iter().map(|m| Meshlet {
			vertex_offset: m.vertex_offset + vertex_base,
			triangle_offset: m.triangle_offset + index_base,
			..*m
		}));
		self.vertices.extend_from_slice(&other.vertices);
		self.indices.extend_from_slice(&other.indices);
	}

	/// Cuts the arrays down to what the last meshlet references.
	pub(crate) fn trim(&mut self) {
		let (vertices_len, indices_len) = self
			.meshlets
			.last()
			.map(|m| {
				(
					(m.vertex_offset + m.vertex_count) as usize,
					m.triangle_offset as usize + triangle_indices_padded_len(m.triangle_count as usize),
				)
			})
			.unwrap_or((0, 0));
		self.vertices.truncate(vertices_len);
		self.indices.truncate(indices_len);
		self.meshlets.shrink_to_fit();
		self.vertices.shrink_to_fit();
		self.indices.shrink_to_fit();
	}
}

impl<'a> FromIterator<&'a MeshletBuildResults> for MeshletBuildResults {
	fn from_iter<T: IntoIterator<Item = &'a MeshletBuildResults>>(iter: T) -> Self {
		let mut out = MeshletBuildResults::default();
		for results in iter {
			out.append(results);
		}
		out
	}
}

/// A meshlet borrowed from [`MeshletBuildResults`], without the index padding.
#[derive(Copy, Clone, Debug)]
pub struct MeshletView<'a> {
	pub vertices: &'a [u32],
	pub indices: &'a [u8],
}

impl<'a> MeshletView<'a> {
	#[inline]
	pub fn vertex_count(&self) -> usize {
		self.vertices.len()
	}

	#[inline]
	pub fn triangle_count(&self) -> usize {
		self.indices.len() / 3
	}

	#[inline]
	pub fn local_triangle(&self, triangle: usize) -> [u8; 3] {
		let i = triangle * 3;
		[self.indices[i], self.indices[i + 1], self.indices[i + 2]]
	}

	#[inline]
	pub fn global_triangle(&self, triangle: usize) -> [u32; 3] {
		self.local_triangle(triangle).map(|i| self.vertices[i as usize])
	}

	pub fn global_triangles(&self) -> impl Iterator<Item = [u32; 3]> + 'a {
		let view = *self;
		(0..view.triangle_count()).map(move |t| view.global_triangle(t))
	}
}
