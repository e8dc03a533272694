use crate::lod_tree_gen::lod_tree::LodHierarchy;
use crate::meshlet::{MeshletView, triangle_indices_padded_len};
use crate::shape::sphere::Sphere;
use bytemuck_derive::{Pod, Zeroable};
use glam::Vec4;
use static_assertions::const_assert_eq;
use std::ops::Range;

/// A meshlet of a [`MeshletCollection`] together with its culling data, laid out for upload.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct PackedMeshlet {
	pub vertex_offset: u32,
	/// byte offset into [`MeshletCollection::indices`], always 4 byte aligned
	pub triangle_offset: u32,
	pub vertex_count: u32,
	pub triangle_count: u32,
	/// `xyz` center `w` radius
	pub bounding_sphere: Vec4,
	/// `xyz` apex `w` cutoff
	pub cone_apex_cutoff: Vec4,
	pub cone_axis: Vec4,
}
const_assert_eq!(size_of::<PackedMeshlet>(), 64);

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct PackedLodNode {
	pub meshlet_start_index: u32,
	pub meshlet_count: u32,
	pub level_index: u32,
	pub error: f32,
	pub bounds: Sphere,
	pub parent_bounds: Sphere,
	pub parent_error: f32,
	pub _pad: [u32; 3],
}
const_assert_eq!(size_of::<PackedLodNode>(), 64);

/// All levels of a [`LodHierarchy`] flattened into contiguous arrays. Nodes are ordered by level (least detailed
/// first), then by group, and every node references exactly one meshlet.
#[derive(Clone, Debug, Default)]
pub struct MeshletCollection {
	pub meshlets: Vec<PackedMeshlet>,
	pub lod_nodes: Vec<PackedLodNode>,
	/// global vertex ids
	pub vertices: Vec<u32>,
	/// local triangle corners, the run of every meshlet padded to 4 bytes
	pub indices: Vec<u8>,
	pub level_node_counts: Vec<u32>,
}

impl MeshletCollection {
	#[profiling::function]
	pub fn from_hierarchy(hierarchy: &LodHierarchy) -> Self {
		let meshlet_count = hierarchy.meshlet_count();
		let mut out = Self {
			meshlets: Vec::with_capacity(meshlet_count),
			lod_nodes: Vec::with_capacity(meshlet_count),
			vertices: Vec::with_capacity(hierarchy.levels.iter().map(|l| l.meshlets.vertices.len()).sum()),
			indices: Vec::with_capacity(hierarchy.levels.iter().map(|l| l.meshlets.indices.len()).sum()),
			level_node_counts: Vec::with_capacity(hierarchy.levels.len()),
		};

		for (level_index, level) in hierarchy.levels.iter().enumerate() {
			out.level_node_counts.push(level.nodes.len() as u32);
			for node in level.groups.iter().flatten().map(|id| &level.nodes[id.index()]) {
				out.lod_nodes.push(PackedLodNode {
					meshlet_start_index: out.meshlets.len() as u32,
					meshlet_count: 1,
					level_index: level_index as u32,
					error: node.error,
					bounds: node.bounds,
					parent_bounds: node.parent_bounds,
					parent_error: node.parent_error,
					_pad: [0; 3],
				});

				let view = level.meshlets.meshlet(node.meshlet.index());
				let culling = &node.culling;
				out.meshlets.push(PackedMeshlet {
					vertex_offset: out.vertices.len() as u32,
					triangle_offset: out.indices.len() as u32,
					vertex_count: view.vertex_count() as u32,
					triangle_count: view.triangle_count() as u32,
					bounding_sphere: Vec4::from((culling.center, culling.radius)),
					cone_apex_cutoff: Vec4::from((culling.cone_apex, culling.cone_cutoff)),
					cone_axis: Vec4::from((culling.cone_axis, 0.)),
				});
				out.vertices.extend_from_slice(view.vertices);
				let indices_start = out.indices.len();
				out.indices.extend_from_slice(view.indices);
				out.indices
					.resize(indices_start + triangle_indices_padded_len(view.triangle_count()), 0);
			}
		}
		out
	}

	/// range of [`Self::lod_nodes`] belonging to `level`
	pub fn level_nodes(&self, level: usize) -> Range<usize> {
		let start = self.level_node_counts[..level].iter().map(|c| *c as usize).sum::<usize>();
		start..start + self.level_node_counts[level] as usize
	}

	pub fn meshlet(&self, index: usize) -> MeshletView<'_> {
		let meshlet = &self.meshlets[index];
		let vertices = meshlet.vertex_offset as usize..(meshlet.vertex_offset + meshlet.vertex_count) as usize;
		let indices = meshlet.triangle_offset as usize..(meshlet.triangle_offset + meshlet.triangle_count * 3) as usize;
		MeshletView {
			vertices: &self.vertices[vertices],
			indices: &self.indices[indices],
		}
	}

	pub fn triangle_count(&self) -> usize {
		self.meshlets.iter().map(|m| m.triangle_count as usize).sum()
	}
}
