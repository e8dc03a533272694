use meshlet_lod::lod_tree_gen::collection::MeshletCollection;
use std::io::{self, Write};

/// Number of `u32` counts leading an exported collection: levels, meshlets, lod nodes, vertices, index bytes.
pub const HEADER_LEN: usize = 5;

/// Writes `collection` as little endian `u32` counts followed by the level node counts and the raw meshlet, lod node,
/// vertex and index arrays, in that order.
#[profiling::function]
pub fn write_collection(mut out: impl Write, collection: &MeshletCollection) -> io::Result<()> {
	let header: [u32; HEADER_LEN] = [
		collection.level_node_counts.len(),
		collection.meshlets.len(),
		collection.lod_nodes.len(),
		collection.vertices.len(),
		collection.indices.len(),
	]
	.map(|count| count as u32);
	out.write_all(bytemuck::cast_slice(&header))?;
	out.write_all(bytemuck::cast_slice(&collection.level_node_counts))?;
	out.write_all(bytemuck::cast_slice(&collection.meshlets))?;
	out.write_all(bytemuck::cast_slice(&collection.lod_nodes))?;
	out.write_all(bytemuck::cast_slice(&collection.vertices))?;
	out.write_all(&collection.indices)?;
	out.flush()
}

pub fn exported_len(collection: &MeshletCollection) -> usize {
	size_of::<[u32; HEADER_LEN]>()
		+ size_of_val(collection.level_node_counts.as_slice())
		+ size_of_val(collection.meshlets.as_slice())
		+ size_of_val(collection.lod_nodes.as_slice())
		+ size_of_val(collection.vertices.as_slice())
		+ collection.indices.len()
}
