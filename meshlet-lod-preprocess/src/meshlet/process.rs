use crate::gltf::Gltf;
use crate::meshlet::error::MeshletError;
use gltf::Primitive;
use gltf::mesh::Mode;
use meshlet_lod::lod_tree_gen::collection::MeshletCollection;
use meshlet_lod::lod_tree_gen::lod_tree::{LodConfig, LodHierarchy, LodLevelStats};
use meshlet_lod::vertex::VertexPositions;
use rayon::prelude::*;
use smallvec::SmallVec;

#[derive(Debug)]
pub struct PrimitiveStats {
	pub mesh: usize,
	pub mesh_name: Option<String>,
	pub primitive: usize,
	pub vertices: usize,
	pub triangles: usize,
	/// least detailed first
	pub levels: Vec<LodLevelStats>,
	pub collection_bytes: usize,
}

pub struct ProcessedPrimitive {
	pub stats: PrimitiveStats,
	pub collection: MeshletCollection,
}

#[profiling::function]
pub fn process_meshes(gltf: &Gltf, config: &LodConfig) -> anyhow::Result<Vec<ProcessedPrimitive>> {
	let primitives = gltf
		.meshes()
		.collect::<Vec<_>>()
		.into_par_iter()
		.map(|mesh| {
			let vec = mesh.primitives().collect::<SmallVec<[_; 4]>>();
			vec.into_par_iter()
				.map(|primitive| process_mesh_primitive(gltf, mesh.index(), mesh.name(), primitive, config))
				.collect::<Result<Vec<_>, _>>()
		})
		.collect::<Result<Vec<_>, _>>()?;
	Ok(primitives.into_iter().flatten().collect())
}

#[profiling::function]
pub fn process_mesh_primitive(
	gltf: &Gltf,
	mesh: usize,
	mesh_name: Option<&str>,
	primitive: Primitive,
	config: &LodConfig,
) -> anyhow::Result<ProcessedPrimitive> {
	if primitive.mode() != Mode::Triangles {
		Err(MeshletError::PrimitiveMustBeTriangleList)?;
	}

	let reader = primitive.reader(|b| gltf.buffer(b));
	let positions: Vec<[f32; 3]> = reader
		.read_positions()
		.ok_or(MeshletError::NoVertexPositions)?
		.collect();
	let indices: Vec<u32> = if let Some(indices) = reader.read_indices() {
		indices.into_u32().collect()
	} else {
		(0..positions.len() as u32).collect()
	};
	if positions.is_empty() || indices.is_empty() {
		Err(MeshletError::EmptyPrimitive)?;
	}
	if indices.len() % 3 != 0 {
		Err(MeshletError::IndexCountNotMultipleOfThree)?;
	}
	if indices.iter().any(|i| *i as usize >= positions.len()) {
		Err(MeshletError::IndexOutOfBounds)?;
	}

	let vertex_positions = VertexPositions::new(bytemuck::cast_slice(&positions), 0, size_of::<[f32; 3]>());
	let hierarchy = LodHierarchy::build(&vertex_positions, &indices, config)?;
	let collection = MeshletCollection::from_hierarchy(&hierarchy);
	log::debug!(
		"mesh {} primitive {}: {} levels {} meshlets",
		mesh,
		primitive.index(),
		hierarchy.levels.len(),
		collection.meshlets.len()
	);

	let collection_bytes = size_of_val(collection.meshlets.as_slice())
		+ size_of_val(collection.lod_nodes.as_slice())
		+ size_of_val(collection.vertices.as_slice())
		+ size_of_val(collection.indices.as_slice());
	Ok(ProcessedPrimitive {
		stats: PrimitiveStats {
			mesh,
			mesh_name: mesh_name.map(String::from),
			primitive: primitive.index(),
			vertices: positions.len(),
			triangles: indices.len() / 3,
			levels: hierarchy.stats(),
			collection_bytes,
		},
		collection,
	})
}
