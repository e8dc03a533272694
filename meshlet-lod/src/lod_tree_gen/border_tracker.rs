use crate::lod_tree_gen::indices::{IndexPair, MeshletId};
use crate::lod_tree_gen::sorted_smallvec::SortedSmallVec;
use crate::meshlet::MeshletBuildResults;
use crate::partition::{GraphAdjacency, PartitionError, part_graph_kway};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use static_assertions::const_assert_eq;

/// a group of meshlets that is simplified together
pub type MeshletGroup = SmallVec<[MeshletId; 8]>;

/// The meshlet graph of one LOD level: two meshlets are connected if they share at least one edge, weighted by the
/// number of edges they share.
#[derive(Debug)]
pub struct MeshletAdjacency {
	/// CSR like METIS, adjacency indices are sorted, `adjwgt` holds the shared edge counts
	graph: GraphAdjacency,
}

impl MeshletAdjacency {
	#[profiling::function]
	pub fn from_meshlets(meshlets: &MeshletBuildResults) -> Self {
		// SmallVec: most Edges have only 1 meshlet, some 2, and in extremely rare cases >2
		// But we get a capacity of 4 for free, as SmallVec's heap alloc needs 16 bytes anyway
		const_assert_eq!(
			size_of::<SmallVec<[MeshletId; 1]>>(),
			size_of::<SmallVec<[MeshletId; 4]>>()
		);
		let mut edge_to_meshlets: FxHashMap<IndexPair<u32>, SmallVec<[MeshletId; 4]>>;
		let mut meshlet_adj: Vec<SortedSmallVec<MeshletId, 6>>;
		{
			profiling::scope!("edge_to_meshlets meshlet_adj");
			edge_to_meshlets =
				FxHashMap::with_capacity_and_hasher(meshlets.triangle_count() * 2, Default::default());
			meshlet_adj = vec![SortedSmallVec::new(); meshlets.len()];
			for (meshlet_id, meshlet) in meshlets.iter().enumerate() {
				let meshlet_id = MeshletId(meshlet_id as u32);
				for [a, b, c] in meshlet.global_triangles() {
					for edge in [IndexPair::new(a, b), IndexPair::new(b, c), IndexPair::new(c, a)] {
						// linear scan, there are typically at most 2 entries
						let vec = edge_to_meshlets.entry(edge).or_default();
						if vec.contains(&meshlet_id) {
							continue;
						}
						for other_meshlet_id in vec.iter().copied() {
							meshlet_adj[meshlet_id.index()].insert(other_meshlet_id);
							meshlet_adj[other_meshlet_id.index()].insert(meshlet_id);
						}
						vec.push(meshlet_id);
					}
				}
			}
		}

		let mut xadj;
		let mut adjncy;
		{
			profiling::scope!("xadj adjncy");
			xadj = Vec::with_capacity(meshlets.len() + 1);
			adjncy = Vec::with_capacity(meshlet_adj.iter().map(|adj| adj.len()).sum());
			xadj.push(0);
			for adj in &meshlet_adj {
				adjncy.extend(adj.iter().map(|id| id.0 as i32));
				xadj.push(adjncy.len() as i32);
			}
		}

		let mut adjwgt;
		{
			profiling::scope!("shared edge weights");
			adjwgt = vec![0; adjncy.len()];
			for sharing in edge_to_meshlets.values() {
				for a in 0..sharing.len() {
					for b in 0..sharing.len() {
						if a == b {
							continue;
						}
						let (from, to) = (sharing[a], sharing[b]);
						if let Some(pos) = meshlet_adj[from.index()].position(&to) {
							adjwgt[xadj[from.index()] as usize + pos] += 1;
						}
					}
				}
			}
		}

		Self {
			graph: GraphAdjacency {
				xadj,
				adjncy,
				adjwgt: Some(adjwgt),
			},
		}
	}

	pub fn meshlets(&self) -> usize {
		self.graph.vertex_count()
	}

	pub fn graph(&self) -> &GraphAdjacency {
		&self.graph
	}

	pub fn connected_meshlets(&self, meshlet: MeshletId) -> impl Iterator<Item = MeshletId> + '_ {
		self.graph
			.neighbors(meshlet.index())
			.iter()
			.map(|i| MeshletId(*i as u32))
	}

	/// count of edges shared between two meshlets, `None` if they aren't connected
	pub fn shared_edges(&self, meshlets: IndexPair<MeshletId>) -> Option<u32> {
		let start = self.graph.xadj[meshlets.0.index()] as usize;
		let pos = self
			.graph
			.neighbors(meshlets.0.index())
			.binary_search(&(*meshlets.1 as i32))
			.ok()?;
		self.graph.adjwgt.as_ref().map(|w| w[start + pos] as u32)
	}

	/// Splits the meshlets into groups of about `meshlets_per_group` meshlets that share many edges. Returns a single
	/// group of all meshlets if there are too few to partition. Groups are never empty.
	#[profiling::function]
	pub fn group_meshlets(&self, meshlets_per_group: usize) -> Result<Vec<MeshletGroup>, PartitionError> {
		assert!(meshlets_per_group > 0, "meshlets_per_group must be positive");
		let n_partitions = self.meshlets().div_ceil(meshlets_per_group);
		if n_partitions <= 1 {
			return Ok(Vec::from([(0..self.meshlets()).map(|id| MeshletId(id as u32)).collect()]));
		}

		let partitions = {
			profiling::scope!("metis partitioning");
			part_graph_kway(&self.graph, n_partitions)?
		};

		let mut groups;
		{
			profiling::scope!("meshlet groups");
			groups = vec![MeshletGroup::new(); n_partitions];
			for (meshlet_id, partition) in partitions.iter().enumerate() {
				groups[*partition as usize].push(MeshletId(meshlet_id as u32));
			}
			groups.retain(|group| !group.is_empty());
		}
		Ok(groups)
	}
}
