use rustc_hash::FxHashSet;

/// An undirected graph in the Compressed Sparse Row format METIS expects. The neighbors of vertex `v` are
/// `adjncy[xadj[v]..xadj[v + 1]]`, every edge is stored once in each direction.
#[derive(Clone, Debug, Default)]
pub struct GraphAdjacency {
	pub xadj: Vec<i32>,
	pub adjncy: Vec<i32>,
	/// optional edge weights, parallel to `adjncy`
	pub adjwgt: Option<Vec<i32>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PartitionError {
	#[error("invalid graph: {0}")]
	InvalidInput(&'static str),
	#[error("graph partitioning ran out of memory")]
	OutOfMemory,
	#[error("graph partitioning failed")]
	InternalError,
}

impl From<metis::Error> for PartitionError {
	fn from(value: metis::Error) -> Self {
		match value {
			metis::Error::Input => PartitionError::InvalidInput("rejected by METIS"),
			metis::Error::Memory => PartitionError::OutOfMemory,
			_ => PartitionError::InternalError,
		}
	}
}

impl GraphAdjacency {
	/// Builds the symmetric CSR of `vertex_count` vertices from undirected `edges`, with neighbors sorted.
	pub fn from_edges(vertex_count: usize, edges: &[(u32, u32)]) -> Self {
		let mut neighbors = vec![Vec::new(); vertex_count];
		for &(a, b) in edges {
			neighbors[a as usize].push(b as i32);
			neighbors[b as usize].push(a as i32);
		}

		let mut xadj = Vec::with_capacity(vertex_count + 1);
		let mut adjncy = Vec::with_capacity(edges.len() * 2);
		xadj.push(0);
		for mut list in neighbors {
			list.sort_unstable();
			adjncy.extend(list);
			xadj.push(adjncy.len() as i32);
		}
		Self {
			xadj,
			adjncy,
			adjwgt: None,
		}
	}

	pub fn with_weights(self, adjwgt: Vec<i32>) -> Self {
		Self {
			adjwgt: Some(adjwgt),
			..self
		}
	}

	pub fn vertex_count(&self) -> usize {
		self.xadj.len().saturating_sub(1)
	}

	pub fn neighbors(&self, vertex: usize) -> &[i32] {
		&self.adjncy[self.xadj[vertex] as usize..self.xadj[vertex + 1] as usize]
	}

	pub fn validate(&self) -> Result<(), PartitionError> {
		if self.xadj.len() < 2 {
			return Err(PartitionError::InvalidInput("graph has no vertices"));
		}
		if self.xadj[0] != 0 {
			return Err(PartitionError::InvalidInput("xadj must start at 0"));
		}
		if self.xadj.windows(2).any(|w| w[0] > w[1]) {
			return Err(PartitionError::InvalidInput("xadj must be non-decreasing"));
		}
		if self.xadj.last().copied() != Some(self.adjncy.len() as i32) {
			return Err(PartitionError::InvalidInput("last xadj entry must equal adjncy length"));
		}

		let n = self.vertex_count();
		let mut edges = FxHashSet::with_capacity_and_hasher(self.adjncy.len(), Default::default());
		for v in 0..n {
			for &u in self.neighbors(v) {
				if u < 0 || u as usize >= n {
					return Err(PartitionError::InvalidInput("adjncy references a vertex out of range"));
				}
				if u as usize == v {
					return Err(PartitionError::InvalidInput("adjncy contains a self loop"));
				}
				edges.insert((v as i32, u));
			}
		}
		if edges.iter().any(|(v, u)| !edges.contains(&(*u, *v))) {
			return Err(PartitionError::InvalidInput("adjacency is not symmetric"));
		}

		if let Some(adjwgt) = &self.adjwgt {
			if adjwgt.len() != self.adjncy.len() {
				return Err(PartitionError::InvalidInput("adjwgt length must equal adjncy length"));
			}
			if adjwgt.iter().any(|w| *w <= 0) {
				return Err(PartitionError::InvalidInput("edge weights must be positive"));
			}
		}
		Ok(())
	}
}

/// Partitions `graph` into `partitions` parts with METIS' multilevel k-way scheme, minimizing the (weighted) edge cut.
/// Returns the part of every vertex, or no labels at all on failure.
///
/// # Panics
/// if `partitions < 2`, a single partition needs no partitioning
#[profiling::function]
pub fn part_graph_kway(graph: &GraphAdjacency, partitions: usize) -> Result<Vec<i32>, PartitionError> {
	assert!(partitions > 1, "partitioning into {} parts", partitions);
	graph.validate()?;

	let mut labels = vec![0; graph.vertex_count()];
	let metis_graph = || {
		metis::Graph::new(1, partitions as i32, &graph.xadj, &graph.adjncy)
			.map_err(|_| PartitionError::InvalidInput("rejected by METIS"))
	};
	match &graph.adjwgt {
		Some(adjwgt) => metis_graph()?.set_adjwgt(adjwgt).part_kway(&mut labels)?,
		None => metis_graph()?.part_kway(&mut labels)?,
	};
	Ok(labels)
}
