use crate::meshlet::{
	Meshlet, MeshletBuildResults, MeshletGenerationParams, build_meshlets_bound, triangle_indices_padded_len,
};
use crate::vertex::VertexPositions;
use glam::Vec3;

const UNUSED: u16 = u16::MAX;

/// Reorders triangles for post-transform vertex cache locality. Optional, but improves both locality of the meshlets
/// built from the result and the rendering performance of them.
#[profiling::function]
pub fn optimize_vertex_cache(indices: &mut [u32], vertex_count: usize) {
	meshopt::optimize_vertex_cache_in_place(indices, vertex_count);
}

/// Greedily partitions the triangle list `indices` into meshlets of at most `params.max_vertices` vertices and
/// `params.max_triangles` triangles. Every triangle ends up in exactly one meshlet, with its corner order preserved.
#[profiling::function]
pub fn build_meshlets(
	positions: &VertexPositions,
	indices: &[u32],
	params: &MeshletGenerationParams,
) -> MeshletBuildResults {
	assert!(!positions.is_empty(), "vertex buffer must not be empty");
	assert!(!indices.is_empty(), "index buffer must not be empty");
	assert_eq!(indices.len() % 3, 0, "index count must be a multiple of 3");
	params.assert_valid();

	let triangles = TriangleData::new(positions, indices, params.max_triangles);
	let mut adjacency = TriangleAdjacency::new(indices, positions.len());

	let bound = build_meshlets_bound(indices.len(), params.max_vertices, params.max_triangles);
	let mut out = MeshletBuildResults {
		meshlets: Vec::with_capacity(bound),
		vertices: Vec::with_capacity(indices.len().min(bound * params.max_vertices)),
		indices: Vec::with_capacity(indices.len() + bound * 3),
	};

	let mut builder = MeshletAppender::new(positions.len(), params);
	let mut emitted = vec![false; triangles.len()];
	let mut emitted_count = 0;
	let mut seed_cursor = 0;
	{
		profiling::scope!("greedy clustering");
		while emitted_count < triangles.len() {
			let cone = builder.cone();
			let candidate = builder.best_neighbor(&adjacency, &triangles, indices, cone.as_ref());
			let triangle = match candidate {
				Some(candidate) => {
					if builder.should_close_early(candidate.spread) {
						builder.flush(&mut out);
					}
					candidate.triangle
				}
				None => {
					while emitted[seed_cursor] {
						seed_cursor += 1;
					}
					seed_cursor
				}
			};

			let corners = triangle_corners(indices, triangle);
			builder.append(&mut out, corners, &triangles, triangle);
			emitted[triangle] = true;
			emitted_count += 1;
			adjacency.remove_triangle(triangle, corners);
		}
		builder.flush(&mut out);
	}

	out.trim();
	out
}

#[inline]
fn triangle_corners(indices: &[u32], triangle: usize) -> [u32; 3] {
	[indices[triangle * 3], indices[triangle * 3 + 1], indices[triangle * 3 + 2]]
}

/// per triangle centroid and unit normal
struct TriangleData {
	centroids: Vec<Vec3>,
	normals: Vec<Vec3>,
	/// expected radius of a full meshlet, used to normalize distances
	expected_radius: f32,
}

impl TriangleData {
	#[profiling::function]
	fn new(positions: &VertexPositions, indices: &[u32], max_triangles: usize) -> Self {
		let triangle_count = indices.len() / 3;
		let mut centroids = Vec::with_capacity(triangle_count);
		let mut normals = Vec::with_capacity(triangle_count);
		let mut mesh_area = 0.;
		for triangle in 0..triangle_count {
			let [a, b, c] = triangle_corners(indices, triangle).map(|i| positions.position(i as usize));
			let normal = (b - a).cross(c - a);
			let area = normal.length();
			mesh_area += area;
			centroids.push((a + b + c) / 3.);
			normals.push(if area > 0. { normal / area } else { Vec3::ZERO });
		}

		let triangle_area_avg = if triangle_count > 0 {
			mesh_area * 0.5 / triangle_count as f32
		} else {
			0.
		};
		let expected_radius = (triangle_area_avg * max_triangles as f32).sqrt() * 0.5;
		Self {
			centroids,
			normals,
			expected_radius: if expected_radius > 0. { expected_radius } else { 1. },
		}
	}

	fn len(&self) -> usize {
		self.centroids.len()
	}
}

/// Vertex to live triangle adjacency in CSR form. Emitted triangles are swap-removed from the lists of their vertices,
/// so every triangle still listed is live.
struct TriangleAdjacency {
	counts: Vec<u32>,
	offsets: Vec<u32>,
	data: Vec<u32>,
}

impl TriangleAdjacency {
	#[profiling::function]
	fn new(indices: &[u32], vertex_count: usize) -> Self {
		let mut counts = vec![0u32; vertex_count];
		for &i in indices {
			assert!(
				(i as usize) < vertex_count,
				"index out of bounds: the vertex count is {} but the index is {}",
				vertex_count,
				i
			);
			counts[i as usize] += 1;
		}

		let mut offsets = Vec::with_capacity(vertex_count);
		let mut offset = 0;
		for count in &counts {
			offsets.push(offset);
			offset += count;
		}

		let mut fill = offsets.clone();
		let mut data = vec![0u32; indices.len()];
		for (index, &vertex) in indices.iter().enumerate() {
			let slot = &mut fill[vertex as usize];
			data[*slot as usize] = (index / 3) as u32;
			*slot += 1;
		}

		Self { counts, offsets, data }
	}

	#[inline]
	fn live(&self, vertex: u32) -> &[u32] {
		let start = self.offsets[vertex as usize] as usize;
		&self.data[start..start + self.counts[vertex as usize] as usize]
	}

	#[inline]
	fn live_count(&self, vertex: u32) -> u32 {
		self.counts[vertex as usize]
	}

	fn remove_triangle(&mut self, triangle: usize, corners: [u32; 3]) {
		for vertex in corners {
			let start = self.offsets[vertex as usize] as usize;
			let count = &mut self.counts[vertex as usize];
			let list = &mut self.data[start..start + *count as usize];
			if let Some(pos) = list.iter().position(|t| *t as usize == triangle) {
				list.swap(pos, list.len() - 1);
				*count -= 1;
			}
		}
	}
}

/// running centroid and normal average of the meshlet under construction
struct MeshletCone {
	center: Vec3,
	axis: Vec3,
}

struct Candidate {
	triangle: usize,
	spread: f32,
}

struct MeshletAppender<'a> {
	params: &'a MeshletGenerationParams,
	/// global vertex to local vertex of the current meshlet, [`UNUSED`] if not part of it
	used: Vec<u16>,
	vertices: Vec<u32>,
	indices: Vec<u8>,
	triangle_count: usize,
	centroid_sum: Vec3,
	normal_sum: Vec3,
}

impl<'a> MeshletAppender<'a> {
	fn new(vertex_count: usize, params: &'a MeshletGenerationParams) -> Self {
		Self {
			params,
			used: vec![UNUSED; vertex_count],
			vertices: Vec::with_capacity(params.max_vertices),
			indices: Vec::with_capacity(params.max_triangles * 3),
			triangle_count: 0,
			centroid_sum: Vec3::ZERO,
			normal_sum: Vec3::ZERO,
		}
	}

	fn cone(&self) -> Option<MeshletCone> {
		if self.triangle_count == 0 {
			return None;
		}
		Some(MeshletCone {
			center: self.centroid_sum / self.triangle_count as f32,
			axis: self.normal_sum.normalize_or_zero(),
		})
	}

	/// Picks the live triangle adjacent to the current meshlet that adds the fewest new vertices, finishing off
	/// vertices with a single live triangle first, and only then the one with the lowest locality and cone score.
	fn best_neighbor(
		&self,
		adjacency: &TriangleAdjacency,
		triangles: &TriangleData,
		indices: &[u32],
		cone: Option<&MeshletCone>,
	) -> Option<Candidate> {
		let cone = cone?;
		let mut best: Option<Candidate> = None;
		let mut best_extra = u32::MAX;
		let mut best_score = f32::MAX;

		for &vertex in &self.vertices {
			for &triangle in adjacency.live(vertex) {
				let triangle = triangle as usize;
				let corners = triangle_corners(indices, triangle);

				let mut extra = self.new_vertex_count(corners);
				if corners.iter().any(|v| adjacency.live_count(*v) == 1) {
					extra = 0;
				}
				if extra > best_extra {
					continue;
				}

				let distance = triangles.centroids[triangle].distance(cone.center);
				let spread = triangles.normals[triangle].dot(cone.axis);
				let score = meshlet_score(distance, spread, self.params.cone_weight, triangles.expected_radius);
				if extra < best_extra || score < best_score {
					best = Some(Candidate { triangle, spread });
					best_extra = extra;
					best_score = score;
				}
			}
		}
		best
	}

	/// Splitting early once the meshlet is half full keeps cones tight, instead of adding a triangle facing away.
	fn should_close_early(&self, spread: f32) -> bool {
		let cone_weight = self.params.cone_weight;
		cone_weight > 0. && self.triangle_count * 2 >= self.params.max_triangles && spread < 1. - 2. * cone_weight
	}

	fn new_vertex_count(&self, corners: [u32; 3]) -> u32 {
		let [a, b, c] = corners;
		let mut extra = (self.used[a as usize] == UNUSED) as u32;
		extra += (self.used[b as usize] == UNUSED && b != a) as u32;
		extra += (self.used[c as usize] == UNUSED && c != a && c != b) as u32;
		extra
	}

	fn append(&mut self, out: &mut MeshletBuildResults, corners: [u32; 3], triangles: &TriangleData, triangle: usize) {
		let extra = self.new_vertex_count(corners) as usize;
		if self.vertices.len() + extra > self.params.max_vertices || self.triangle_count >= self.params.max_triangles {
			self.flush(out);
		}

		for vertex in corners {
			let local = &mut self.used[vertex as usize];
			if *local == UNUSED {
				*local = self.vertices.len() as u16;
				self.vertices.push(vertex);
			}
			self.indices.push(*local as u8);
		}
		self.triangle_count += 1;
		self.centroid_sum += triangles.centroids[triangle];
		self.normal_sum += triangles.normals[triangle];
	}

	fn flush(&mut self, out: &mut MeshletBuildResults) {
		if self.triangle_count == 0 {
			return;
		}

		let meshlet = Meshlet {
			vertex_offset: out.vertices.len() as u32,
			triangle_offset: out.indices.len() as u32,
			vertex_count: self.vertices.len() as u32,
			triangle_count: self.triangle_count as u32,
		};
		out.vertices.extend_from_slice(&self.vertices);
		out.indices.extend_from_slice(&self.indices);
		let padded = meshlet.triangle_offset as usize + triangle_indices_padded_len(self.triangle_count);
		out.indices.resize(padded, 0);
		out.meshlets.push(meshlet);

		for vertex in self.vertices.drain(..) {
			self.used[vertex as usize] = UNUSED;
		}
		self.indices.clear();
		self.triangle_count = 0;
		self.centroid_sum = Vec3::ZERO;
		self.normal_sum = Vec3::ZERO;
	}
}

#[inline]
fn meshlet_score(distance: f32, spread: f32, cone_weight: f32, expected_radius: f32) -> f32 {
	let cone = 1. - spread * cone_weight;
	let cone_clamped = cone.max(1e-3);
	(1. + distance / expected_radius * (1. - cone_weight)) * cone_clamped
}
