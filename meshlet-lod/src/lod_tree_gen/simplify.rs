use crate::lod_tree_gen::indices::{IndexPair, MeshletId};
use crate::meshlet::MeshletBuildResults;
use crate::vertex::VertexPositions;
use glam::DVec3;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::cmp::Ordering;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum SimplifyMode {
	/// bounded by [`SimplifyOptions::target_error`]
	#[default]
	Normal,
	/// bounded by [`SimplifyOptions::target_error_sloppy`], for meshes that don't reduce enough otherwise
	Sloppy,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SimplifyOptions {
	/// fraction of triangles to keep
	pub target_ratio: f32,
	/// maximum deviation, relative to the cluster's extent
	pub target_error: f32,
	pub target_error_sloppy: f32,
	pub mode: SimplifyMode,
}

impl Default for SimplifyOptions {
	fn default() -> Self {
		Self {
			target_ratio: 0.5,
			target_error: 0.01,
			target_error_sloppy: 0.1,
			mode: SimplifyMode::Normal,
		}
	}
}

impl SimplifyOptions {
	pub fn error_limit(&self) -> f32 {
		match self.mode {
			SimplifyMode::Normal => self.target_error,
			SimplifyMode::Sloppy => self.target_error_sloppy,
		}
	}

	pub fn target_index_count(&self, index_count: usize) -> usize {
		(index_count as f64 * self.target_ratio as f64 / 3.).floor() as usize * 3
	}
}

/// The merged triangles of a group of meshlets. Every meshlet vertex becomes its own local vertex, even if another
/// meshlet of the group references the same global vertex.
#[derive(Clone, Debug, Default)]
pub struct ClusterMesh {
	/// local to global vertex
	pub vertices: Vec<u32>,
	/// triangle list of local vertices
	pub indices: Vec<u32>,
}

impl ClusterMesh {
	#[profiling::function]
	pub fn from_meshlets(meshlets: &MeshletBuildResults, group: &[MeshletId]) -> Self {
		let views = group.iter().map(|id| meshlets.meshlet(id.index())).collect::<SmallVec<[_; 8]>>();
		let vertex_cnt = views.iter().map(|m| m.vertex_count()).sum();
		let index_cnt = views.iter().map(|m| m.indices.len()).sum();
		let mut vertices = Vec::with_capacity(vertex_cnt);
		let mut indices = Vec::with_capacity(index_cnt);
		for m in &views {
			let base = vertices.len() as u32;
			vertices.extend_from_slice(m.vertices);
			indices.extend(m.indices.iter().map(|i| base + *i as u32));
		}
		Self { vertices, indices }
	}

	pub fn triangle_count(&self) -> usize {
		self.indices.len() / 3
	}
}

#[derive(Clone, Debug, Default)]
pub struct SimplifiedCluster {
	/// triangle list of local vertices of the [`ClusterMesh`] it was simplified from
	pub indices: Vec<u32>,
	/// absolute deviation from the source cluster, in model units
	pub error: f32,
}

impl SimplifiedCluster {
	pub fn triangle_count(&self) -> usize {
		self.indices.len() / 3
	}

	pub fn to_global(&self, cluster: &ClusterMesh) -> Vec<u32> {
		self.indices.iter().map(|i| cluster.vertices[*i as usize]).collect()
	}
}

/// Area weighted sum of squared plane distances, `pᵀAp + 2bᵀp + c`.
#[derive(Copy, Clone, Debug, Default)]
struct Quadric {
	a00: f64,
	a11: f64,
	a22: f64,
	a01: f64,
	a02: f64,
	a12: f64,
	b0: f64,
	b1: f64,
	b2: f64,
	c: f64,
	weight: f64,
}

impl Quadric {
	fn from_plane(normal: DVec3, d: f64, weight: f64) -> Self {
		let DVec3 { x, y, z } = normal;
		Self {
			a00: x * x * weight,
			a11: y * y * weight,
			a22: z * z * weight,
			a01: x * y * weight,
			a02: x * z * weight,
			a12: y * z * weight,
			b0: x * d * weight,
			b1: y * d * weight,
			b2: z * d * weight,
			c: d * d * weight,
			weight,
		}
	}

	fn add(&self, o: &Self) -> Self {
		Self {
			a00: self.a00 + o.a00,
			a11: self.a11 + o.a11,
			a22: self.a22 + o.a22,
			a01: self.a01 + o.a01,
			a02: self.a02 + o.a02,
			a12: self.a12 + o.a12,
			b0: self.b0 + o.b0,
			b1: self.b1 + o.b1,
			b2: self.b2 + o.b2,
			c: self.c + o.c,
			weight: self.weight + o.weight,
		}
	}

	/// mean squared distance of `p` to all accumulated planes
	fn error(&self, p: DVec3) -> f64 {
		let DVec3 { x, y, z } = p;
		let rx = self.a00 * x + self.a01 * y + self.a02 * z;
		let ry = self.a01 * x + self.a11 * y + self.a12 * z;
		let rz = self.a02 * x + self.a12 * y + self.a22 * z;
		let r = rx * x + ry * y + rz * z + 2. * (self.b0 * x + self.b1 * y + self.b2 * z) + self.c;
		if self.weight > 0. {
			(r / self.weight).abs()
		} else {
			r.abs()
		}
	}
}

#[derive(Copy, Clone, Debug)]
struct Collapse {
	cost: f64,
	from: u32,
	to: u32,
}

/// Reduces the triangle count of `cluster` to `options.target_ratio` of its input by collapsing vertices onto their
/// neighbors, as long as the deviation stays below the error limit. Vertices on edges used by a single triangle are
/// locked, so the border towards meshlets outside the cluster stays intact and the result fits seamlessly into the
/// neighboring clusters.
#[profiling::function]
pub fn simplify_cluster(
	cluster: &ClusterMesh,
	positions: &VertexPositions,
	options: &SimplifyOptions,
) -> SimplifiedCluster {
	let vertex_count = cluster.vertices.len();

	// topology works on one canonical local vertex per global vertex
	let canonical = {
		let mut first_local = FxHashMap::with_capacity_and_hasher(vertex_count, Default::default());
		cluster
			.vertices
			.iter()
			.enumerate()
			.map(|(local, global)| *first_local.entry(*global).or_insert(local as u32))
			.collect::<Vec<u32>>()
	};
	let mut triangles = cluster
		.indices
		.chunks_exact(3)
		.map(|t| [t[0], t[1], t[2]].map(|i| canonical[i as usize]))
		.filter(|[a, b, c]| a != b && b != c && c != a)
		.collect::<Vec<_>>();

	let target_index_count = options.target_index_count(triangles.len() * 3);
	if triangles.len() * 3 <= target_index_count {
		return SimplifiedCluster {
			indices: triangles.into_iter().flatten().collect(),
			error: 0.,
		};
	}

	let (points, scale) = normalized_positions(cluster, positions, &triangles);
	let locked = border_vertices(vertex_count, &triangles);

	let mut quadrics = vec![Quadric::default(); vertex_count];
	{
		profiling::scope!("quadrics");
		for tri in &triangles {
			let [p0, p1, p2] = tri.map(|i| points[i as usize]);
			let normal = (p1 - p0).cross(p2 - p0);
			let area = normal.length();
			if area > 0. {
				let normal = normal / area;
				let q = Quadric::from_plane(normal, -normal.dot(p0), area);
				for i in tri {
					quadrics[*i as usize] = quadrics[*i as usize].add(&q);
				}
			}
		}
	}

	let error_limit = options.error_limit() as f64;
	let error_limit_sq = error_limit * error_limit;
	let mut alive = vec![true; triangles.len()];
	let mut live_count = triangles.len();
	let mut max_error_sq = 0f64;

	loop {
		profiling::scope!("collapse pass");
		if live_count * 3 <= target_index_count {
			break;
		}

		let mut vertex_triangles = vec![SmallVec::<[u32; 8]>::new(); vertex_count];
		for (t, tri) in triangles.iter().enumerate().filter(|(t, _)| alive[*t]) {
			for v in tri {
				vertex_triangles[*v as usize].push(t as u32);
			}
		}

		// every directed edge of every triangle, interior edges are thus considered in both directions
		let mut candidates = triangles
			.iter()
			.enumerate()
			.filter(|(t, _)| alive[*t])
			.flat_map(|(_, tri)| (0..3).map(move |i| (tri[i], tri[(i + 1) % 3])))
			.filter(|(from, _)| !locked[*from as usize])
			.map(|(from, to)| Collapse {
				cost: quadrics[from as usize]
					.add(&quadrics[to as usize])
					.error(points[to as usize]),
				from,
				to,
			})
			.collect::<Vec<_>>();
		candidates.sort_unstable_by(|a, b| {
			a.cost
				.total_cmp(&b.cost)
				.then(a.from.cmp(&b.from))
				.then(a.to.cmp(&b.to))
		});

		let mut dirty = vec![false; vertex_count];
		let mut collapsed = 0;
		for collapse in candidates {
			if live_count * 3 <= target_index_count || collapse.cost > error_limit_sq {
				break;
			}
			let (from, to) = (collapse.from as usize, collapse.to as usize);
			if dirty[from] || dirty[to] {
				continue;
			}
			if !can_collapse(&triangles, &alive, &vertex_triangles, &points, collapse) {
				continue;
			}

			for &t in &vertex_triangles[from] {
				let t = t as usize;
				if !alive[t] {
					continue;
				}
				let tri = &mut triangles[t];
				if tri.contains(&collapse.to) {
					alive[t] = false;
					live_count -= 1;
				} else {
					for v in tri.iter_mut().filter(|v| **v == collapse.from) {
						*v = collapse.to;
					}
				}
				for v in triangles[t] {
					dirty[v as usize] = true;
				}
			}
			dirty[from] = true;
			dirty[to] = true;
			quadrics[to] = quadrics[to].add(&quadrics[from]);
			max_error_sq = max_error_sq.max(collapse.cost);
			collapsed += 1;
		}

		if collapsed == 0 {
			break;
		}
	}

	SimplifiedCluster {
		indices: triangles
			.iter()
			.zip(&alive)
			.filter(|(_, alive)| **alive)
			.flat_map(|(tri, _)| *tri)
			.collect(),
		error: (max_error_sq.sqrt() * scale) as f32,
	}
}

/// Positions mapped into the unit cube of the cluster's bounding box, and the scale to map them back.
fn normalized_positions(
	cluster: &ClusterMesh,
	positions: &VertexPositions,
	triangles: &[[u32; 3]],
) -> (Vec<DVec3>, f64) {
	let points = cluster
		.vertices
		.iter()
		.map(|g| positions.position(*g as usize).as_dvec3())
		.collect::<Vec<_>>();
	let (min, max) = triangles
		.iter()
		.flatten()
		.map(|i| points[*i as usize])
		.fold((DVec3::INFINITY, DVec3::NEG_INFINITY), |(min, max), p| (min.min(p), max.max(p)));
	let extent = (max - min).max_element();
	let scale = if extent > 0. { extent } else { 1. };
	(points.into_iter().map(|p| (p - min) / scale).collect(), scale)
}

/// Vertices on edges not shared by exactly two triangles: mesh borders, seams to other clusters and non-manifold edges.
fn border_vertices(vertex_count: usize, triangles: &[[u32; 3]]) -> Vec<bool> {
	let mut edge_use = FxHashMap::with_capacity_and_hasher(triangles.len() * 2, Default::default());
	for [a, b, c] in triangles {
		for edge in [IndexPair::new(*a, *b), IndexPair::new(*b, *c), IndexPair::new(*c, *a)] {
			*edge_use.entry(edge).or_insert(0u32) += 1;
		}
	}

	let mut locked = vec![false; vertex_count];
	for (edge, count) in edge_use {
		if count != 2 {
			for v in edge.iter() {
				locked[v as usize] = true;
			}
		}
	}
	locked
}

fn can_collapse(
	triangles: &[[u32; 3]],
	alive: &[bool],
	vertex_triangles: &[SmallVec<[u32; 8]>],
	points: &[DVec3],
	collapse: Collapse,
) -> bool {
	let Collapse { from, to, .. } = collapse;
	let live = move |v: u32| {
		vertex_triangles[v as usize]
			.iter()
			.map(|t| *t as usize)
			.filter(move |t| alive[*t])
			.map(move |t| triangles[t])
	};
	let neighbors = |v: u32| {
		let mut n = live(v).flatten().filter(|o| *o != v).collect::<SmallVec<[u32; 16]>>();
		n.sort_unstable();
		n.dedup();
		n
	};

	// link condition: the only vertices adjacent to both are the ones opposite of the collapsed edge, otherwise the
	// collapse would pinch the surface
	let mut opposite = live(from)
		.filter(|tri| tri.contains(&to))
		.filter_map(|tri| tri.into_iter().find(|v| *v != from && *v != to))
		.collect::<SmallVec<[u32; 4]>>();
	if opposite.is_empty() {
		return false;
	}
	opposite.sort_unstable();
	opposite.dedup();
	let from_neighbors = neighbors(from);
	let shared = neighbors(to)
		.iter()
		.filter(|v| from_neighbors.binary_search(v).is_ok())
		.count();
	if shared != opposite.len() {
		return false;
	}

	// reject triangles that would flip or degenerate
	for tri in live(from).filter(|tri| !tri.contains(&to)) {
		let old = tri.map(|v| points[v as usize]);
		let new = tri.map(|v| {
			let v = if v == from { to } else { v };
			points[v as usize]
		});
		let old_normal = (old[1] - old[0]).cross(old[2] - old[0]);
		let new_normal = (new[1] - new[0]).cross(new[2] - new[0]);
		if new_normal.length_squared() <= f64::EPSILON * old_normal.length_squared() {
			return false;
		}
		if old_normal.dot(new_normal).partial_cmp(&0.) != Some(Ordering::Greater) {
			return false;
		}
	}
	true
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::meshlet::MeshletGenerationParams;
	use crate::meshlet::builder::build_meshlets;
	use crate::test_meshes::{TestMesh, grid, uv_sphere};
	use rustc_hash::FxHashSet;

	fn all_meshlets(mesh: &TestMesh, params: &MeshletGenerationParams) -> (MeshletBuildResults, Vec<MeshletId>) {
		let meshlets = build_meshlets(&mesh.positions(), &mesh.indices, params);
		let ids = (0..meshlets.len() as u32).map(MeshletId).collect();
		(meshlets, ids)
	}

	fn assert_valid(cluster: &ClusterMesh, simplified: &SimplifiedCluster) {
		assert_eq!(simplified.indices.len() % 3, 0);
		assert!(simplified.indices.len() <= cluster.indices.len());
		assert!(simplified.indices.iter().all(|i| (*i as usize) < cluster.vertices.len()));
		for tri in simplified.indices.chunks_exact(3) {
			assert!(tri[0] != tri[1] && tri[1] != tri[2] && tri[2] != tri[0], "degenerate {tri:?}");
		}
	}

	fn border_globals(mesh: &TestMesh, n: u32) -> Vec<u32> {
		(0..mesh.positions.len() as u32)
			.filter(|v| {
				let (x, z) = (v % (n + 1), v / (n + 1));
				x == 0 || z == 0 || x == n || z == n
			})
			.collect()
	}

	#[test]
	fn test_target_index_count() {
		let options = SimplifyOptions::default();
		assert_eq!(options.target_index_count(384), 192);
		assert_eq!(options.target_index_count(36), 18);
		assert_eq!(options.target_index_count(3), 0);
	}

	#[test]
	fn test_flat_grid() {
		let mesh = grid(8);
		let (meshlets, ids) = all_meshlets(&mesh, &MeshletGenerationParams::default());
		assert_eq!(meshlets.len(), 1);
		let cluster = ClusterMesh::from_meshlets(&meshlets, &ids);
		assert_eq!(cluster.triangle_count(), 128);

		let options = SimplifyOptions {
			target_error: 1.,
			..SimplifyOptions::default()
		};
		let simplified = simplify_cluster(&cluster, &mesh.positions(), &options);
		assert_valid(&cluster, &simplified);
		assert!(simplified.indices.len() <= options.target_index_count(cluster.indices.len()));
		// a plane stays a plane
		assert_eq!(simplified.error, 0.);

		// the border is locked
		let global = simplified.to_global(&cluster).into_iter().collect::<FxHashSet<_>>();
		for v in border_globals(&mesh, 8) {
			assert!(global.contains(&v), "border vertex {v} was removed");
		}
	}

	#[test]
	fn test_seams_inside_cluster_unlocked() {
		let mesh = grid(8);
		let params = MeshletGenerationParams {
			max_vertices: 64,
			max_triangles: 32,
			cone_weight: 0.,
		};
		let (meshlets, ids) = all_meshlets(&mesh, &params);
		assert!(meshlets.len() >= 4);
		let cluster = ClusterMesh::from_meshlets(&meshlets, &ids);
		// no dedup of shared vertices
		assert!(cluster.vertices.len() > mesh.positions.len());

		let simplified = simplify_cluster(&cluster, &mesh.positions(), &SimplifyOptions::default());
		assert_valid(&cluster, &simplified);
		assert!(simplified.triangle_count() < 128 * 3 / 4, "{}", simplified.triangle_count());
	}

	#[test]
	fn test_reaches_target_ratio() {
		let options = SimplifyOptions {
			target_error: 1.,
			..SimplifyOptions::default()
		};
		for mesh in [grid(16), uv_sphere(32, 48)] {
			let (meshlets, _) = all_meshlets(&mesh, &MeshletGenerationParams::default());
			assert!(meshlets.len() >= 4);
			let ids = (0..4).map(MeshletId).collect::<Vec<_>>();
			let cluster = ClusterMesh::from_meshlets(&meshlets, &ids);

			let simplified = simplify_cluster(&cluster, &mesh.positions(), &options);
			assert_valid(&cluster, &simplified);
			let target = options.target_index_count(cluster.indices.len());
			assert!(
				simplified.indices.len() <= target,
				"{} indices, target {}",
				simplified.indices.len(),
				target
			);
		}
	}

	#[test]
	fn test_target_ignores_degenerate_triangles() {
		let mesh = grid(8);
		let mut indices = mesh.indices.clone();
		for _ in 0..16 {
			indices.extend_from_slice(&[0, 0, 1]);
		}
		let cluster = ClusterMesh {
			vertices: (0..mesh.positions.len() as u32).collect(),
			indices,
		};
		assert_eq!(cluster.triangle_count(), 144);

		let options = SimplifyOptions {
			target_error: 1.,
			..SimplifyOptions::default()
		};
		let simplified = simplify_cluster(&cluster, &mesh.positions(), &options);
		assert_valid(&cluster, &simplified);
		// half of the 128 live triangles, not half of all 144
		assert!(simplified.triangle_count() <= 64, "{}", simplified.triangle_count());
	}

	#[test]
	fn test_seams_outside_cluster_locked() {
		let mesh = grid(8);
		let params = MeshletGenerationParams {
			max_vertices: 64,
			max_triangles: 32,
			cone_weight: 0.,
		};
		let (meshlets, _) = all_meshlets(&mesh, &params);
		let cluster = ClusterMesh::from_meshlets(&meshlets, &[MeshletId(0)]);

		// vertices shared with any other meshlet must survive
		let others = (1..meshlets.len())
			.flat_map(|i| meshlets.meshlet(i).vertices.iter().copied())
			.collect::<FxHashSet<_>>();
		let simplified = simplify_cluster(&cluster, &mesh.positions(), &SimplifyOptions::default());
		assert_valid(&cluster, &simplified);
		let global = simplified.to_global(&cluster).into_iter().collect::<FxHashSet<_>>();
		for v in cluster.vertices.iter().filter(|v| others.contains(v)) {
			assert!(global.contains(v), "seam vertex {v} was removed");
		}
	}

	#[test]
	fn test_error_limit() {
		let mesh = uv_sphere(16, 24);
		let (meshlets, ids) = all_meshlets(&mesh, &MeshletGenerationParams::default());
		let cluster = ClusterMesh::from_meshlets(&meshlets, &ids);
		let options = SimplifyOptions {
			target_error: 0.,
			..SimplifyOptions::default()
		};
		let simplified = simplify_cluster(&cluster, &mesh.positions(), &options);
		assert_valid(&cluster, &simplified);
		assert_eq!(simplified.triangle_count(), cluster.triangle_count());
		assert_eq!(simplified.error, 0.);
	}

	#[test]
	fn test_sloppy() {
		let mesh = uv_sphere(16, 24);
		let (meshlets, ids) = all_meshlets(&mesh, &MeshletGenerationParams::default());
		let cluster = ClusterMesh::from_meshlets(&meshlets, &ids);
		let options = SimplifyOptions {
			target_error: 0.,
			target_error_sloppy: 0.5,
			mode: SimplifyMode::Sloppy,
			..SimplifyOptions::default()
		};
		assert_eq!(options.error_limit(), 0.5);
		let simplified = simplify_cluster(&cluster, &mesh.positions(), &options);
		assert_valid(&cluster, &simplified);
		assert!(simplified.triangle_count() < cluster.triangle_count());
		assert!(simplified.error > 0.);
		// extent of the unit sphere is 2
		assert!(simplified.error <= 0.5 * 2. + 1e-4);
	}

	#[test]
	fn test_already_small() {
		let mesh = grid(1);
		let (meshlets, ids) = all_meshlets(&mesh, &MeshletGenerationParams::default());
		let cluster = ClusterMesh::from_meshlets(&meshlets, &ids);
		let options = SimplifyOptions {
			target_ratio: 1.,
			..SimplifyOptions::default()
		};
		let simplified = simplify_cluster(&cluster, &mesh.positions(), &options);
		assert_eq!(simplified.triangle_count(), 2);
		assert_eq!(simplified.error, 0.);
	}
}
