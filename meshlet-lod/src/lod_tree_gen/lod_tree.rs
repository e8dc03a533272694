use crate::lod_tree_gen::border_tracker::{MeshletAdjacency, MeshletGroup};
use crate::lod_tree_gen::indices::MeshletId;
use crate::lod_tree_gen::simplify::{ClusterMesh, SimplifyMode, SimplifyOptions, simplify_cluster};
use crate::meshlet::bounds::{Bounds, compute_meshlet_bounds};
use crate::meshlet::builder::{build_meshlets, optimize_vertex_cache};
use crate::meshlet::{MeshletBuildResults, MeshletGenerationParams};
use crate::partition::PartitionError;
use crate::shape::sphere::Sphere;
use crate::vertex::VertexPositions;
use log::{debug, warn};
use rayon::prelude::*;
use smallvec::SmallVec;

/// Added to the error of every simplification step, so that a parent is always strictly coarser than its children.
pub const MIN_SIMPLIFICATION_ERROR: f32 = 1e-4;
/// Parent bounds are grown by this, so they strictly contain the bounds of their children.
pub const BOUNDS_RADIUS_EPSILON: f32 = 1e-4;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LodConfig {
	pub meshlet: MeshletGenerationParams,
	/// meshlets of a level that are grouped and simplified together
	pub meshlets_per_group: usize,
	/// stop generating after this many levels, 0 is unlimited
	pub max_levels: usize,
	/// levels with this many triangles or less are not simplified further
	pub min_triangle_count: usize,
	pub target_ratio: f32,
	pub target_error: f32,
	pub target_error_sloppy: f32,
	/// a new level is only kept if it has less than `previous * min_triangle_reduction` triangles
	pub min_triangle_reduction: f32,
	pub optimize_vertex_cache: bool,
}

impl Default for LodConfig {
	fn default() -> Self {
		let simplify = SimplifyOptions::default();
		Self {
			meshlet: MeshletGenerationParams::default(),
			meshlets_per_group: 4,
			max_levels: 0,
			min_triangle_count: 0,
			target_ratio: simplify.target_ratio,
			target_error: simplify.target_error,
			target_error_sloppy: simplify.target_error_sloppy,
			min_triangle_reduction: 0.8,
			optimize_vertex_cache: true,
		}
	}
}

impl LodConfig {
	pub fn simplify_options(&self, mode: SimplifyMode) -> SimplifyOptions {
		SimplifyOptions {
			target_ratio: self.target_ratio,
			target_error: self.target_error,
			target_error_sloppy: self.target_error_sloppy,
			mode,
		}
	}

	pub fn assert_valid(&self) {
		self.meshlet.assert_valid();
		assert!(self.meshlets_per_group > 0, "meshlets_per_group must be positive");
		assert!(
			self.target_ratio > 0. && self.target_ratio <= 1.,
			"target_ratio must be in (0, 1] but is {}",
			self.target_ratio
		);
		assert!(
			self.target_error >= 0. && self.target_error_sloppy >= 0.,
			"target errors must not be negative: {} {}",
			self.target_error,
			self.target_error_sloppy
		);
		assert!(
			self.min_triangle_reduction > 0. && self.min_triangle_reduction <= 1.,
			"min_triangle_reduction must be in (0, 1] but is {}",
			self.min_triangle_reduction
		);
	}
}

/// One meshlet of a [`LodLevel`]. All nodes simplified from the same group share `error` and `bounds`, and the nodes
/// of that group share `parent_error` and `parent_bounds`. A renderer draws a node if its own error is acceptable but
/// its parent's error is not.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LodNode {
	/// index into [`LodLevel::meshlets`]
	pub meshlet: MeshletId,
	/// group of the next more detailed level this node was simplified from, `None` for leaves
	pub child_group: Option<u32>,
	/// culling bounds of the meshlet itself
	pub culling: Bounds,
	pub bounds: Sphere,
	/// absolute deviation from the source mesh, 0 for leaves
	pub error: f32,
	pub parent_bounds: Sphere,
	/// [`f32::INFINITY`] for nodes of the root level
	pub parent_error: f32,
}

#[derive(Clone, Debug, Default)]
pub struct LodLevel {
	pub meshlets: MeshletBuildResults,
	pub nodes: Vec<LodNode>,
	/// Partition of [`Self::nodes`]. For all levels but the root, these are the groups the next less detailed level
	/// was simplified from.
	pub groups: Vec<MeshletGroup>,
}

impl LodLevel {
	pub fn triangle_count(&self) -> usize {
		self.meshlets.triangle_count()
	}
}

/// A DAG of meshlets at decreasing levels of detail.
#[derive(Clone, Debug, Default)]
pub struct LodHierarchy {
	/// least detailed first, the last level holds the meshlets of the source mesh
	pub levels: Vec<LodLevel>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LodLevelStats {
	pub meshlets: usize,
	pub triangles: usize,
	pub vertices: usize,
	pub groups: usize,
	pub max_error: f32,
}

/// output of simplifying a single group
struct SimplifiedGroup {
	meshlets: MeshletBuildResults,
	culling: Vec<Bounds>,
	error: f32,
	bounds: Sphere,
}

impl LodHierarchy {
	#[profiling::function]
	pub fn build(positions: &VertexPositions, indices: &[u32], config: &LodConfig) -> Result<Self, PartitionError> {
		config.assert_valid();

		let mut indices = indices.to_vec();
		if config.optimize_vertex_cache {
			optimize_vertex_cache(&mut indices, positions.len());
		}
		let meshlets = build_meshlets(positions, &indices, &config.meshlet);
		let nodes = meshlets
			.iter()
			.enumerate()
			.map(|(i, meshlet)| {
				let culling = compute_meshlet_bounds(&meshlet, positions);
				LodNode {
					meshlet: MeshletId(i as u32),
					child_group: None,
					culling,
					bounds: culling.sphere(),
					error: 0.,
					parent_bounds: culling.sphere(),
					parent_error: f32::INFINITY,
				}
			})
			.collect();
		let mut levels = vec![LodLevel {
			meshlets,
			nodes,
			groups: Vec::new(),
		}];
		debug!(
			"level 0: {} meshlets {} triangles",
			levels[0].nodes.len(),
			levels[0].triangle_count()
		);

		let mut mode = SimplifyMode::Normal;
		loop {
			let previous = &levels[levels.len() - 1];
			let previous_triangles = previous.triangle_count();
			if previous.nodes.len() < 2
				|| (config.max_levels > 0 && levels.len() >= config.max_levels)
				|| previous_triangles <= config.min_triangle_count
			{
				break;
			}

			let groups = MeshletAdjacency::from_meshlets(&previous.meshlets).group_meshlets(config.meshlets_per_group)?;
			let simplified = simplify_level(previous, &groups, positions, config, mode);
			let level = assemble_level(&simplified);

			let level_triangles = level.triangle_count();
			if !level.nodes.is_empty()
				&& (level_triangles as f64) < previous_triangles as f64 * config.min_triangle_reduction as f64
			{
				debug!(
					"level {}: {} meshlets {} triangles from {} groups ({:?})",
					levels.len(),
					level.nodes.len(),
					level_triangles,
					groups.len(),
					mode
				);
				let previous = levels.len() - 1;
				let previous = &mut levels[previous];
				for (group, parent) in groups.iter().zip(&simplified) {
					for id in group {
						let node = &mut previous.nodes[id.index()];
						node.parent_error = parent.error;
						node.parent_bounds = parent.bounds;
					}
				}
				previous.groups = groups;
				levels.push(level);
			} else if mode == SimplifyMode::Normal {
				warn!(
					"level {}: {} triangles did not reduce enough from {}, retrying with sloppy simplification",
					levels.len(),
					level_triangles,
					previous_triangles
				);
				mode = SimplifyMode::Sloppy;
			} else {
				warn!(
					"level {}: {} triangles did not reduce enough from {}, stopping",
					levels.len(),
					level_triangles,
					previous_triangles
				);
				break;
			}
		}

		levels.reverse();
		for level in &mut levels {
			if level.groups.is_empty() {
				level.groups = Vec::from([(0..level.nodes.len() as u32).map(MeshletId).collect()]);
			}
		}
		Ok(Self { levels })
	}

	pub fn root(&self) -> Option<&LodLevel> {
		self.levels.first()
	}

	/// the level holding the meshlets of the source mesh
	pub fn leaves(&self) -> Option<&LodLevel> {
		self.levels.last()
	}

	pub fn meshlet_count(&self) -> usize {
		self.levels.iter().map(|l| l.nodes.len()).sum()
	}

	pub fn stats(&self) -> Vec<LodLevelStats> {
		self.levels
			.iter()
			.map(|level| LodLevelStats {
				meshlets: level.nodes.len(),
				triangles: level.triangle_count(),
				vertices: level.meshlets.vertices.len(),
				groups: level.groups.len(),
				max_error: level.nodes.iter().map(|n| n.error).fold(0., f32::max),
			})
			.collect()
	}
}

#[profiling::function]
fn simplify_level(
	previous: &LodLevel,
	groups: &[MeshletGroup],
	positions: &VertexPositions,
	config: &LodConfig,
	mode: SimplifyMode,
) -> Vec<SimplifiedGroup> {
	let options = config.simplify_options(mode);
	groups
		.par_iter()
		.map(|group| {
			let children = group
				.iter()
				.map(|id| &previous.nodes[id.index()])
				.collect::<SmallVec<[_; 8]>>();
			let child_error = children.iter().map(|n| n.error).fold(0., f32::max);
			let child_bounds = children.iter().map(|n| n.bounds).collect::<SmallVec<[_; 8]>>();

			let cluster = ClusterMesh::from_meshlets(&previous.meshlets, group);
			let simplified = simplify_cluster(&cluster, positions, &options);
			let indices = simplified.to_global(&cluster);
			let meshlets = if indices.is_empty() {
				MeshletBuildResults::default()
			} else {
				build_meshlets(positions, &indices, &config.meshlet)
			};
			let culling = meshlets
				.iter()
				.map(|m| compute_meshlet_bounds(&m, positions))
				.collect();

			SimplifiedGroup {
				meshlets,
				culling,
				error: child_error + simplified.error.max(MIN_SIMPLIFICATION_ERROR),
				bounds: Sphere::merge_spheres_approx(&child_bounds)
					.unwrap_or_default()
					.grow(BOUNDS_RADIUS_EPSILON),
			}
		})
		.collect()
}

fn assemble_level(simplified: &[SimplifiedGroup]) -> LodLevel {
	let mut level = LodLevel {
		meshlets: simplified.iter().map(|g| &g.meshlets).collect(),
		nodes: Vec::with_capacity(simplified.iter().map(|g| g.meshlets.len()).sum()),
		groups: Vec::new(),
	};
	for (group_index, group) in simplified.iter().enumerate() {
		for culling in &group.culling {
			level.nodes.push(LodNode {
				meshlet: MeshletId(level.nodes.len() as u32),
				child_group: Some(group_index as u32),
				culling: *culling,
				bounds: group.bounds,
				error: group.error,
				parent_bounds: group.bounds,
				parent_error: f32::INFINITY,
			});
		}
	}
	level
}
