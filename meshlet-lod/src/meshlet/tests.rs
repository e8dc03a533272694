use crate::meshlet::bounds::compute_meshlet_bounds;
use crate::meshlet::builder::{build_meshlets, optimize_vertex_cache};
use crate::meshlet::{
	MeshletBuildResults, MeshletGenerationParams, build_meshlets_bound, triangle_indices_padded_len,
};
use crate::test_meshes::{TestMesh, cube, grid, sorted_triangles, uv_sphere};
use crate::vertex::VertexPositions;
use approx::assert_relative_eq;
use glam::Vec3;

fn params(max_vertices: usize, max_triangles: usize, cone_weight: f32) -> MeshletGenerationParams {
	MeshletGenerationParams {
		max_vertices,
		max_triangles,
		cone_weight,
	}
}

fn assert_valid_meshlets(mesh: &TestMesh, out: &MeshletBuildResults, params: &MeshletGenerationParams) {
	assert!(out.len() <= build_meshlets_bound(mesh.indices.len(), params.max_vertices, params.max_triangles));

	// coverage: every input triangle exactly once, in the same corner order
	assert_eq!(sorted_triangles(&out.global_indices()), mesh.sorted_triangles());

	// capacity and non overlapping ranges
	let mut vertex_end = 0;
	let mut index_end = 0;
	for (i, m) in out.meshlets.iter().enumerate() {
		assert!(m.vertex_count as usize <= params.max_vertices, "meshlet {i}: {m:?}");
		assert!(m.triangle_count as usize <= params.max_triangles, "meshlet {i}: {m:?}");
		assert!(m.triangle_count > 0, "meshlet {i}: {m:?}");
		assert_eq!(m.vertex_offset, vertex_end, "meshlet {i}: {m:?}");
		assert_eq!(m.triangle_offset, index_end, "meshlet {i}: {m:?}");
		assert_eq!(m.triangle_offset % 4, 0);
		vertex_end += m.vertex_count;
		index_end += triangle_indices_padded_len(m.triangle_count as usize) as u32;

		let view = out.meshlet(i);
		for &local in view.indices {
			assert!((local as usize) < view.vertex_count());
		}
	}
	assert_eq!(out.vertices.len(), vertex_end as usize);
	assert_eq!(out.indices.len(), index_end as usize);
}

#[test]
fn test_cube_single_meshlet() {
	let mesh = cube();
	let params = params(128, 128, 0.5);
	let out = build_meshlets(&mesh.positions(), &mesh.indices, &params);
	assert_eq!(out.len(), 1);
	assert_eq!(out.meshlets[0].triangle_count, 12);
	assert_eq!(out.meshlets[0].vertex_count, 8);
	assert_eq!(out.indices.len(), 36);
	assert_valid_meshlets(&mesh, &out, &params);
}

#[test]
fn test_sphere_coverage() {
	let mesh = uv_sphere(24, 32);
	for params in [
		MeshletGenerationParams::default(),
		params(64, 124, 0.),
		params(64, 64, 0.25),
		params(256, 512, 0.9),
		params(3, 1, 0.),
		params(4, 2, 0.5),
	] {
		let out = build_meshlets(&mesh.positions(), &mesh.indices, &params);
		assert_valid_meshlets(&mesh, &out, &params);
	}
}

#[test]
fn test_grid_capacity() {
	let mesh = grid(20);
	let params = params(32, 32, 0.);
	let out = build_meshlets(&mesh.positions(), &mesh.indices, &params);
	assert_valid_meshlets(&mesh, &out, &params);
	// 800 triangles can't fit into less than 25 meshlets
	assert!(out.len() >= 25);
}

#[test]
fn test_disconnected_islands() {
	let mut mesh = cube();
	let offset = mesh.positions.len() as u32;
	let far = cube();
	mesh.positions.extend(far.positions.iter().map(|p| *p + Vec3::X * 10.));
	mesh.indices.extend(far.indices.iter().map(|i| i + offset));

	let params = params(128, 128, 0.);
	let out = build_meshlets(&mesh.positions(), &mesh.indices, &params);
	assert_valid_meshlets(&mesh, &out, &params);
	assert_eq!(out.triangle_count(), 24);
}

#[test]
fn test_optimize_vertex_cache() {
	let mut mesh = uv_sphere(12, 16);
	let before = mesh.sorted_triangles().len();
	optimize_vertex_cache(&mut mesh.indices, mesh.positions.len());
	assert_eq!(mesh.triangle_count(), before);
	let params = MeshletGenerationParams::default();
	let out = build_meshlets(&mesh.positions(), &mesh.indices, &params);
	assert_valid_meshlets(&mesh, &out, &params);
}

#[test]
fn test_interleaved_vertices() {
	// position after a 4 float normal + uv block
	let mesh = cube();
	let data = mesh
		.positions
		.iter()
		.flat_map(|p| [0., 0., 0., 0., p.x, p.y, p.z, 0.])
		.collect::<Vec<f32>>();
	let positions = VertexPositions::new(&data, 16, 32);
	let out = build_meshlets(&positions, &mesh.indices, &MeshletGenerationParams::default());
	assert_eq!(out.len(), 1);
	assert_eq!(out.triangle_count(), 12);
}

#[test]
fn test_build_meshlets_bound() {
	assert_eq!(build_meshlets_bound(36, 128, 128), 1);
	assert_eq!(build_meshlets_bound(300, 3, 1), 300);
	assert_eq!(build_meshlets_bound(3 * 1000, 64, 124), 49);
	assert_eq!(build_meshlets_bound(0, 64, 124), 0);
}

#[test]
#[should_panic(expected = "max_vertices must be in")]
fn test_too_few_vertices() {
	let mesh = cube();
	build_meshlets(&mesh.positions(), &mesh.indices, &params(2, 64, 0.));
}

#[test]
#[should_panic(expected = "max_vertices must be in")]
fn test_too_many_vertices() {
	let mesh = cube();
	build_meshlets(&mesh.positions(), &mesh.indices, &params(257, 64, 0.));
}

#[test]
#[should_panic(expected = "multiple of 3")]
fn test_partial_triangle() {
	let mesh = cube();
	build_meshlets(&mesh.positions(), &mesh.indices[..7], &MeshletGenerationParams::default());
}

#[test]
#[should_panic(expected = "index out of bounds")]
fn test_index_out_of_range() {
	let mesh = cube();
	build_meshlets(&mesh.positions(), &[0, 1, 8], &MeshletGenerationParams::default());
}

fn assert_sound_bounds(mesh: &TestMesh, out: &MeshletBuildResults) {
	let positions = mesh.positions();
	for view in out.iter() {
		let bounds = compute_meshlet_bounds(&view, &positions);
		assert!(bounds.radius >= 0.);
		assert!((-1. ..=1.).contains(&bounds.cone_cutoff));

		for &v in view.vertices {
			let p = positions.position(v as usize);
			assert!(bounds.sphere().contains(p, 1e-4), "{p:?} outside {bounds:?}");
		}

		if bounds.is_cone_degenerate() {
			continue;
		}
		for [a, b, c] in view.global_triangles().map(|t| t.map(|i| positions.position(i as usize))) {
			let normal = (b - a).cross(c - a).normalize();
			assert!(normal.dot(bounds.cone_axis) >= bounds.cone_cutoff - 1e-4);
			assert!(normal.dot(bounds.cone_axis_decoded()) >= bounds.cone_cutoff_decoded() - 1e-4);
			// apex lies behind every triangle
			assert!((bounds.cone_apex - a).dot(normal) <= 1e-4);
		}
	}
}

#[test]
fn test_bounds_sphere() {
	let mesh = uv_sphere(16, 24);
	let out = build_meshlets(&mesh.positions(), &mesh.indices, &params(64, 64, 0.5));
	assert_sound_bounds(&mesh, &out);
}

#[test]
fn test_bounds_cube() {
	let mesh = cube();
	let out = build_meshlets(&mesh.positions(), &mesh.indices, &MeshletGenerationParams::default());
	assert_sound_bounds(&mesh, &out);
	let bounds = compute_meshlet_bounds(&out.meshlet(0), &mesh.positions());
	// normals point in every direction
	assert!(bounds.is_cone_degenerate());
	assert_eq!(bounds.cone_apex, bounds.center);
	assert!(bounds.radius >= 3f32.sqrt() - 1e-4);
}

#[test]
fn test_bounds_flat() {
	let mesh = grid(4);
	let out = build_meshlets(&mesh.positions(), &mesh.indices, &MeshletGenerationParams::default());
	assert_eq!(out.len(), 1);
	assert_sound_bounds(&mesh, &out);

	let bounds = compute_meshlet_bounds(&out.meshlet(0), &mesh.positions());
	assert!(bounds.cone_axis.abs_diff_eq(Vec3::Y, 1e-6));
	assert_relative_eq!(bounds.cone_cutoff, 1.);
	assert_eq!(bounds.cone_axis_s8, [0, 127, 0]);
	assert_eq!(bounds.cone_cutoff_s8, 127);
	// Ritter is within a few percent of the minimal sphere
	let minimal = 8f32.sqrt();
	assert!(bounds.radius >= minimal - 1e-4 && bounds.radius <= minimal * 1.5, "{bounds:?}");
}

#[test]
fn test_bounds_degenerate() {
	let positions = [Vec3::ZERO, Vec3::X, Vec3::X * 2.];
	let mesh = TestMesh {
		positions: positions.to_vec(),
		indices: vec![0, 1, 2],
	};
	let out = build_meshlets(&mesh.positions(), &mesh.indices, &MeshletGenerationParams::default());
	let bounds = compute_meshlet_bounds(&out.meshlet(0), &mesh.positions());
	assert!(bounds.is_cone_degenerate());
	assert_eq!(bounds.cone_cutoff_s8, -127);
	assert!(bounds.center.abs_diff_eq(Vec3::X, 1e-6));
	assert_relative_eq!(bounds.radius, 1.);
}
