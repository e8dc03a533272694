use crate::vertex::VertexPositions;
use glam::Vec3;
use std::f32::consts::PI;

pub struct TestMesh {
	pub positions: Vec<Vec3>,
	pub indices: Vec<u32>,
}

impl TestMesh {
	pub fn positions(&self) -> VertexPositions<'_> {
		VertexPositions::from_vec3(&self.positions)
	}

	pub fn triangle_count(&self) -> usize {
		self.indices.len() / 3
	}

	pub fn sorted_triangles(&self) -> Vec<[u32; 3]> {
		sorted_triangles(&self.indices)
	}
}

pub fn sorted_triangles(indices: &[u32]) -> Vec<[u32; 3]> {
	let mut triangles = indices
		.chunks_exact(3)
		.map(|t| [t[0], t[1], t[2]])
		.collect::<Vec<_>>();
	triangles.sort();
	triangles
}

/// 2x2x2 cube with outward facing triangles
pub fn cube() -> TestMesh {
	let positions = [
		[-1., -1., -1.],
		[1., -1., -1.],
		[1., 1., -1.],
		[-1., 1., -1.],
		[-1., -1., 1.],
		[1., -1., 1.],
		[1., 1., 1.],
		[-1., 1., 1.],
	]
	.map(Vec3::from_array)
	.to_vec();
	let indices = vec![
		0, 2, 1, 0, 3, 2, // -z
		4, 5, 6, 4, 6, 7, // +z
		0, 1, 5, 0, 5, 4, // -y
		3, 7, 6, 3, 6, 2, // +y
		0, 4, 7, 0, 7, 3, // -x
		1, 2, 6, 1, 6, 5, // +x
	];
	TestMesh { positions, indices }
}

/// flat `n` by `n` quad grid on the xz plane facing +y, with unit spacing
pub fn grid(n: u32) -> TestMesh {
	let v = |x: u32, z: u32| z * (n + 1) + x;
	let positions = (0..=n)
		.flat_map(|z| (0..=n).map(move |x| Vec3::new(x as f32, 0., z as f32)))
		.collect();
	let mut indices = Vec::with_capacity((n * n * 6) as usize);
	for z in 0..n {
		for x in 0..n {
			let (a, b, c, d) = (v(x, z), v(x + 1, z), v(x, z + 1), v(x + 1, z + 1));
			indices.extend_from_slice(&[a, c, b, b, c, d]);
		}
	}
	TestMesh { positions, indices }
}

/// closed unit sphere with shared pole vertices and no seam
pub fn uv_sphere(rings: u32, segments: u32) -> TestMesh {
	assert!(rings >= 2 && segments >= 3);
	let mut positions = vec![Vec3::Y];
	for i in 1..rings {
		let phi = PI * i as f32 / rings as f32;
		for j in 0..segments {
			let theta = 2. * PI * j as f32 / segments as f32;
			positions.push(Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin()));
		}
	}
	positions.push(Vec3::NEG_Y);

	let top = 0;
	let bottom = positions.len() as u32 - 1;
	let v = |i: u32, j: u32| 1 + (i - 1) * segments + j % segments;
	let mut indices = Vec::new();
	for j in 0..segments {
		indices.extend_from_slice(&[top, v(1, j + 1), v(1, j)]);
	}
	for i in 1..rings - 1 {
		for j in 0..segments {
			let (a, b, c, d) = (v(i, j), v(i, j + 1), v(i + 1, j), v(i + 1, j + 1));
			indices.extend_from_slice(&[a, b, d, a, d, c]);
		}
	}
	for j in 0..segments {
		indices.extend_from_slice(&[bottom, v(rings - 1, j), v(rings - 1, j + 1)]);
	}
	TestMesh { positions, indices }
}
