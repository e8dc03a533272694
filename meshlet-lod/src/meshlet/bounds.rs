use crate::meshlet::MeshletView;
use crate::shape::sphere::Sphere;
use crate::vertex::VertexPositions;
use glam::Vec3;

/// Culling data of a meshlet.
///
/// The normal cone contains every face normal `n` of the meshlet: `dot(n, cone_axis) >= cone_cutoff`. The meshlet is
/// entirely backfacing if `dot(normalize(cone_apex - camera), cone_axis) >= sqrt(1 - cone_cutoff²)`. A cone with
/// `cone_cutoff == -1` can't be used for culling.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds {
	pub center: Vec3,
	pub radius: f32,
	pub cone_apex: Vec3,
	pub cone_axis: Vec3,
	/// cos of the cone's half angle
	pub cone_cutoff: f32,
	/// `cone_axis` as signed normalized 8-bit, decode with `v / 127`
	pub cone_axis_s8: [i8; 3],
	/// `cone_cutoff` as signed normalized 8-bit, conservative with respect to the quantized axis
	pub cone_cutoff_s8: i8,
}

impl Bounds {
	pub fn sphere(&self) -> Sphere {
		Sphere::new(self.center, self.radius)
	}

	/// true if the cone excludes no direction
	pub fn is_cone_degenerate(&self) -> bool {
		self.cone_cutoff <= -1.
	}

	pub fn cone_axis_decoded(&self) -> Vec3 {
		Vec3::from_array(self.cone_axis_s8.map(|a| a as f32 / 127.))
	}

	pub fn cone_cutoff_decoded(&self) -> f32 {
		self.cone_cutoff_s8 as f32 / 127.
	}
}

/// below this the cone is too wide to ever cull anything
const MIN_CONE_CUTOFF: f32 = 0.1;

#[profiling::function]
pub fn compute_meshlet_bounds(meshlet: &MeshletView, positions: &VertexPositions) -> Bounds {
	let corners = meshlet
		.global_triangles()
		.map(|t| t.map(|i| positions.position(i as usize)))
		.collect::<Vec<_>>();

	let sphere = Sphere::bounding_sphere(|| corners.iter().flatten().copied()).unwrap_or_default();
	let center = sphere.center();

	// unnormalized normals are area weighted
	let mut axis = Vec3::ZERO;
	let mut normals = Vec::with_capacity(corners.len());
	for [a, b, c] in &corners {
		let normal = (*b - *a).cross(*c - *a);
		let area = normal.length();
		if area > 0. {
			axis += normal;
			normals.push((*a, normal / area));
		}
	}
	let axis = axis.normalize_or_zero();

	let min_dot = normals
		.iter()
		.map(|(_, n)| n.dot(axis))
		.min_by(|a, b| a.total_cmp(b))
		.unwrap_or(-1.);

	if normals.is_empty() || axis == Vec3::ZERO || min_dot <= MIN_CONE_CUTOFF {
		return Bounds {
			center,
			radius: sphere.radius(),
			cone_apex: center,
			cone_axis: Vec3::ZERO,
			cone_cutoff: -1.,
			cone_axis_s8: [0; 3],
			cone_cutoff_s8: -127,
		};
	}

	// move the apex back along the axis until it's behind every triangle's plane
	// dot(axis, n) >= min_dot > 0 so the division is well defined
	let max_t = normals
		.iter()
		.map(|(p, n)| (center - *p).dot(*n) / axis.dot(*n))
		.fold(0f32, f32::max);
	let cone_apex = center - axis * max_t;

	let cone_axis_s8 = axis.to_array().map(quantize_snorm8);
	let decoded = Vec3::from_array(cone_axis_s8.map(|a| a as f32 / 127.));
	let axis_error = (decoded - axis).abs().element_sum();
	let cone_cutoff_s8 = ((min_dot - axis_error) * 127.).floor().clamp(-127., 127.) as i8;

	Bounds {
		center,
		radius: sphere.radius(),
		cone_apex,
		cone_axis: axis,
		cone_cutoff: min_dot,
		cone_axis_s8,
		cone_cutoff_s8,
	}
}

#[inline]
fn quantize_snorm8(v: f32) -> i8 {
	(v.clamp(-1., 1.) * 127.).round() as i8
}
