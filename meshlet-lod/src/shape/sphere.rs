use bytemuck_derive::{Pod, Zeroable};
use glam::{Vec3, Vec4, Vec4Swizzles};

/// `xyz` center and `w` radius
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct Sphere(Vec4);

impl Sphere {
	pub fn new(center: Vec3, radius: f32) -> Sphere {
		Self(Vec4::from((center, radius)))
	}

	/// Ritter's bounding sphere: start with the most distant pair of axis extreme points and grow the sphere towards
	/// every point outside it. Not minimal, but within a few percent of it. `iter` must yield the same values every
	/// time.
	pub fn bounding_sphere<I: Iterator<Item = Vec3>>(iter: impl Fn() -> I) -> Option<Self> {
		let first = iter().next()?;
		let mut min = [first; 3];
		let mut max = [first; 3];
		for p in iter() {
			for axis in 0..3 {
				if p[axis] < min[axis][axis] {
					min[axis] = p;
				}
				if p[axis] > max[axis][axis] {
					max[axis] = p;
				}
			}
		}

		let axis = (0..3)
			.max_by(|a, b| {
				let da = min[*a].distance_squared(max[*a]);
				let db = min[*b].distance_squared(max[*b]);
				da.total_cmp(&db)
			})
			.unwrap_or(0);
		let mut center = (min[axis] + max[axis]) * 0.5;
		let mut radius = min[axis].distance(max[axis]) * 0.5;

		for p in iter() {
			let d2 = p.distance_squared(center);
			if d2 > radius * radius {
				let d = d2.sqrt();
				let k = 0.5 + (radius / d) * 0.5;
				center = center * k + p * (1. - k);
				radius = (radius + d) * 0.5;
			}
		}
		Some(Self::new(center, radius))
	}

	/// Sphere enclosing all `spheres`, centered at their radius weighted average center.
	pub fn merge_spheres_approx(spheres: &[Sphere]) -> Option<Sphere> {
		if spheres.is_empty() {
			return None;
		}

		let mut center = Vec3::ZERO;
		let mut weight_accum = 0.;
		for sphere in spheres {
			let weight = sphere.radius();
			center += sphere.center() * weight;
			weight_accum += weight;
		}
		if weight_accum > 0. {
			center /= weight_accum;
		} else {
			center = spheres.iter().map(Sphere::center).sum::<Vec3>() / spheres.len() as f32;
		}

		let radius = spheres
			.iter()
			.map(|s| s.center().distance(center) + s.radius())
			.max_by(|a, b| a.total_cmp(b))?;
		Some(Self::new(center, radius))
	}

	pub fn center(&self) -> Vec3 {
		self.0.xyz()
	}

	pub fn radius(&self) -> f32 {
		self.0.w
	}

	pub fn grow(&self, amount: f32) -> Self {
		Self::new(self.center(), self.radius() + amount)
	}

	pub fn contains(&self, point: Vec3, epsilon: f32) -> bool {
		point.distance(self.center()) <= self.radius() + epsilon
	}

	pub fn contains_sphere(&self, other: &Sphere, epsilon: f32) -> bool {
		other.center().distance(self.center()) + other.radius() <= self.radius() + epsilon
	}
}
