use std::hash::Hash;
use std::ops::Deref;

/// An unordered pair, stored sorted so that `(a, b)` and `(b, a)` compare and hash equal. Used for undirected edges
/// between vertices and between meshlets.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct IndexPair<T: Copy + Ord>((T, T));

impl<T: Copy + Ord> IndexPair<T> {
	pub fn new(a: T, b: T) -> Self {
		if a < b { Self((a, b)) } else { Self((b, a)) }
	}

	pub fn contains(&self, value: T) -> bool {
		self.0.0 == value || self.0.1 == value
	}

	pub fn iter(&self) -> impl Iterator<Item = T> {
		[self.0.0, self.0.1].into_iter()
	}
}

impl<T: Copy + Ord> Deref for IndexPair<T> {
	type Target = (T, T);

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// index of a meshlet within one LOD level
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct MeshletId(pub u32);

impl MeshletId {
	#[inline]
	pub fn index(self) -> usize {
		self.0 as usize
	}
}

impl Deref for MeshletId {
	type Target = u32;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
