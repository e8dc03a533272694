use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;

/// A small set kept as a sorted, duplicate free [`SmallVec`], for the short per meshlet neighbor lists. Derefs to the
/// sorted slice.
pub struct SortedSmallVec<T: Ord, const N: usize>(SmallVec<[T; N]>);

impl<T: Ord + Clone, const N: usize> Clone for SortedSmallVec<T, N> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T: Ord + Debug, const N: usize> Debug for SortedSmallVec<T, N> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_set().entries(self.0.iter()).finish()
	}
}

impl<T: Ord, const N: usize> Default for SortedSmallVec<T, N> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T: Ord, const N: usize> SortedSmallVec<T, N> {
	pub const fn new() -> Self {
		Self(SmallVec::new_const())
	}

	/// returns false if `element` was already present
	pub fn insert(&mut self, element: T) -> bool {
		self.0
			.binary_search(&element)
			.map_err(|i| self.0.insert(i, element))
			.is_err()
	}

	pub fn remove(&mut self, element: &T) -> bool {
		self.position(element).map(|i| self.0.remove(i)).is_some()
	}

	/// index of `element` within the sorted slice
	pub fn position(&self, element: &T) -> Option<usize> {
		self.0.binary_search(element).ok()
	}
}

impl<T: Ord, const N: usize> Deref for SortedSmallVec<T, N> {
	type Target = [T];

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

impl<T: Ord, const N: usize> FromIterator<T> for SortedSmallVec<T, N> {
	fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
		let mut vec = iter.into_iter().collect::<SmallVec<[T; N]>>();
		vec.sort_unstable();
		vec.dedup();
		Self(vec)
	}
}
