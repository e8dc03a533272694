use crate::index_allocator::{IndexAllocation, IndexAllocator};

/// Storage addressed by generation tagged [`IndexAllocation`] handles, backed by an [`IndexAllocator`]. Lookups with a
/// handle whose slot has since been freed return `None` instead of aliasing the new occupant.
#[derive(Debug)]
pub struct SlotTable<T> {
	allocator: IndexAllocator,
	slots: Vec<Option<T>>,
}

impl<T> SlotTable<T> {
	pub fn new(capacity: usize, auto_grow: bool) -> Self {
		let allocator = IndexAllocator::new(capacity, auto_grow);
		let slots = (0..allocator.capacity()).map(|_| None).collect();
		Self { allocator, slots }
	}

	/// Returns `None` if the table is full and can't grow.
	pub fn insert(&mut self, value: T) -> Option<IndexAllocation> {
		let handle = self.allocator.allocate();
		if !handle.is_valid() {
			return None;
		}
		if self.slots.len() < self.allocator.capacity() {
			self.slots.resize_with(self.allocator.capacity(), || None);
		}
		self.slots[handle.index as usize] = Some(value);
		Some(handle)
	}

	pub fn get(&self, handle: IndexAllocation) -> Option<&T> {
		if self.allocator.is_alive(handle) {
			self.slots[handle.index as usize].as_ref()
		} else {
			None
		}
	}

	pub fn get_mut(&mut self, handle: IndexAllocation) -> Option<&mut T> {
		if self.allocator.is_alive(handle) {
			self.slots[handle.index as usize].as_mut()
		} else {
			None
		}
	}

	/// # Panics
	/// if `handle` is stale, see [`IndexAllocator::free`]
	pub fn remove(&mut self, handle: IndexAllocation) -> T {
		self.allocator.free(handle);
		match self.slots[handle.index as usize].take() {
			Some(value) => value,
			None => unreachable!("alive slot {:?} without a value", handle),
		}
	}

	pub fn len(&self) -> usize {
		self.allocator.allocated()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn capacity(&self) -> usize {
		self.allocator.capacity()
	}
}
