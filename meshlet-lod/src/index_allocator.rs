use std::fmt::{Debug, Formatter};

/// A handle into an [`IndexAllocator`]. The handle is only valid as long as the `generation` matches the generation
/// currently stored in the slot, freeing a slot increments its generation and invalidates all handles to it.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct IndexAllocation {
	pub index: u32,
	pub generation: u32,
}

impl IndexAllocation {
	/// Returned by [`IndexAllocator::allocate`] if there is no capacity left
	pub const INVALID: Self = Self {
		index: INVALID_INDEX,
		generation: 0,
	};

	#[inline]
	pub fn is_valid(&self) -> bool {
		self.index != INVALID_INDEX
	}
}

impl Debug for IndexAllocation {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if self.is_valid() {
			f.debug_struct("IndexAllocation")
				.field("index", &self.index)
				.field("generation", &self.generation)
				.finish()
		} else {
			f.write_str("IndexAllocation::INVALID")
		}
	}
}

const INVALID_INDEX: u32 = !0;

#[derive(Copy, Clone, Debug)]
struct Node {
	/// next free node, only meaningful while this node is part of the free list
	next: u32,
	generation: u32,
}

/// Fixed capacity slot allocator handing out generation tagged indices. The free nodes form an intrusive singly
/// linked list, so both [`Self::allocate`] and [`Self::free`] are O(1). Growing appends new nodes and never moves
/// existing slots, so handles stay valid across growth.
///
/// All mutation requires `&mut self`, sharing an allocator across threads requires external locking.
pub struct IndexAllocator {
	nodes: Vec<Node>,
	head: u32,
	allocated: usize,
	auto_grow: bool,
}

impl IndexAllocator {
	pub fn new(capacity: usize, auto_grow: bool) -> Self {
		assert!(capacity > 0, "IndexAllocator capacity must be positive");
		assert!(capacity < INVALID_INDEX as usize, "IndexAllocator capacity {} is too large", capacity);
		let mut allocator = Self {
			nodes: Vec::with_capacity(capacity),
			head: INVALID_INDEX,
			allocated: 0,
			auto_grow,
		};
		allocator.append_free_nodes(capacity);
		allocator
	}

	#[inline]
	pub fn capacity(&self) -> usize {
		self.nodes.len()
	}

	#[inline]
	pub fn is_full(&self) -> bool {
		self.head == INVALID_INDEX
	}

	/// count of currently alive allocations
	#[inline]
	pub fn allocated(&self) -> usize {
		self.allocated
	}

	#[inline]
	pub fn auto_grow(&self) -> bool {
		self.auto_grow
	}

	/// Pops a free slot. If the allocator is full, it doubles its capacity when `auto_grow` is enabled, otherwise
	/// returns [`IndexAllocation::INVALID`].
	pub fn allocate(&mut self) -> IndexAllocation {
		if self.is_full() {
			if self.auto_grow {
				self.force_grow(self.capacity() * 2);
			}
			if self.is_full() {
				return IndexAllocation::INVALID;
			}
		}

		let index = self.head;
		let node = &mut self.nodes[index as usize];
		self.head = node.next;
		node.next = INVALID_INDEX;
		self.allocated += 1;
		IndexAllocation {
			index,
			generation: node.generation,
		}
	}

	/// Returns the slot of `allocation` to the free list and invalidates all handles to it.
	///
	/// # Panics
	/// if `allocation` is out of bounds or its generation does not match the slot, e.g. when freeing twice
	pub fn free(&mut self, allocation: IndexAllocation) {
		let capacity = self.capacity();
		assert!(
			(allocation.index as usize) < capacity,
			"index out of bounds: the capacity is {} but the index is {}",
			capacity,
			allocation.index
		);
		let node = &mut self.nodes[allocation.index as usize];
		assert_eq!(
			node.generation, allocation.generation,
			"freeing stale allocation {:?}, slot is at generation {}",
			allocation, node.generation
		);

		node.next = self.head;
		node.generation = node.generation.wrapping_add(1);
		self.head = allocation.index;
		self.allocated -= 1;
	}

	/// Ensures a capacity of at least `ensured_capacity`, rounded up to the next multiple of the current capacity. The
	/// new slots are put in front of the existing free list.
	pub fn force_grow(&mut self, ensured_capacity: usize) {
		let old_capacity = self.capacity();
		if ensured_capacity <= old_capacity {
			return;
		}
		let new_capacity = ensured_capacity.div_ceil(old_capacity) * old_capacity;
		assert!(
			new_capacity < INVALID_INDEX as usize,
			"IndexAllocator capacity {} is too large",
			new_capacity
		);
		self.append_free_nodes(new_capacity - old_capacity);
	}

	/// the generation currently stored in slot `index`
	pub fn generation(&self, index: u32) -> u32 {
		assert_ne!(index, INVALID_INDEX, "generation of IndexAllocation::INVALID");
		self.nodes[index as usize].generation
	}

	/// true if `allocation` still refers to the current generation of its slot
	pub fn is_alive(&self, allocation: IndexAllocation) -> bool {
		self.nodes
			.get(allocation.index as usize)
			.is_some_and(|node| node.generation == allocation.generation)
	}

	fn append_free_nodes(&mut self, count: usize) {
		let start = self.nodes.len() as u32;
		let end = start + count as u32;
		let old_head = self.head;
		self.nodes.extend((start..end).map(|i| Node {
			next: if i + 1 == end { old_head } else { i + 1 },
			generation: 0,
		}));
		self.head = start;
	}
}

impl Debug for IndexAllocator {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IndexAllocator")
			.field("capacity", &self.capacity())
			.field("allocated", &self.allocated)
			.field("auto_grow", &self.auto_grow)
			.finish()
	}
}
