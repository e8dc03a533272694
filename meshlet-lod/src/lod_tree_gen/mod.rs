pub mod border_tracker;
pub mod collection;
pub mod indices;
pub mod lod_tree;
pub mod simplify;
pub mod sorted_smallvec;
