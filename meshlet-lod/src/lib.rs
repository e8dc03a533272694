pub mod index_allocator;
pub mod lod_tree_gen;
pub mod meshlet;
pub mod partition;
pub mod shape;
pub mod slot_table;
pub mod vertex;

#[cfg(test)]
mod test_meshes;
