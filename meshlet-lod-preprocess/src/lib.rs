pub mod gltf;
pub mod meshlet;
