use gltf::buffer::Data;
use gltf::{Buffer, Document};
use std::ops::Deref;
use std::path::Path;

/// A glTF document with all of its buffers loaded. Images are never decoded.
pub struct Gltf {
	pub document: Document,
	pub buffers: Vec<Data>,
}

impl Gltf {
	#[profiling::function]
	pub fn open(path: &Path) -> Result<Self, gltf::Error> {
		let gltf::Gltf { document, blob } = gltf::Gltf::open(path)?;
		let buffers = gltf::import_buffers(&document, Some(path.parent().unwrap_or(Path::new("./"))), blob)?;
		Ok(Self { document, buffers })
	}

	pub fn buffer(&self, buffer: Buffer) -> Option<&[u8]> {
		self.buffers.get(buffer.index()).map(|b| &b.0[..])
	}
}

impl Deref for Gltf {
	type Target = Document;

	fn deref(&self) -> &Self::Target {
		&self.document
	}
}
