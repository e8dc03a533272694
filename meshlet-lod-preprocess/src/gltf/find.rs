use std::path::{Path, PathBuf};
use std::{fs, io};

#[derive(Clone, Debug)]
pub struct GltfFile {
	pub src_path: PathBuf,
	/// path relative to the models directory
	pub relative: PathBuf,
}

/// Recursively collects all `.gltf` and `.glb` files below `models_dir`, sorted by path.
#[profiling::function]
pub fn find_gltf_files(models_dir: &Path) -> io::Result<Vec<GltfFile>> {
	let models_dir = fs::canonicalize(models_dir)?;
	let mut files = walkdir::WalkDir::new(&models_dir)
		.follow_links(true)
		.into_iter()
		.filter_map(|e| e.ok())
		.filter(|e| e.file_type().is_file())
		.filter(|e| e.path().extension().is_some_and(|ext| ext == "gltf" || ext == "glb"))
		.map(|e| {
			let src_path = e.into_path();
			let relative = src_path
				.strip_prefix(&models_dir)
				.map(Path::to_path_buf)
				.unwrap_or_else(|_| src_path.clone());
			GltfFile { src_path, relative }
		})
		.collect::<Vec<_>>();
	files.sort_by(|a, b| a.relative.cmp(&b.relative));
	Ok(files)
}
