use crate::gltf::{Gltf, find_gltf_files};
use crate::meshlet::export::write_collection;
use crate::meshlet::process::{PrimitiveStats, process_meshes};
use anyhow::Context;
use meshlet_lod::lod_tree_gen::lod_tree::LodConfig;
use rayon::prelude::*;
use std::fs;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct ModelStats {
	pub relative: PathBuf,
	pub primitives: Vec<PrimitiveStats>,
	/// exported collections, one per primitive, empty without an output dir
	pub out_files: Vec<PathBuf>,
}

/// Builds the LOD hierarchy of every triangle primitive of every glTF model below `models_dir`. With an `out_dir` each
/// collection is written to `<out_dir>/<relative model path>.mesh<m>.prim<p>.bin`.
pub fn preprocess_models(
	models_dir: &Path,
	out_dir: Option<&Path>,
	config: &LodConfig,
) -> anyhow::Result<Vec<ModelStats>> {
	profiling::function_scope!();
	let model_paths = find_gltf_files(models_dir)
		.with_context(|| format!("searching for gltf files failed {:?}", models_dir))?;
	log::info!("found {} gltf files in {:?}", model_paths.len(), models_dir);

	profiling::scope!("processing all models");
	model_paths
		.par_iter()
		.map(|model| {
			profiling::scope!("processing model", model.src_path.to_str().unwrap_or_default());
			let gltf =
				Gltf::open(&model.src_path).with_context(|| format!("opening gltf file failed {:?}", model.src_path))?;
			let primitives = process_meshes(&gltf, config)
				.with_context(|| format!("processing gltf failed {:?}", model.src_path))?;
			log::info!("processed {:?}: {} primitives", model.relative, primitives.len());

			let mut out_files = Vec::new();
			if let Some(out_dir) = out_dir {
				profiling::scope!("writing collections");
				for primitive in &primitives {
					let out_path = out_dir.join(format!(
						"{}.mesh{}.prim{}.bin",
						model.relative.display(),
						primitive.stats.mesh,
						primitive.stats.primitive
					));
					if let Some(parent) = out_path.parent() {
						fs::create_dir_all(parent)
							.with_context(|| format!("creating output directory failed {:?}", parent))?;
					}
					let file = File::create(&out_path)
						.with_context(|| format!("creating output file failed {:?}", out_path))?;
					write_collection(BufWriter::new(file), &primitive.collection)
						.with_context(|| format!("writing collection failed {:?}", out_path))?;
					out_files.push(out_path);
				}
			}

			Ok::<_, anyhow::Error>(ModelStats {
				relative: model.relative.clone(),
				primitives: primitives.into_iter().map(|p| p.stats).collect(),
				out_files,
			})
		})
		.collect()
}
