use clap::Parser;
use meshlet_lod::lod_tree_gen::lod_tree::LodConfig;
use meshlet_lod_preprocess::meshlet::preprocess::preprocess_models;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct PreprocessArgs {
	#[arg(short, long)]
	models_dir: PathBuf,
	/// write each primitive's packed collection below this directory
	#[arg(short, long)]
	out_dir: Option<PathBuf>,
	/// stop after this many LOD levels, 0 is unlimited
	#[arg(long, default_value_t = 0)]
	max_levels: usize,
	#[arg(long, default_value_t = 4)]
	meshlets_per_group: usize,
	#[arg(long, default_value_t = 0.01)]
	target_error: f32,
	#[arg(long, default_value_t = 0.1)]
	target_error_sloppy: f32,
	#[arg(long, default_value_t = 0.8)]
	min_triangle_reduction: f32,
	#[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
	optimize_vertex_cache: bool,
}

impl PreprocessArgs {
	fn lod_config(&self) -> LodConfig {
		LodConfig {
			max_levels: self.max_levels,
			meshlets_per_group: self.meshlets_per_group,
			target_error: self.target_error,
			target_error_sloppy: self.target_error_sloppy,
			min_triangle_reduction: self.min_triangle_reduction,
			optimize_vertex_cache: self.optimize_vertex_cache,
			..LodConfig::default()
		}
	}
}

pub fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = PreprocessArgs::parse();
	let result = preprocess_models(&args.models_dir, args.out_dir.as_deref(), &args.lod_config())?;
	println!("{result:#?}");
	Ok(())
}
